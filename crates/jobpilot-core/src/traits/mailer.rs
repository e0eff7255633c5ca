// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mailer adapter trait for external email-sending providers.

use async_trait::async_trait;

use crate::types::{OutboundEmail, SendFailure};

/// Adapter for the external email-sending provider.
///
/// Implementations classify every failure as transient or permanent; the
/// dispatcher's retry policy depends on that distinction. Credential
/// refresh is the provider client's concern, not the caller's: a send that
/// fails because the credential is expired or revoked must come back as
/// [`SendFailure::Permanent`].
#[async_trait]
pub trait MailerAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this mailer.
    fn name(&self) -> &str;

    /// Sends one email. `Ok(())` means the provider accepted the message.
    async fn send(&self, email: &OutboundEmail) -> Result<(), SendFailure>;
}
