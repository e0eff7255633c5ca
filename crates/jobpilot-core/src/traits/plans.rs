// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only seam to the billing subsystem's subscription plans.

use async_trait::async_trait;

use crate::error::JobpilotError;

/// Supplies the subscription-defined daily application limit for a user.
///
/// Owned by a separate billing subsystem; the quota ledger only reads it.
#[async_trait]
pub trait PlanProvider: Send + Sync + 'static {
    /// The maximum number of distinct companies the user may auto-apply to
    /// per calendar day.
    async fn daily_limit(&self, user_id: &str) -> Result<u32, JobpilotError>;
}
