// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for external collaborators.
//!
//! All adapters use `#[async_trait]` for dynamic dispatch compatibility and
//! are wired as `Arc<dyn Trait + Send + Sync>` at the engine boundary.

pub mod mailer;
pub mod plans;

pub use mailer::MailerAdapter;
pub use plans::PlanProvider;
