// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Jobpilot auto-apply engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Jobpilot workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::JobpilotError;
pub use types::{
    AppliedStatus, ConnectionStatus, DeliveryOutcome, DeliveryStatus, JobFilters, OutboundEmail,
    QuotaDecision, SendFailure, SessionId, SessionStatus, WorkItem,
};

pub use traits::{MailerAdapter, PlanProvider};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobpilot_error_has_all_variants() {
        let _config = JobpilotError::Config("test".into());
        let _storage = JobpilotError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _mailer = JobpilotError::Mailer {
            message: "test".into(),
            source: None,
        };
        let _not_eligible = JobpilotError::NotEligible {
            user_id: "u".into(),
            reason: "integration disconnected".into(),
        };
        let _running = JobpilotError::AlreadyRunning { user_id: "u".into() };
        let _missing = JobpilotError::SessionNotFound {
            session_id: "s".into(),
        };
        let _timeout = JobpilotError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = JobpilotError::Internal("test".into());
    }

    #[test]
    fn error_messages_name_the_user() {
        let err = JobpilotError::AlreadyRunning {
            user_id: "user-7".into(),
        };
        assert!(err.to_string().contains("user-7"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_mailer<T: MailerAdapter>() {}
        fn _assert_plans<T: PlanProvider>() {}
    }
}
