// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Jobpilot auto-apply engine.

use thiserror::Error;

/// The primary error type used across Jobpilot crates.
#[derive(Debug, Error)]
pub enum JobpilotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Email provider errors that are not part of normal outcome classification
    /// (connection setup, message construction).
    #[error("mailer error: {message}")]
    Mailer {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A run was rejected at trigger time: the integration profile is missing,
    /// disconnected, revoked, or auto-apply is disabled.
    #[error("user {user_id} is not eligible for auto-apply: {reason}")]
    NotEligible { user_id: String, reason: String },

    /// A run was rejected because another session for the same user is active.
    #[error("a session is already running for user {user_id}")]
    AlreadyRunning { user_id: String },

    /// The requested session does not exist.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
