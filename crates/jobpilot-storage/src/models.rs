// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Status columns are stored as lowercase strings and surfaced as the typed
//! enums from `jobpilot-core`. JSON-array columns (filter sets, the per-day
//! company set) are surfaced as `Vec<String>`.

use std::str::FromStr;

use jobpilot_core::types::{AppliedStatus, ConnectionStatus, DeliveryStatus, SessionStatus};

/// One per user; holds provider-connection state and the preference filter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationProfile {
    pub user_id: String,
    pub display_name: String,
    pub email_address: String,
    pub status: ConnectionStatus,
    pub auto_apply_enabled: bool,
    /// Subscription tier name, resolved to a daily limit via `PlanProvider`.
    pub plan: String,
    pub categories: Vec<String>,
    pub locations: Vec<String>,
    pub experience_levels: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An open (or retracted) job posting in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company_name: String,
    /// Destination contact address. A job without one is never a candidate.
    pub company_email: Option<String>,
    pub category: String,
    pub location: String,
    pub experience_level: String,
    pub is_active: bool,
    pub posted_at: String,
}

/// One orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplySession {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub jobs_found: i64,
    pub applications_sent: i64,
    pub applications_failed: i64,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

/// One per (user, job) pair the orchestrator has attempted, ever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedJob {
    pub user_id: String,
    pub job_id: String,
    pub status: AppliedStatus,
    pub company_email: String,
    pub error: Option<String>,
    pub attempted_at: String,
}

/// One send attempt (retries included), linked to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDelivery {
    /// Auto-assigned row id; ignored on insert.
    pub id: i64,
    pub session_id: String,
    pub user_id: String,
    pub job_id: String,
    pub recipient: String,
    pub subject: String,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: String,
}

/// Per-(user, day) quota ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    pub user_id: String,
    pub day: String,
    pub applications_count: i64,
    /// Distinct companies applied to on `day`.
    pub companies: Vec<String>,
}

/// One enqueued orchestration work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkQueueEntry {
    pub id: i64,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

/// Parse a stored status string into its typed enum inside a query closure.
pub(crate) fn parse_enum<T: FromStr>(value: &str, what: &str) -> Result<T, rusqlite::Error> {
    T::from_str(value).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("invalid {what}: `{value}`").into(),
        )
    })
}

/// Parse a JSON-array column into a string list inside a query closure.
pub(crate) fn parse_json_list(value: &str) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Serialize a string list for a JSON-array column.
pub(crate) fn to_json_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}
