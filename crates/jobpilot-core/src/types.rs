// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Jobpilot workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an application session (one orchestration run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection state of a user's external email integration.
///
/// Profiles are never hard-deleted; unlinking marks them `Disconnected`,
/// a failed credential marks them `Revoked`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connected,
    Revoked,
}

/// Lifecycle states of an application session.
///
/// `Pending` and `Running` are live; `Completed`, `Partial`, and `Failed`
/// are terminal and immutable once written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created by a trigger, not yet picked up by a worker.
    Pending,
    /// A worker is actively processing candidates.
    Running,
    /// All candidates attempted, none failed permanently, no exhausted retries.
    Completed,
    /// At least one candidate exhausted its transient retries; the run proceeded.
    Partial,
    /// A permanent failure aborted the run, or it could not start.
    Failed,
}

impl SessionStatus {
    /// Whether this state is terminal. Terminal sessions are immutable.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Failed)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// `Pending -> Failed` covers trigger-time rejections surfaced after the
    /// session row exists (worker-side exclusivity loss, revoked profile).
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending, Self::Failed) => true,
            (Self::Running, Self::Completed | Self::Partial | Self::Failed) => true,
            _ => false,
        }
    }
}

/// Delivery state of an applied-job record (one per (user, job) pair, ever).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppliedStatus {
    Pending,
    Sent,
    Failed,
}

/// Terminal state of a single email delivery attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Bounced,
}

/// Classified outcome of a dispatch (send plus bounded retries).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The application email was accepted by the provider.
    Sent,
    /// Retries were exhausted on errors expected to succeed later
    /// (timeout, rate limit, temporary provider error).
    TransientFailure(String),
    /// The error will not succeed on retry without external intervention
    /// (revoked credential, malformed recipient, suspended account).
    PermanentFailure(String),
}

/// A single send failure as classified by the mailer adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Worth retrying after a backoff delay.
    Transient(String),
    /// Retrying is certain to fail identically.
    Permanent(String),
}

impl SendFailure {
    /// The human-readable failure detail.
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

impl std::fmt::Display for SendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(m) => write!(f, "transient send failure: {m}"),
            Self::Permanent(m) => write!(f, "permanent send failure: {m}"),
        }
    }
}

impl std::error::Error for SendFailure {}

/// Result of the quota ledger's atomic check-then-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The application was counted; the caller may proceed.
    Recorded,
    /// The user already applied to this company today. Expected skip.
    CompanyAlreadyApplied,
    /// The daily distinct-company limit is reached. Expected skip, and the
    /// caller should stop iterating further candidates.
    LimitReached,
}

/// An outbound application email, ready for the mailer adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Preference filters applied when selecting candidate jobs.
///
/// Empty lists mean "no constraint" for that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub experience_levels: Vec<String>,
}

impl JobFilters {
    /// True when no dimension constrains the selection.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.locations.is_empty() && self.experience_levels.is_empty()
    }
}

/// A unit of enqueued orchestration work, one per (user, trigger) pair.
///
/// `session_id` references the session row created at trigger time, so the
/// triggering caller holds an identifier before the worker picks this up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub session_id: String,
    pub user_id: String,
    /// Caller-requested cap on applications this run. `None` uses the
    /// configured per-run maximum.
    #[serde(default)]
    pub max_applications: Option<u32>,
    /// Overrides the profile's preference filters for this run only.
    #[serde(default)]
    pub filter_override: Option<JobFilters>,
}
