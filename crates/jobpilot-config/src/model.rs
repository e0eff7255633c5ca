// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Jobpilot auto-apply engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Jobpilot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobpilotConfig {
    /// Orchestration engine behavior settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound SMTP settings.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Work queue polling and daily sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Subscription plan daily limits (read-only mirror of billing).
    #[serde(default)]
    pub plans: PlansConfig,
}

/// Orchestration engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Default cap on applications per run when the trigger does not set one.
    #[serde(default = "default_max_applications_per_run")]
    pub max_applications_per_run: u32,

    /// Per-attempt send timeout in seconds.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Maximum send attempts per candidate (first attempt included).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Base backoff delay in seconds between transient-failure retries.
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: u64,

    /// Upper bound on a single backoff delay in seconds.
    #[serde(default = "default_retry_max_delay_secs")]
    pub retry_max_delay_secs: u64,

    /// A session still `running` after this many seconds is treated as
    /// abandoned by the recovery sweep and force-failed.
    #[serde(default = "default_stalled_after_secs")]
    pub stalled_after_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_applications_per_run: default_max_applications_per_run(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            retry_max_delay_secs: default_retry_max_delay_secs(),
            stalled_after_secs: default_stalled_after_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_applications_per_run() -> u32 {
    10
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_secs() -> u64 {
    2
}

fn default_retry_max_delay_secs() -> u64 {
    30
}

fn default_stalled_after_secs() -> u64 {
    900 // 15 minutes
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("jobpilot").join("jobpilot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("jobpilot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// SMTP relay hostname.
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// From address on outbound application emails.
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// SMTP username. `None` sends without authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,

    /// Use STARTTLS on the relay connection.
    #[serde(default = "default_smtp_tls")]
    pub tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            from_address: default_from_address(),
            username: None,
            password: None,
            tls: default_smtp_tls(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@jobpilot.dev".to_string()
}

fn default_smtp_tls() -> bool {
    true
}

/// Work queue polling and daily sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Enable the recurring daily sweep over eligible users.
    #[serde(default = "default_sweep_enabled")]
    pub sweep_enabled: bool,

    /// Cron expression for the daily sweep (5-field, UTC).
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,

    /// Work queue poll interval in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Interval in seconds between stalled-session recovery sweeps.
    #[serde(default = "default_stall_sweep_interval_secs")]
    pub stall_sweep_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: default_sweep_enabled(),
            sweep_cron: default_sweep_cron(),
            poll_interval_secs: default_poll_interval_secs(),
            stall_sweep_interval_secs: default_stall_sweep_interval_secs(),
        }
    }
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_cron() -> String {
    "0 8 * * *".to_string() // daily at 08:00 UTC
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_stall_sweep_interval_secs() -> u64 {
    60
}

/// Daily application limits per subscription tier.
///
/// This is a read-only mirror of the billing subsystem's plan definitions;
/// the quota ledger consults it through the `PlanProvider` seam.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlansConfig {
    /// Daily distinct-company limit for the free tier.
    #[serde(default = "default_free_limit")]
    pub free: u32,

    /// Daily distinct-company limit for the pro tier.
    #[serde(default = "default_pro_limit")]
    pub pro: u32,

    /// Daily distinct-company limit for the enterprise tier.
    #[serde(default = "default_enterprise_limit")]
    pub enterprise: u32,
}

impl PlansConfig {
    /// Resolve a plan name to its daily limit. Unknown plans fall back to
    /// the free tier.
    pub fn daily_limit(&self, plan: &str) -> u32 {
        match plan.to_ascii_lowercase().as_str() {
            "pro" => self.pro,
            "enterprise" => self.enterprise,
            _ => self.free,
        }
    }
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            free: default_free_limit(),
            pro: default_pro_limit(),
            enterprise: default_enterprise_limit(),
        }
    }
}

fn default_free_limit() -> u32 {
    5
}

fn default_pro_limit() -> u32 {
    25
}

fn default_enterprise_limit() -> u32 {
    100
}
