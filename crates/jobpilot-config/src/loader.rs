// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./jobpilot.toml` > `~/.config/jobpilot/jobpilot.toml`
//! > `/etc/jobpilot/jobpilot.toml` with environment variable overrides via
//! `JOBPILOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::JobpilotConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/jobpilot/jobpilot.toml` (system-wide)
/// 3. `~/.config/jobpilot/jobpilot.toml` (user XDG config)
/// 4. `./jobpilot.toml` (local directory)
/// 5. `JOBPILOT_*` environment variables
pub fn load_config() -> Result<JobpilotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and for loading config from an explicit string.
pub fn load_config_from_str(toml_content: &str) -> Result<JobpilotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JobpilotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<JobpilotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JobpilotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(JobpilotConfig::default()))
        .merge(Toml::file("/etc/jobpilot/jobpilot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("jobpilot/jobpilot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("jobpilot.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `JOBPILOT_SMTP_FROM_ADDRESS` must map to
/// `smtp.from_address`, not `smtp.from.address`.
fn env_provider() -> Env {
    Env::prefixed("JOBPILOT_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: JOBPILOT_SMTP_FROM_ADDRESS -> "smtp_from_address"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("smtp_", "smtp.", 1)
            .replacen("scheduler_", "scheduler.", 1)
            .replacen("plans_", "plans.", 1);
        mapped.into()
    })
}
