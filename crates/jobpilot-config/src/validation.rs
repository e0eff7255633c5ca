// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths, sane retry bounds, and plausible
//! addresses.

use crate::diagnostic::ConfigError;
use crate::model::JobpilotConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &JobpilotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.smtp.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "smtp.host must not be empty".to_string(),
        });
    }

    if !config.smtp.from_address.contains('@') {
        errors.push(ConfigError::Validation {
            message: format!(
                "smtp.from_address `{}` is not a valid email address",
                config.smtp.from_address
            ),
        });
    }

    if config.engine.max_applications_per_run == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.max_applications_per_run must be at least 1".to_string(),
        });
    }

    if config.engine.retry_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.retry_max_attempts must be at least 1".to_string(),
        });
    }

    if config.engine.retry_base_delay_secs > config.engine.retry_max_delay_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.retry_base_delay_secs ({}) must not exceed engine.retry_max_delay_secs ({})",
                config.engine.retry_base_delay_secs, config.engine.retry_max_delay_secs
            ),
        });
    }

    if config.engine.dispatch_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.dispatch_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.scheduler.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "scheduler.poll_interval_secs must be at least 1".to_string(),
        });
    }

    for (tier, limit) in [
        ("free", config.plans.free),
        ("pro", config.plans.pro),
        ("enterprise", config.plans.enterprise),
    ] {
        if limit == 0 {
            errors.push(ConfigError::Validation {
                message: format!("plans.{tier} must be at least 1"),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineConfig, SmtpConfig, StorageConfig};

    #[test]
    fn default_config_is_valid() {
        let config = JobpilotConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_rejected() {
        let config = JobpilotConfig {
            storage: StorageConfig {
                database_path: "  ".to_string(),
                wal_mode: true,
            },
            ..JobpilotConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("database_path")));
    }

    #[test]
    fn from_address_without_at_sign_rejected() {
        let config = JobpilotConfig {
            smtp: SmtpConfig {
                from_address: "not-an-address".to_string(),
                ..SmtpConfig::default()
            },
            ..JobpilotConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("from_address")));
    }

    #[test]
    fn inverted_retry_delays_rejected() {
        let config = JobpilotConfig {
            engine: EngineConfig {
                retry_base_delay_secs: 60,
                retry_max_delay_secs: 30,
                ..EngineConfig::default()
            },
            ..JobpilotConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("retry_base_delay_secs")));
    }

    #[test]
    fn partial_toml_fills_in_defaults_and_validates() {
        let toml_str = r#"
            [smtp]
            host = "mail.example.com"
            from_address = "apply@example.com"

            [plans]
            free = 2
        "#;
        let config: JobpilotConfig = toml::from_str(toml_str).unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.plans.free, 2);
        assert_eq!(config.plans.pro, 25);
        assert_eq!(config.engine.max_applications_per_run, 10);
    }

    #[test]
    fn unknown_keys_are_rejected_at_parse_time() {
        let toml_str = r#"
            [engine]
            max_aplications_per_run = 5
        "#;
        assert!(toml::from_str::<JobpilotConfig>(toml_str).is_err());
    }

    #[test]
    fn all_errors_collected_not_fail_fast() {
        let config = JobpilotConfig {
            storage: StorageConfig {
                database_path: String::new(),
                wal_mode: true,
            },
            engine: EngineConfig {
                retry_max_attempts: 0,
                max_applications_per_run: 0,
                ..EngineConfig::default()
            },
            ..JobpilotConfig::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected all errors, got {}", errors.len());
    }
}
