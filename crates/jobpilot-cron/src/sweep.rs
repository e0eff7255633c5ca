// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring sweeps: the daily auto-apply sweep and stall recovery.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use croner::Cron;
use jobpilot_core::JobpilotError;
use jobpilot_engine::Orchestrator;
use jobpilot_storage::queries::queue;
use jobpilot_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Triggers a run for every eligible user on a cron schedule.
pub struct DailySweep {
    orchestrator: Arc<Orchestrator>,
    cron: Cron,
}

impl std::fmt::Debug for DailySweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailySweep")
            .field("cron", &self.cron.pattern.to_string())
            .finish_non_exhaustive()
    }
}

impl DailySweep {
    /// Build a sweep from a cron pattern (e.g. `"0 8 * * *"`).
    pub fn new(orchestrator: Arc<Orchestrator>, pattern: &str) -> Result<Self, JobpilotError> {
        let cron = Cron::from_str(pattern)
            .map_err(|e| JobpilotError::Config(format!("invalid sweep cron `{pattern}`: {e}")))?;
        Ok(Self { orchestrator, cron })
    }

    /// Seconds until the next scheduled sweep.
    fn until_next(&self) -> Result<Duration, JobpilotError> {
        let now = Utc::now();
        let next = self
            .cron
            .find_next_occurrence(&now, false)
            .map_err(|e| JobpilotError::Internal(format!("cron schedule error: {e}")))?;
        Ok((next - now).to_std().unwrap_or(Duration::ZERO))
    }

    /// Run until cancelled, sweeping at each scheduled occurrence.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("daily sweep scheduler started");
        loop {
            let wait = match self.until_next() {
                Ok(wait) => wait,
                Err(e) => {
                    error!(error = %e, "sweep scheduling failed, stopping");
                    return;
                }
            };
            debug!(wait_secs = wait.as_secs(), "next sweep scheduled");
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "daily sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("daily sweep scheduler shutting down");
                    break;
                }
            }
        }
    }

    /// Trigger one run per eligible user. Users with an active session are
    /// skipped; one user's failure never stops the sweep.
    pub async fn sweep_once(&self) -> Result<usize, JobpilotError> {
        let eligible = self.orchestrator.eligible_users().await?;
        let mut triggered = 0;
        for profile in &eligible {
            match self.orchestrator.trigger_run(&profile.user_id, None, None).await {
                Ok(session_id) => {
                    debug!(user_id = %profile.user_id, session_id = %session_id.0, "sweep triggered run");
                    triggered += 1;
                }
                Err(JobpilotError::AlreadyRunning { .. }) => {
                    debug!(user_id = %profile.user_id, "sweep skipped: session already active");
                }
                Err(JobpilotError::NotEligible { user_id, reason }) => {
                    debug!(user_id, reason, "sweep skipped: no longer eligible");
                }
                Err(e) => {
                    warn!(user_id = %profile.user_id, error = %e, "sweep trigger failed");
                }
            }
        }
        info!(eligible = eligible.len(), triggered, "daily sweep finished");
        Ok(triggered)
    }
}

/// Recovers sessions and queue entries orphaned by crashes.
pub struct StallSweep {
    db: Database,
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
}

impl StallSweep {
    pub fn new(db: Database, orchestrator: Arc<Orchestrator>, interval: Duration) -> Self {
        Self {
            db,
            orchestrator,
            interval,
        }
    }

    /// Run until cancelled, sweeping on a fixed interval.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        info!(interval_secs = self.interval.as_secs(), "stall sweep started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "stall sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("stall sweep shutting down");
                    break;
                }
            }
        }
    }

    /// One recovery pass: fail stalled sessions, release expired queue locks.
    pub async fn sweep_once(&self) -> Result<(), JobpilotError> {
        let swept = self.orchestrator.sweep_stalled().await?;
        if !swept.is_empty() {
            warn!(sessions = swept.len(), "stalled sessions failed by sweep");
        }
        let released = queue::release_expired(&self.db).await?;
        if released > 0 {
            warn!(entries = released, "expired queue locks released");
        }
        Ok(())
    }
}
