// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration: trigger, execute, and inspect auto-apply runs.
//!
//! A trigger creates the session row up front (so the caller holds an ID
//! immediately) and enqueues a work item referencing it. The worker later
//! claims the session pending -> running and drives the candidate loop. Per
//! candidate the order is fixed: quota reservation, duplicate guard, dispatch.
//! The reservation comes first so the check-then-increment is the single
//! gate; a send that fails afterwards keeps its slot.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_config::model::EngineConfig;
use jobpilot_core::types::{DeliveryOutcome, JobFilters, QuotaDecision, SessionStatus, WorkItem};
use jobpilot_core::{JobpilotError, SessionId};
use jobpilot_storage::queries::{applied, jobs, profiles, queue, sessions};
use jobpilot_storage::{AppliedJob, ApplySession, Database, InsertOutcome, IntegrationProfile};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::locks::RunLockRegistry;
use crate::quota::QuotaLedger;
use crate::selector;

/// Counters produced by one candidate loop.
///
/// `fatal` holds the message of a permanent dispatch failure, which aborts
/// the remainder of the run.
struct RunOutcome {
    found: i64,
    sent: i64,
    failed: i64,
    fatal: Option<String>,
}

/// Drives auto-apply sessions end to end.
pub struct Orchestrator {
    db: Database,
    quota: QuotaLedger,
    dispatcher: Dispatcher,
    locks: RunLockRegistry,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(
        db: Database,
        quota: QuotaLedger,
        dispatcher: Dispatcher,
        locks: RunLockRegistry,
        config: EngineConfig,
    ) -> Self {
        Self {
            db,
            quota,
            dispatcher,
            locks,
            config,
        }
    }

    /// Trigger an auto-apply run for a user.
    ///
    /// Validates eligibility, creates a pending session, and enqueues the work
    /// item. Returns the session ID; the run itself happens on the worker.
    pub async fn trigger_run(
        &self,
        user_id: &str,
        max_applications: Option<u32>,
        filter_override: Option<JobFilters>,
    ) -> Result<SessionId, JobpilotError> {
        let profile = self.eligible_profile(user_id).await?;

        // The session insert doubles as the exclusivity check; two
        // concurrent triggers for the same user race through here and the
        // writer thread admits exactly one.
        let session_id = uuid::Uuid::new_v4().to_string();
        if !sessions::create_session_exclusive(&self.db, &session_id, user_id).await? {
            return Err(JobpilotError::AlreadyRunning {
                user_id: user_id.to_string(),
            });
        }

        let item = WorkItem {
            session_id: session_id.clone(),
            user_id: profile.user_id,
            max_applications,
            filter_override,
        };
        queue::enqueue(&self.db, &item).await?;

        info!(session_id = %session_id, user_id, "auto-apply run triggered");
        Ok(SessionId(session_id))
    }

    /// Execute one dequeued work item to its terminal session state.
    ///
    /// Never returns `Err` for per-candidate failures; those land in the
    /// session counters. An `Err` here means the run itself could not
    /// proceed and the queue entry should be retried.
    pub async fn process_item(&self, item: &WorkItem) -> Result<(), JobpilotError> {
        let Some(_guard) = self.locks.try_acquire(&item.user_id) else {
            // Lost the in-process race: the trigger-time exclusivity check
            // makes this rare, and a run rejected here stays rejected.
            warn!(
                session_id = %item.session_id,
                user_id = %item.user_id,
                "run lock held, rejecting session"
            );
            sessions::reject_session(&self.db, &item.session_id, "another run is active").await?;
            return Ok(());
        };

        if !sessions::claim_session(&self.db, &item.session_id).await? {
            warn!(
                session_id = %item.session_id,
                user_id = %item.user_id,
                "session not claimable, rejecting"
            );
            sessions::reject_session(&self.db, &item.session_id, "another run is active").await?;
            return Ok(());
        }

        // The profile may have disconnected between trigger and execution.
        let profile = match self.eligible_profile(&item.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                sessions::finish_session(
                    &self.db,
                    &item.session_id,
                    SessionStatus::Failed,
                    0,
                    0,
                    0,
                    Some(&e.to_string()),
                )
                .await?;
                return Ok(());
            }
        };

        match self.run_candidates(item, &profile).await {
            Ok(outcome) => {
                let RunOutcome {
                    found,
                    sent,
                    failed,
                    fatal,
                } = outcome;
                // A permanent failure aborts the run; exhausted transient
                // retries degrade it to partial; otherwise it completed.
                let status = if fatal.is_some() {
                    SessionStatus::Failed
                } else if failed > 0 {
                    SessionStatus::Partial
                } else {
                    SessionStatus::Completed
                };
                let error = fatal;
                sessions::finish_session(
                    &self.db,
                    &item.session_id,
                    status,
                    found,
                    sent,
                    failed,
                    error.as_deref(),
                )
                .await?;
                info!(
                    session_id = %item.session_id,
                    user_id = %item.user_id,
                    %status,
                    jobs_found = found,
                    applications_sent = sent,
                    applications_failed = failed,
                    "session finished"
                );
            }
            Err(e) => {
                sessions::finish_session(
                    &self.db,
                    &item.session_id,
                    SessionStatus::Failed,
                    0,
                    0,
                    0,
                    Some(&e.to_string()),
                )
                .await?;
                warn!(session_id = %item.session_id, error = %e, "session failed");
            }
        }
        Ok(())
    }

    /// The candidate loop.
    ///
    /// Transient failures (after retry exhaustion) count and move on; a
    /// permanent failure stops the loop so no further candidates are
    /// attempted against a rejecting upstream.
    async fn run_candidates(
        &self,
        item: &WorkItem,
        profile: &IntegrationProfile,
    ) -> Result<RunOutcome, JobpilotError> {
        let per_run_cap = item
            .max_applications
            .unwrap_or(self.config.max_applications_per_run)
            .min(self.config.max_applications_per_run);
        let remaining = self.quota.remaining_today(&profile.user_id).await?;

        let batch = selector::select_batch(
            &self.db,
            profile,
            item.filter_override.as_ref(),
            per_run_cap,
            remaining,
        )
        .await?;

        let found = batch.len() as i64;
        let mut sent = 0i64;
        let mut failed = 0i64;
        let mut fatal = None;

        for job in &batch {
            // Selection already requires a non-empty address; re-checked here
            // because the row may have changed since.
            let Some(recipient) = jobs::get_job(&self.db, &job.id)
                .await?
                .and_then(|j| j.company_email)
                .filter(|e| !e.is_empty())
            else {
                debug!(job_id = %job.id, "candidate lost its contact address, skipping");
                continue;
            };

            match self.quota.reserve(&profile.user_id, &job.company_name).await? {
                QuotaDecision::Recorded => {}
                QuotaDecision::CompanyAlreadyApplied => {
                    debug!(job_id = %job.id, company = %job.company_name, "company already applied today, skipping");
                    continue;
                }
                QuotaDecision::LimitReached => {
                    debug!(user_id = %profile.user_id, "daily limit reached, stopping run");
                    break;
                }
            }

            match applied::insert_pending(&self.db, &profile.user_id, &job.id, &recipient).await? {
                InsertOutcome::Inserted => {}
                InsertOutcome::Duplicate => {
                    // A concurrent run got here first. The quota slot stays
                    // consumed; slots are never handed back.
                    debug!(job_id = %job.id, "already attempted by a concurrent run, skipping");
                    continue;
                }
            }

            match self
                .dispatcher
                .dispatch(&item.session_id, profile, job, &recipient)
                .await?
            {
                DeliveryOutcome::Sent => {
                    applied::mark_sent(&self.db, &profile.user_id, &job.id).await?;
                    sent += 1;
                }
                DeliveryOutcome::TransientFailure(msg) => {
                    applied::mark_failed(&self.db, &profile.user_id, &job.id, &msg).await?;
                    failed += 1;
                }
                DeliveryOutcome::PermanentFailure(msg) => {
                    applied::mark_failed(&self.db, &profile.user_id, &job.id, &msg).await?;
                    failed += 1;
                    warn!(
                        session_id = %item.session_id,
                        job_id = %job.id,
                        error = %msg,
                        "permanent delivery failure, aborting run"
                    );
                    fatal = Some(msg);
                    break;
                }
            }
        }

        Ok(RunOutcome {
            found,
            sent,
            failed,
            fatal,
        })
    }

    /// Get a session by ID.
    pub async fn get_session(&self, session_id: &str) -> Result<ApplySession, JobpilotError> {
        sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| JobpilotError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// List a user's sessions, newest first.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ApplySession>, JobpilotError> {
        sessions::list_sessions_for_user(&self.db, user_id, limit).await
    }

    /// List a user's applied-job records, newest first.
    pub async fn list_applied(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<AppliedJob>, JobpilotError> {
        applied::list_for_user(&self.db, user_id, limit).await
    }

    /// Fail running sessions older than the configured stall threshold.
    pub async fn sweep_stalled(&self) -> Result<Vec<String>, JobpilotError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(Duration::from_secs(self.config.stalled_after_secs))
                .unwrap_or_else(|_| chrono::Duration::seconds(900));
        let swept = sessions::fail_stalled_sessions(
            &self.db,
            &cutoff.to_rfc3339(),
            "session stalled and was recovered",
        )
        .await?;
        if !swept.is_empty() {
            warn!(count = swept.len(), "stalled sessions recovered");
        }
        Ok(swept)
    }

    /// Every eligible user, for the daily sweep.
    pub async fn eligible_users(&self) -> Result<Vec<IntegrationProfile>, JobpilotError> {
        profiles::list_eligible(&self.db).await
    }

    async fn eligible_profile(&self, user_id: &str) -> Result<IntegrationProfile, JobpilotError> {
        let profile = profiles::get_profile(&self.db, user_id).await?.ok_or_else(|| {
            JobpilotError::NotEligible {
                user_id: user_id.to_string(),
                reason: "no integration profile".to_string(),
            }
        })?;
        if profile.status != jobpilot_core::types::ConnectionStatus::Connected {
            return Err(JobpilotError::NotEligible {
                user_id: user_id.to_string(),
                reason: format!("integration is {}", profile.status),
            });
        }
        if !profile.auto_apply_enabled {
            return Err(JobpilotError::NotEligible {
                user_id: user_id.to_string(),
                reason: "auto-apply is disabled".to_string(),
            });
        }
        Ok(profile)
    }
}
