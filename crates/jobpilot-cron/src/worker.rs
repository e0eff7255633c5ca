// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker: executes enqueued auto-apply runs.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_core::types::WorkItem;
use jobpilot_core::JobpilotError;
use jobpilot_engine::Orchestrator;
use jobpilot_storage::queries::queue;
use jobpilot_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Polls the work queue and drives each item to a terminal session state.
pub struct QueueWorker {
    db: Database,
    orchestrator: Arc<Orchestrator>,
    poll_interval: Duration,
}

impl QueueWorker {
    pub fn new(db: Database, orchestrator: Arc<Orchestrator>, poll_interval: Duration) -> Self {
        Self {
            db,
            orchestrator,
            poll_interval,
        }
    }

    /// Run until cancelled, draining the queue on each poll tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(poll_interval_secs = self.poll_interval.as_secs(), "queue worker started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.drain().await {
                        error!(error = %e, "queue drain failed");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("queue worker shutting down");
                    break;
                }
            }
        }
    }

    /// Process pending entries until the queue is empty.
    pub async fn drain(&self) -> Result<usize, JobpilotError> {
        let mut processed = 0;
        while self.process_next().await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Process at most one queue entry. Returns `false` when the queue was
    /// empty.
    pub async fn process_next(&self) -> Result<bool, JobpilotError> {
        let Some(entry) = queue::dequeue(&self.db).await? else {
            return Ok(false);
        };

        let item: WorkItem = match serde_json::from_str(&entry.payload) {
            Ok(item) => item,
            Err(e) => {
                // Corrupt payload will never parse; burn its attempts.
                error!(entry_id = entry.id, error = %e, "unparseable work item");
                queue::fail(&self.db, entry.id).await?;
                return Ok(true);
            }
        };

        debug!(entry_id = entry.id, session_id = %item.session_id, "processing work item");
        match self.orchestrator.process_item(&item).await {
            Ok(()) => queue::ack(&self.db, entry.id).await?,
            Err(e) => {
                error!(
                    entry_id = entry.id,
                    session_id = %item.session_id,
                    error = %e,
                    "work item failed"
                );
                queue::fail(&self.db, entry.id).await?;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use jobpilot_config::model::EngineConfig;
    use jobpilot_core::types::{
        ConnectionStatus, OutboundEmail, SendFailure, SessionStatus,
    };
    use jobpilot_core::{MailerAdapter, PlanProvider};
    use jobpilot_engine::{Dispatcher, QuotaLedger, RetryPolicy, RunLockRegistry};
    use jobpilot_storage::queries::{jobs, profiles, sessions};
    use jobpilot_storage::{IntegrationProfile, JobPosting};
    use tempfile::tempdir;

    use super::*;

    struct OkMailer;

    #[async_trait]
    impl MailerAdapter for OkMailer {
        fn name(&self) -> &str {
            "ok"
        }
        async fn send(&self, _email: &OutboundEmail) -> Result<(), SendFailure> {
            Ok(())
        }
    }

    struct FixedPlan(u32);

    #[async_trait]
    impl PlanProvider for FixedPlan {
        async fn daily_limit(&self, _user_id: &str) -> Result<u32, JobpilotError> {
            Ok(self.0)
        }
    }

    async fn setup() -> (QueueWorker, Arc<Orchestrator>, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let config = EngineConfig::default();
        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            QuotaLedger::new(db.clone(), Arc::new(FixedPlan(10))),
            Dispatcher::new(
                db.clone(),
                Arc::new(OkMailer),
                RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
                Duration::from_secs(5),
            ),
            RunLockRegistry::new(),
            config,
        ));
        let worker = QueueWorker::new(db.clone(), orchestrator.clone(), Duration::from_millis(10));
        (worker, orchestrator, db, dir)
    }

    async fn seed_user_and_job(db: &Database, user_id: &str) {
        profiles::upsert_profile(
            db,
            &IntegrationProfile {
                user_id: user_id.to_string(),
                display_name: "Jane".to_string(),
                email_address: "jane@example.com".to_string(),
                status: ConnectionStatus::Connected,
                auto_apply_enabled: true,
                plan: "free".to_string(),
                categories: vec![],
                locations: vec![],
                experience_levels: vec![],
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                updated_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
        jobs::upsert_job(
            db,
            &JobPosting {
                id: format!("job-{user_id}"),
                title: "Engineer".to_string(),
                company_name: format!("Company {user_id}"),
                company_email: Some("jobs@example.com".to_string()),
                category: "engineering".to_string(),
                location: "remote".to_string(),
                experience_level: "mid".to_string(),
                is_active: true,
                posted_at: "2026-03-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn drains_enqueued_runs_to_completion() {
        let (worker, orchestrator, db, _dir) = setup().await;
        seed_user_and_job(&db, "u1").await;

        let session_id = orchestrator.trigger_run("u1", None, None).await.unwrap().0;
        assert_eq!(worker.drain().await.unwrap(), 1);

        let session = sessions::get_session(&db, &session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.applications_sent, 1);

        // Nothing left.
        assert!(!worker.process_next().await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_payload_is_failed_not_looped() {
        let (worker, _orchestrator, db, _dir) = setup().await;

        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO work_queue (payload) VALUES ('not json')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        // Three attempts burn the entry out.
        for _ in 0..3 {
            assert!(worker.process_next().await.unwrap());
        }
        assert!(!worker.process_next().await.unwrap());

        let status: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("SELECT status FROM work_queue", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(status, "failed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn worker_loop_stops_on_cancel() {
        let (worker, _orchestrator, db, _dir) = setup().await;
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { worker.run(cancel).await })
        };
        cancel.cancel();
        handle.await.unwrap();

        db.close().await.unwrap();
    }
}
