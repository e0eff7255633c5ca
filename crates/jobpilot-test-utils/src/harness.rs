// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the complete engine stack (temp SQLite database,
//! mock mailer, quota ledger, orchestrator) plus seed helpers, and a
//! `run_to_completion()` method that drives trigger -> queue -> worker-side
//! execution the way the daemon does.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_config::model::{EngineConfig, PlansConfig};
use jobpilot_core::types::{ConnectionStatus, JobFilters, SendFailure, WorkItem};
use jobpilot_core::JobpilotError;
use jobpilot_engine::{
    ConfigPlanProvider, Dispatcher, Orchestrator, QuotaLedger, RetryPolicy, RunLockRegistry,
};
use jobpilot_storage::queries::{jobs, profiles, queue};
use jobpilot_storage::{Database, IntegrationProfile, JobPosting};

use crate::mock_mailer::MockMailer;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    script: Vec<Result<(), SendFailure>>,
    engine: EngineConfig,
    plans: PlansConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            script: Vec::new(),
            engine: EngineConfig::default(),
            plans: PlansConfig::default(),
        }
    }

    /// Script the mailer's outcomes (replayed in order, then successes).
    pub fn with_mailer_script(mut self, script: Vec<Result<(), SendFailure>>) -> Self {
        self.script = script;
        self
    }

    /// Override the engine configuration.
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Override the plan table.
    pub fn with_plans(mut self, plans: PlansConfig) -> Self {
        self.plans = plans;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, JobpilotError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| JobpilotError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;

        let mailer = Arc::new(MockMailer::with_script(self.script));
        let plans = Arc::new(ConfigPlanProvider::new(db.clone(), self.plans));
        let quota = QuotaLedger::new(db.clone(), plans);
        // Millisecond backoff keeps retried tests fast.
        let dispatcher = Dispatcher::new(
            db.clone(),
            mailer.clone(),
            RetryPolicy::new(
                self.engine.retry_max_attempts,
                Duration::from_millis(1),
                Duration::from_millis(5),
            ),
            Duration::from_secs(self.engine.dispatch_timeout_secs),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            db.clone(),
            quota,
            dispatcher,
            RunLockRegistry::new(),
            self.engine,
        ));

        Ok(TestHarness {
            db,
            mailer,
            orchestrator,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment over a temp database.
pub struct TestHarness {
    /// Storage handle (temp DB, cleaned up on drop).
    pub db: Database,
    /// The mock mailer, for scripting outcomes and inspecting sent mail.
    pub mailer: Arc<MockMailer>,
    /// The orchestrator under test.
    pub orchestrator: Arc<Orchestrator>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Seed a connected, auto-apply-enabled profile.
    pub async fn seed_profile(&self, user_id: &str, plan: &str) -> Result<(), JobpilotError> {
        self.seed_profile_with(user_id, plan, ConnectionStatus::Connected, true, JobFilters::default())
            .await
    }

    /// Seed a profile with explicit status, toggle, and filters.
    pub async fn seed_profile_with(
        &self,
        user_id: &str,
        plan: &str,
        status: ConnectionStatus,
        auto_apply_enabled: bool,
        filters: JobFilters,
    ) -> Result<(), JobpilotError> {
        let now = chrono::Utc::now().to_rfc3339();
        let profile = IntegrationProfile {
            user_id: user_id.to_string(),
            display_name: format!("User {user_id}"),
            email_address: format!("{user_id}@example.com"),
            status,
            auto_apply_enabled,
            plan: plan.to_string(),
            categories: filters.categories,
            locations: filters.locations,
            experience_levels: filters.experience_levels,
            created_at: now.clone(),
            updated_at: now,
        };
        profiles::upsert_profile(&self.db, &profile).await
    }

    /// Seed an active job posting with a contact address.
    pub async fn seed_job(&self, id: &str, company: &str, posted_at: &str) -> Result<(), JobpilotError> {
        let job = JobPosting {
            id: id.to_string(),
            title: "Backend Engineer".to_string(),
            company_name: company.to_string(),
            company_email: Some(format!("jobs@{}.example.com", company.to_lowercase())),
            category: "engineering".to_string(),
            location: "remote".to_string(),
            experience_level: "mid".to_string(),
            is_active: true,
            posted_at: posted_at.to_string(),
        };
        jobs::upsert_job(&self.db, &job).await
    }

    /// Seed a fully custom job posting.
    pub async fn seed_job_with(&self, job: &JobPosting) -> Result<(), JobpilotError> {
        jobs::upsert_job(&self.db, job).await
    }

    /// Trigger a run and execute it through the queue, like the daemon's
    /// worker would. Returns the session ID.
    pub async fn run_to_completion(&self, user_id: &str) -> Result<String, JobpilotError> {
        let session_id = self
            .orchestrator
            .trigger_run(user_id, None, None)
            .await?
            .0;
        self.drain_queue().await?;
        Ok(session_id)
    }

    /// Execute every pending queue entry.
    pub async fn drain_queue(&self) -> Result<(), JobpilotError> {
        while let Some(entry) = queue::dequeue(&self.db).await? {
            let item: WorkItem = serde_json::from_str(&entry.payload)
                .map_err(|e| JobpilotError::Internal(e.to_string()))?;
            self.orchestrator.process_item(&item).await?;
            queue::ack(&self.db, entry.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jobpilot_core::types::SessionStatus;

    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.seed_profile("u1", "free").await.unwrap();
        harness
            .seed_job("j1", "Acme", "2026-03-01T00:00:00.000Z")
            .await
            .unwrap();

        let session_id = harness.run_to_completion("u1").await.unwrap();
        let session = harness.orchestrator.get_session(&session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(harness.mailer.attempt_count(), 1);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.seed_profile("u1", "free").await.unwrap();
        let p1 = profiles::get_profile(&h1.db, "u1").await.unwrap();
        let p2 = profiles::get_profile(&h2.db, "u1").await.unwrap();
        assert!(p1.is_some());
        assert!(p2.is_none());
    }
}
