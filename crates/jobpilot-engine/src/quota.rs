// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota ledger front-end: plan resolution plus the storage ledger.
//!
//! Day keys are UTC dates. A run that straddles midnight draws from both
//! days' quotas, one day at a time; the ledger is consulted per application,
//! never cached for the run.

use std::sync::Arc;

use async_trait::async_trait;
use jobpilot_config::model::PlansConfig;
use jobpilot_core::types::QuotaDecision;
use jobpilot_core::{JobpilotError, PlanProvider};
use jobpilot_storage::queries::{profiles, usage};
use jobpilot_storage::Database;
use tracing::debug;

/// Resolves daily limits from the static plan table in configuration.
pub struct ConfigPlanProvider {
    db: Database,
    plans: PlansConfig,
}

impl ConfigPlanProvider {
    pub fn new(db: Database, plans: PlansConfig) -> Self {
        Self { db, plans }
    }
}

#[async_trait]
impl PlanProvider for ConfigPlanProvider {
    async fn daily_limit(&self, user_id: &str) -> Result<u32, JobpilotError> {
        let plan = profiles::get_profile(&self.db, user_id)
            .await?
            .map(|p| p.plan)
            .unwrap_or_else(|| "free".to_string());
        Ok(self.plans.daily_limit(&plan))
    }
}

/// Per-user per-day application counter with the distinct-company rule.
#[derive(Clone)]
pub struct QuotaLedger {
    db: Database,
    plans: Arc<dyn PlanProvider>,
}

impl QuotaLedger {
    pub fn new(db: Database, plans: Arc<dyn PlanProvider>) -> Self {
        Self { db, plans }
    }

    /// Today's day key in UTC.
    pub fn today() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Atomically reserve a quota slot for an application to `company` today.
    ///
    /// Call this BEFORE dispatching; the slot is kept even if the send later
    /// fails, so a failed send still counts against the day.
    pub async fn reserve(
        &self,
        user_id: &str,
        company: &str,
    ) -> Result<QuotaDecision, JobpilotError> {
        let limit = self.plans.daily_limit(user_id).await?;
        let day = Self::today();
        let decision = usage::record_application(&self.db, user_id, &day, company, limit).await?;
        debug!(user_id, company, day, ?decision, "quota reservation");
        Ok(decision)
    }

    /// Remaining slots for the user today.
    pub async fn remaining_today(&self, user_id: &str) -> Result<u32, JobpilotError> {
        let limit = self.plans.daily_limit(user_id).await?;
        usage::remaining(&self.db, user_id, &Self::today(), limit).await
    }

    /// Read-only check: would an application to `company` be admitted today?
    ///
    /// Advisory only. Two callers can both see `true` and race; `reserve` is
    /// the authoritative gate.
    pub async fn can_apply(&self, user_id: &str, company: &str) -> Result<bool, JobpilotError> {
        let limit = self.plans.daily_limit(user_id).await?;
        let Some(row) = usage::get_usage(&self.db, user_id, &Self::today()).await? else {
            return Ok(limit > 0);
        };
        Ok(!row.companies.iter().any(|c| c == company) && row.applications_count < limit as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobpilot_core::types::ConnectionStatus;
    use jobpilot_storage::IntegrationProfile;
    use tempfile::tempdir;

    struct FixedPlan(u32);

    #[async_trait]
    impl PlanProvider for FixedPlan {
        async fn daily_limit(&self, _user_id: &str) -> Result<u32, JobpilotError> {
            Ok(self.0)
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn reserve_consumes_slots_until_limit() {
        let (db, _dir) = setup_db().await;
        let ledger = QuotaLedger::new(db.clone(), Arc::new(FixedPlan(2)));

        assert_eq!(ledger.reserve("u1", "Acme").await.unwrap(), QuotaDecision::Recorded);
        assert_eq!(ledger.remaining_today("u1").await.unwrap(), 1);

        assert_eq!(ledger.reserve("u1", "Globex").await.unwrap(), QuotaDecision::Recorded);
        assert_eq!(
            ledger.reserve("u1", "Initech").await.unwrap(),
            QuotaDecision::LimitReached
        );
        assert_eq!(ledger.remaining_today("u1").await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeat_company_is_flagged_without_consuming() {
        let (db, _dir) = setup_db().await;
        let ledger = QuotaLedger::new(db.clone(), Arc::new(FixedPlan(5)));

        ledger.reserve("u1", "Acme").await.unwrap();
        assert_eq!(
            ledger.reserve("u1", "Acme").await.unwrap(),
            QuotaDecision::CompanyAlreadyApplied
        );
        assert_eq!(ledger.remaining_today("u1").await.unwrap(), 4);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn can_apply_mirrors_reserve_without_writing() {
        let (db, _dir) = setup_db().await;
        let ledger = QuotaLedger::new(db.clone(), Arc::new(FixedPlan(2)));

        assert!(ledger.can_apply("u1", "Acme").await.unwrap());
        // The check does not consume a slot.
        assert_eq!(ledger.remaining_today("u1").await.unwrap(), 2);

        ledger.reserve("u1", "Acme").await.unwrap();
        assert!(!ledger.can_apply("u1", "Acme").await.unwrap());
        assert!(ledger.can_apply("u1", "Globex").await.unwrap());

        ledger.reserve("u1", "Globex").await.unwrap();
        assert!(!ledger.can_apply("u1", "Initech").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn config_plan_provider_resolves_profile_plan() {
        let (db, _dir) = setup_db().await;
        let profile = IntegrationProfile {
            user_id: "u1".to_string(),
            display_name: "Jane".to_string(),
            email_address: "jane@example.com".to_string(),
            status: ConnectionStatus::Connected,
            auto_apply_enabled: true,
            plan: "pro".to_string(),
            categories: vec![],
            locations: vec![],
            experience_levels: vec![],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        profiles::upsert_profile(&db, &profile).await.unwrap();

        let provider = ConfigPlanProvider::new(db.clone(), PlansConfig::default());
        assert_eq!(provider.daily_limit("u1").await.unwrap(), 25);
        // Unknown users fall back to the free tier.
        assert_eq!(provider.daily_limit("nobody").await.unwrap(), 5);

        db.close().await.unwrap();
    }
}
