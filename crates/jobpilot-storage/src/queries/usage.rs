// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily quota ledger.
//!
//! `record_application` is the atomic check-then-increment: the company-set
//! check, the limit check, and the upsert all happen in one transaction on
//! the single writer thread, so two concurrent runs can never both consume
//! the last quota slot. Counts are never decremented; failed sends keep
//! their slot.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::QuotaDecision;
use rusqlite::params;

use crate::database::Database;
use crate::models::{self, DailyUsage};

/// Atomically reserve one quota slot for an application to `company`.
///
/// Same-company repeats on the same day return `CompanyAlreadyApplied`
/// without consuming a slot. Once `daily_limit` distinct companies are
/// recorded, further companies get `LimitReached`.
pub async fn record_application(
    db: &Database,
    user_id: &str,
    day: &str,
    company: &str,
    daily_limit: u32,
) -> Result<QuotaDecision, JobpilotError> {
    let user_id = user_id.to_string();
    let day = day.to_string();
    let company = company.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<(i64, String)> = {
                let result = tx.query_row(
                    "SELECT applications_count, companies FROM daily_usage
                     WHERE user_id = ?1 AND day = ?2",
                    params![user_id, day],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                );
                match result {
                    Ok(row) => Some(row),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e),
                }
            };

            let (count, mut companies) = match existing {
                Some((count, json)) => (count, models::parse_json_list(&json)?),
                None => (0, Vec::new()),
            };

            if companies.iter().any(|c| c == &company) {
                tx.commit()?;
                return Ok(QuotaDecision::CompanyAlreadyApplied);
            }
            if count >= i64::from(daily_limit) {
                tx.commit()?;
                return Ok(QuotaDecision::LimitReached);
            }

            companies.push(company);
            tx.execute(
                "INSERT INTO daily_usage (user_id, day, applications_count, companies)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, day) DO UPDATE SET
                     applications_count = excluded.applications_count,
                     companies = excluded.companies",
                params![user_id, day, count + 1, models::to_json_list(&companies)],
            )?;
            tx.commit()?;
            Ok(QuotaDecision::Recorded)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the ledger row for (user, day), if any.
pub async fn get_usage(
    db: &Database,
    user_id: &str,
    day: &str,
) -> Result<Option<DailyUsage>, JobpilotError> {
    let user_id = user_id.to_string();
    let day = day.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT user_id, day, applications_count, companies FROM daily_usage
                 WHERE user_id = ?1 AND day = ?2",
                params![user_id, day],
                |row| {
                    Ok((
                        DailyUsage {
                            user_id: row.get(0)?,
                            day: row.get(1)?,
                            applications_count: row.get(2)?,
                            companies: Vec::new(),
                        },
                        row.get::<_, String>(3)?,
                    ))
                },
            );
            match result {
                Ok((mut usage, json)) => {
                    usage.companies = models::parse_json_list(&json)?;
                    Ok(Some(usage))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remaining quota slots for (user, day) under `daily_limit`.
pub async fn remaining(
    db: &Database,
    user_id: &str,
    day: &str,
    daily_limit: u32,
) -> Result<u32, JobpilotError> {
    let used = get_usage(db, user_id, day)
        .await?
        .map(|u| u.applications_count)
        .unwrap_or(0);
    Ok(u32::try_from(i64::from(daily_limit) - used).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    const DAY: &str = "2026-08-30";

    #[tokio::test]
    async fn records_up_to_limit_then_rejects() {
        let (db, _dir) = setup_db().await;

        for company in ["Acme", "Globex", "Initech"] {
            let decision = record_application(&db, "u1", DAY, company, 3).await.unwrap();
            assert_eq!(decision, QuotaDecision::Recorded);
        }

        let decision = record_application(&db, "u1", DAY, "Umbrella", 3).await.unwrap();
        assert_eq!(decision, QuotaDecision::LimitReached);

        let usage = get_usage(&db, "u1", DAY).await.unwrap().unwrap();
        assert_eq!(usage.applications_count, 3);
        assert_eq!(usage.companies.len(), 3);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_company_same_day_does_not_consume_slot() {
        let (db, _dir) = setup_db().await;

        assert_eq!(
            record_application(&db, "u1", DAY, "Acme", 5).await.unwrap(),
            QuotaDecision::Recorded
        );
        assert_eq!(
            record_application(&db, "u1", DAY, "Acme", 5).await.unwrap(),
            QuotaDecision::CompanyAlreadyApplied
        );

        let usage = get_usage(&db, "u1", DAY).await.unwrap().unwrap();
        assert_eq!(usage.applications_count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn quota_rolls_over_by_day_and_is_per_user() {
        let (db, _dir) = setup_db().await;

        assert_eq!(
            record_application(&db, "u1", "2026-08-29", "Acme", 1).await.unwrap(),
            QuotaDecision::Recorded
        );
        assert_eq!(
            record_application(&db, "u1", "2026-08-29", "Globex", 1).await.unwrap(),
            QuotaDecision::LimitReached
        );

        // New day: fresh slots, and yesterday's company is allowed again.
        assert_eq!(
            record_application(&db, "u1", "2026-08-30", "Acme", 1).await.unwrap(),
            QuotaDecision::Recorded
        );

        // Other users are unaffected.
        assert_eq!(
            record_application(&db, "u2", "2026-08-29", "Acme", 1).await.unwrap(),
            QuotaDecision::Recorded
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn remaining_reflects_usage() {
        let (db, _dir) = setup_db().await;
        assert_eq!(remaining(&db, "u1", DAY, 5).await.unwrap(), 5);

        record_application(&db, "u1", DAY, "Acme", 5).await.unwrap();
        record_application(&db, "u1", DAY, "Globex", 5).await.unwrap();
        assert_eq!(remaining(&db, "u1", DAY, 5).await.unwrap(), 3);

        // A lowered limit never underflows.
        assert_eq!(remaining(&db, "u1", DAY, 1).await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_reservations_never_exceed_limit() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                record_application(&db, "u1", DAY, &format!("company-{i}"), 4).await
            }));
        }

        let mut recorded = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == QuotaDecision::Recorded {
                recorded += 1;
            }
        }
        assert_eq!(recorded, 4);

        let usage = get_usage(&db, "u1", DAY).await.unwrap().unwrap();
        assert_eq!(usage.applications_count, 4);

        db.close().await.unwrap();
    }
}
