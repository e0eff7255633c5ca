// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Applied-job records and the storage-level duplicate guard.
//!
//! `insert_pending` is the only way a (user, job) pair enters the table, and
//! the UNIQUE constraint decides races: whichever writer lands second gets
//! [`InsertOutcome::Duplicate`] and must skip the job.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::AppliedStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{self, AppliedJob};

/// Whether an applied-job row was newly created or already existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Insert a pending applied-job record for a (user, job) pair.
pub async fn insert_pending(
    db: &Database,
    user_id: &str,
    job_id: &str,
    company_email: &str,
) -> Result<InsertOutcome, JobpilotError> {
    let user_id = user_id.to_string();
    let job_id = job_id.to_string();
    let company_email = company_email.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO applied_jobs (user_id, job_id, status, company_email, attempted_at)
                 VALUES (?1, ?2, 'pending', ?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![user_id, job_id, company_email],
            );
            match result {
                Ok(_) => Ok(InsertOutcome::Inserted),
                Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a pair's record as sent.
pub async fn mark_sent(db: &Database, user_id: &str, job_id: &str) -> Result<(), JobpilotError> {
    let user_id = user_id.to_string();
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE applied_jobs SET status = 'sent', error = NULL
                 WHERE user_id = ?1 AND job_id = ?2",
                params![user_id, job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a pair's record as failed with the final error.
pub async fn mark_failed(
    db: &Database,
    user_id: &str,
    job_id: &str,
    error: &str,
) -> Result<(), JobpilotError> {
    let user_id = user_id.to_string();
    let job_id = job_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE applied_jobs SET status = 'failed', error = ?1
                 WHERE user_id = ?2 AND job_id = ?3",
                params![error, user_id, job_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// True when the user has any record for the job, regardless of outcome.
pub async fn already_applied(
    db: &Database,
    user_id: &str,
    job_id: &str,
) -> Result<bool, JobpilotError> {
    let user_id = user_id.to_string();
    let job_id = job_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM applied_jobs WHERE user_id = ?1 AND job_id = ?2",
                params![user_id, job_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's applied-job records, newest attempt first.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<AppliedJob>, JobpilotError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, job_id, status, company_email, error, attempted_at
                 FROM applied_jobs
                 WHERE user_id = ?1 ORDER BY attempted_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok((
                    AppliedJob {
                        user_id: row.get(0)?,
                        job_id: row.get(1)?,
                        status: AppliedStatus::Pending,
                        company_email: row.get(3)?,
                        error: row.get(4)?,
                        attempted_at: row.get(5)?,
                    },
                    row.get::<_, String>(2)?,
                ))
            })?;
            let mut records = Vec::new();
            for row in rows {
                let (mut record, status) = row?;
                record.status = models::parse_enum(&status, "applied status")?;
                records.push(record);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
