// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job catalog operations and candidate selection.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::JobFilters;
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::Database;
use crate::models::JobPosting;

const JOB_COLUMNS: &str = "id, title, company_name, company_email, category, location,
     experience_level, is_active, posted_at";

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobPosting> {
    Ok(JobPosting {
        id: row.get(0)?,
        title: row.get(1)?,
        company_name: row.get(2)?,
        company_email: row.get(3)?,
        category: row.get(4)?,
        location: row.get(5)?,
        experience_level: row.get(6)?,
        is_active: row.get::<_, i64>(7)? != 0,
        posted_at: row.get(8)?,
    })
}

/// Insert or replace a posting in the catalog.
pub async fn upsert_job(db: &Database, job: &JobPosting) -> Result<(), JobpilotError> {
    let job = job.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO jobs
                     (id, title, company_name, company_email, category, location,
                      experience_level, is_active, posted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    job.id,
                    job.title,
                    job.company_name,
                    job.company_email,
                    job.category,
                    job.location,
                    job.experience_level,
                    job.is_active as i64,
                    job.posted_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a posting by ID.
pub async fn get_job(db: &Database, id: &str) -> Result<Option<JobPosting>, JobpilotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_job);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a posting inactive (retracted). Inactive postings are never candidates.
pub async fn deactivate_job(db: &Database, id: &str) -> Result<(), JobpilotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("UPDATE jobs SET is_active = 0 WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Select candidate postings for a user.
///
/// A candidate is active, has a contact address, matches every non-empty
/// filter dimension, and has never been attempted by this user. Newest
/// postings first, at most `limit` rows. An empty filter dimension matches
/// everything.
pub async fn select_candidates(
    db: &Database,
    user_id: &str,
    filters: &JobFilters,
    limit: u32,
) -> Result<Vec<JobPosting>, JobpilotError> {
    let user_id = user_id.to_string();
    let filters = filters.clone();
    db.connection()
        .call(move |conn| {
            let mut sql = format!(
                "SELECT {JOB_COLUMNS} FROM jobs
                 WHERE is_active = 1
                   AND company_email IS NOT NULL AND company_email != ''
                   AND id NOT IN (SELECT job_id FROM applied_jobs WHERE user_id = ?1)"
            );
            let mut bindings: Vec<Value> = vec![Value::Text(user_id)];

            for (column, values) in [
                ("category", &filters.categories),
                ("location", &filters.locations),
                ("experience_level", &filters.experience_levels),
            ] {
                if values.is_empty() {
                    continue;
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        bindings.push(Value::Text(v.clone()));
                        format!("?{}", bindings.len())
                    })
                    .collect();
                sql.push_str(&format!(" AND {column} IN ({})", placeholders.join(", ")));
            }

            bindings.push(Value::Integer(i64::from(limit)));
            sql.push_str(&format!(" ORDER BY posted_at DESC LIMIT ?{}", bindings.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(bindings), row_to_job)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
