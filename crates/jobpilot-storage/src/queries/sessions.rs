// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle queries.
//!
//! Status transitions are enforced in SQL guards so that the state machine
//! holds even with concurrent workers: `claim_session` only moves
//! pending -> running and only when the user has no other running session;
//! `finish_session` only moves running -> terminal.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::SessionStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{self, ApplySession};

const SESSION_COLUMNS: &str = "id, user_id, status, jobs_found, applications_sent,
     applications_failed, error, created_at, started_at, ended_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<(ApplySession, String)> {
    let status: String = row.get(2)?;
    Ok((
        ApplySession {
            id: row.get(0)?,
            user_id: row.get(1)?,
            status: SessionStatus::Pending,
            jobs_found: row.get(3)?,
            applications_sent: row.get(4)?,
            applications_failed: row.get(5)?,
            error: row.get(6)?,
            created_at: row.get(7)?,
            started_at: row.get(8)?,
            ended_at: row.get(9)?,
        },
        status,
    ))
}

fn finish_session_row(
    (mut session, status): (ApplySession, String),
) -> Result<ApplySession, rusqlite::Error> {
    session.status = models::parse_enum(&status, "session status")?;
    Ok(session)
}

/// Create a pending session.
pub async fn create_session(db: &Database, id: &str, user_id: &str) -> Result<(), JobpilotError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, status, created_at)
                 VALUES (?1, ?2, 'pending', strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![id, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create a pending session unless the user already has an active one.
///
/// The existence check and the insert are one statement on the writer
/// thread, so two concurrent triggers for the same user can never both get
/// a session. Returns `false` (writing nothing) when a pending or running
/// session exists.
pub async fn create_session_exclusive(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<bool, JobpilotError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO sessions (id, user_id, status, created_at)
                 SELECT ?1, ?2, 'pending', strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE NOT EXISTS (
                     SELECT 1 FROM sessions
                     WHERE user_id = ?2 AND status IN ('pending', 'running')
                 )",
                params![id, user_id],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ApplySession>, JobpilotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_session);
            match result {
                Ok(parts) => Ok(Some(finish_session_row(parts)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim a pending session for execution.
///
/// Moves pending -> running and stamps `started_at`. Returns `false` when the
/// session is not pending anymore or another session for the same user is
/// already running.
pub async fn claim_session(db: &Database, id: &str) -> Result<bool, JobpilotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE sessions
                 SET status = 'running', started_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'
                   AND NOT EXISTS (
                       SELECT 1 FROM sessions other
                       WHERE other.user_id = sessions.user_id
                         AND other.status = 'running'
                         AND other.id != sessions.id
                   )",
                params![id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Finish a running session with a terminal status and final counters.
pub async fn finish_session(
    db: &Database,
    id: &str,
    status: SessionStatus,
    jobs_found: i64,
    applications_sent: i64,
    applications_failed: i64,
    error: Option<&str>,
) -> Result<(), JobpilotError> {
    debug_assert!(status.is_terminal());
    let id = id.to_string();
    let error = error.map(|e| e.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1, jobs_found = ?2, applications_sent = ?3,
                     applications_failed = ?4, error = ?5,
                     ended_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?6 AND status = 'running'",
                params![
                    status.to_string(),
                    jobs_found,
                    applications_sent,
                    applications_failed,
                    error,
                    id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fail a session that never started (pending -> failed).
pub async fn reject_session(db: &Database, id: &str, error: &str) -> Result<(), JobpilotError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = 'failed', error = ?1,
                     ended_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'pending'",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's sessions, newest first.
pub async fn list_sessions_for_user(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<ApplySession>, JobpilotError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], row_to_session)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(finish_session_row(row?)?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fail every running session that started before `cutoff` (RFC 3339).
///
/// Recovers sessions orphaned by a crash mid-run. Returns the IDs that were
/// transitioned.
pub async fn fail_stalled_sessions(
    db: &Database,
    cutoff: &str,
    error: &str,
) -> Result<Vec<String>, JobpilotError> {
    let cutoff = cutoff.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM sessions
                     WHERE status = 'running' AND started_at < ?1",
                )?;
                let rows = stmt.query_map(params![cutoff], |row| row.get(0))?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(row?);
                }
                ids
            };
            for id in &ids {
                tx.execute(
                    "UPDATE sessions
                     SET status = 'failed', error = ?1,
                         ended_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![error, id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
        .map_err(crate::database::map_tr_err)
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

    #[tokio::test]
    async fn create_and_get_session() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.user_id, "u1");
        assert!(session.started_at.is_none());
        assert!(get_session(&db, "missing").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_moves_pending_to_running_once() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();

        assert!(claim_session(&db, "s1").await.unwrap());
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Running);
        assert!(session.started_at.is_some());

        // Second claim is a no-op.
        assert!(!claim_session(&db, "s1").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_rejected_while_user_has_running_session() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();
        create_session(&db, "s2", "u1").await.unwrap();
        create_session(&db, "s3", "u2").await.unwrap();

        assert!(claim_session(&db, "s1").await.unwrap());
        // Same user: blocked.
        assert!(!claim_session(&db, "s2").await.unwrap());
        // Different user: fine.
        assert!(claim_session(&db, "s3").await.unwrap());

        // After s1 finishes, s2 becomes claimable.
        finish_session(&db, "s1", SessionStatus::Completed, 3, 3, 0, None)
            .await
            .unwrap();
        assert!(claim_session(&db, "s2").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn finish_only_applies_to_running_sessions() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();

        // Still pending: finish is ignored.
        finish_session(&db, "s1", SessionStatus::Completed, 1, 1, 0, None)
            .await
            .unwrap();
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Pending);

        claim_session(&db, "s1").await.unwrap();
        finish_session(&db, "s1", SessionStatus::Partial, 5, 3, 2, None)
            .await
            .unwrap();
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Partial);
        assert_eq!(session.jobs_found, 5);
        assert_eq!(session.applications_sent, 3);
        assert_eq!(session.applications_failed, 2);
        assert!(session.ended_at.is_some());

        // Terminal states never change again.
        finish_session(&db, "s1", SessionStatus::Completed, 9, 9, 9, None)
            .await
            .unwrap();
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Partial);
        assert_eq!(session.jobs_found, 5);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reject_fails_pending_session() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();
        reject_session(&db, "s1", "another run is active").await.unwrap();

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.error.as_deref(), Some("another run is active"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn exclusive_create_rejects_while_user_has_active_session() {
        let (db, _dir) = setup_db().await;

        assert!(create_session_exclusive(&db, "s1", "u1").await.unwrap());
        // Pending blocks.
        assert!(!create_session_exclusive(&db, "s2", "u1").await.unwrap());
        assert!(get_session(&db, "s2").await.unwrap().is_none());

        // Running blocks too.
        claim_session(&db, "s1").await.unwrap();
        assert!(!create_session_exclusive(&db, "s2", "u1").await.unwrap());

        // Other users are unaffected.
        assert!(create_session_exclusive(&db, "s3", "u2").await.unwrap());

        // Terminal frees the user.
        finish_session(&db, "s1", SessionStatus::Completed, 0, 0, 0, None)
            .await
            .unwrap();
        assert!(create_session_exclusive(&db, "s2", "u1").await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stalled_sessions_are_failed_past_cutoff() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "s1", "u1").await.unwrap();
        claim_session(&db, "s1").await.unwrap();

        // Cutoff far in the past: nothing stalled yet.
        let failed = fail_stalled_sessions(&db, "2000-01-01T00:00:00.000Z", "stalled")
            .await
            .unwrap();
        assert!(failed.is_empty());

        // Cutoff in the future: the running session is swept.
        let failed = fail_stalled_sessions(&db, "2999-01-01T00:00:00.000Z", "stalled")
            .await
            .unwrap();
        assert_eq!(failed, vec!["s1".to_string()]);

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.error.as_deref(), Some("stalled"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_sessions_newest_first() {
        let (db, _dir) = setup_db().await;
        create_session(&db, "a", "u1").await.unwrap();
        create_session(&db, "b", "u1").await.unwrap();
        create_session(&db, "c", "u2").await.unwrap();

        let sessions = list_sessions_for_user(&db, "u1", 10).await.unwrap();
        assert_eq!(sessions.len(), 2);

        let limited = list_sessions_for_user(&db, "u1", 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        db.close().await.unwrap();
    }
}
