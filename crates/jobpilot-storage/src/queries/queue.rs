// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work queue operations for crash-safe run processing.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::WorkItem;
use rusqlite::params;

use crate::database::Database;
use crate::models::WorkQueueEntry;

/// Enqueue a work item. Returns the auto-generated queue entry ID.
pub async fn enqueue(db: &Database, item: &WorkItem) -> Result<i64, JobpilotError> {
    let payload = serde_json::to_string(item).map_err(|e| JobpilotError::Internal(e.to_string()))?;
    db.connection()
        .call(move |conn| {
            conn.execute("INSERT INTO work_queue (payload) VALUES (?1)", params![payload])?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Dequeue the next pending entry.
///
/// Atomically selects the oldest pending entry and marks it as "processing"
/// with a 5-minute lock timeout. Returns `None` if the queue is empty.
pub async fn dequeue(db: &Database) -> Result<Option<WorkQueueEntry>, JobpilotError> {
    db.connection()
        .call(|conn| {
            // Use a transaction to atomically find + update the next pending entry.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, payload, status, attempts, max_attempts,
                            created_at, updated_at, locked_until
                     FROM work_queue
                     WHERE status = 'pending'
                     ORDER BY id ASC
                     LIMIT 1",
                )?;
                stmt.query_row([], |row| {
                    Ok(WorkQueueEntry {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                        status: row.get(2)?,
                        attempts: row.get(3)?,
                        max_attempts: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                        locked_until: row.get(7)?,
                    })
                })
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE work_queue SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(WorkQueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing of a queue entry.
pub async fn ack(db: &Database, id: i64) -> Result<(), JobpilotError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE work_queue SET status = 'completed',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a queue entry as failed.
///
/// Increments attempts. If attempts >= max_attempts, sets status to "failed".
/// Otherwise resets to "pending" for retry and clears the lock.
pub async fn fail(db: &Database, id: i64) -> Result<(), JobpilotError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM work_queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let status = if new_attempts >= max_attempts { "failed" } else { "pending" };
            conn.execute(
                "UPDATE work_queue SET status = ?1, attempts = ?2,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release entries whose processing lock expired back to pending.
///
/// Recovers work orphaned by a worker crash. Returns the number released.
pub async fn release_expired(db: &Database) -> Result<usize, JobpilotError> {
    db.connection()
        .call(|conn| {
            let released = conn.execute(
                "UPDATE work_queue SET status = 'pending', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'processing'
                   AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            Ok(released)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
