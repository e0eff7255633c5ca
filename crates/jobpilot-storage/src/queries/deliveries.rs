// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email delivery audit records, one row per send attempt.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::DeliveryStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{self, EmailDelivery};

/// Record one send attempt. Returns the auto-generated row ID.
pub async fn insert_delivery(db: &Database, delivery: &EmailDelivery) -> Result<i64, JobpilotError> {
    let delivery = delivery.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO email_deliveries
                     (session_id, user_id, job_id, recipient, subject, status, error, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    delivery.session_id,
                    delivery.user_id,
                    delivery.job_id,
                    delivery.recipient,
                    delivery.subject,
                    delivery.status.to_string(),
                    delivery.error,
                    delivery.sent_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a session's delivery attempts in insertion order.
pub async fn list_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<EmailDelivery>, JobpilotError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, user_id, job_id, recipient, subject, status, error, sent_at
                 FROM email_deliveries
                 WHERE session_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                Ok((
                    EmailDelivery {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        user_id: row.get(2)?,
                        job_id: row.get(3)?,
                        recipient: row.get(4)?,
                        subject: row.get(5)?,
                        status: DeliveryStatus::Sent,
                        error: row.get(7)?,
                        sent_at: row.get(8)?,
                    },
                    row.get::<_, String>(6)?,
                ))
            })?;
            let mut deliveries = Vec::new();
            for row in rows {
                let (mut delivery, status) = row?;
                delivery.status = models::parse_enum(&status, "delivery status")?;
                deliveries.push(delivery);
            }
            Ok(deliveries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
