// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration profile CRUD operations.

use jobpilot_core::JobpilotError;
use jobpilot_core::types::ConnectionStatus;
use rusqlite::params;

use crate::database::Database;
use crate::models::{self, IntegrationProfile};

const PROFILE_COLUMNS: &str = "user_id, display_name, email_address, status, auto_apply_enabled,
     plan, categories, locations, experience_levels, created_at, updated_at";

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<(IntegrationProfile, String, [String; 3])> {
    let status: String = row.get(3)?;
    let categories: String = row.get(6)?;
    let locations: String = row.get(7)?;
    let experience_levels: String = row.get(8)?;
    Ok((
        IntegrationProfile {
            user_id: row.get(0)?,
            display_name: row.get(1)?,
            email_address: row.get(2)?,
            status: ConnectionStatus::Disconnected,
            auto_apply_enabled: row.get::<_, i64>(4)? != 0,
            plan: row.get(5)?,
            categories: Vec::new(),
            locations: Vec::new(),
            experience_levels: Vec::new(),
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        },
        status,
        [categories, locations, experience_levels],
    ))
}

fn finish_profile(
    (mut profile, status, [categories, locations, experience_levels]): (
        IntegrationProfile,
        String,
        [String; 3],
    ),
) -> Result<IntegrationProfile, rusqlite::Error> {
    profile.status = models::parse_enum(&status, "connection status")?;
    profile.categories = models::parse_json_list(&categories)?;
    profile.locations = models::parse_json_list(&locations)?;
    profile.experience_levels = models::parse_json_list(&experience_levels)?;
    Ok(profile)
}

/// Insert or replace a profile keyed by user ID.
pub async fn upsert_profile(db: &Database, profile: &IntegrationProfile) -> Result<(), JobpilotError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO integration_profiles
                     (user_id, display_name, email_address, status, auto_apply_enabled,
                      plan, categories, locations, experience_levels, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT (user_id) DO UPDATE SET
                     display_name = excluded.display_name,
                     email_address = excluded.email_address,
                     status = excluded.status,
                     auto_apply_enabled = excluded.auto_apply_enabled,
                     plan = excluded.plan,
                     categories = excluded.categories,
                     locations = excluded.locations,
                     experience_levels = excluded.experience_levels,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    profile.user_id,
                    profile.display_name,
                    profile.email_address,
                    profile.status.to_string(),
                    profile.auto_apply_enabled as i64,
                    profile.plan,
                    models::to_json_list(&profile.categories),
                    models::to_json_list(&profile.locations),
                    models::to_json_list(&profile.experience_levels),
                    profile.created_at,
                    profile.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a profile by user ID.
pub async fn get_profile(
    db: &Database,
    user_id: &str,
) -> Result<Option<IntegrationProfile>, JobpilotError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM integration_profiles WHERE user_id = ?1"
            ))?;
            let result = stmt.query_row(params![user_id], row_to_profile);
            match result {
                Ok(parts) => Ok(Some(finish_profile(parts)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update the provider-connection status for a user.
pub async fn set_connection_status(
    db: &Database,
    user_id: &str,
    status: ConnectionStatus,
) -> Result<(), JobpilotError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE integration_profiles
                 SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?2",
                params![status.to_string(), user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Toggle auto-apply for a user.
pub async fn set_auto_apply(
    db: &Database,
    user_id: &str,
    enabled: bool,
) -> Result<(), JobpilotError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE integration_profiles
                 SET auto_apply_enabled = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?2",
                params![enabled as i64, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List users eligible for the daily sweep: connected with auto-apply on.
pub async fn list_eligible(db: &Database) -> Result<Vec<IntegrationProfile>, JobpilotError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM integration_profiles
                 WHERE status = 'connected' AND auto_apply_enabled = 1
                 ORDER BY user_id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_profile)?;
            let mut profiles = Vec::new();
            for row in rows {
                profiles.push(finish_profile(row?)?);
            }
            Ok(profiles)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
