// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate selection for a run.

use jobpilot_core::types::JobFilters;
use jobpilot_core::JobpilotError;
use jobpilot_storage::queries::jobs;
use jobpilot_storage::{Database, IntegrationProfile, JobPosting};
use tracing::debug;

/// How many candidates to fetch for a run.
///
/// The bound is the smaller of the per-run cap and the user's remaining daily
/// quota. Same-company candidates don't consume quota beyond the first, so a
/// run can exhaust its batch below the cap; the next trigger picks up the
/// remainder.
pub fn selection_limit(per_run_cap: u32, remaining_quota: u32) -> u32 {
    per_run_cap.min(remaining_quota)
}

/// Effective filters for a run: the trigger's override when present,
/// otherwise the profile's preference set.
pub fn effective_filters(
    profile: &IntegrationProfile,
    filter_override: Option<&JobFilters>,
) -> JobFilters {
    match filter_override {
        Some(filters) => filters.clone(),
        None => JobFilters {
            categories: profile.categories.clone(),
            locations: profile.locations.clone(),
            experience_levels: profile.experience_levels.clone(),
        },
    }
}

/// Select the candidate batch for a user's run.
pub async fn select_batch(
    db: &Database,
    profile: &IntegrationProfile,
    filter_override: Option<&JobFilters>,
    per_run_cap: u32,
    remaining_quota: u32,
) -> Result<Vec<JobPosting>, JobpilotError> {
    let limit = selection_limit(per_run_cap, remaining_quota);
    if limit == 0 {
        return Ok(Vec::new());
    }
    let filters = effective_filters(profile, filter_override);
    let candidates = jobs::select_candidates(db, &profile.user_id, &filters, limit).await?;
    debug!(
        user_id = %profile.user_id,
        limit,
        found = candidates.len(),
        "candidate batch selected"
    );
    Ok(candidates)
}
