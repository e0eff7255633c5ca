// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per storage entity.

pub mod applied;
pub mod deliveries;
pub mod jobs;
pub mod profiles;
pub mod queue;
pub mod sessions;
pub mod usage;
