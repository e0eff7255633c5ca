// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduling for the Jobpilot auto-apply engine.
//!
//! Three background loops: the queue worker executes enqueued runs, the daily
//! sweep triggers runs for every eligible user on a cron schedule, and the
//! stall sweep recovers sessions and queue locks orphaned by crashes.

pub mod sweep;
pub mod worker;

pub use sweep::{DailySweep, StallSweep};
pub use worker::QueueWorker;
