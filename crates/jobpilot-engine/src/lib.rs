// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-apply orchestration engine.
//!
//! Wires candidate selection, the daily quota ledger, the duplicate guard,
//! and retried email dispatch into session runs with a strict lifecycle:
//! pending -> running -> completed | partial | failed.

pub mod backoff;
pub mod dispatcher;
pub mod locks;
pub mod orchestrator;
pub mod quota;
pub mod selector;

pub use backoff::RetryPolicy;
pub use dispatcher::Dispatcher;
pub use locks::RunLockRegistry;
pub use orchestrator::Orchestrator;
pub use quota::{ConfigPlanProvider, QuotaLedger};
