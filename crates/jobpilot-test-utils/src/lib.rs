// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Jobpilot integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without an SMTP server.
//!
//! # Components
//!
//! - [`MockMailer`] - Mailer with scripted outcomes and sent-email capture
//! - [`TestHarness`] - Full engine stack over a temp SQLite database

pub mod harness;
pub mod mock_mailer;

pub use harness::TestHarness;
pub use mock_mailer::MockMailer;
