// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP mailer adapter for the Jobpilot auto-apply engine.

pub mod smtp;

pub use smtp::SmtpMailer;
