// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock mailer adapter with scripted outcomes and capture.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use jobpilot_core::types::{OutboundEmail, SendFailure};
use jobpilot_core::MailerAdapter;

/// Mailer that replays a scripted sequence of outcomes and captures every
/// email it was asked to send.
///
/// When the script is exhausted (or was never set), sends succeed.
pub struct MockMailer {
    script: Mutex<VecDeque<Result<(), SendFailure>>>,
    sent: Mutex<Vec<OutboundEmail>>,
}

impl MockMailer {
    /// A mailer where every send succeeds.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A mailer that replays `outcomes` in order, then succeeds.
    pub fn with_script(outcomes: Vec<Result<(), SendFailure>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Append an outcome to the script.
    pub fn push_outcome(&self, outcome: Result<(), SendFailure>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Every email handed to `send`, in order, including failed attempts.
    pub fn sent_emails(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of send attempts observed.
    pub fn attempt_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailerAdapter for MockMailer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), SendFailure> {
        self.sent.lock().unwrap().push(email.clone());
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
