// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email dispatch with bounded retries and a per-attempt audit trail.
//!
//! Every attempt writes one `email_deliveries` row: sent, failed (transient,
//! may be retried) or bounced (permanent, never retried). The dispatcher
//! classifies; it does not touch quota or applied-job state.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_core::types::{DeliveryOutcome, DeliveryStatus, OutboundEmail, SendFailure};
use jobpilot_core::{JobpilotError, MailerAdapter};
use jobpilot_storage::queries::deliveries;
use jobpilot_storage::{Database, EmailDelivery, IntegrationProfile, JobPosting};
use tracing::{debug, warn};

use crate::backoff::RetryPolicy;

/// Build the application email for a (profile, job) pair.
pub fn build_email(profile: &IntegrationProfile, job: &JobPosting, recipient: &str) -> OutboundEmail {
    let subject = format!("Application for {} - {}", job.title, profile.display_name);
    let body = format!(
        "Dear {} hiring team,\n\n\
         I would like to apply for the {} position ({}, {}).\n\n\
         My profile and resume are available on Jobpilot. You can reach me at {}.\n\n\
         Best regards,\n{}",
        job.company_name, job.title, job.location, job.experience_level,
        profile.email_address, profile.display_name,
    );
    OutboundEmail {
        to: recipient.to_string(),
        subject,
        body,
    }
}

/// Sends application emails through a [`MailerAdapter`].
pub struct Dispatcher {
    db: Database,
    mailer: Arc<dyn MailerAdapter>,
    policy: RetryPolicy,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        mailer: Arc<dyn MailerAdapter>,
        policy: RetryPolicy,
        send_timeout: Duration,
    ) -> Self {
        Self {
            db,
            mailer,
            policy,
            send_timeout,
        }
    }

    /// Dispatch one application email, retrying transient failures.
    ///
    /// Returns the classified outcome after at most `policy.max_attempts`
    /// tries. Permanent failures stop the retry loop immediately.
    pub async fn dispatch(
        &self,
        session_id: &str,
        profile: &IntegrationProfile,
        job: &JobPosting,
        recipient: &str,
    ) -> Result<DeliveryOutcome, JobpilotError> {
        let email = build_email(profile, job, recipient);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self.send_once(&email).await;

            let (status, error) = match &result {
                Ok(()) => (DeliveryStatus::Sent, None),
                Err(SendFailure::Transient(msg)) => (DeliveryStatus::Failed, Some(msg.clone())),
                Err(SendFailure::Permanent(msg)) => (DeliveryStatus::Bounced, Some(msg.clone())),
            };
            self.record_attempt(session_id, profile, job, &email, status, error.as_deref())
                .await?;

            match result {
                Ok(()) => {
                    debug!(job_id = %job.id, attempt, "application email sent");
                    return Ok(DeliveryOutcome::Sent);
                }
                Err(SendFailure::Permanent(msg)) => {
                    warn!(job_id = %job.id, attempt, error = %msg, "permanent send failure");
                    return Ok(DeliveryOutcome::PermanentFailure(msg));
                }
                Err(SendFailure::Transient(msg)) => {
                    if !self.policy.should_retry(attempt) {
                        warn!(
                            job_id = %job.id,
                            attempt,
                            error = %msg,
                            "transient send failure, retries exhausted"
                        );
                        return Ok(DeliveryOutcome::TransientFailure(msg));
                    }
                    let delay = self.policy.next_delay(attempt);
                    debug!(
                        job_id = %job.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "transient send failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One send attempt with the configured timeout. A timeout is transient.
    async fn send_once(&self, email: &OutboundEmail) -> Result<(), SendFailure> {
        match tokio::time::timeout(self.send_timeout, self.mailer.send(email)).await {
            Ok(result) => result,
            Err(_) => Err(SendFailure::Transient(format!(
                "send timed out after {}s",
                self.send_timeout.as_secs()
            ))),
        }
    }

    async fn record_attempt(
        &self,
        session_id: &str,
        profile: &IntegrationProfile,
        job: &JobPosting,
        email: &OutboundEmail,
        status: DeliveryStatus,
        error: Option<&str>,
    ) -> Result<(), JobpilotError> {
        let delivery = EmailDelivery {
            id: 0,
            session_id: session_id.to_string(),
            user_id: profile.user_id.clone(),
            job_id: job.id.clone(),
            recipient: email.to.clone(),
            subject: email.subject.clone(),
            status,
            error: error.map(|e| e.to_string()),
            sent_at: chrono::Utc::now().to_rfc3339(),
        };
        deliveries::insert_delivery(&self.db, &delivery).await?;
        Ok(())
    }
}
