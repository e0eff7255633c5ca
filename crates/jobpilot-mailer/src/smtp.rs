// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP delivery via `lettre` with TLS support.
//!
//! Failure classification drives the dispatcher's retry loop: permanent SMTP
//! responses (5xx) and malformed addresses are [`SendFailure::Permanent`],
//! everything else (4xx, connection trouble, TLS setup) is retried as
//! [`SendFailure::Transient`].

use async_trait::async_trait;
use jobpilot_config::model::SmtpConfig;
use jobpilot_core::types::{OutboundEmail, SendFailure};
use jobpilot_core::{JobpilotError, MailerAdapter};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Sends application emails through an SMTP relay.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from SMTP configuration.
    ///
    /// Port 465 uses implicit TLS; other ports use STARTTLS when `tls` is
    /// enabled, plaintext otherwise.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, JobpilotError> {
        let from: Mailbox = config.from_address.parse().map_err(
            |e: lettre::address::AddressError| {
                JobpilotError::Config(format!("invalid smtp.from_address: {e}"))
            },
        )?;

        let mut builder = if config.port == 465 || config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| JobpilotError::Mailer {
                    message: format!("smtp relay setup failed: {e}"),
                    source: Some(Box::new(e)),
                })?
                .port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn classify(e: lettre::transport::smtp::Error) -> SendFailure {
        if e.is_permanent() {
            SendFailure::Permanent(e.to_string())
        } else {
            // 4xx responses, connection and TLS failures are worth retrying.
            SendFailure::Transient(e.to_string())
        }
    }
}

#[async_trait]
impl MailerAdapter for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), SendFailure> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                SendFailure::Permanent(format!("invalid recipient address: {e}"))
            })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .body(email.body.clone())
            .map_err(|e| SendFailure::Permanent(format!("message construction failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(Self::classify)?;

        debug!(to = %email.to, subject = %email.subject, "application email accepted by relay");
        Ok(())
    }
}
