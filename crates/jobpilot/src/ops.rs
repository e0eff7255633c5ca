// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands: trigger, status, sessions, applied.
//!
//! These open the same database as the daemon, so running them against a
//! live `jobpilot serve` is safe; the single-writer model serializes access.

use std::sync::Arc;

use colored::Colorize;
use jobpilot_config::model::JobpilotConfig;
use jobpilot_core::types::SessionStatus;
use jobpilot_core::{JobpilotError, MailerAdapter};
use jobpilot_mailer::SmtpMailer;

use crate::serve::build_stack;

fn status_label(status: SessionStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        SessionStatus::Completed => label.green(),
        SessionStatus::Partial => label.yellow(),
        SessionStatus::Failed => label.red(),
        SessionStatus::Pending | SessionStatus::Running => label.cyan(),
    }
}

/// Trigger a run for a user and print the session ID.
///
/// The run executes on the daemon's queue worker; this command returns as
/// soon as the session is enqueued.
pub async fn run_trigger(
    config: JobpilotConfig,
    user_id: &str,
    max: Option<u32>,
) -> Result<(), JobpilotError> {
    let mailer: Arc<dyn MailerAdapter> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
    let stack = build_stack(&config, mailer).await?;

    let session_id = stack.orchestrator.trigger_run(user_id, max, None).await?;
    println!("session {} {}", session_id.0.bold(), "enqueued".cyan());

    stack.db.close().await
}

/// Print a session's status and counters.
pub async fn run_status(config: JobpilotConfig, session_id: &str) -> Result<(), JobpilotError> {
    let mailer: Arc<dyn MailerAdapter> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
    let stack = build_stack(&config, mailer).await?;

    let session = stack.orchestrator.get_session(session_id).await?;
    println!("session  {}", session.id.bold());
    println!("user     {}", session.user_id);
    println!("status   {}", status_label(session.status));
    println!(
        "counts   found={} sent={} failed={}",
        session.jobs_found, session.applications_sent, session.applications_failed
    );
    if let Some(error) = &session.error {
        println!("error    {}", error.red());
    }
    println!("created  {}", session.created_at);
    if let Some(started) = &session.started_at {
        println!("started  {started}");
    }
    if let Some(ended) = &session.ended_at {
        println!("ended    {ended}");
    }

    stack.db.close().await
}

/// Print a user's sessions, newest first.
pub async fn run_sessions(
    config: JobpilotConfig,
    user_id: &str,
    limit: u32,
) -> Result<(), JobpilotError> {
    let mailer: Arc<dyn MailerAdapter> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
    let stack = build_stack(&config, mailer).await?;

    let sessions = stack.orchestrator.list_sessions(user_id, limit).await?;
    if sessions.is_empty() {
        println!("no sessions for {user_id}");
    }
    for session in sessions {
        println!(
            "{}  {}  sent={} failed={}  {}",
            session.created_at,
            status_label(session.status),
            session.applications_sent,
            session.applications_failed,
            session.id,
        );
    }

    stack.db.close().await
}

/// Print a user's applied jobs, newest first.
pub async fn run_applied(
    config: JobpilotConfig,
    user_id: &str,
    limit: u32,
) -> Result<(), JobpilotError> {
    let mailer: Arc<dyn MailerAdapter> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
    let stack = build_stack(&config, mailer).await?;

    let records = stack.orchestrator.list_applied(user_id, limit).await?;
    if records.is_empty() {
        println!("no applications for {user_id}");
    }
    for record in records {
        let status = record.status.to_string();
        let status = match record.status {
            jobpilot_core::types::AppliedStatus::Sent => status.green(),
            jobpilot_core::types::AppliedStatus::Failed => status.red(),
            jobpilot_core::types::AppliedStatus::Pending => status.cyan(),
        };
        println!(
            "{}  {}  {}  {}",
            record.attempted_at, status, record.job_id, record.company_email
        );
    }

    stack.db.close().await
}
