// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `jobpilot serve` command implementation.
//!
//! Starts the full daemon: SQLite storage, SMTP mailer, the orchestration
//! engine, the queue worker, the daily sweep scheduler, and the stall
//! recovery sweep. Supports graceful shutdown via signal handlers.

use std::sync::Arc;
use std::time::Duration;

use jobpilot_config::model::JobpilotConfig;
use jobpilot_core::{JobpilotError, MailerAdapter};
use jobpilot_cron::{DailySweep, QueueWorker, StallSweep};
use jobpilot_engine::{
    ConfigPlanProvider, Dispatcher, Orchestrator, QuotaLedger, RetryPolicy, RunLockRegistry,
};
use jobpilot_mailer::SmtpMailer;
use jobpilot_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Assembled engine stack shared by the daemon and the one-shot commands.
pub struct Stack {
    pub db: Database,
    pub orchestrator: Arc<Orchestrator>,
}

/// Open storage and wire the orchestration engine from configuration.
pub async fn build_stack(
    config: &JobpilotConfig,
    mailer: Arc<dyn MailerAdapter>,
) -> Result<Stack, JobpilotError> {
    let db =
        Database::open_with_journal(&config.storage.database_path, config.storage.wal_mode).await?;

    let plans = Arc::new(ConfigPlanProvider::new(db.clone(), config.plans.clone()));
    let quota = QuotaLedger::new(db.clone(), plans);
    let dispatcher = Dispatcher::new(
        db.clone(),
        mailer,
        RetryPolicy::new(
            config.engine.retry_max_attempts,
            Duration::from_secs(config.engine.retry_base_delay_secs),
            Duration::from_secs(config.engine.retry_max_delay_secs),
        ),
        Duration::from_secs(config.engine.dispatch_timeout_secs),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        db.clone(),
        quota,
        dispatcher,
        RunLockRegistry::new(),
        config.engine.clone(),
    ));

    Ok(Stack { db, orchestrator })
}

/// Runs the `jobpilot serve` command.
pub async fn run_serve(config: JobpilotConfig) -> Result<(), JobpilotError> {
    init_tracing(&config.engine.log_level);
    info!("starting jobpilot serve");

    let mailer: Arc<dyn MailerAdapter> = Arc::new(SmtpMailer::from_config(&config.smtp)?);
    let stack = build_stack(&config, mailer).await?;

    let cancel = install_signal_handler();
    let mut tasks = Vec::new();

    let worker = QueueWorker::new(
        stack.db.clone(),
        stack.orchestrator.clone(),
        Duration::from_secs(config.scheduler.poll_interval_secs),
    );
    {
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move { worker.run(cancel).await }));
    }

    if config.scheduler.sweep_enabled {
        let sweep = DailySweep::new(stack.orchestrator.clone(), &config.scheduler.sweep_cron)?;
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move { sweep.run(cancel).await }));
    } else {
        info!("daily sweep disabled by configuration");
    }

    let stall = StallSweep::new(
        stack.db.clone(),
        stack.orchestrator.clone(),
        Duration::from_secs(config.scheduler.stall_sweep_interval_secs),
    );
    {
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move { stall.run(cancel).await }));
    }

    info!("jobpilot daemon running");
    cancel.cancelled().await;

    for task in tasks {
        let _ = task.await;
    }
    stack.db.close().await?;
    info!("jobpilot daemon stopped");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jobpilot={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
