// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Jobpilot - an automated job-application orchestrator.
//!
//! This is the binary entry point for the Jobpilot daemon and operator CLI.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod ops;
mod serve;

use clap::{Parser, Subcommand};

/// Jobpilot - an automated job-application orchestrator.
#[derive(Parser, Debug)]
#[command(name = "jobpilot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Jobpilot daemon (queue worker, daily sweep, stall recovery).
    Serve,
    /// Trigger an auto-apply run for a user.
    Trigger {
        /// User to run for.
        user_id: String,
        /// Cap on applications for this run.
        #[arg(long)]
        max: Option<u32>,
    },
    /// Show a session's status and counters.
    Status {
        /// Session ID returned by `trigger`.
        session_id: String,
    },
    /// List a user's sessions, newest first.
    Sessions {
        user_id: String,
        /// Maximum rows to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// List a user's applied jobs, newest first.
    Applied {
        user_id: String,
        /// Maximum rows to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match jobpilot_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            jobpilot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Trigger { user_id, max }) => ops::run_trigger(config, &user_id, max).await,
        Some(Commands::Status { session_id }) => ops::run_status(config, &session_id).await,
        Some(Commands::Sessions { user_id, limit }) => {
            ops::run_sessions(config, &user_id, limit).await
        }
        Some(Commands::Applied { user_id, limit }) => {
            ops::run_applied(config, &user_id, limit).await
        }
        None => {
            println!("jobpilot: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
