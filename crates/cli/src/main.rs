// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bgjob`: bootstraps one `BackgroundJobServer` over the in-memory
//! `StorageProvider` and exposes the development-convenience subcommands
//! described in §6.1 — not a distributed control plane (§1 Non-goals).

mod color;
mod commands;
mod exit_error;

use bgjob_core::{Clock, SystemClock};
use bgjob_engine::{
    BackgroundJobServer, BackgroundJobServerConfiguration, DefaultConcurrentJobModificationResolver,
    DefaultRetryFilter, FixedWorkDistributionStrategy, JobFilter,
};
use bgjob_storage::{InMemoryStorageProvider, StorageProvider};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use exit_error::ExitError;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bgjob", version, about = "Exercise the background job engine from the command line", styles = color::styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enqueue a job for immediate processing.
    Enqueue {
        job_name: String,
        #[arg(long = "arg", value_parser = parse_key_val)]
        arg: Vec<(String, String)>,
    },
    /// Schedule a job for a future instant.
    Schedule {
        job_name: String,
        #[arg(long, value_parser = parse_rfc3339)]
        at: DateTime<Utc>,
    },
    /// Register a recurring job on a cron schedule.
    ScheduleRecurring {
        id: String,
        job_name: String,
        cron: String,
        #[arg(long, default_value = "UTC")]
        zone: String,
    },
    /// Print current job counts.
    Status,
    /// Poll a job by id until it reaches a terminal state.
    Tail { job_id: String },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    Ok((key.to_string(), value.to_string()))
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("invalid RFC 3339 timestamp `{raw}`: {err}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let storage: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageProvider::new(clock.clone()));
    let config = BackgroundJobServerConfiguration::builder()
        .poll_interval(BackgroundJobServerConfiguration::MIN_POLL_INTERVAL)
        .build();

    let default_filters: Vec<Arc<dyn JobFilter>> =
        vec![Arc::new(DefaultRetryFilter::new(clock.clone(), config.max_retries))];

    let server = BackgroundJobServer::new(
        storage.clone(),
        clock,
        config,
        default_filters,
        Arc::new(DefaultConcurrentJobModificationResolver),
        Arc::new(FixedWorkDistributionStrategy::default()),
        Arc::new(commands::demo_jobs::build_activator()),
    );
    server.start().await;

    let result = match cli.command {
        Command::Enqueue { job_name, arg } => {
            commands::enqueue::run(&server.scheduler(), &job_name, arg).await
        }
        Command::Schedule { job_name, at } => commands::schedule::run(&server.scheduler(), &job_name, at).await,
        Command::ScheduleRecurring { id, job_name, cron, zone } => {
            commands::schedule_recurring::run(&server.scheduler(), &id, &job_name, &cron, &zone).await
        }
        Command::Status => {
            commands::status::run(&storage).await;
            Ok(())
        }
        Command::Tail { job_id } => commands::tail::run(&storage, &job_id).await,
    };

    server.stop().await;
    result
}
