//! Works out which bins go out tomorrow and sends a reminder.

mod app;
mod config;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use binday_core::{model::CollectionResult, service::Outcome};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "binday", version)]
#[command(about = "Check tomorrow's bin collection and send a reminder")]
struct Cli {
    /// Path to binday.toml (defaults to ./, the user config dir, then /etc/binday)
    #[arg(short, long, env = "BINDAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Resolve and print the result without sending a notification
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());
    let debug = cli.debug || loaded.as_ref().is_ok_and(|(config, _)| config.debug);
    init_tracing(debug);

    match run(loaded, cli.dry_run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(loaded: Result<(Config, PathBuf)>, dry_run: bool) -> Result<()> {
    let (config, path) = loaded.context("config load failed")?;
    tracing::debug!(path = %path.display(), "loaded configuration");

    let service = app::service(&config)?;
    // Every stage resolves against this one day.
    let today = Local::now().date_naive();

    if dry_run {
        let result = service.check(today).await.map_err(|err| {
            let stage = err.stage();
            anyhow::Error::new(err).context(format!("{stage} stage failed"))
        })?;
        let line = match result {
            CollectionResult::Due(due) => due.summary(),
            CollectionResult::NoneDueToday => String::from("No bins out today"),
        };
        writeln!(io::stdout().lock(), "{line}").context("Failed to write to stdout")?;
        return Ok(());
    }

    match service.run(today).await {
        Ok(Outcome::Dispatched(due)) => {
            tracing::info!(bins = due.len(), "reminder sent");
            Ok(())
        }
        Ok(Outcome::NothingDue) => {
            tracing::info!("no bins out today");
            Ok(())
        }
        Err(err) => {
            let stage = err.stage();
            Err(anyhow::Error::new(err).context(format!("{stage} stage failed")))
        }
    }
}
