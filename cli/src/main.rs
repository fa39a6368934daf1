//! safewrite CLI - recompute ticket priority scores and write them back safely.
//!
//! # Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `recalc <id>...` | fetch each ticket, recompute its score, store it through one coordinator |
//! | `score --impact V ...` | compute a score offline and print the breakdown as JSON |
//!
//! Configuration comes from `~/.safewrite/config.toml`; logs go to
//! `~/.safewrite/logs/safewrite.log`.

mod args;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde_json::Value;
use clap::Parser;
use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::{Cli, Command, ScoreArgs};
use safewrite_engine::{RefreshOutcome, SafewriteConfig, ScoreSync};
use safewrite_types::ScoreInputs;
use safewrite_types::score::default_impact_options;

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.safewrite/logs/safewrite.log
    if let Some(config_path) = SafewriteConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("safewrite.log"));
    }

    // Fallback: ./.safewrite/logs/safewrite.log (useful in constrained environments)
    candidates.push(PathBuf::from(".safewrite").join("logs").join("safewrite.log"));
    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Score(score) => print_score(&score),
        Command::Recalc { ticket_ids } => recalc(&ticket_ids).await,
    }
}

fn print_score(args: &ScoreArgs) -> Result<()> {
    let config = SafewriteConfig::load()?.unwrap_or_default();
    let inputs = ScoreInputs {
        impact: Value::from(args.impact.as_str()),
        impact_options: default_impact_options(),
        priority: args.priority,
        created_at: args.created_at.unwrap_or_else(Utc::now),
        security: Value::Bool(args.security),
        manager_override: args
            .manager_override
            .as_deref()
            .map_or(Value::Null, Value::from),
    };
    let breakdown = inputs.score(&config.priority_points(), Utc::now());
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(())
}

async fn recalc(ticket_ids: &[u64]) -> Result<()> {
    let config = SafewriteConfig::load()?
        .context("no config found; create ~/.safewrite/config.toml with a [remote] section")?;
    let sync = ScoreSync::connect(&config).await?;

    let mut failures = 0usize;
    for (id, result) in sync.refresh_many(ticket_ids).await {
        match result {
            Ok(RefreshOutcome::Unchanged { breakdown }) => {
                println!("ticket {id}: unchanged (score {})", breakdown.total);
            }
            Ok(RefreshOutcome::Written {
                previous,
                breakdown,
            }) => {
                let previous = previous.map_or_else(|| "none".to_string(), |p| p.to_string());
                println!("ticket {id}: {previous} -> {}", breakdown.total);
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(ticket_id = id, error = %err, "Refresh failed");
                eprintln!("ticket {id}: error: {err}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} tickets failed", ticket_ids.len());
    }
    Ok(())
}
