//! Command-line parsing.

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use safewrite_types::Priority;

#[derive(Debug, Parser)]
#[command(name = "safewrite", version)]
#[command(about = "Keep ticket priority scores current without clobbering concurrent edits")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Recompute and store the score of each ticket
    Recalc {
        /// Ticket ids to refresh
        #[arg(required = true)]
        ticket_ids: Vec<u64>,
    },
    /// Compute a score offline and print the breakdown as JSON
    Score(ScoreArgs),
}

#[derive(Debug, Clone, PartialEq, Args)]
pub struct ScoreArgs {
    /// Impact option value, e.g. `cps_impact_high`
    #[arg(long)]
    pub impact: String,
    /// Ticket priority: urgent, high, normal or low
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    /// Ticket creation time (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    pub created_at: Option<DateTime<Utc>>,
    /// Security flag is set
    #[arg(long)]
    pub security: bool,
    /// Manager override option value, e.g. `cps_override_2`
    #[arg(long = "override")]
    pub manager_override: Option<String>,
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::parse(raw).ok_or_else(|| format!("unknown priority `{raw}`"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp `{raw}`: {e}"))
}
