//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_settings`, `ai_client`, `request_context` - Per-command runtime setup
//! - `record_filter` - Resolve --trip / --from --to / --all selections
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::warn;
use tripledger_core::ai::{AIBackend, AIClient};
use tripledger_core::{Database, RecordFilter, RequestContext, Settings};

/// Open (and migrate) the database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Settings from the override file or embedded defaults
pub fn load_settings() -> Settings {
    Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load settings, using defaults");
        Settings::default()
    })
}

/// AI client from the environment, bounded by the configured timeout
pub fn ai_client(settings: &Settings) -> Option<AIClient> {
    AIClient::from_env().map(|client| client.with_timeout(settings.ai_timeout))
}

pub fn request_context(settings: &Settings) -> RequestContext {
    RequestContext::new(reqwest::Client::new(), settings.clone())
}

/// Print which AI backend (if any) a command will use
pub fn print_ai_status(ai: Option<&AIClient>) {
    match ai {
        Some(client) => println!("   🤖 AI backend: {} ({})", client.host(), client.model()),
        None => println!("   💡 Tip: Set OPENAI_COMPATIBLE_HOST for AI-generated content"),
    }
}

/// Parse a YYYY-MM-DD argument
pub fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

/// Resolve the mutually exclusive record selectors
///
/// With `required` false, no selector means every record.
pub fn record_filter(
    trip: Option<i64>,
    from: Option<&str>,
    to: Option<&str>,
    all: bool,
    required: bool,
) -> Result<RecordFilter> {
    let has_range = from.is_some() || to.is_some();
    let selected = [trip.is_some(), has_range, all]
        .iter()
        .filter(|s| **s)
        .count();
    if selected > 1 {
        bail!("Use only one of --trip, --from/--to or --all");
    }

    match (trip, from, to) {
        (Some(id), _, _) => Ok(RecordFilter::Trip(id)),
        (None, Some(from), Some(to)) => {
            let start = parse_date(from, "--from")?;
            let end = parse_date(to, "--to")?;
            if start > end {
                bail!("--from {} is after --to {}", start, end);
            }
            Ok(RecordFilter::DateRange { start, end })
        }
        (None, Some(_), None) | (None, None, Some(_)) => {
            bail!("--from and --to must be given together")
        }
        (None, None, None) if all || !required => Ok(RecordFilter::All),
        (None, None, None) => bail!("Select records with --trip, --from/--to or --all"),
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let trips = db.list_trips().context("Failed to read trips")?;
    println!("   Trips: {}", trips.len());

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a trip: tripledger trips add \"Client Visit\" --start 2024-03-01");
    println!("  2. Record expenses: tripledger expenses add --vendor ... --amount ... --date ...");
    println!("  3. Build a report: tripledger report --all");

    Ok(())
}
