//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// tripledger - Trip expense records and spreadsheet reports
#[derive(Parser)]
#[command(name = "tripledger")]
#[command(about = "Track trip expenses and mileage, and build xlsx expense reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tripledger.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable; same-origin only when omitted)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },

    /// Manage trips
    Trips {
        #[command(subcommand)]
        action: Option<TripsAction>,
    },

    /// Manage expenses
    Expenses {
        #[command(subcommand)]
        action: Option<ExpensesAction>,
    },

    /// Manage mileage entries
    Mileage {
        #[command(subcommand)]
        action: Option<MileageAction>,
    },

    /// Generate an xlsx expense report
    ///
    /// Select records with exactly one of --trip, --from/--to or --all.
    Report {
        /// Trip ID
        #[arg(long)]
        trip: Option<i64>,

        /// Start date (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: Option<String>,

        /// Every record
        #[arg(long)]
        all: bool,

        /// Template workbook to fill: a local .xlsx path or an http(s) URL
        #[arg(long)]
        template: Option<String>,

        /// Output file (defaults to a name derived from the selection)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze a template workbook: variables, tables, generated schema
    Analyze {
        /// Template .xlsx file
        file: PathBuf,
    },

    /// Extract receipt data from an image
    ExtractReceipt {
        /// Receipt image (jpg, png, webp, pdf)
        image: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Write a short description for an extracted receipt
    DescribeReceipt {
        /// JSON file holding an extracted receipt
        file: PathBuf,
    },

    /// Read the mileage from an odometer photo
    Odometer {
        /// Odometer image
        image: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TripsAction {
    /// Create a trip
    Add {
        /// Trip name
        name: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Destination (e.g., "Austin, TX")
        #[arg(long)]
        location: Option<String>,
        /// Business purpose
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// List trips
    List,
}

#[derive(Subcommand)]
pub enum ExpensesAction {
    /// Record an expense
    Add {
        /// Vendor or merchant
        #[arg(long)]
        vendor: String,
        /// Amount
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Category: accommodation, transportation, meals, entertainment, business, office, other
        #[arg(long = "type", default_value = "other")]
        expense_type: String,
        /// Currency code (defaults to the configured currency)
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Trip ID
        #[arg(long)]
        trip: Option<i64>,
    },

    /// List expenses
    List {
        /// Only this trip
        #[arg(long)]
        trip: Option<i64>,
        /// Start date (YYYY-MM-DD), with --to
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD), with --from
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MileageAction {
    /// Record a drive
    Add {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        /// Starting point
        #[arg(long)]
        start: String,
        /// Destination
        #[arg(long)]
        end: String,
        /// Distance in miles
        #[arg(long)]
        distance: f64,
        /// Rate per mile (defaults to the configured rate)
        #[arg(long)]
        rate: Option<f64>,
        /// Explicit cost (defaults to distance × rate)
        #[arg(long)]
        cost: Option<f64>,
        #[arg(long)]
        purpose: Option<String>,
        /// Trip ID
        #[arg(long)]
        trip: Option<i64>,
    },

    /// List mileage entries
    List {
        /// Only this trip
        #[arg(long)]
        trip: Option<i64>,
        /// Start date (YYYY-MM-DD), with --to
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD), with --from
        #[arg(long)]
        to: Option<String>,
    },
}
