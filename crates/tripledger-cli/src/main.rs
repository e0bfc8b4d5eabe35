//! tripledger CLI - Trip expense records and spreadsheet reports
//!
//! Usage:
//!   tripledger init                           Initialize database
//!   tripledger trips add "Client Visit"       Create a trip
//!   tripledger report --trip 1 -o visit.xlsx  Build an xlsx report
//!   tripledger serve --port 3000              Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tripledger_core::DocumentAiClient;

use cli::*;
use commands::{ExpenseArgs, MileageArgs, TripArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => commands::cmd_serve(&cli.db, &host, port, allowed_origins).await,
        Commands::Trips { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(TripsAction::List) => commands::cmd_trips_list(&db),
                Some(TripsAction::Add {
                    name,
                    start,
                    end,
                    location,
                    purpose,
                    description,
                }) => commands::cmd_trips_add(
                    &db,
                    &TripArgs {
                        name: &name,
                        start: start.as_deref(),
                        end: end.as_deref(),
                        location: location.as_deref(),
                        purpose: purpose.as_deref(),
                        description: description.as_deref(),
                    },
                )
                .map(|_| ()),
            }
        }
        Commands::Expenses { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_expenses_list(&db, &tripledger_core::RecordFilter::All),
                Some(ExpensesAction::List { trip, from, to }) => {
                    let filter = commands::record_filter(
                        trip,
                        from.as_deref(),
                        to.as_deref(),
                        false,
                        false,
                    )?;
                    commands::cmd_expenses_list(&db, &filter)
                }
                Some(ExpensesAction::Add {
                    vendor,
                    amount,
                    date,
                    expense_type,
                    currency,
                    description,
                    location,
                    trip,
                }) => {
                    let settings = commands::load_settings();
                    commands::cmd_expenses_add(
                        &db,
                        &settings,
                        &ExpenseArgs {
                            vendor: &vendor,
                            amount,
                            date: &date,
                            expense_type: &expense_type,
                            currency: currency.as_deref(),
                            description: description.as_deref(),
                            location: location.as_deref(),
                            trip,
                        },
                    )
                    .map(|_| ())
                }
            }
        }
        Commands::Mileage { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_mileage_list(&db, &tripledger_core::RecordFilter::All),
                Some(MileageAction::List { trip, from, to }) => {
                    let filter = commands::record_filter(
                        trip,
                        from.as_deref(),
                        to.as_deref(),
                        false,
                        false,
                    )?;
                    commands::cmd_mileage_list(&db, &filter)
                }
                Some(MileageAction::Add {
                    date,
                    start,
                    end,
                    distance,
                    rate,
                    cost,
                    purpose,
                    trip,
                }) => {
                    let settings = commands::load_settings();
                    commands::cmd_mileage_add(
                        &db,
                        &settings,
                        &MileageArgs {
                            date: &date,
                            start: &start,
                            end: &end,
                            distance,
                            rate,
                            cost,
                            purpose: purpose.as_deref(),
                            trip,
                        },
                    )
                    .map(|_| ())
                }
            }
        }
        Commands::Report {
            trip,
            from,
            to,
            all,
            template,
            output,
        } => {
            let filter =
                commands::record_filter(trip, from.as_deref(), to.as_deref(), all, true)?;
            let db = commands::open_db(&cli.db)?;
            let settings = commands::load_settings();
            let ai = commands::ai_client(&settings);
            commands::print_ai_status(ai.as_ref());
            let ctx = commands::request_context(&settings);
            commands::cmd_report(
                &db,
                &ctx,
                ai,
                filter,
                template.as_deref(),
                output.as_deref(),
            )
            .await
            .map(|_| ())
        }
        Commands::Analyze { file } => {
            let settings = commands::load_settings();
            let ai = commands::ai_client(&settings);
            commands::cmd_analyze(&file, ai.as_ref()).await
        }
        Commands::ExtractReceipt { image, mime } => {
            let settings = commands::load_settings();
            let ai = commands::ai_client(&settings);
            let doc_ai = DocumentAiClient::from_settings(&settings.extraction);
            let ctx = commands::request_context(&settings);
            commands::cmd_extract_receipt(&ctx, doc_ai.as_ref(), ai.as_ref(), &image, mime.as_deref())
                .await
                .map(|_| ())
        }
        Commands::DescribeReceipt { file } => {
            let settings = commands::load_settings();
            let ai = commands::ai_client(&settings);
            let ctx = commands::request_context(&settings);
            commands::cmd_describe_receipt(&ctx, ai.as_ref(), &file)
                .await
                .map(|_| ())
        }
        Commands::Odometer { image, mime } => {
            let settings = commands::load_settings();
            let ai = commands::ai_client(&settings);
            commands::cmd_odometer(ai.as_ref(), &image, mime.as_deref())
                .await
                .map(|_| ())
        }
    }
}
