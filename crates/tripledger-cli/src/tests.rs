//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::Path;

use tempfile::TempDir;
use tripledger_core::ai::AIClient;
use tripledger_core::db::Database;
use tripledger_core::models::RecordFilter;
use tripledger_core::template::sheet::{cell_text, set_text};
use tripledger_core::{RequestContext, Settings, TemplateSource, Workbook};

use crate::commands::{self, truncate, ExpenseArgs, MileageArgs, TripArgs};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Trip with one meal, returning the trip ID
fn seed_trip(db: &Database) -> i64 {
    let trip = commands::cmd_trips_add(
        db,
        &TripArgs {
            name: "Client Visit",
            start: Some("2024-03-01"),
            end: Some("2024-03-03"),
            ..Default::default()
        },
    )
    .unwrap();
    commands::cmd_expenses_add(
        db,
        &Settings::default(),
        &ExpenseArgs {
            vendor: "Olive Garden",
            amount: 85.75,
            date: "2024-03-02",
            expense_type: "meals",
            trip: Some(trip),
            ..Default::default()
        },
    )
    .unwrap();
    trip
}

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// ========== Selection ==========

#[test]
fn test_record_filter_selection() {
    assert_eq!(
        commands::record_filter(Some(3), None, None, false, true).unwrap(),
        RecordFilter::Trip(3)
    );
    assert_eq!(
        commands::record_filter(None, None, None, true, true).unwrap(),
        RecordFilter::All
    );
    assert_eq!(
        commands::record_filter(None, None, None, false, false).unwrap(),
        RecordFilter::All
    );
    assert!(matches!(
        commands::record_filter(None, Some("2024-03-01"), Some("2024-03-31"), false, true).unwrap(),
        RecordFilter::DateRange { .. }
    ));
}

#[test]
fn test_record_filter_rejects_bad_selection() {
    // Nothing selected for a report
    assert!(commands::record_filter(None, None, None, false, true).is_err());
    // Two selectors
    assert!(commands::record_filter(Some(1), None, None, true, true).is_err());
    // Half a range
    assert!(commands::record_filter(None, Some("2024-03-01"), None, false, false).is_err());
    // Reversed range
    assert!(
        commands::record_filter(None, Some("2024-03-31"), Some("2024-03-01"), false, true).is_err()
    );
    // Bad date
    assert!(commands::record_filter(None, Some("03/01/2024"), Some("2024-03-31"), false, true).is_err());
}

// ========== Records ==========

#[test]
fn test_cmd_trips_add_and_list() {
    let db = setup_test_db();
    let id = seed_trip(&db);

    let trip = db.get_trip(id).unwrap().unwrap();
    assert_eq!(trip.name, "Client Visit");
    assert_eq!(trip.start_date.unwrap().to_string(), "2024-03-01");
    assert!(commands::cmd_trips_list(&db).is_ok());
}

#[test]
fn test_cmd_trips_add_rejects_bad_date() {
    let db = setup_test_db();
    let result = commands::cmd_trips_add(
        &db,
        &TripArgs {
            name: "Trip",
            start: Some("March 1"),
            ..Default::default()
        },
    );
    assert!(result.is_err());
    assert!(db.list_trips().unwrap().is_empty());
}

#[test]
fn test_cmd_expenses_add_uses_configured_currency() {
    let db = setup_test_db();
    let settings = Settings {
        default_currency: "EUR".to_string(),
        ..Settings::default()
    };

    let id = commands::cmd_expenses_add(
        &db,
        &settings,
        &ExpenseArgs {
            vendor: "Hotel Adlon",
            amount: 240.0,
            date: "2024-06-01",
            expense_type: "hotel",
            ..Default::default()
        },
    )
    .unwrap();

    let expense = db.get_expense(id).unwrap().unwrap();
    assert_eq!(expense.currency, "EUR");
    assert_eq!(expense.expense_type.as_str(), "accommodation");
    assert!(commands::cmd_expenses_list(&db, &RecordFilter::All).is_ok());
}

#[test]
fn test_cmd_expenses_add_unknown_trip() {
    let db = setup_test_db();
    let result = commands::cmd_expenses_add(
        &db,
        &Settings::default(),
        &ExpenseArgs {
            vendor: "Cafe",
            amount: 4.5,
            date: "2024-06-01",
            expense_type: "meals",
            trip: Some(99),
            ..Default::default()
        },
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_mileage_add_default_rate() {
    let db = setup_test_db();
    let id = commands::cmd_mileage_add(
        &db,
        &Settings::default(),
        &MileageArgs {
            date: "2024-03-01",
            start: "Office",
            end: "Client HQ",
            distance: 75.0,
            ..Default::default()
        },
    )
    .unwrap();

    let record = db.get_mileage(id).unwrap().unwrap();
    assert!((record.cost - 43.5).abs() < 1e-9);
    assert!(commands::cmd_mileage_list(&db, &RecordFilter::Trip(5)).is_ok());
}

// ========== Reports ==========

#[tokio::test]
async fn test_cmd_report_writes_workbook() {
    let db = setup_test_db();
    let trip = seed_trip(&db);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("visit.xlsx");

    let path = commands::cmd_report(
        &db,
        &RequestContext::default(),
        None,
        RecordFilter::Trip(trip),
        None,
        Some(&output),
    )
    .await
    .unwrap();
    assert_eq!(path, output);

    let wb = Workbook::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(wb.sheet_names(), vec!["Summary", "Expenses", "Mileage"]);
    assert_eq!(
        cell_text(wb.sheet_by_name("Expenses").unwrap(), 3, 2),
        "Olive Garden"
    );
}

#[tokio::test]
async fn test_cmd_report_with_local_template() {
    let db = setup_test_db();
    let trip = seed_trip(&db);
    let dir = TempDir::new().unwrap();

    let mut template = Workbook::new_report();
    set_text(template.sheet_mut(0).unwrap(), 1, 1, "{{trip.name}} / {{expenses.count}}");
    let template_path = write_file(&dir, "template.xlsx", &template.to_bytes().unwrap());
    let output = dir.path().join("out.xlsx");

    commands::cmd_report(
        &db,
        &RequestContext::default(),
        Some(AIClient::mock()),
        RecordFilter::Trip(trip),
        template_path.to_str(),
        Some(&output),
    )
    .await
    .unwrap();

    let wb = Workbook::from_bytes(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(cell_text(wb.sheet(0).unwrap(), 1, 1), "Client Visit / 1");
}

#[test]
fn test_template_source() {
    assert!(matches!(
        commands::template_source("https://example.com/t.xlsx").unwrap(),
        TemplateSource::Url(_)
    ));
    assert!(commands::template_source("/definitely/missing/template.xlsx").is_err());
}

#[tokio::test]
async fn test_cmd_analyze() {
    let dir = TempDir::new().unwrap();
    let mut template = Workbook::new_report();
    set_text(template.sheet_mut(0).unwrap(), 1, 1, "{{report.summary}}");
    let path = write_file(&dir, "t.xlsx", &template.to_bytes().unwrap());

    let mock = AIClient::mock();
    assert!(commands::cmd_analyze(&path, Some(&mock)).await.is_ok());
    assert!(commands::cmd_analyze(&path, None).await.is_ok());

    let junk = write_file(&dir, "junk.xlsx", b"not a workbook");
    assert!(commands::cmd_analyze(&junk, None).await.is_err());
}

// ========== Extraction ==========

#[tokio::test]
async fn test_cmd_extract_receipt_and_describe() {
    let dir = TempDir::new().unwrap();
    let image = write_file(&dir, "receipt.png", b"fake png bytes");
    let ctx = RequestContext::default();
    let mock = AIClient::mock();

    let receipt = commands::cmd_extract_receipt(&ctx, None, Some(&mock), &image, None)
        .await
        .unwrap();
    assert_eq!(receipt.vendor, "Mock Cafe");
    assert!(!receipt.fallback);

    let json = write_file(
        &dir,
        "receipt.json",
        serde_json::to_string(&receipt).unwrap().as_bytes(),
    );
    let description = commands::cmd_describe_receipt(&ctx, None, &json)
        .await
        .unwrap();
    assert_eq!(description, "Meals expense at Mock Cafe for $12.50");

    let not_receipt = write_file(&dir, "other.json", b"{\"hello\": 1}");
    assert!(commands::cmd_describe_receipt(&ctx, None, &not_receipt)
        .await
        .is_err());
}

#[tokio::test]
async fn test_cmd_extract_receipt_without_services() {
    let dir = TempDir::new().unwrap();
    let image = write_file(&dir, "receipt.jpg", b"jpeg");

    let receipt =
        commands::cmd_extract_receipt(&RequestContext::default(), None, None, &image, None)
            .await
            .unwrap();
    assert!(receipt.fallback);
    assert_eq!(receipt.amount, 0.0);

    let missing = dir.path().join("missing.jpg");
    assert!(
        commands::cmd_extract_receipt(&RequestContext::default(), None, None, &missing, None)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_cmd_odometer() {
    let dir = TempDir::new().unwrap();
    let image = write_file(&dir, "dash.jpg", b"jpeg");

    let mock = AIClient::mock();
    let reading = commands::cmd_odometer(Some(&mock), &image, Some("image/jpeg"))
        .await
        .unwrap();
    assert_eq!(reading.reading, Some(12345.6));

    let fallback = commands::cmd_odometer(None, &image, None).await.unwrap();
    assert_eq!(fallback.reading, None);
    assert!(fallback.fallback);
}

// ========== Helpers ==========

#[test]
fn test_guess_mime() {
    assert_eq!(commands::guess_mime(Path::new("a.PNG")), "image/png");
    assert_eq!(commands::guess_mime(Path::new("scan.pdf")), "application/pdf");
    assert_eq!(commands::guess_mime(Path::new("photo")), "image/jpeg");
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long vendor name", 10), "a very ...");
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}
