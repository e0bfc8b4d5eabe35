//! Integration tests for tripledger-core
//!
//! These tests exercise the full record store → report assembly workflow.

use chrono::NaiveDate;
use tripledger_core::{
    db::Database,
    models::{ExpenseType, NewExpense, NewMileage, NewTrip, RecordFilter},
    template::sheet::{cell_text, set_text, Workbook},
    AIClient, Error, ReportAssembler, RequestContext, SchemaSource, TemplateSource,
};
use umya_spreadsheet::Worksheet;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

/// One trip with two expenses and one 75 mile drive
fn client_visit(db: &Database) -> i64 {
    let trip = db
        .create_trip(&NewTrip {
            name: "Client Visit".to_string(),
            start_date: Some(day(1)),
            end_date: Some(day(3)),
            location: Some("Austin, TX".to_string()),
            purpose: Some("Quarterly review".to_string()),
            ..Default::default()
        })
        .expect("Failed to create trip");

    db.add_expense(&NewExpense {
        trip_id: Some(trip),
        date: day(2),
        expense_type: ExpenseType::Meals,
        vendor: "Olive Garden".to_string(),
        description: Some("Team dinner".to_string()),
        amount: 85.75,
        currency: "USD".to_string(),
        location: None,
    })
    .expect("Failed to add meal");

    db.add_expense(&NewExpense {
        trip_id: Some(trip),
        date: day(3),
        expense_type: ExpenseType::Transportation,
        vendor: "Uber".to_string(),
        description: None,
        amount: 28.50,
        currency: "USD".to_string(),
        location: None,
    })
    .expect("Failed to add ride");

    db.add_mileage(&NewMileage {
        trip_id: Some(trip),
        date: day(1),
        start_location: "Office".to_string(),
        end_location: "Client HQ".to_string(),
        distance: 75.0,
        purpose: Some("Client meeting".to_string()),
        rate: 0.58,
        cost: None,
    })
    .expect("Failed to add mileage");

    trip
}

/// Column B next to a column A label
fn summary_value(ws: &Worksheet, label: &str) -> String {
    (1..=60)
        .find(|row| cell_text(ws, 1, *row) == label)
        .map(|row| cell_text(ws, 2, row))
        .unwrap_or_else(|| panic!("label {} not found", label))
}

fn summary_number(ws: &Worksheet, label: &str) -> f64 {
    summary_value(ws, label)
        .parse()
        .unwrap_or_else(|_| panic!("{} is not numeric", label))
}

// =============================================================================
// Standard workbook
// =============================================================================

#[tokio::test]
async fn test_client_visit_report_totals() {
    let db = Database::in_memory().unwrap();
    let trip = client_visit(&db);

    let output = ReportAssembler::new(db)
        .generate(&RequestContext::default(), RecordFilter::Trip(trip), None)
        .await
        .expect("Report generation failed");

    assert_eq!(output.filename, "client-visit-expense-report.xlsx");
    assert_eq!(output.expense_count, 2);
    assert!(!output.template_used);

    let wb = Workbook::from_bytes(&output.bytes).unwrap();
    assert_eq!(wb.sheet_names(), vec!["Summary", "Expenses", "Mileage"]);

    let summary = wb.sheet_by_name("Summary").unwrap();
    assert_eq!(cell_text(summary, 1, 1), "Expense Report: Client Visit");
    assert_eq!(summary_value(summary, "Trip:"), "Client Visit");
    assert!((summary_number(summary, "Total Expenses:") - 114.25).abs() < 1e-9);
    assert_eq!(summary_value(summary, "Total Distance:"), "75.0 miles");
    assert!((summary_number(summary, "Mileage Cost:") - 43.50).abs() < 1e-9);
    assert!((summary_number(summary, "GRAND TOTAL:") - 157.75).abs() < 1e-9);

    let expenses = wb.sheet_by_name("Expenses").unwrap();
    assert_eq!(cell_text(expenses, 3, 2), "Olive Garden");
    assert_eq!(cell_text(expenses, 2, 3), "Transportation");
    assert_eq!(cell_text(expenses, 8, 2), "Client Visit");

    let mileage = wb.sheet_by_name("Mileage").unwrap();
    assert_eq!(cell_text(mileage, 2, 2), "Office");
    assert_eq!(cell_text(mileage, 4, 2), "75");
}

#[tokio::test]
async fn test_empty_report_is_openable() {
    let db = Database::in_memory().unwrap();

    let output = ReportAssembler::new(db)
        .generate(&RequestContext::default(), RecordFilter::All, None)
        .await
        .unwrap();

    assert_eq!(output.filename, "all-expenses-report.xlsx");
    assert!(!output.bytes.is_empty());

    let wb = Workbook::from_bytes(&output.bytes).unwrap();
    let summary = wb.sheet_by_name("Summary").unwrap();
    assert_eq!(summary_number(summary, "Total Expenses:"), 0.0);
    assert_eq!(summary_number(summary, "GRAND TOTAL:"), 0.0);
    assert_eq!(summary_value(summary, "Total Distance:"), "0.0 miles");
    for label in ["Total Expenses:", "Mileage Cost:", "GRAND TOTAL:"] {
        assert!(summary_number(summary, label).is_sign_positive(), "{}", label);
    }

    let expenses = wb.sheet_by_name("Expenses").unwrap();
    assert_eq!(cell_text(expenses, 1, 1), "Date");
    assert_eq!(cell_text(expenses, 5, 1), "Amount");
    assert_eq!(cell_text(expenses, 1, 2), "");
    assert_eq!(cell_text(wb.sheet_by_name("Mileage").unwrap(), 1, 1), "Date");
}

#[tokio::test]
async fn test_missing_trip_is_not_found() {
    let db = Database::in_memory().unwrap();
    let result = ReportAssembler::new(db)
        .generate(&RequestContext::default(), RecordFilter::Trip(999), None)
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_date_range_report() {
    let db = Database::in_memory().unwrap();
    client_visit(&db);

    let output = ReportAssembler::new(db)
        .generate(
            &RequestContext::default(),
            RecordFilter::DateRange {
                start: day(3),
                end: day(31),
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(output.expense_count, 1);
    assert_eq!(output.mileage_count, 0);
    assert_eq!(
        output.filename,
        "expense-report-2024-03-03-to-2024-03-31.xlsx"
    );

    let wb = Workbook::from_bytes(&output.bytes).unwrap();
    let summary = wb.sheet_by_name("Summary").unwrap();
    assert!((summary_number(summary, "Total Expenses:") - 28.50).abs() < 1e-9);
}

// =============================================================================
// Templates
// =============================================================================

fn template_bytes() -> Vec<u8> {
    let mut wb = Workbook::new_report();

    let summary = wb.sheet_mut(0).unwrap();
    set_text(summary, 1, 1, "Report for {{trip.name}}");
    set_text(summary, 1, 2, "Total");
    set_text(summary, 2, 2, "{{expenses.total}}");
    set_text(summary, 1, 3, "{{report.summary}}");

    let expenses = wb.sheet_mut(1).unwrap();
    set_text(expenses, 1, 1, "Trip Expenses");
    for (i, header) in ["Date", "Vendor", "Amount", "Description"].iter().enumerate() {
        set_text(expenses, i as u32 + 1, 3, header);
    }
    set_text(expenses, 1, 4, "placeholder row");

    wb.to_bytes().unwrap()
}

#[tokio::test]
async fn test_template_report_fills_variables_and_tables() {
    let db = Database::in_memory().unwrap();
    let trip = client_visit(&db);

    let output = ReportAssembler::new(db)
        .with_ai(Some(AIClient::mock()))
        .generate(
            &RequestContext::default(),
            RecordFilter::Trip(trip),
            Some(TemplateSource::Bytes(template_bytes())),
        )
        .await
        .unwrap();

    assert!(output.template_used);
    assert_eq!(output.schema_source, Some(SchemaSource::Ai));

    let wb = Workbook::from_bytes(&output.bytes).unwrap();
    let summary = wb.sheet_by_name("Summary").unwrap();
    assert_eq!(cell_text(summary, 1, 1), "Report for Client Visit");
    assert_eq!(cell_text(summary, 2, 2), "114.25");
    assert_eq!(
        cell_text(summary, 1, 3),
        "Generated text for report.summary."
    );

    let expenses = wb.sheet_by_name("Expenses").unwrap();
    assert_eq!(cell_text(expenses, 1, 1), "Trip Expenses");
    assert_eq!(cell_text(expenses, 2, 3), "Vendor");
    assert_eq!(cell_text(expenses, 1, 4), "2024-03-02");
    assert_eq!(cell_text(expenses, 2, 4), "Olive Garden");
    assert_eq!(cell_text(expenses, 3, 4), "85.75");
    assert_eq!(cell_text(expenses, 2, 5), "Uber");
    assert_eq!(cell_text(expenses, 1, 6), "");

    // No mileage table in the template: fixed layout on the blank sheet
    let mileage = wb.sheet_by_name("Mileage").unwrap();
    assert_eq!(cell_text(mileage, 4, 1), "Distance");
    assert_eq!(cell_text(mileage, 4, 2), "75");
}

#[tokio::test]
async fn test_template_without_ai_uses_fallbacks() {
    let db = Database::in_memory().unwrap();
    let trip = client_visit(&db);

    let output = ReportAssembler::new(db)
        .generate(
            &RequestContext::default(),
            RecordFilter::Trip(trip),
            Some(TemplateSource::Bytes(template_bytes())),
        )
        .await
        .unwrap();

    assert_eq!(output.schema_source, Some(SchemaSource::Fallback));
    let wb = Workbook::from_bytes(&output.bytes).unwrap();
    let prose = cell_text(wb.sheet_by_name("Summary").unwrap(), 1, 3);
    assert!(prose.starts_with("The Client Visit trip includes 2 expenses"));
}

#[tokio::test]
async fn test_unreadable_template_falls_back_to_standard_workbook() {
    let db = Database::in_memory().unwrap();

    for template in [
        TemplateSource::Bytes(b"not a workbook".to_vec()),
        TemplateSource::Url("http://127.0.0.1:1/missing.xlsx".to_string()),
    ] {
        let output = ReportAssembler::new(db.clone())
            .generate(&RequestContext::default(), RecordFilter::All, Some(template))
            .await
            .unwrap();

        assert!(!output.template_used);
        let wb = Workbook::from_bytes(&output.bytes).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Summary", "Expenses", "Mileage"]);
    }
}
