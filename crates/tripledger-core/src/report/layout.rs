//! Fixed sheet layouts used when a template offers nothing better

use umya_spreadsheet::Worksheet;

use super::variables::ReportData;
use crate::template::columns::ColumnMapping;
use crate::template::sheet::{set_bold_text, set_currency, set_number, set_text};

pub const EXPENSE_HEADERS: &[&str] = &[
    "Date",
    "Type",
    "Vendor",
    "Description",
    "Amount",
    "Currency",
    "Location",
    "Trip",
];

pub const MILEAGE_HEADERS: &[&str] = &["Date", "Start", "End", "Distance", "Purpose", "Cost", "Trip"];

/// Write a bold header row
fn write_headers(ws: &mut Worksheet, row: u32, headers: &[&str]) {
    for (i, header) in headers.iter().enumerate() {
        set_bold_text(ws, i as u32 + 1, row, header);
    }
}

/// Header in row 1, one expense per row below
pub fn write_expense_sheet(ws: &mut Worksheet, data: &ReportData) {
    write_headers(ws, 1, EXPENSE_HEADERS);
    for (i, e) in data.expenses.iter().enumerate() {
        let row = i as u32 + 2;
        set_text(ws, 1, row, &e.date.to_string());
        set_text(ws, 2, row, e.expense_type.label());
        set_text(ws, 3, row, &e.vendor);
        set_text(ws, 4, row, e.description.as_deref().unwrap_or(""));
        set_currency(ws, 5, row, e.amount);
        set_text(ws, 6, row, &e.currency);
        set_text(ws, 7, row, e.location.as_deref().unwrap_or(""));
        set_text(ws, 8, row, &data.trip_name(e.trip_id));
    }
}

/// Header in row 1, one mileage record per row below
pub fn write_mileage_sheet(ws: &mut Worksheet, data: &ReportData) {
    write_headers(ws, 1, MILEAGE_HEADERS);
    for (i, m) in data.mileage.iter().enumerate() {
        let row = i as u32 + 2;
        set_text(ws, 1, row, &m.date.to_string());
        set_text(ws, 2, row, &m.start_location);
        set_text(ws, 3, row, &m.end_location);
        set_number(ws, 4, row, m.distance);
        set_text(ws, 5, row, m.purpose.as_deref().unwrap_or(""));
        set_currency(ws, 6, row, m.cost);
        set_text(ws, 7, row, &data.trip_name(m.trip_id));
    }
}

/// Write expenses into the columns of a detected template table
pub fn write_mapped_expenses(ws: &mut Worksheet, mapping: &ColumnMapping, data: &ReportData) {
    for (i, e) in data.expenses.iter().enumerate() {
        let row = mapping.header_row + 1 + i as u32;
        for column in &mapping.columns {
            let col = column.index;
            match column.field.as_str() {
                "date" => set_text(ws, col, row, &e.date.to_string()),
                "type" => set_text(ws, col, row, e.expense_type.label()),
                "vendor" => set_text(ws, col, row, &e.vendor),
                "description" => set_text(ws, col, row, e.description.as_deref().unwrap_or("")),
                "amount" => set_currency(ws, col, row, e.amount),
                "currency" => set_text(ws, col, row, &e.currency),
                "location" => set_text(ws, col, row, e.location.as_deref().unwrap_or("")),
                "trip" => set_text(ws, col, row, &data.trip_name(e.trip_id)),
                _ => {}
            }
        }
    }
}

/// Write mileage records into the columns of a detected template table
pub fn write_mapped_mileage(ws: &mut Worksheet, mapping: &ColumnMapping, data: &ReportData) {
    for (i, m) in data.mileage.iter().enumerate() {
        let row = mapping.header_row + 1 + i as u32;
        for column in &mapping.columns {
            let col = column.index;
            match column.field.as_str() {
                "date" => set_text(ws, col, row, &m.date.to_string()),
                "start_location" => set_text(ws, col, row, &m.start_location),
                "end_location" => set_text(ws, col, row, &m.end_location),
                "distance" => set_number(ws, col, row, m.distance),
                "purpose" => set_text(ws, col, row, m.purpose.as_deref().unwrap_or("")),
                "cost" => set_currency(ws, col, row, m.cost),
                "trip" => set_text(ws, col, row, &data.trip_name(m.trip_id)),
                _ => {}
            }
        }
    }
}

fn label(ws: &mut Worksheet, row: &mut u32, text: &str, value: &str) {
    set_bold_text(ws, 1, *row, text);
    set_text(ws, 2, *row, value);
    *row += 1;
}

/// Labeled summary rows: title, trip metadata, counts, totals
///
/// Labels sit in column A and values in column B.
pub fn write_summary_sheet(ws: &mut Worksheet, data: &ReportData, generated_on: &str) {
    let mut row = 1;
    set_bold_text(ws, 1, row, &data.title());
    row += 2;

    label(ws, &mut row, "Generated:", generated_on);
    if !data.period.is_empty() {
        label(ws, &mut row, "Period:", &data.period);
    }
    if let Some(ref trip) = data.trip {
        label(ws, &mut row, "Trip:", &trip.name);
        if let Some(ref location) = trip.location {
            label(ws, &mut row, "Location:", location);
        }
        if let Some(ref purpose) = trip.purpose {
            label(ws, &mut row, "Purpose:", purpose);
        }
    }
    label(ws, &mut row, "Currency:", &data.currency);
    row += 1;

    set_bold_text(ws, 1, row, "Expense Count:");
    set_number(ws, 2, row, data.expenses.len() as f64);
    row += 1;
    set_bold_text(ws, 1, row, "Total Expenses:");
    set_currency(ws, 2, row, data.expense_total());
    row += 1;
    set_bold_text(ws, 1, row, "Mileage Entries:");
    set_number(ws, 2, row, data.mileage.len() as f64);
    row += 1;
    label(
        ws,
        &mut row,
        "Total Distance:",
        &format!("{:.1} miles", data.total_distance()),
    );
    set_bold_text(ws, 1, row, "Mileage Cost:");
    set_currency(ws, 2, row, data.mileage_total());
    row += 2;

    let categories = data.category_totals();
    if !categories.is_empty() {
        set_bold_text(ws, 1, row, "By Category");
        row += 1;
        for (kind, total) in categories {
            set_text(ws, 1, row, kind.label());
            set_currency(ws, 2, row, total);
            row += 1;
        }
        row += 1;
    }

    set_bold_text(ws, 1, row, "GRAND TOTAL:");
    set_currency(ws, 2, row, data.grand_total());
    ws.get_cell_mut((2, row))
        .get_style_mut()
        .get_font_mut()
        .set_bold(true);
}
