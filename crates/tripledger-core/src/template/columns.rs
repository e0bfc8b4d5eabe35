//! Map detected header cells to canonical record fields

use serde::Serialize;
use umya_spreadsheet::Worksheet;

use super::sheet::{cell_text, dimensions};

/// Candidate header substrings per expense field, in priority order
pub const EXPENSE_FIELD_MAPPINGS: &[(&str, &[&str])] = &[
    ("date", &["date", "day"]),
    ("type", &["type", "category"]),
    ("vendor", &["vendor", "merchant", "payee", "supplier"]),
    ("description", &["description", "details", "notes", "memo", "purpose"]),
    ("amount", &["amount", "total", "cost", "price", "sum"]),
    ("currency", &["currency", "curr"]),
    ("location", &["location", "city", "place"]),
    ("trip", &["trip", "project", "event"]),
];

/// Candidate header substrings per mileage field, in priority order
///
/// `=to` matches only a header that is exactly "to"; `~end` matches "end" as a
/// whole word, so "Vendor" or "Spend" stay unmapped.
pub const MILEAGE_FIELD_MAPPINGS: &[(&str, &[&str])] = &[
    ("date", &["date", "day"]),
    ("start_location", &["start", "from", "origin"]),
    ("end_location", &["~end", "destination", "to location", "=to"]),
    ("distance", &["distance", "miles", "mileage", "km"]),
    ("purpose", &["purpose", "description", "reason", "notes"]),
    ("cost", &["cost", "amount", "reimbursement", "total"]),
    ("trip", &["trip", "project", "event"]),
];

/// How a column was matched to its field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatchKind {
    /// Header text equals a candidate
    Exact,
    /// Header text contains a candidate
    Partial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMatch {
    pub field: String,
    /// Excel-style column letter
    pub column: String,
    /// 1-based column index
    pub index: u32,
    pub header: String,
    pub kind: ColumnMatchKind,
}

/// Field → column mapping for one header row of one worksheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub header_row: u32,
    pub columns: Vec<ColumnMatch>,
}

impl ColumnMapping {
    pub fn get(&self, field: &str) -> Option<&ColumnMatch> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Column letter for a field
    pub fn letter(&self, field: &str) -> Option<&str> {
        self.get(field).map(|c| c.column.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Map header cells to fields
///
/// Header cells are visited left to right. Each still-unmapped field is
/// tested in declaration order against its candidates (case-insensitive
/// substring); the first matching field claims the column. A field maps to
/// at most one column.
pub fn map_table_columns(
    ws: &Worksheet,
    header_row: u32,
    field_mappings: &[(&str, &[&str])],
) -> ColumnMapping {
    let (max_col, _) = dimensions(ws);
    let headers = (1..=max_col).map(|col| (col, cell_text(ws, col, header_row)));
    map_header_cells(headers, header_row, field_mappings)
}

/// Same as [`map_table_columns`] over pre-extracted `(column, text)` pairs
pub fn map_header_cells(
    headers: impl IntoIterator<Item = (u32, String)>,
    header_row: u32,
    field_mappings: &[(&str, &[&str])],
) -> ColumnMapping {
    let mut mapping = ColumnMapping {
        header_row,
        columns: Vec::new(),
    };

    for (index, header) in headers {
        let text = header.trim().to_lowercase();
        if text.is_empty() {
            continue;
        }

        let hit = field_mappings
            .iter()
            .filter(|(field, _)| mapping.get(field).is_none())
            .find_map(|(field, candidates)| {
                candidates
                    .iter()
                    .find_map(|c| match_candidate(&text, c))
                    .map(|kind| (*field, kind))
            });

        if let Some((field, kind)) = hit {
            mapping.columns.push(ColumnMatch {
                field: field.to_string(),
                column: column_letter(index),
                index,
                header: header.trim().to_string(),
                kind,
            });
        }
    }

    mapping
}

/// Candidate text without its `=` (exact only) or `~` (whole word) marker
pub fn candidate_text(candidate: &str) -> &str {
    candidate.trim_start_matches(['=', '~'])
}

fn match_candidate(text: &str, candidate: &str) -> Option<ColumnMatchKind> {
    let needle = candidate_text(candidate).to_lowercase();
    if text == needle {
        return Some(ColumnMatchKind::Exact);
    }
    let found = if candidate.starts_with('=') {
        false
    } else if candidate.starts_with('~') {
        text.split(|c: char| !c.is_alphanumeric()).any(|word| word == needle)
    } else {
        text.contains(&needle)
    };
    found.then_some(ColumnMatchKind::Partial)
}

/// Convert a 1-based column index to its letter (1 → A, 27 → AA)
pub fn column_letter(index: u32) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
