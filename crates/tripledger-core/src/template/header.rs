//! Heuristic table header detection
//!
//! Rows are scored against a keyword set:
//! `2×exact + 1×partial + 3×distinct keywords + 2 (≥3 non-empty cells) + 3 (row 2..=10)`.
//! Real header rows carry several *different* keywords and usually sit just
//! below a title row; the bonuses encode that.

use std::collections::BTreeSet;

use serde::Serialize;
use umya_spreadsheet::Worksheet;

use super::sheet::{dimensions, row_texts};

/// Minimum score for a row to be reported as a header
pub const HEADER_THRESHOLD: u32 = 5;

/// Generic keywords used when analyzing an unknown template
pub const GENERIC_KEYWORDS: &[&str] = &[
    "date",
    "amount",
    "expense",
    "description",
    "total",
    "vendor",
    "type",
    "category",
    "name",
    "id",
];

/// Why a row scored the way it did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchReason {
    /// Cell text equals the keyword, its plural, or keyword + ":"
    Exact { keyword: String, cell: String },
    /// Cell text contains the keyword
    Partial { keyword: String, cell: String },
    /// Row has at least three non-empty cells
    ManyCells { count: usize },
    /// Row sits in the conventional header band (rows 2..=10)
    TypicalPosition { row: u32 },
}

/// A detected header row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderMatch {
    /// 1-based row number
    pub row_number: u32,
    /// Cell texts from column A through the last non-empty cell
    pub header_cells: Vec<String>,
    pub score: u32,
    pub reasons: Vec<MatchReason>,
}

/// Score a single row of cell texts
pub fn score_row(cells: &[String], row_number: u32, keywords: &[&str]) -> (u32, Vec<MatchReason>) {
    let mut exact = 0u32;
    let mut partial = 0u32;
    let mut distinct = BTreeSet::new();
    let mut reasons = Vec::new();

    for cell in cells.iter().filter(|c| !c.is_empty()) {
        let text = cell.to_lowercase();
        for keyword in keywords {
            if is_exact_match(&text, keyword) {
                exact += 1;
                distinct.insert(*keyword);
                reasons.push(MatchReason::Exact {
                    keyword: keyword.to_string(),
                    cell: cell.clone(),
                });
            } else if text.contains(keyword) {
                partial += 1;
                distinct.insert(*keyword);
                reasons.push(MatchReason::Partial {
                    keyword: keyword.to_string(),
                    cell: cell.clone(),
                });
            }
        }
    }

    let mut score = 2 * exact + partial + 3 * distinct.len() as u32;

    let non_empty = cells.iter().filter(|c| !c.is_empty()).count();
    if non_empty >= 3 {
        score += 2;
        reasons.push(MatchReason::ManyCells { count: non_empty });
    }
    if (2..=10).contains(&row_number) {
        score += 3;
        reasons.push(MatchReason::TypicalPosition { row: row_number });
    }

    (score, reasons)
}

fn is_exact_match(text: &str, keyword: &str) -> bool {
    text == keyword
        || text.strip_suffix('s') == Some(keyword)
        || text.strip_suffix(':') == Some(keyword)
}

/// Find the best header row in a worksheet
///
/// Scans top to bottom; the first row with the highest score wins, provided
/// the score reaches [`HEADER_THRESHOLD`].
pub fn find_table_header_row(ws: &Worksheet, keywords: &[&str]) -> Option<HeaderMatch> {
    let (max_col, max_row) = dimensions(ws);
    let rows = (1..=max_row).map(|row| (row, row_texts(ws, row, max_col)));
    best_header(rows, keywords)
}

/// Same as [`find_table_header_row`] over pre-extracted rows
pub fn best_header(
    rows: impl IntoIterator<Item = (u32, Vec<String>)>,
    keywords: &[&str],
) -> Option<HeaderMatch> {
    let mut best: Option<HeaderMatch> = None;

    for (row_number, cells) in rows {
        let (score, reasons) = score_row(&cells, row_number, keywords);
        if score < HEADER_THRESHOLD || best.as_ref().is_some_and(|b| b.score >= score) {
            continue;
        }
        best = Some(HeaderMatch {
            row_number,
            header_cells: trim_trailing_empty(cells),
            score,
            reasons,
        });
    }

    best
}

fn trim_trailing_empty(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
}
