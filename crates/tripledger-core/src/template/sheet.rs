//! Thin adapter over `umya_spreadsheet`
//!
//! Coordinates are 1-based `(column, row)` throughout, matching the
//! underlying library.

use std::io::Cursor;

use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{Error, Result};

/// Currency number format applied to amount cells
pub const CURRENCY_FORMAT: &str = "$#,##0.00";

/// Default sheet names for a freshly built report
pub const SUMMARY_SHEET: &str = "Summary";
pub const EXPENSES_SHEET: &str = "Expenses";
pub const MILEAGE_SHEET: &str = "Mileage";

/// An in-memory workbook owned by a single request
pub struct Workbook {
    book: Spreadsheet,
}

impl Workbook {
    /// Load an xlsx workbook from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Spreadsheet("Workbook data is empty".into()));
        }
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
            .map_err(|e| Error::Spreadsheet(format!("Failed to read workbook: {}", e)))?;
        Ok(Self { book })
    }

    /// Create the standard Summary/Expenses/Mileage workbook
    pub fn new_report() -> Self {
        let mut book = umya_spreadsheet::new_file();
        if let Some(first) = book.get_sheet_mut(&0) {
            first.set_name(SUMMARY_SHEET);
        }
        let mut workbook = Self { book };
        // Names are distinct, so creation cannot collide
        let _ = workbook.add_sheet(EXPENSES_SHEET);
        let _ = workbook.add_sheet(MILEAGE_SHEET);
        workbook
    }

    /// Serialize to xlsx bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut out)
            .map_err(|e| Error::Spreadsheet(format!("Failed to serialize workbook: {}", e)))?;
        Ok(out.into_inner())
    }

    pub fn sheet_count(&self) -> usize {
        self.book.get_sheet_count()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        (0..self.sheet_count())
            .filter_map(|i| self.book.get_sheet(&i))
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    pub fn sheet(&self, index: usize) -> Option<&Worksheet> {
        self.book.get_sheet(&index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.book.get_sheet_mut(&index)
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.book.get_sheet_by_name(name)
    }

    /// Append a new empty sheet and return its index
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        self.book
            .new_sheet(name)
            .map_err(|e| Error::Spreadsheet(format!("Failed to create sheet {}: {}", name, e)))?;
        Ok(self.sheet_count() - 1)
    }
}

/// Trimmed text of a cell; empty for missing cells
pub fn cell_text(ws: &Worksheet, col: u32, row: u32) -> String {
    ws.get_value((col, row)).trim().to_string()
}

/// Highest populated (column, row) of a sheet
pub fn dimensions(ws: &Worksheet) -> (u32, u32) {
    (ws.get_highest_column(), ws.get_highest_row())
}

/// All cell texts of a row, from column 1 to `max_col`
pub fn row_texts(ws: &Worksheet, row: u32, max_col: u32) -> Vec<String> {
    (1..=max_col).map(|col| cell_text(ws, col, row)).collect()
}

pub fn set_text(ws: &mut Worksheet, col: u32, row: u32, value: &str) {
    ws.get_cell_mut((col, row)).set_value_string(value);
}

pub fn set_number(ws: &mut Worksheet, col: u32, row: u32, value: f64) {
    ws.get_cell_mut((col, row)).set_value_number(value);
}

/// Write an amount with the currency number format
pub fn set_currency(ws: &mut Worksheet, col: u32, row: u32, value: f64) {
    let cell = ws.get_cell_mut((col, row));
    cell.set_value_number(value);
    cell.get_style_mut()
        .get_number_format_mut()
        .set_format_code(CURRENCY_FORMAT);
}

pub fn set_bold_text(ws: &mut Worksheet, col: u32, row: u32, value: &str) {
    let cell = ws.get_cell_mut((col, row));
    cell.set_value_string(value);
    cell.get_style_mut().get_font_mut().set_bold(true);
}

fn is_blank_row(ws: &Worksheet, row: u32, max_col: u32) -> bool {
    (1..=max_col).all(|col| cell_text(ws, col, row).is_empty())
}

fn is_totals_row(ws: &Worksheet, row: u32, max_col: u32) -> bool {
    (1..=max_col).any(|col| {
        let text = cell_text(ws, col, row).to_lowercase();
        let first_word = text.split(|c: char| !c.is_alphanumeric()).next().unwrap_or("");
        matches!(first_word, "total" | "totals" | "subtotal" | "sum" | "grand")
    })
}

/// Data rows available under a table header before its footer
///
/// The footer is the first non-blank row that follows a blank row, or the
/// first totals row. `None` means nothing follows the table.
pub fn table_capacity(ws: &Worksheet, header_row: u32) -> Option<u32> {
    let (max_col, highest) = dimensions(ws);
    let mut seen_blank = false;
    for row in header_row + 1..=highest {
        if is_blank_row(ws, row, max_col) {
            seen_blank = true;
            continue;
        }
        if seen_blank || is_totals_row(ws, row, max_col) {
            return Some(row - header_row - 1);
        }
    }
    None
}

/// Empty the data rows under `header_row` and make room for `needed` records
///
/// Rows at and below the table footer are kept; when the records outgrow the
/// space above the footer, rows are inserted so the footer moves down.
pub fn reserve_table_rows(ws: &mut Worksheet, header_row: u32, needed: u32) {
    let highest = ws.get_highest_row();
    let first = header_row + 1;
    match table_capacity(ws, header_row) {
        None => {
            if highest > header_row {
                ws.remove_row(&first, &(highest - header_row));
            }
        }
        Some(capacity) => {
            if capacity > 0 {
                ws.remove_row(&first, &capacity);
                ws.insert_new_row(&first, &capacity);
            }
            if needed > capacity {
                ws.insert_new_row(&(first + capacity), &(needed - capacity));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_has_three_sheets() {
        let wb = Workbook::new_report();
        assert_eq!(wb.sheet_names(), vec!["Summary", "Expenses", "Mileage"]);
    }

    #[test]
    fn test_round_trip_bytes() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(0).unwrap();
        set_text(ws, 1, 1, "Expense Report");
        set_currency(ws, 2, 2, 12.5);

        let bytes = wb.to_bytes().unwrap();
        assert!(!bytes.is_empty());

        let loaded = Workbook::from_bytes(&bytes).unwrap();
        let ws = loaded.sheet_by_name("Summary").unwrap();
        assert_eq!(cell_text(ws, 1, 1), "Expense Report");
        assert_eq!(cell_text(ws, 2, 2), "12.5");
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(Workbook::from_bytes(b"").is_err());
        assert!(Workbook::from_bytes(b"not a zip").is_err());
    }

    #[test]
    fn test_reserve_rows_without_footer_clears_to_end() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(1).unwrap();
        set_text(ws, 1, 1, "Date");
        set_text(ws, 1, 2, "2024-01-01");
        set_text(ws, 1, 3, "2024-01-02");

        assert_eq!(table_capacity(ws, 1), None);
        reserve_table_rows(ws, 1, 1);
        assert_eq!(cell_text(ws, 1, 1), "Date");
        assert_eq!(cell_text(ws, 1, 2), "");
        assert_eq!(cell_text(ws, 1, 3), "");
    }

    #[test]
    fn test_reserve_rows_keeps_footer_in_place() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(1).unwrap();
        set_text(ws, 1, 2, "Date");
        set_text(ws, 2, 2, "Amount");
        set_text(ws, 1, 3, "sample");
        set_text(ws, 1, 10, "Approved by: Dana");

        assert_eq!(table_capacity(ws, 2), Some(7));
        reserve_table_rows(ws, 2, 2);
        assert_eq!(cell_text(ws, 1, 2), "Date");
        assert_eq!(cell_text(ws, 1, 3), "");
        assert_eq!(cell_text(ws, 1, 10), "Approved by: Dana");
    }

    #[test]
    fn test_reserve_rows_pushes_footer_down() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(1).unwrap();
        set_text(ws, 1, 1, "Date");
        set_text(ws, 2, 1, "Amount");
        set_text(ws, 1, 2, "2024-01-01");
        set_text(ws, 1, 3, "Total");
        set_text(ws, 2, 3, "99");

        assert_eq!(table_capacity(ws, 1), Some(1));
        reserve_table_rows(ws, 1, 3);
        assert_eq!(cell_text(ws, 1, 2), "");
        assert_eq!(cell_text(ws, 1, 4), "");
        assert_eq!(cell_text(ws, 1, 5), "Total");
        assert_eq!(cell_text(ws, 2, 5), "99");
    }
}
