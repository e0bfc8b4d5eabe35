//! Locating report sheets and record tables inside a template

use tracing::debug;
use umya_spreadsheet::Worksheet;

use crate::error::Result;
use crate::template::columns::{
    candidate_text, map_table_columns, ColumnMapping, EXPENSE_FIELD_MAPPINGS, MILEAGE_FIELD_MAPPINGS,
};
use crate::template::header::find_table_header_row;
use crate::template::sheet::{
    cell_text, dimensions, Workbook, EXPENSES_SHEET, MILEAGE_SHEET, SUMMARY_SHEET,
};

/// The three sheets a report writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetRole {
    Summary,
    Expenses,
    Mileage,
}

impl SheetRole {
    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Summary => SUMMARY_SHEET,
            Self::Expenses => EXPENSES_SHEET,
            Self::Mileage => MILEAGE_SHEET,
        }
    }

    fn hints(&self) -> &'static [&'static str] {
        match self {
            Self::Summary => &["summary", "overview", "report"],
            Self::Expenses => &["expense", "cost", "spend"],
            Self::Mileage => &["mile", "travel", "trip"],
        }
    }

    fn position(&self) -> usize {
        match self {
            Self::Summary => 0,
            Self::Expenses => 1,
            Self::Mileage => 2,
        }
    }

    fn field_mappings(&self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Self::Mileage => MILEAGE_FIELD_MAPPINGS,
            _ => EXPENSE_FIELD_MAPPINGS,
        }
    }
}

/// Find the best sheet for a role: exact name, then name hint, then
/// position, else a new sheet
pub fn locate_sheet(workbook: &mut Workbook, role: SheetRole) -> Result<usize> {
    let names: Vec<String> = workbook
        .sheet_names()
        .into_iter()
        .map(|n| n.to_lowercase())
        .collect();
    let wanted = role.default_name().to_lowercase();

    if let Some(index) = names.iter().position(|n| *n == wanted) {
        return Ok(index);
    }
    if let Some(index) = names
        .iter()
        .position(|n| role.hints().iter().any(|h| n.contains(h)))
    {
        return Ok(index);
    }
    if role.position() < names.len() {
        return Ok(role.position());
    }

    debug!(sheet = role.default_name(), "Creating missing report sheet");
    workbook.add_sheet(&unique_name(&names, role.default_name()))
}

/// `name`, or `name 2`, `name 3`, ... when taken
fn unique_name(taken_lower: &[String], name: &str) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while taken_lower.contains(&candidate.to_lowercase()) {
        candidate = format!("{} {}", name, n);
        n += 1;
    }
    candidate
}

/// Header keywords for a role: the candidates of its field mappings,
/// leaving out exact-only ones
fn header_keywords(role: SheetRole) -> Vec<&'static str> {
    let mut keywords: Vec<&'static str> = Vec::new();
    for (_, candidates) in role.field_mappings() {
        for candidate in candidates.iter().filter(|c| !c.starts_with('=')) {
            let text = candidate_text(candidate);
            if !keywords.contains(&text) {
                keywords.push(text);
            }
        }
    }
    keywords
}

/// A record table detected in a worksheet
///
/// Mileage tables need a distance column. Expense tables need an amount
/// column and must not look like mileage tables, whose cost and purpose
/// columns also match expense fields.
pub fn detect_table(ws: &Worksheet, role: SheetRole) -> Option<ColumnMapping> {
    let keywords = header_keywords(role);
    let header = find_table_header_row(ws, &keywords)?;
    let mapping = map_table_columns(ws, header.row_number, role.field_mappings());

    let usable = match role {
        SheetRole::Mileage => mapping.get("distance").is_some(),
        SheetRole::Expenses => {
            mapping.get("amount").is_some()
                && map_table_columns(ws, header.row_number, MILEAGE_FIELD_MAPPINGS)
                    .get("distance")
                    .is_none()
        }
        SheetRole::Summary => false,
    };

    debug!(
        sheet = ws.get_name(),
        row = header.row_number,
        score = header.score,
        columns = mapping.columns.len(),
        usable,
        "Detected template table header"
    );
    usable.then_some(mapping)
}

/// Sheet and mapping of the record table for a role
///
/// The located sheet is preferred; otherwise the first sheet holding a
/// usable table wins.
pub fn find_table(workbook: &Workbook, preferred: usize, role: SheetRole) -> Option<(usize, ColumnMapping)> {
    let preferred_hit = workbook
        .sheet(preferred)
        .and_then(|ws| detect_table(ws, role))
        .map(|m| (preferred, m));
    preferred_hit.or_else(|| {
        (0..workbook.sheet_count())
            .filter(|i| *i != preferred)
            .find_map(|i| workbook.sheet(i).and_then(|ws| detect_table(ws, role)).map(|m| (i, m)))
    })
}

/// Whether a sheet has no content at all
pub fn is_blank(ws: &Worksheet) -> bool {
    let (max_col, max_row) = dimensions(ws);
    (1..=max_row).all(|row| (1..=max_col).all(|col| cell_text(ws, col, row).is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::sheet::set_text;

    fn header(ws: &mut Worksheet, row: u32, cells: &[&str]) {
        for (i, text) in cells.iter().enumerate() {
            set_text(ws, i as u32 + 1, row, text);
        }
    }

    #[test]
    fn test_locate_by_exact_hint_and_position() {
        let mut wb = Workbook::new_report();
        assert_eq!(locate_sheet(&mut wb, SheetRole::Expenses).unwrap(), 1);

        let mut single = Workbook::new_report();
        single.sheet_mut(0).unwrap().set_name("Overview");
        single.sheet_mut(1).unwrap().set_name("Costs");
        single.sheet_mut(2).unwrap().set_name("Sheet3");
        assert_eq!(locate_sheet(&mut single, SheetRole::Summary).unwrap(), 0);
        assert_eq!(locate_sheet(&mut single, SheetRole::Expenses).unwrap(), 1);
        assert_eq!(locate_sheet(&mut single, SheetRole::Mileage).unwrap(), 2);
    }

    #[test]
    fn test_locate_creates_missing_sheet() {
        let mut book = umya_spreadsheet::new_file();
        book.get_sheet_mut(&0).unwrap().set_name("Data");
        let mut bytes = std::io::Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut bytes).unwrap();
        let mut wb = Workbook::from_bytes(&bytes.into_inner()).unwrap();

        assert_eq!(locate_sheet(&mut wb, SheetRole::Summary).unwrap(), 0);
        assert_eq!(locate_sheet(&mut wb, SheetRole::Expenses).unwrap(), 1);
        assert_eq!(locate_sheet(&mut wb, SheetRole::Mileage).unwrap(), 2);
        assert_eq!(wb.sheet_names(), vec!["Data", "Expenses", "Mileage"]);
    }

    #[test]
    fn test_unique_name() {
        let taken = vec!["expenses".to_string(), "expenses 2".to_string()];
        assert_eq!(unique_name(&taken, "Expenses"), "Expenses 3");
        assert_eq!(unique_name(&[], "Expenses"), "Expenses");
    }

    #[test]
    fn test_detect_expense_table() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(1).unwrap();
        set_text(ws, 1, 1, "Quarterly Expenses");
        header(ws, 3, &["Date", "Vendor", "Amount", "Description"]);

        let mapping = detect_table(wb.sheet(1).unwrap(), SheetRole::Expenses).unwrap();
        assert_eq!(mapping.header_row, 3);
        assert_eq!(mapping.letter("amount"), Some("C"));
        assert!(detect_table(wb.sheet(1).unwrap(), SheetRole::Mileage).is_none());
    }

    #[test]
    fn test_mileage_table_is_not_an_expense_table() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(2).unwrap();
        header(ws, 2, &["Date", "From", "Destination", "Miles", "Purpose", "Cost"]);

        let sheet = wb.sheet(2).unwrap();
        assert!(detect_table(sheet, SheetRole::Expenses).is_none());
        let mapping = detect_table(sheet, SheetRole::Mileage).unwrap();
        assert_eq!(mapping.letter("distance"), Some("D"));
        assert_eq!(mapping.letter("start_location"), Some("B"));
    }

    #[test]
    fn test_find_table_searches_other_sheets() {
        let mut wb = Workbook::new_report();
        header(
            wb.sheet_mut(0).unwrap(),
            2,
            &["Date", "Merchant", "Category", "Total"],
        );
        let (index, mapping) = find_table(&wb, 1, SheetRole::Expenses).unwrap();
        assert_eq!(index, 0);
        assert_eq!(mapping.letter("vendor"), Some("B"));
        assert!(is_blank(wb.sheet(1).unwrap()));
    }
}
