//! Single-pass structural analysis of an uploaded template

use std::collections::BTreeMap;

use serde::Serialize;

use super::columns::column_letter;
use super::header::{score_row, GENERIC_KEYWORDS, HEADER_THRESHOLD};
use super::sheet::{dimensions, row_texts, Workbook};
use super::substitute::find_tokens;

/// Data type inferred from a variable's name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Date,
    Currency,
    Number,
    Boolean,
    String,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Currency => "currency",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableInfo {
    pub name: String,
    pub count: usize,
    /// Cell references such as `Summary!B4`
    pub locations: Vec<String>,
    pub inferred_type: VariableType,
}

/// A table found under a detected header row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSection {
    pub sheet: String,
    pub header_row: u32,
    /// Last non-empty row before the next header or the end of the sheet
    pub end_row: u32,
    pub header_cells: Vec<String>,
    pub variables_in_table: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAnalysis {
    pub sheet_names: Vec<String>,
    pub variables: BTreeMap<String, VariableInfo>,
    pub table_sections: Vec<TableSection>,
    pub has_expense_table: bool,
    pub has_mileage_table: bool,
    pub has_summary_section: bool,
    pub complexity: Complexity,
}

impl TemplateAnalysis {
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

/// Walk every row of every sheet once
///
/// A row scoring at least the header threshold against the generic keywords
/// opens a new table section. Rows that contain placeholders are never headers;
/// their tokens go into the variable registry and into the open section.
pub fn analyze_template(workbook: &Workbook) -> TemplateAnalysis {
    let mut variables: BTreeMap<String, VariableInfo> = BTreeMap::new();
    let mut sections: Vec<TableSection> = Vec::new();

    for index in 0..workbook.sheet_count() {
        let Some(ws) = workbook.sheet(index) else {
            continue;
        };
        let sheet_name = ws.get_name().to_string();
        let (max_col, max_row) = dimensions(ws);
        let mut open: Option<TableSection> = None;

        for row in 1..=max_row {
            let cells = row_texts(ws, row, max_col);
            if cells.iter().all(|c| c.is_empty()) {
                continue;
            }

            let has_tokens = cells.iter().any(|c| c.contains("{{"));
            if !has_tokens && score_row(&cells, row, GENERIC_KEYWORDS).0 >= HEADER_THRESHOLD {
                sections.extend(open.take());
                let mut header_cells = cells;
                while header_cells.last().is_some_and(|c| c.is_empty()) {
                    header_cells.pop();
                }
                open = Some(TableSection {
                    sheet: sheet_name.clone(),
                    header_row: row,
                    end_row: row,
                    header_cells,
                    variables_in_table: Vec::new(),
                });
                continue;
            }

            if let Some(section) = open.as_mut() {
                section.end_row = row;
            }

            for (i, cell) in cells.iter().enumerate() {
                for name in find_tokens(cell) {
                    let location = format!("{}!{}{}", sheet_name, column_letter(i as u32 + 1), row);
                    let entry = variables.entry(name.clone()).or_insert_with(|| VariableInfo {
                        inferred_type: infer_type(&name),
                        name: name.clone(),
                        count: 0,
                        locations: Vec::new(),
                    });
                    entry.count += 1;
                    entry.locations.push(location);

                    if let Some(section) = open.as_mut() {
                        if !section.variables_in_table.contains(&name) {
                            section.variables_in_table.push(name);
                        }
                    }
                }
            }
        }

        sections.extend(open.take());
    }

    let names: Vec<String> = variables.keys().map(|k| k.to_lowercase()).collect();
    let any_name = |keys: &[&str]| names.iter().any(|n| keys.iter().any(|k| n.contains(k)));
    let any_header = |keys: &[&str]| {
        sections.iter().any(|s| {
            s.header_cells
                .iter()
                .any(|c| keys.iter().any(|k| c.to_lowercase().contains(k)))
        })
    };

    let has_expense_table = any_name(&["expense"]) || any_header(&["vendor", "expense"]);
    let has_mileage_table =
        any_name(&["mileage", "miles", "distance"]) || any_header(&["mileage", "miles", "distance"]);
    let has_summary_section = any_name(&["summary", "grand_total", "total"]);

    let complexity = classify_complexity(variables.len(), sections.len());

    TemplateAnalysis {
        sheet_names: workbook.sheet_names(),
        variables,
        table_sections: sections,
        has_expense_table,
        has_mileage_table,
        has_summary_section,
        complexity,
    }
}

/// Infer a type from the variable's name alone
pub fn infer_type(name: &str) -> VariableType {
    let lower = name.to_lowercase();
    let last = lower.rsplit('.').next().unwrap_or(&lower);

    if lower.contains("date") {
        VariableType::Date
    } else if ["amount", "total", "cost", "price"]
        .iter()
        .any(|k| lower.contains(k))
    {
        VariableType::Currency
    } else if ["count", "number", "qty"].iter().any(|k| lower.contains(k)) {
        VariableType::Number
    } else if [lower.as_str(), last]
        .iter()
        .any(|n| n.starts_with("is_") || n.starts_with("has_"))
    {
        VariableType::Boolean
    } else {
        VariableType::String
    }
}

pub fn classify_complexity(variable_count: usize, section_count: usize) -> Complexity {
    if variable_count > 20 || section_count > 2 {
        Complexity::Complex
    } else if variable_count > 10 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}
