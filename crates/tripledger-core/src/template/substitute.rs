//! `{{variable}}` substitution across worksheets
//!
//! The variable map is fully built before substitution starts, so a single
//! pass is enough: rendered values are plain text and never template syntax.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;
use umya_spreadsheet::Worksheet;

use super::sheet::{dimensions, set_number, set_text, Workbook};

/// Flat dotted-name → value mapping for one report
pub type VariableMap = BTreeMap<String, String>;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("valid regex"));

/// Counts of what a substitution pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionStats {
    /// Cells rewritten via `{{name}}` tokens
    pub braced: usize,
    /// Cells whose whole text was a bare variable name
    pub exact: usize,
    /// Cells with bare names replaced inside larger text
    pub word: usize,
}

impl SubstitutionStats {
    pub fn total(&self) -> usize {
        self.braced + self.exact + self.word
    }

    fn add(&mut self, other: SubstitutionStats) {
        self.braced += other.braced;
        self.exact += other.exact;
        self.word += other.word;
    }
}

/// Name inside a `{{ name }}` token
pub fn token_name(token: &str) -> &str {
    token
        .trim_start_matches("{{")
        .trim_end_matches("}}")
        .trim()
}

/// All placeholder names in a piece of text, in order of appearance
pub fn find_tokens(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(text)
        .map(|m| token_name(m.as_str()).to_string())
        .collect()
}

/// Replace recognized `{{name}}` tokens; unknown tokens are left verbatim
pub fn process_variables(text: &str, variables: &VariableMap) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures| {
            let token = &caps[0];
            variables
                .get(token_name(token))
                .cloned()
                .unwrap_or_else(|| token.to_string())
        })
        .into_owned()
}

/// Substitute variables in every cell of a worksheet
///
/// Per cell, in priority order:
/// 1. `{{name}}` tokens
/// 2. whole cell text equal to a variable name
/// 3. bare dotted/underscored names as whole words inside larger text
///
/// A cell that is exactly one token (or one bare name) with a numeric value is
/// written as a number so the template's number format still applies.
pub fn process_worksheet(ws: &mut Worksheet, variables: &VariableMap) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();
    let (max_col, max_row) = dimensions(ws);

    // Longest first so `expenses.total.currency` wins over `expenses.total`
    let mut bare_names: Vec<&String> = variables.keys().filter(|k| is_bare_word_name(k)).collect();
    bare_names.sort_by_key(|k| std::cmp::Reverse(k.len()));

    for row in 1..=max_row {
        for col in 1..=max_col {
            let original = ws.get_value((col, row));
            if original.is_empty() {
                continue;
            }
            let trimmed = original.trim();

            if TOKEN.is_match(&original) {
                let single = TOKEN
                    .find(trimmed)
                    .is_some_and(|m| m.start() == 0 && m.end() == trimmed.len());
                let value = single
                    .then(|| variables.get(token_name(trimmed)))
                    .flatten();
                match value.and_then(|v| numeric_value(v)) {
                    Some(number) => set_number(ws, col, row, number),
                    None => {
                        let replaced = process_variables(&original, variables);
                        if replaced == original {
                            continue;
                        }
                        set_text(ws, col, row, &replaced);
                    }
                }
                stats.braced += 1;
            } else if let Some(value) = variables.get(trimmed) {
                match numeric_value(value) {
                    Some(number) => set_number(ws, col, row, number),
                    None => set_text(ws, col, row, value),
                }
                stats.exact += 1;
            } else {
                let replaced = replace_bare_words(&original, &bare_names, variables);
                if replaced != original {
                    set_text(ws, col, row, &replaced);
                    stats.word += 1;
                }
            }
        }
    }

    stats
}

/// Substitute variables across every sheet of a workbook
pub fn process_workbook(workbook: &mut Workbook, variables: &VariableMap) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();
    for index in 0..workbook.sheet_count() {
        if let Some(ws) = workbook.sheet_mut(index) {
            let sheet_stats = process_worksheet(ws, variables);
            debug!(
                sheet = ws.get_name(),
                changed = sheet_stats.total(),
                "Substituted template variables"
            );
            stats.add(sheet_stats);
        }
    }
    stats
}

/// Bare-word replacement only applies to names that cannot be ordinary words
fn is_bare_word_name(name: &str) -> bool {
    name.contains('.') || name.contains('_')
}

fn replace_bare_words(text: &str, names: &[&String], variables: &VariableMap) -> String {
    let mut result = text.to_string();
    for name in names {
        if !result.contains(name.as_str()) {
            continue;
        }
        let value = variables.get(name.as_str()).map(String::as_str).unwrap_or_default();
        result = match Regex::new(&format!(r"\b{}\b", regex::escape(name))) {
            Ok(re) => re.replace_all(&result, regex::NoExpand(value)).into_owned(),
            Err(e) => {
                debug!(name = %name, error = %e, "Word pattern failed, using literal replace");
                result.replace(name.as_str(), value)
            }
        };
    }
    result
}

/// Numeric value for plain decimal strings; leading-zero codes stay text
fn numeric_value(value: &str) -> Option<f64> {
    let v = value.trim();
    let leading_zero = v.len() > 1 && v.starts_with('0') && !v.starts_with("0.");
    if v.is_empty() || leading_zero {
        return None;
    }
    v.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::sheet::{cell_text, Workbook};

    fn vars(pairs: &[(&str, &str)]) -> VariableMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_process_variables() {
        let v = vars(&[("user.name", "Ann"), ("total", "$5")]);
        assert_eq!(
            process_variables("Hello {{user.name}}, total {{total}}", &v),
            "Hello Ann, total $5"
        );
    }

    #[test]
    fn test_unknown_tokens_pass_through() {
        let v = vars(&[("total", "$5")]);
        assert_eq!(
            process_variables("{{missing}} and {{ total }}", &v),
            "{{missing}} and $5"
        );
    }

    #[test]
    fn test_find_tokens() {
        assert_eq!(
            find_tokens("{{a}} x {{ b.c }} {{a}}"),
            vec!["a".to_string(), "b.c".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn test_process_worksheet_strategies() {
        let mut wb = Workbook::new_report();
        let ws = wb.sheet_mut(0).unwrap();
        set_text(ws, 1, 1, "Report for {{trip.name}}");
        set_text(ws, 1, 2, "trip.name");
        set_text(ws, 1, 3, "Spent expenses.total so far");
        set_text(ws, 1, 4, "{{expenses.total}}");
        set_text(ws, 1, 5, "{{unknown}}");
        set_text(ws, 1, 6, "total");

        let v = vars(&[
            ("trip.name", "Client Visit"),
            ("expenses.total", "114.25"),
            ("total", "ignored"),
        ]);
        let stats = process_worksheet(ws, &v);

        assert_eq!(cell_text(ws, 1, 1), "Report for Client Visit");
        assert_eq!(cell_text(ws, 1, 2), "Client Visit");
        assert_eq!(cell_text(ws, 1, 3), "Spent 114.25 so far");
        assert_eq!(cell_text(ws, 1, 4), "114.25");
        assert_eq!(cell_text(ws, 1, 5), "{{unknown}}");
        // Exact whole-cell names apply to any variable, including plain words
        assert_eq!(cell_text(ws, 1, 6), "ignored");
        assert_eq!(stats.braced, 2);
        assert_eq!(stats.exact, 2);
        assert_eq!(stats.word, 1);
    }

    #[test]
    fn test_bare_word_requires_word_boundary() {
        let v = vars(&[("trip.name", "X")]);
        let names: Vec<&String> = v.keys().collect();
        assert_eq!(replace_bare_words("mytrip.names", &names, &v), "mytrip.names");
        assert_eq!(replace_bare_words("(trip.name)", &names, &v), "(X)");
    }

    #[test]
    fn test_numeric_value_rules() {
        assert_eq!(numeric_value("114.25"), Some(114.25));
        assert_eq!(numeric_value("0.58"), Some(0.58));
        assert_eq!(numeric_value("0042"), None);
        assert_eq!(numeric_value("75.0 miles"), None);
    }
}
