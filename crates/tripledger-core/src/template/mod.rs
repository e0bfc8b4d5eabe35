//! Spreadsheet template handling
//!
//! - `sheet`: workbook load/save and cell helpers
//! - `header`: scored table-header detection
//! - `columns`: header cell → record field mapping
//! - `substitute`: `{{variable}}` replacement
//! - `analyze`: one-pass structural analysis of a template

pub mod analyze;
pub mod columns;
pub mod header;
pub mod sheet;
pub mod substitute;
