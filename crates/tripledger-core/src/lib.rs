//! tripledger Core Library
//!
//! Shared functionality for the tripledger expense reporting tool:
//! - Record store (trips, expenses, mileage) with connection pooling and migrations
//! - Number/date/location normalization for noisy extracted text
//! - Spreadsheet template handling: header detection, column mapping,
//!   `{{variable}}` substitution and template analysis
//! - Schema and prose generation with deterministic fallbacks
//! - Report assembly into xlsx workbooks
//! - Receipt and odometer extraction via pluggable AI backends
//! - Prompt library and settings with embedded defaults and local overrides

pub mod ai;
pub mod context;
pub mod db;
pub mod document_ai;
pub mod error;
pub mod extraction;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod report;
pub mod retry;
pub mod schema;
pub mod settings;
pub mod template;

/// Test utilities including a mock upstream server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, OpenAICompatibleBackend};
pub use context::RequestContext;
pub use db::Database;
pub use document_ai::DocumentAiClient;
pub use error::{Error, Result};
pub use extraction::{describe_receipt, extract_odometer, extract_receipt, Entity};
pub use models::{
    ExpenseType, ExtractedOdometerReading, ExtractedReceipt, Location, NewExpense, NewMileage,
    NewTrip, RecordFilter, Trip,
};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use report::{RecordStore, ReportAssembler, ReportOutput, TemplateSource, XLSX_MIME};
pub use retry::RetryPolicy;
pub use schema::{SchemaSource, TemplateSchema};
pub use settings::Settings;
pub use template::{
    analyze::{analyze_template, Complexity, TemplateAnalysis},
    columns::{column_letter, map_table_columns, ColumnMapping},
    header::{find_table_header_row, HeaderMatch, MatchReason},
    sheet::Workbook,
    substitute::{process_variables, process_worksheet, VariableMap},
};
