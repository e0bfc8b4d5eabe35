//! Report assembly
//!
//! Turns a record set and an optional template workbook into xlsx bytes:
//! - `variables` - aggregates and the flat variable map
//! - `tables` - locating report sheets and record tables in a template
//! - `layout` - fixed sheet layouts for when no template table is usable

mod layout;
mod tables;
pub(crate) mod variables;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::models::{Expense, MileageRecord, RecordFilter, Trip};
use crate::retry::with_timeout;
use crate::schema::{generate_dynamic_content, generate_schema, SchemaSource};
use crate::template::analyze::analyze_template;
use crate::template::sheet::{reserve_table_rows, Workbook};
use crate::template::substitute::process_workbook;

pub use layout::{EXPENSE_HEADERS, MILEAGE_HEADERS};
pub use tables::{detect_table, locate_sheet, SheetRole};
pub use variables::{build_variables, ReportData};

/// MIME type of generated reports
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Read access to stored records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn trip(&self, id: i64) -> Result<Option<Trip>>;

    async fn expenses(&self, filter: RecordFilter) -> Result<Vec<Expense>>;

    async fn mileage(&self, filter: RecordFilter) -> Result<Vec<MileageRecord>>;

    /// Trip id → display name
    async fn trip_names(&self) -> Result<HashMap<i64, String>>;
}

/// Where a report template comes from
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Url(String),
    Bytes(Vec<u8>),
}

/// A finished report
#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime: &'static str,
    pub expense_count: usize,
    pub mileage_count: usize,
    pub template_used: bool,
    pub schema_source: Option<SchemaSource>,
}

/// Lowercase `[a-z0-9-]` slug; runs of anything else collapse to one dash
fn sanitize_filename(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// File name from the trip, the date range, or the catch-all name
pub fn report_filename(filter: &RecordFilter, trip: Option<&Trip>) -> String {
    let stem = match (filter, trip) {
        (RecordFilter::Trip(_), Some(t)) => format!("{} Expense Report", t.name),
        (RecordFilter::DateRange { start, end }, _) => format!("Expense Report {} to {}", start, end),
        _ => "All-Expenses-Report".to_string(),
    };
    let slug = sanitize_filename(&stem);
    if slug.is_empty() {
        "expense-report.xlsx".to_string()
    } else {
        format!("{}.xlsx", slug)
    }
}

/// Builds reports against a record store
pub struct ReportAssembler<S> {
    store: S,
    ai: Option<AIClient>,
}

impl<S: RecordStore> ReportAssembler<S> {
    pub fn new(store: S) -> Self {
        Self { store, ai: None }
    }

    /// Text service for schema and prose generation; without one every
    /// generated value uses its fallback
    pub fn with_ai(mut self, ai: Option<AIClient>) -> Self {
        self.ai = ai;
        self
    }

    /// Assemble one report
    ///
    /// A missing trip is `NotFound` and a failed record query propagates.
    /// Template problems never fail the report: the standard workbook is
    /// built instead.
    pub async fn generate(
        &self,
        ctx: &RequestContext,
        filter: RecordFilter,
        template: Option<TemplateSource>,
    ) -> Result<ReportOutput> {
        let data = self.load_records(ctx, filter).await?;
        info!(
            expenses = data.expenses.len(),
            mileage = data.mileage.len(),
            trip = data.trip.as_ref().map(|t| t.name.as_str()),
            "Assembling report"
        );

        let template = match template {
            Some(source) => load_template(ctx, source).await,
            None => None,
        };
        let template_used = template.is_some();

        let (workbook, schema_source) = match template {
            Some(workbook) => {
                let (workbook, source) = self.fill_template(workbook, &data).await?;
                (workbook, Some(source))
            }
            None => (build_standard_workbook(&data), None),
        };

        let bytes = workbook
            .to_bytes()
            .map_err(|e| Error::Report(format!("Failed to serialize report: {}", e)))?;
        if bytes.is_empty() {
            return Err(Error::Report("Serialized report is empty".into()));
        }

        let filename = report_filename(&filter, data.trip.as_ref());
        debug!(filename = %filename, size = bytes.len(), "Report serialized");

        Ok(ReportOutput {
            bytes,
            filename,
            mime: XLSX_MIME,
            expense_count: data.expenses.len(),
            mileage_count: data.mileage.len(),
            template_used,
            schema_source,
        })
    }

    async fn load_records(&self, ctx: &RequestContext, filter: RecordFilter) -> Result<ReportData> {
        let trip = match filter {
            RecordFilter::Trip(id) => Some(
                self.store
                    .trip(id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Trip {} not found", id)))?,
            ),
            _ => None,
        };

        let trip_scoped = trip.is_some();
        let (expenses, mileage, trip_names) = tokio::try_join!(
            self.store.expenses(filter),
            self.store.mileage(filter),
            async {
                if trip_scoped {
                    Ok(HashMap::new())
                } else {
                    self.store.trip_names().await
                }
            },
        )?;

        Ok(ReportData::new(
            &filter,
            trip,
            expenses,
            mileage,
            trip_names,
            &ctx.settings().default_currency,
        ))
    }

    /// Analyze, substitute once, then write record tables
    async fn fill_template(
        &self,
        mut workbook: Workbook,
        data: &ReportData,
    ) -> Result<(Workbook, SchemaSource)> {
        let analysis = analyze_template(&workbook);
        let schema = generate_schema(self.ai.as_ref(), &analysis).await;

        let mut variables = build_variables(data);
        let dynamic_fields: Vec<String> = schema
            .dynamic_content
            .iter()
            .filter(|name| !variables.contains_key(*name))
            .cloned()
            .collect();
        let generated =
            generate_dynamic_content(self.ai.as_ref(), &dynamic_fields, &data.aggregates()).await;
        variables.extend(generated);

        let stats = process_workbook(&mut workbook, &variables);
        info!(
            variables = analysis.variable_count(),
            substituted = stats.total(),
            schema = ?schema.source,
            "Template variables substituted"
        );

        let summary = locate_sheet(&mut workbook, SheetRole::Summary)?;
        if analysis.variables.is_empty() {
            if let Some(ws) = workbook.sheet_mut(summary).filter(|ws| tables::is_blank(ws)) {
                layout::write_summary_sheet(ws, data, &today());
            }
        }

        fill_table(&mut workbook, SheetRole::Expenses, data)?;
        fill_table(&mut workbook, SheetRole::Mileage, data)?;

        Ok((workbook, schema.source))
    }
}

fn today() -> String {
    Local::now().date_naive().to_string()
}

/// Write one record table into a template
///
/// A detected header keeps its row; the data rows under it are replaced by
/// records in the mapped columns and any footer below the table is kept. Without a usable table the fixed layout
/// goes on the located sheet when it is blank, else on a new sheet.
fn fill_table(workbook: &mut Workbook, role: SheetRole, data: &ReportData) -> Result<()> {
    let located = locate_sheet(workbook, role)?;

    if let Some((index, mapping)) = tables::find_table(workbook, located, role) {
        if let Some(ws) = workbook.sheet_mut(index) {
            let needed = match role {
                SheetRole::Mileage => data.mileage.len(),
                _ => data.expenses.len(),
            };
            reserve_table_rows(ws, mapping.header_row, needed as u32);
            match role {
                SheetRole::Mileage => layout::write_mapped_mileage(ws, &mapping, data),
                _ => layout::write_mapped_expenses(ws, &mapping, data),
            }
            debug!(sheet = ws.get_name(), header_row = mapping.header_row, "Filled template table");
        }
        return Ok(());
    }

    let blank = workbook.sheet(located).is_some_and(tables::is_blank);
    let index = if blank {
        located
    } else {
        let taken: Vec<String> = workbook.sheet_names();
        let mut name = format!("{} Data", role.default_name());
        let mut n = 2;
        while taken.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
            name = format!("{} Data {}", role.default_name(), n);
            n += 1;
        }
        workbook.add_sheet(&name)?
    };

    if let Some(ws) = workbook.sheet_mut(index) {
        match role {
            SheetRole::Mileage => layout::write_mileage_sheet(ws, data),
            _ => layout::write_expense_sheet(ws, data),
        }
        debug!(sheet = ws.get_name(), "Wrote fixed table layout");
    }
    Ok(())
}

/// The standard Summary/Expenses/Mileage workbook
fn build_standard_workbook(data: &ReportData) -> Workbook {
    let mut workbook = Workbook::new_report();
    if let Some(ws) = workbook.sheet_mut(0) {
        layout::write_summary_sheet(ws, data, &today());
    }
    if let Some(ws) = workbook.sheet_mut(1) {
        layout::write_expense_sheet(ws, data);
    }
    if let Some(ws) = workbook.sheet_mut(2) {
        layout::write_mileage_sheet(ws, data);
    }
    workbook
}

/// Load a template workbook; None on any failure
async fn load_template(ctx: &RequestContext, source: TemplateSource) -> Option<Workbook> {
    let bytes = match source {
        TemplateSource::Bytes(bytes) => bytes,
        TemplateSource::Url(url) => match download_template(ctx, &url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(url = %url, error = %e, "Template download failed, using standard workbook");
                return None;
            }
        },
    };

    match Workbook::from_bytes(&bytes) {
        Ok(workbook) => Some(workbook),
        Err(e) => {
            warn!(error = %e, "Template could not be read, using standard workbook");
            None
        }
    }
}

async fn download_template(ctx: &RequestContext, url: &str) -> Result<Vec<u8>> {
    let request = ctx.http().get(url);
    let timeout = ctx.settings().template_timeout;

    with_timeout(timeout, async move {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    })
    .await
}
