//! Report generation handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tracing::info;

use super::{read_json, record_filter};
use crate::{AppError, AppState, MAX_JSON_BODY};
use tripledger_core::{ReportAssembler, TemplateSource};

/// Exactly one of `trip_id`, `start_date`+`end_date` or `all`
#[derive(Debug, Default, Deserialize)]
pub struct GenerateReportRequest {
    pub trip_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub all: bool,
    /// Workbook to fill instead of the standard layout
    pub template_url: Option<String>,
}

/// POST /api/reports/generate - Build an xlsx report
///
/// Responds with the workbook as an attachment. Template download or
/// parsing failures fall back to the standard layout, reported through
/// the `x-template-used` header.
pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let body: GenerateReportRequest = read_json(request, MAX_JSON_BODY).await?;

    let filter = record_filter(
        body.trip_id,
        body.start_date.as_deref(),
        body.end_date.as_deref(),
        body.all,
    )?
    .ok_or_else(|| {
        AppError::bad_request("Choose exactly one of trip_id, start_date/end_date or all")
    })?;

    let template = body
        .template_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .map(TemplateSource::Url);

    let ctx = state.context();
    let output = ReportAssembler::new(state.db.clone())
        .with_ai(state.ai.clone())
        .generate(&ctx, filter, template)
        .await?;

    info!(
        filename = %output.filename,
        expenses = output.expense_count,
        mileage = output.mileage_count,
        template_used = output.template_used,
        "Generated report"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, output.mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.filename),
        )
        .header("x-template-used", output.template_used.to_string())
        .body(Body::from(output.bytes))
        .map_err(|e| AppError::internal(&e.to_string()))
}
