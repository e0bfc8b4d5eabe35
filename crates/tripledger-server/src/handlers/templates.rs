//! Template analysis handler

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use tripledger_core::schema::generate_schema;
use tripledger_core::{analyze_template as analyze, TemplateAnalysis, TemplateSchema, Workbook};

#[derive(Debug, Serialize)]
pub struct AnalyzeTemplateResponse {
    pub analysis: TemplateAnalysis,
    pub schema: TemplateSchema,
}

/// POST /api/templates/analyze - Analyze an uploaded xlsx template
///
/// The request body is the raw workbook.
pub async fn analyze_template(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<AnalyzeTemplateResponse>, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_UPLOAD_SIZE)
        .await
        .map_err(|_| AppError::payload_too_large("Template too large (max 10 MB)"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("Template body is empty"));
    }

    let workbook = Workbook::from_bytes(&bytes)
        .map_err(|e| AppError::bad_request("Invalid xlsx workbook").with_details(e.to_string()))?;

    let analysis = analyze(&workbook);
    let schema = generate_schema(state.ai.as_ref(), &analysis).await;

    info!(
        variables = analysis.variable_count(),
        sections = analysis.table_sections.len(),
        schema_source = ?schema.source,
        "Analyzed template"
    );

    Ok(Json(AnalyzeTemplateResponse { analysis, schema }))
}
