//! Health check handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use tripledger_core::ai::AIBackend;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ai_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    pub document_ai_configured: bool,
}

/// GET /api/health - Liveness plus a live AI backend check
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ai_available = match state.ai {
        Some(ref client) => client.health_check().await,
        None => false,
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai_available,
        ai_model: state.ai.as_ref().map(|c| c.model().to_string()),
        document_ai_configured: state.document_ai.is_some(),
    })
}
