//! Mileage record handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{parse_date_param, read_json, RecordQuery};
use crate::{AppError, AppState, MAX_JSON_BODY};
use tripledger_core::models::{MileageRecord, NewMileage};

#[derive(Debug, Deserialize)]
pub struct CreateMileageRequest {
    pub trip_id: Option<i64>,
    pub date: String,
    pub start_location: String,
    pub end_location: String,
    pub distance: f64,
    pub purpose: Option<String>,
    /// Per-mile rate; the configured default when absent
    pub rate: Option<f64>,
    /// Explicit cost; distance × rate when absent
    pub cost: Option<f64>,
}

/// POST /api/mileage - Record a mileage entry
pub async fn create_mileage(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<MileageRecord>, AppError> {
    let body: CreateMileageRequest = read_json(request, MAX_JSON_BODY).await?;

    let entry = NewMileage {
        trip_id: body.trip_id,
        date: parse_date_param(&body.date, "date")?,
        start_location: body.start_location,
        end_location: body.end_location,
        distance: body.distance,
        purpose: body.purpose,
        rate: body.rate.unwrap_or(state.settings.default_mileage_rate),
        cost: body.cost,
    };

    let id = state.db.add_mileage(&entry)?;
    let record = state
        .db
        .get_mileage(id)?
        .ok_or_else(|| AppError::internal("Failed to fetch created mileage entry"))?;

    info!(id, distance = record.distance, cost = record.cost, "Recorded mileage");
    Ok(Json(record))
}

/// GET /api/mileage - List mileage by trip, date range, or all
pub async fn list_mileage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordQuery>,
) -> Result<Json<Vec<MileageRecord>>, AppError> {
    let records = state.db.list_mileage(&params.filter()?)?;
    Ok(Json(records))
}
