//! Trip management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{parse_date_param, read_json};
use crate::{AppError, AppState, MAX_JSON_BODY};
use tripledger_core::models::{NewTrip, Trip};

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
}

/// POST /api/trips - Create a new trip
pub async fn create_trip(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Trip>, AppError> {
    let body: CreateTripRequest = read_json(request, MAX_JSON_BODY).await?;

    let start_date = body
        .start_date
        .as_deref()
        .map(|s| parse_date_param(s, "start_date"))
        .transpose()?;
    let end_date = body
        .end_date
        .as_deref()
        .map(|s| parse_date_param(s, "end_date"))
        .transpose()?;

    let new_trip = NewTrip {
        name: body.name,
        description: body.description,
        start_date,
        end_date,
        location: body.location,
        purpose: body.purpose,
    };

    let trip_id = state.db.create_trip(&new_trip)?;
    let trip = state
        .db
        .get_trip(trip_id)?
        .ok_or_else(|| AppError::internal("Failed to fetch created trip"))?;

    info!(trip_id, name = %trip.name, "Created trip");
    Ok(Json(trip))
}

/// GET /api/trips - List all trips
pub async fn list_trips(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Trip>>, AppError> {
    let trips = state.db.list_trips()?;
    Ok(Json(trips))
}

/// GET /api/trips/:id - Get a single trip
pub async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .db
        .get_trip(id)?
        .ok_or_else(|| AppError::not_found("Trip not found"))?;
    Ok(Json(trip))
}
