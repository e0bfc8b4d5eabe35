//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod expenses;
pub mod extraction;
pub mod health;
pub mod mileage;
pub mod reports;
pub mod templates;
pub mod trips;

// Re-export all handlers for use in router
pub use expenses::*;
pub use extraction::*;
pub use health::*;
pub use mileage::*;
pub use reports::*;
pub use templates::*;
pub use trips::*;

use axum::extract::Request;
use chrono::NaiveDate;
use tripledger_core::models::RecordFilter;
use serde::de::DeserializeOwned;

use crate::AppError;

/// Read and parse a JSON request body of at most `limit` bytes
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: Request,
    limit: usize,
) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AppError::bad_request("Invalid JSON").with_details(e.to_string()))
}

/// Parse a YYYY-MM-DD parameter named `field`
pub(crate) fn parse_date_param(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::bad_request(&format!("Invalid {} format (use YYYY-MM-DD)", field))
    })
}

/// Resolve the mutually exclusive record selectors into a filter
///
/// Returns `Ok(None)` when no selector is given.
pub(crate) fn record_filter(
    trip_id: Option<i64>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    all: bool,
) -> Result<Option<RecordFilter>, AppError> {
    let has_range = start_date.is_some() || end_date.is_some();
    let selected = [trip_id.is_some(), has_range, all]
        .iter()
        .filter(|s| **s)
        .count();
    if selected > 1 {
        return Err(AppError::bad_request(
            "Choose exactly one of trip_id, start_date/end_date or all",
        ));
    }

    if let Some(id) = trip_id {
        return Ok(Some(RecordFilter::Trip(id)));
    }
    if all {
        return Ok(Some(RecordFilter::All));
    }
    match (start_date, end_date) {
        (Some(start), Some(end)) => {
            let start = parse_date_param(start, "start_date")?;
            let end = parse_date_param(end, "end_date")?;
            if start > end {
                return Err(AppError::bad_request("start_date must not be after end_date"));
            }
            Ok(Some(RecordFilter::DateRange { start, end }))
        }
        (None, None) => Ok(None),
        _ => Err(AppError::bad_request(
            "start_date and end_date must be given together",
        )),
    }
}
