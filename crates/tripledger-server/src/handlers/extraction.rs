//! Receipt and odometer extraction handlers
//!
//! Images arrive base64-encoded in JSON, optionally as a `data:` URL.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::read_json;
use crate::{AppError, AppState, MAX_JSON_BODY, MAX_UPLOAD_SIZE};
use tripledger_core::extraction;
use tripledger_core::models::{ExtractedOdometerReading, ExtractedReceipt};

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Base64 grows payloads by a third
const MAX_IMAGE_BODY: usize = MAX_UPLOAD_SIZE / 3 * 4 + MAX_JSON_BODY;

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: String,
    pub mime_type: Option<String>,
}

impl ImageRequest {
    /// Decoded image bytes and MIME type
    fn decode(&self) -> Result<(Vec<u8>, String), AppError> {
        let raw = self.image.trim();
        let (data_url_mime, encoded) = match raw.strip_prefix("data:") {
            Some(rest) => {
                let (meta, data) = rest
                    .split_once(',')
                    .ok_or_else(|| AppError::bad_request("Invalid data URL"))?;
                let mime = meta.trim_end_matches(";base64");
                (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
            }
            None => (None, raw),
        };

        if encoded.is_empty() {
            return Err(AppError::bad_request("Image data is required"));
        }
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::bad_request("Invalid base64 image data").with_details(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::bad_request("Image data is required"));
        }
        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::payload_too_large("Image too large (max 10 MB)"));
        }

        let mime = self
            .mime_type
            .clone()
            .or(data_url_mime)
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
        Ok((bytes, mime))
    }
}

/// POST /api/receipts/extract - Extract a receipt from an image
///
/// Upstream failures still answer 200 with a record flagged `_fallback`.
pub async fn extract_receipt(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ExtractedReceipt>, AppError> {
    let body: ImageRequest = read_json(request, MAX_IMAGE_BODY).await?;
    let (image, mime) = body.decode()?;

    let ctx = state.context();
    let receipt = extraction::extract_receipt(
        &ctx,
        state.document_ai.as_ref(),
        state.ai.as_ref(),
        &image,
        &mime,
    )
    .await?;
    Ok(Json(receipt))
}

#[derive(Debug, Deserialize)]
pub struct DescribeReceiptRequest {
    pub receipt: ExtractedReceipt,
}

#[derive(Debug, Serialize)]
pub struct DescribeReceiptResponse {
    pub description: String,
}

/// POST /api/receipts/describe - Short description of an extracted receipt
pub async fn describe_receipt(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<DescribeReceiptResponse>, AppError> {
    let body: DescribeReceiptRequest = read_json(request, MAX_JSON_BODY).await?;
    let description =
        extraction::describe_receipt(state.ai.as_ref(), &body.receipt, &state.settings.retry).await;
    Ok(Json(DescribeReceiptResponse { description }))
}

/// POST /api/odometer/extract - Read an odometer photo
pub async fn extract_odometer(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ExtractedOdometerReading>, AppError> {
    let body: ImageRequest = read_json(request, MAX_IMAGE_BODY).await?;
    let (image, mime) = body.decode()?;

    let reading = extraction::extract_odometer(state.ai.as_ref(), &image, &mime).await?;
    Ok(Json(reading))
}
