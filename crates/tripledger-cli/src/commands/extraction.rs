//! Receipt and odometer commands

use std::path::Path;

use anyhow::{Context, Result};
use tripledger_core::ai::AIClient;
use tripledger_core::extraction::{describe_receipt, extract_odometer, extract_receipt};
use tripledger_core::models::{ExtractedOdometerReading, ExtractedReceipt};
use tripledger_core::{DocumentAiClient, RequestContext};

/// MIME type from a file extension, JPEG when unknown
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "image/jpeg",
    }
}

fn read_image(path: &Path, mime: Option<&str>) -> Result<(Vec<u8>, String)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let mime = mime.unwrap_or_else(|| guess_mime(path)).to_string();
    Ok((bytes, mime))
}

/// Extract a receipt and print it as JSON
pub async fn cmd_extract_receipt(
    ctx: &RequestContext,
    doc_ai: Option<&DocumentAiClient>,
    ai: Option<&AIClient>,
    image: &Path,
    mime: Option<&str>,
) -> Result<ExtractedReceipt> {
    let (bytes, mime) = read_image(image, mime)?;
    let receipt = extract_receipt(ctx, doc_ai, ai, &bytes, &mime)
        .await
        .context("Receipt extraction failed")?;

    if let Some(ref reason) = receipt.fallback_reason {
        eprintln!("⚠️  Could not extract receipt data: {}", reason);
    }
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(receipt)
}

/// Describe a receipt stored as JSON (e.g. from `extract-receipt`)
pub async fn cmd_describe_receipt(
    ctx: &RequestContext,
    ai: Option<&AIClient>,
    file: &Path,
) -> Result<String> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let receipt: ExtractedReceipt =
        serde_json::from_str(&json).context("File is not an extracted receipt")?;

    let description = describe_receipt(ai, &receipt, &ctx.settings().retry).await;
    println!("{}", description);
    Ok(description)
}

/// Read an odometer photo and print the reading
pub async fn cmd_odometer(
    ai: Option<&AIClient>,
    image: &Path,
    mime: Option<&str>,
) -> Result<ExtractedOdometerReading> {
    let (bytes, mime) = read_image(image, mime)?;
    let reading = extract_odometer(ai, &bytes, &mime)
        .await
        .context("Odometer extraction failed")?;

    match reading.reading {
        Some(value) => println!(
            "🚗 Odometer: {:.1} (confidence {:.0}%)",
            value,
            reading.confidence * 100.0
        ),
        None => println!(
            "⚠️  Odometer unreadable{}",
            reading
                .fallback_reason
                .as_deref()
                .map(|r| format!(": {}", r))
                .unwrap_or_default()
        ),
    }
    Ok(reading)
}
