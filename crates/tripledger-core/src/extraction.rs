//! Receipt and odometer extraction
//!
//! Every path here ends in a usable record. Receipts go through the document
//! extraction service first, then the vision model, then a synthesized
//! fallback flagged with `_fallback`. Odometer photos go straight to the
//! vision model. Raw values from either source are normalized by the same
//! functions so the canonical record has one shape regardless of origin.

use std::collections::HashMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ai::parsing::{clean_plain_text, extract_json_object};
use crate::ai::{AIBackend, AIClient};
use crate::context::RequestContext;
use crate::document_ai::{DocumentAiClient, ProcessedDocument};
use crate::error::{Error, Result};
use crate::models::{ExpenseType, ExtractedOdometerReading, ExtractedReceipt, Location, ReceiptItem};
use crate::normalize::{
    extract_location_from_text, extract_numeric_value, extract_total_from_text,
    guess_expense_type, parse_address, parse_date,
};
use crate::prompts::PromptId;
use crate::retry::RetryPolicy;

/// Confidence used when the source gives none (or gives garbage)
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Ceiling for odometer readings that could not be read as a number
pub const UNREADABLE_ODOMETER_CONFIDENCE: f64 = 0.3;

const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// One labeled fact returned by the extraction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub mention_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<NormalizedValue>,
    /// Child entities (line item description/amount/quantity)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedValue {
    #[serde(default)]
    pub text: String,
}

impl Entity {
    pub fn new(entity_type: &str, mention_text: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            mention_text: mention_text.to_string(),
            confidence: None,
            normalized_value: None,
            properties: Vec::new(),
        }
    }

    /// Normalized text when the service provides it, else the raw mention
    pub fn value(&self) -> &str {
        self.normalized_value
            .as_ref()
            .map(|v| v.text.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.mention_text.trim())
    }
}

/// Receipt field an entity type feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityField {
    Vendor,
    Total,
    Amount,
    Date,
    Address,
    Tax,
    Currency,
    LineItem,
}

/// Recognized entity type strings per receipt field
pub const ENTITY_TYPES: &[(EntityField, &[&str])] = &[
    (
        EntityField::Vendor,
        &[
            "supplier_name",
            "merchant_name",
            "vendor_name",
            "business_name",
            "store_name",
            "company_name",
            "restaurant_name",
        ],
    ),
    (
        EntityField::Total,
        &[
            "total_amount",
            "grand_total",
            "total",
            "total_due",
            "amount_due",
            "balance_due",
        ],
    ),
    (
        EntityField::Amount,
        &["net_amount", "subtotal", "sub_total", "amount", "payment_amount"],
    ),
    (
        EntityField::Date,
        &[
            "receipt_date",
            "invoice_date",
            "purchase_date",
            "transaction_date",
            "issue_date",
            "date",
        ],
    ),
    (
        EntityField::Address,
        &[
            "supplier_address",
            "merchant_address",
            "vendor_address",
            "store_address",
            "ship_from_address",
            "address",
        ],
    ),
    (
        EntityField::Tax,
        &["total_tax_amount", "tax_amount", "sales_tax", "tax", "vat"],
    ),
    (EntityField::Currency, &["currency", "currency_code"]),
    (EntityField::LineItem, &["line_item", "line_items", "item"]),
];

/// Look up which receipt field an entity type string feeds
pub fn classify_entity(entity_type: &str) -> Option<EntityField> {
    let key = entity_type.trim().to_lowercase();
    ENTITY_TYPES
        .iter()
        .find(|(_, names)| names.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// ISO date when parseable, otherwise today
fn iso_date_or_today(raw: &str) -> String {
    parse_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(today)
}

/// Currency implied by a symbol in an amount string
fn currency_from_symbol(text: &str) -> Option<&'static str> {
    const SYMBOLS: &[(&str, &str)] = &[
        ("CA$", "CAD"),
        ("C$", "CAD"),
        ("A$", "AUD"),
        ("AU$", "AUD"),
        ("NZ$", "NZD"),
        ("MX$", "MXN"),
        ("€", "EUR"),
        ("£", "GBP"),
        ("¥", "JPY"),
        ("$", "USD"),
    ];
    SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(symbol))
        .map(|(_, code)| *code)
}

fn currency_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code)
    } else {
        currency_from_symbol(raw).map(str::to_string)
    }
}

fn clamp_confidence(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Resolve the `total` / `amount` pair, each defaulting to the other
fn settle_amounts(amount: Option<f64>, total: Option<f64>, fallback: Option<f64>) -> (f64, f64) {
    match (amount, total) {
        (Some(a), Some(t)) => (a, t),
        (Some(a), None) => (a, a),
        (None, Some(t)) => (t, t),
        (None, None) => {
            let v = fallback.unwrap_or(0.0);
            (v, v)
        }
    }
}

fn line_item(entity: &Entity) -> Option<ReceiptItem> {
    let mut name = None;
    let mut quantity = None;
    let mut price = None;

    for prop in &entity.properties {
        let kind = prop
            .entity_type
            .rsplit('/')
            .next()
            .unwrap_or(&prop.entity_type);
        match kind {
            "description" | "product_code" | "name" if name.is_none() => {
                name = Some(prop.value().to_string())
            }
            "quantity" => quantity = extract_numeric_value(prop.value()),
            "amount" | "unit_price" | "price" if price.is_none() => {
                price = extract_numeric_value(prop.value())
            }
            _ => {}
        }
    }

    let name = name
        .or_else(|| Some(entity.value().to_string()))
        .filter(|n| !n.is_empty())?;
    Some(ReceiptItem {
        name,
        quantity,
        price,
    })
}

/// Build a canonical receipt from extraction-service entities
pub fn normalize_receipt(doc: &ProcessedDocument, default_currency: &str) -> ExtractedReceipt {
    let mut fields: HashMap<EntityField, Vec<&Entity>> = HashMap::new();
    for entity in &doc.entities {
        match classify_entity(&entity.entity_type) {
            Some(field) => fields.entry(field).or_default().push(entity),
            None => debug!(entity_type = %entity.entity_type, "Ignoring unrecognized entity"),
        }
    }
    let first = |field: EntityField| {
        fields
            .get(&field)
            .and_then(|v| v.iter().find(|e| !e.value().is_empty()))
            .copied()
    };
    let first_number = |field: EntityField| first(field).and_then(|e| extract_numeric_value(e.value()));

    let vendor = first(EntityField::Vendor)
        .map(|e| e.value().to_string())
        .unwrap_or_else(|| UNKNOWN_VENDOR.to_string());

    let (amount, total) = settle_amounts(
        first_number(EntityField::Amount),
        first_number(EntityField::Total),
        extract_total_from_text(&doc.text),
    );

    let currency = first(EntityField::Currency)
        .and_then(|e| currency_code(e.value()))
        .or_else(|| {
            first(EntityField::Total)
                .and_then(|e| currency_from_symbol(&e.mention_text))
                .map(str::to_string)
        })
        .unwrap_or_else(|| default_currency.to_string());

    let date = first(EntityField::Date)
        .map(|e| iso_date_or_today(e.value()))
        .unwrap_or_else(today);

    let location = match first(EntityField::Address) {
        Some(address) => parse_address(address.value()),
        None => extract_location_from_text(&doc.text),
    };

    let items = fields
        .get(&EntityField::LineItem)
        .map(|v| v.iter().filter_map(|e| line_item(e)).collect())
        .unwrap_or_default();

    let confidences: Vec<f64> = doc.entities.iter().filter_map(|e| e.confidence).collect();
    let confidence = if confidences.is_empty() {
        DEFAULT_CONFIDENCE
    } else {
        clamp_confidence(Some(confidences.iter().sum::<f64>() / confidences.len() as f64))
    };

    ExtractedReceipt {
        expense_type: guess_expense_type(&vendor, &doc.text),
        vendor,
        amount,
        currency,
        date,
        items,
        location,
        tax_amount: first_number(EntityField::Tax),
        total,
        confidence,
        fallback: false,
        fallback_reason: None,
    }
}

/// Number from a JSON number or a numeric-looking string
fn number_field(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => extract_numeric_value(s),
        _ => None,
    }
}

fn string_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn location_field(value: Option<&Value>) -> Location {
    match value {
        Some(Value::String(s)) => parse_address(s),
        Some(obj @ Value::Object(_)) => Location {
            city: string_field(obj, &["city"]).unwrap_or_default().to_string(),
            state: string_field(obj, &["state", "region"]).unwrap_or_default().to_string(),
            country: string_field(obj, &["country"]).unwrap_or_default().to_string(),
        },
        _ => Location::default(),
    }
}

fn items_field(value: Option<&Value>) -> Vec<ReceiptItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(ReceiptItem {
                name: s.trim().to_string(),
                quantity: None,
                price: None,
            }),
            Value::Object(_) => Some(ReceiptItem {
                name: string_field(item, &["name", "description"])?.to_string(),
                quantity: number_field(item.get("quantity")),
                price: number_field(item.get("price").or_else(|| item.get("amount"))),
            }),
            _ => None,
        })
        .collect()
}

/// Build a canonical receipt from a vision model's JSON answer
///
/// Tolerates string amounts, a string location, a missing total or amount, and
/// non-numeric confidence.
pub fn receipt_from_llm_json(value: &Value, default_currency: &str) -> ExtractedReceipt {
    let vendor = string_field(value, &["vendor", "merchant", "vendorName", "merchantName"])
        .unwrap_or(UNKNOWN_VENDOR)
        .to_string();

    let (amount, total) = settle_amounts(
        number_field(value.get("amount")),
        number_field(value.get("total")),
        None,
    );

    let currency = string_field(value, &["currency"])
        .and_then(currency_code)
        .unwrap_or_else(|| default_currency.to_string());

    let expense_type = match string_field(value, &["expenseType", "expense_type", "category"]) {
        Some(raw) => match raw.parse::<ExpenseType>() {
            Ok(t) => t,
            Err(_) => guess_expense_type(&vendor, raw),
        },
        None => guess_expense_type(&vendor, ""),
    };

    ExtractedReceipt {
        date: iso_date_or_today(string_field(value, &["date"]).unwrap_or_default()),
        items: items_field(value.get("items")),
        location: location_field(value.get("location")),
        tax_amount: number_field(value.get("taxAmount").or_else(|| value.get("tax_amount"))),
        confidence: clamp_confidence(number_field(value.get("confidence"))),
        vendor,
        amount,
        currency,
        expense_type,
        total,
        fallback: false,
        fallback_reason: None,
    }
}

/// Normalize a vision model's odometer answer
pub fn normalize_odometer(value: &Value) -> ExtractedOdometerReading {
    let reading = number_field(value.get("reading"));
    let mut confidence = clamp_confidence(number_field(value.get("confidence")));
    if reading.is_none() {
        confidence = confidence.min(UNREADABLE_ODOMETER_CONFIDENCE);
    }

    ExtractedOdometerReading {
        reading,
        date: iso_date_or_today(
            value
                .get("date")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        ),
        confidence,
        fallback: false,
        fallback_reason: None,
    }
}

/// Placeholder receipt returned when every extraction path failed
pub fn fallback_receipt(reason: &str, default_currency: &str) -> ExtractedReceipt {
    ExtractedReceipt {
        vendor: UNKNOWN_VENDOR.to_string(),
        amount: 0.0,
        currency: default_currency.to_string(),
        date: today(),
        items: Vec::new(),
        location: Location::default(),
        expense_type: ExpenseType::Other,
        tax_amount: None,
        total: 0.0,
        confidence: 0.0,
        fallback: true,
        fallback_reason: Some(reason.to_string()),
    }
}

pub fn fallback_odometer(reason: &str) -> ExtractedOdometerReading {
    ExtractedOdometerReading {
        reading: None,
        date: today(),
        confidence: 0.0,
        fallback: true,
        fallback_reason: Some(reason.to_string()),
    }
}

/// Extract a receipt from an image
///
/// Only an empty image is an error; upstream failures degrade to the next
/// source and finally to [`fallback_receipt`].
pub async fn extract_receipt(
    ctx: &RequestContext,
    doc_ai: Option<&DocumentAiClient>,
    ai: Option<&AIClient>,
    image: &[u8],
    mime_type: &str,
) -> Result<ExtractedReceipt> {
    if image.is_empty() {
        return Err(Error::InvalidData("Image data is empty".into()));
    }
    let currency = ctx.settings().default_currency.as_str();
    let mut reason = String::from("no extraction service configured");

    if let Some(client) = doc_ai {
        match client.process(ctx, image, mime_type).await {
            Ok(doc) if doc.entities.is_empty() && doc.text.trim().is_empty() => {
                warn!("Document extraction returned nothing");
                reason = "document extraction returned no data".into();
            }
            Ok(doc) => {
                let receipt = normalize_receipt(&doc, currency);
                info!(vendor = %receipt.vendor, total = receipt.total, "Receipt extracted from document entities");
                return Ok(receipt);
            }
            Err(e) => {
                warn!(error = %e, "Document extraction failed, trying vision model");
                reason = format!("document extraction failed: {}", e);
            }
        }
    }

    if let Some(ai) = ai {
        let today = today();
        let mut vars = HashMap::new();
        vars.insert("today", today.as_str());

        let parsed = ai
            .describe_image(PromptId::ExtractReceipt, &vars, image, mime_type)
            .await
            .and_then(|text| extract_json_object::<Value>(&text));
        match parsed {
            Ok(value) => {
                let receipt = receipt_from_llm_json(&value, currency);
                info!(vendor = %receipt.vendor, total = receipt.total, "Receipt extracted by vision model");
                return Ok(receipt);
            }
            Err(e) => {
                warn!(error = %e, "Vision receipt extraction failed");
                reason = format!("vision extraction failed: {}", e);
            }
        }
    }

    warn!(reason = %reason, "Returning fallback receipt");
    Ok(fallback_receipt(&reason, currency))
}

/// Read an odometer photo; failures return [`fallback_odometer`]
pub async fn extract_odometer(
    ai: Option<&AIClient>,
    image: &[u8],
    mime_type: &str,
) -> Result<ExtractedOdometerReading> {
    if image.is_empty() {
        return Err(Error::InvalidData("Image data is empty".into()));
    }
    let Some(ai) = ai else {
        return Ok(fallback_odometer("no vision model configured"));
    };

    let today = today();
    let mut vars = HashMap::new();
    vars.insert("today", today.as_str());

    let parsed = ai
        .describe_image(PromptId::ReadOdometer, &vars, image, mime_type)
        .await
        .and_then(|text| extract_json_object::<Value>(&text));

    match parsed {
        Ok(value) => Ok(normalize_odometer(&value)),
        Err(e) => {
            warn!(error = %e, "Odometer extraction failed");
            Ok(fallback_odometer(&format!("vision extraction failed: {}", e)))
        }
    }
}

/// Deterministic description used when generation is unavailable
pub fn fallback_description(receipt: &ExtractedReceipt) -> String {
    format!(
        "{} expense at {} for ${:.2}",
        receipt.expense_type.label(),
        receipt.vendor,
        receipt.total
    )
}

/// One or two sentence description of a receipt
///
/// Transient upstream failures are retried per `retry`; anything else (or an
/// empty answer) yields [`fallback_description`].
pub async fn describe_receipt(
    ai: Option<&AIClient>,
    receipt: &ExtractedReceipt,
    retry: &RetryPolicy,
) -> String {
    let fallback = fallback_description(receipt);
    let Some(ai) = ai else {
        return fallback;
    };

    let amount = format!("{:.2}", receipt.total);
    let location = receipt.location.to_string();
    let items = receipt
        .items
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut vars = HashMap::new();
    vars.insert("vendor", receipt.vendor.as_str());
    vars.insert("amount", amount.as_str());
    vars.insert("currency", receipt.currency.as_str());
    vars.insert("expense_type", receipt.expense_type.as_str());
    vars.insert("date", receipt.date.as_str());
    vars.insert("location", location.as_str());
    vars.insert("items", items.as_str());
    let vars = &vars;

    match retry
        .run(move || ai.generate_text(PromptId::DescribeReceipt, vars))
        .await
    {
        Ok(text) => clean_plain_text(&text).unwrap_or(fallback),
        Err(e) => {
            warn!(error = %e, "Receipt description failed, using fallback");
            fallback
        }
    }
}
