//! Domain models for tripledger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Expense categories shared by records, receipts and reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Accommodation,
    Transportation,
    Meals,
    Entertainment,
    Business,
    Office,
    #[default]
    Other,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accommodation => "accommodation",
            Self::Transportation => "transportation",
            Self::Meals => "meals",
            Self::Entertainment => "entertainment",
            Self::Business => "business",
            Self::Office => "office",
            Self::Other => "other",
        }
    }

    /// Capitalized label used in spreadsheets and prose
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accommodation => "Accommodation",
            Self::Transportation => "Transportation",
            Self::Meals => "Meals",
            Self::Entertainment => "Entertainment",
            Self::Business => "Business",
            Self::Office => "Office",
            Self::Other => "Other",
        }
    }

    pub fn all() -> &'static [ExpenseType] {
        &[
            Self::Accommodation,
            Self::Transportation,
            Self::Meals,
            Self::Entertainment,
            Self::Business,
            Self::Office,
            Self::Other,
        ]
    }

    /// Parse leniently, mapping anything unrecognized to `Other`
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for ExpenseType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "accommodation" | "lodging" | "hotel" => Ok(Self::Accommodation),
            "transportation" | "transport" | "travel" => Ok(Self::Transportation),
            "meals" | "meal" | "food" | "dining" => Ok(Self::Meals),
            "entertainment" => Ok(Self::Entertainment),
            "business" => Ok(Self::Business),
            "office" | "supplies" => Ok(Self::Office),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown expense type: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured location; every field may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Location {
    pub fn new(city: &str, state: &str, country: &str) -> Self {
        Self {
            city: city.to_string(),
            state: state.to_string(),
            country: country.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.city.is_empty() && self.state.is_empty() && self.country.is_empty()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// A line item on a receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Canonical receipt record produced by the extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceipt {
    pub vendor: String,
    pub amount: f64,
    pub currency: String,
    /// ISO-8601 date (YYYY-MM-DD) when one could be recovered
    pub date: String,
    pub items: Vec<ReceiptItem>,
    pub location: Location,
    pub expense_type: ExpenseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<f64>,
    pub total: f64,
    pub confidence: f64,
    /// Set when the record was synthesized because extraction failed
    #[serde(rename = "_fallback", default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(rename = "_fallbackReason", default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Odometer reading extracted from a dashboard photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedOdometerReading {
    pub reading: Option<f64>,
    pub date: String,
    pub confidence: f64,
    #[serde(rename = "_fallback", default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(rename = "_fallbackReason", default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// A trip that groups related expenses and mileage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Free-form destination (e.g., "Austin, TX")
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New trip for creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTrip {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub purpose: Option<String>,
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub trip_id: Option<i64>,
    pub date: NaiveDate,
    pub expense_type: ExpenseType,
    pub vendor: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// New expense for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub trip_id: Option<i64>,
    pub date: NaiveDate,
    pub expense_type: ExpenseType,
    pub vendor: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub location: Option<String>,
}

/// A business mileage record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MileageRecord {
    pub id: i64,
    pub trip_id: Option<i64>,
    pub date: NaiveDate,
    pub start_location: String,
    pub end_location: String,
    /// Distance in miles
    pub distance: f64,
    pub purpose: Option<String>,
    /// Reimbursement rate per mile
    pub rate: f64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// New mileage entry for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMileage {
    pub trip_id: Option<i64>,
    pub date: NaiveDate,
    pub start_location: String,
    pub end_location: String,
    pub distance: f64,
    pub purpose: Option<String>,
    pub rate: f64,
    /// Explicit cost; distance × rate when absent
    pub cost: Option<f64>,
}

impl NewMileage {
    pub fn resolved_cost(&self) -> f64 {
        self.cost.unwrap_or(self.distance * self.rate)
    }
}

/// Which records a report covers; the three modes are mutually exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    Trip(i64),
    /// Inclusive on both ends
    DateRange { start: NaiveDate, end: NaiveDate },
    All,
}
