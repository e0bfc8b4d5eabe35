//! Tolerant parsing of numbers, dates and locations from extracted text
//!
//! Receipts and invoices emit wildly inconsistent formats (currency codes,
//! thousands separators, regional date orders), so every function here walks
//! an ordered list of increasingly permissive patterns and returns the first
//! successful parse instead of failing outright.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::{ExpenseType, Location};

static CURRENCY_PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[A-Z]{1,3}\$|\$|€|£)\s*(-?[0-9][0-9.,]*)").expect("valid regex")
});
static NON_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,\-]").expect("valid regex"));
static LAST_RESORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]\d+").expect("valid regex"));

static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})\b").expect("valid regex")
});

static CITY_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z]+(?: [A-Z][a-zA-Z]+)*), *([A-Z]{2})\b").expect("valid regex")
});
static STATE_ZIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2})(?:\s+\d{5}(?:-\d{4})?)?$").expect("valid regex")
});
static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4,6}\b").expect("valid regex"));

/// Ordered "Total" patterns; the first capture is the amount
static TOTAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bgrand\s+total\b[:\s]*[A-Z]{0,3}[$€£]?\s*([\d,]+\.\d{2})",
        r"\bTOTAL\b[:\s]*[A-Z]{0,3}[$€£]?\s*([\d,]+\.\d{2})",
        r"\bTotal\b[:\s]*[A-Z]{0,3}[$€£]?\s*([\d,]+\.\d{2})",
        r"(?i)\btotal\s+amount\b[:\s]*[A-Z]{0,3}[$€£]?\s*([\d,]+\.\d{2})",
        r"(?i)\btotal\s+due\b[:\s]*[A-Z]{0,3}[$€£]?\s*([\d,]+\.\d{2})",
        r"(?i)\btotal\b[^\n\d]{0,20}([\d,]+[.,]\d{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});
static CURRENCY_CODE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:USD|EUR|GBP|CAD|AUD|JPY|CHF|MXN)\s*([\d,]+(?:[.,]\d{1,2})?)")
        .expect("valid regex")
});

const US_STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY", "DC",
];

/// (city, state, country) fallbacks for text without a "City, ST" pattern
const MAJOR_CITIES: &[(&str, &str, &str)] = &[
    ("New York", "NY", "USA"),
    ("Los Angeles", "CA", "USA"),
    ("Chicago", "IL", "USA"),
    ("Houston", "TX", "USA"),
    ("Phoenix", "AZ", "USA"),
    ("Philadelphia", "PA", "USA"),
    ("San Antonio", "TX", "USA"),
    ("San Diego", "CA", "USA"),
    ("Dallas", "TX", "USA"),
    ("San Francisco", "CA", "USA"),
    ("Austin", "TX", "USA"),
    ("Seattle", "WA", "USA"),
    ("Denver", "CO", "USA"),
    ("Boston", "MA", "USA"),
    ("Las Vegas", "NV", "USA"),
    ("Miami", "FL", "USA"),
    ("Atlanta", "GA", "USA"),
    ("Washington", "DC", "USA"),
    ("Toronto", "ON", "Canada"),
    ("Vancouver", "BC", "Canada"),
    ("Montreal", "QC", "Canada"),
    ("Mexico City", "", "Mexico"),
    ("London", "", "UK"),
    ("Paris", "", "France"),
    ("Berlin", "", "Germany"),
    ("Madrid", "", "Spain"),
    ("Rome", "", "Italy"),
    ("Amsterdam", "", "Netherlands"),
    ("Dublin", "", "Ireland"),
    ("Tokyo", "", "Japan"),
    ("Singapore", "", "Singapore"),
    ("Sydney", "NSW", "Australia"),
    ("Dubai", "", "UAE"),
];

/// Extract a decimal amount from noisy text such as `"$1,234.56"`, `"CA$45.00"` or `"45,00"`
///
/// Tries a currency-prefixed pattern, then a generic digits-only pass, then a
/// last-resort `\d+[.,]\d+` match.
pub fn extract_numeric_value(text: &str) -> Option<f64> {
    if let Some(caps) = CURRENCY_PREFIXED.captures(text) {
        if let Some(value) = parse_decimal(&caps[1]) {
            return Some(value);
        }
    }

    let stripped = NON_NUMERIC.replace_all(text, "");
    if stripped.chars().any(|c| c.is_ascii_digit()) {
        if let Some(value) = parse_decimal(&stripped) {
            return Some(value);
        }
    }

    LAST_RESORT_NUMBER
        .find(text)
        .and_then(|m| parse_decimal(m.as_str()))
}

/// Parse a digit string that may use either `,` or `.` as the decimal separator
///
/// When both separators appear, the last one is the decimal point. A lone comma
/// followed by one or two digits is a decimal comma; any other comma groups thousands.
fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_matches(|c| c == '.' || c == ',');
    if s.is_empty() {
        return None;
    }

    let normalized = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(comma), None) => {
            let decimals = s.len() - comma - 1;
            if s.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (None, _) => s.to_string(),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize a date string to `YYYY-MM-DD`
///
/// Native formats are tried first, then `MM/DD/YYYY`, then `DD/MM/YYYY`. The
/// original string is returned unchanged when nothing matches.
pub fn normalize_date(text: &str) -> String {
    parse_date(text)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| text.to_string())
}

/// Parse a date using the same ordered strategies as [`normalize_date`]
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    parse_native_date(trimmed).or_else(|| {
        let caps = SLASH_DATE.captures(trimmed)?;
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, first, second)
            .or_else(|| NaiveDate::from_ymd_opt(year, second, first))
    })
}

fn parse_native_date(s: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y", "%d %B %Y",
        "%d %b %Y",
    ];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive()))
}

/// Guess a location from free text when no address entity was extracted
pub fn extract_location_from_text(text: &str) -> Location {
    for caps in CITY_STATE.captures_iter(text) {
        let state = &caps[2];
        if US_STATES.contains(&state) {
            return Location::new(&caps[1], state, "USA");
        }
    }

    let lower = text.to_lowercase();
    MAJOR_CITIES
        .iter()
        .find(|(city, _, _)| contains_word(&lower, &city.to_lowercase()))
        .map(|(city, state, country)| Location::new(city, state, country))
        .unwrap_or_default()
}

/// Find the grand total in OCR text
pub fn extract_total_from_text(text: &str) -> Option<f64> {
    for pattern in TOTAL_PATTERNS.iter() {
        if let Some(value) = pattern
            .captures(text)
            .and_then(|caps| parse_decimal(&caps[1]))
        {
            return Some(value);
        }
    }

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    for pair in lines.windows(2) {
        let label = pair[0].to_lowercase();
        if label == "total" || label == "total:" {
            if let Some(value) = extract_numeric_value(pair[1]) {
                return Some(value);
            }
        }
    }

    CURRENCY_CODE_AMOUNT
        .captures(text)
        .and_then(|caps| parse_decimal(&caps[1]))
}

/// Split a postal address into city/state/country
///
/// Handles `"123 Main St, Springfield, IL 62701"` as well as
/// `"10 Rue de Rivoli, 75001 Paris, France"`; anything else falls back to
/// [`extract_location_from_text`].
pub fn parse_address(text: &str) -> Location {
    let parts: Vec<&str> = text
        .split([',', '\n'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    for (i, part) in parts.iter().enumerate().skip(1) {
        if let Some(caps) = STATE_ZIP.captures(part) {
            let state = &caps[1];
            let country = match parts.get(i + 1) {
                Some(country) => (*country).to_string(),
                None if US_STATES.contains(&state) => "USA".to_string(),
                None => String::new(),
            };
            return Location {
                city: parts[i - 1].to_string(),
                state: state.to_string(),
                country,
            };
        }
    }

    if parts.len() >= 3 {
        let city = POSTAL_CODE.replace_all(parts[parts.len() - 2], "");
        return Location {
            city: city.trim().to_string(),
            state: String::new(),
            country: parts[parts.len() - 1].to_string(),
        };
    }

    extract_location_from_text(text)
}

const MEALS_KEYWORDS: &[&str] = &[
    "restaurant", "cafe", "café", "coffee", "starbucks", "grill", "diner", "pizza", "burger",
    "bistro", "kitchen", "bakery", "olive garden", "mcdonald's", "mcdonalds", "subway",
    "chipotle", "steakhouse", "sushi", "taco", "eatery", "deli", "pub", "brewery", "food",
];
const ACCOMMODATION_KEYWORDS: &[&str] = &[
    "hotel", "inn", "motel", "marriott", "hilton", "hyatt", "sheraton", "westin", "airbnb",
    "resort", "suites", "lodge", "hostel",
];
const TRANSPORTATION_KEYWORDS: &[&str] = &[
    "uber", "lyft", "taxi", "cab", "airline", "airlines", "airways", "delta", "united",
    "southwest", "amtrak", "rail", "shell", "chevron", "exxon", "fuel", "gas", "parking",
    "hertz", "avis", "enterprise", "toll", "metro", "transit",
];
const ENTERTAINMENT_KEYWORDS: &[&str] = &[
    "cinema", "theater", "theatre", "movie", "museum", "concert", "tickets", "ticketmaster",
    "amc", "bowling", "golf",
];
const OFFICE_KEYWORDS: &[&str] = &[
    "staples", "office depot", "officemax", "supplies", "printing", "fedex office", "ups store",
    "best buy",
];
const BUSINESS_KEYWORDS: &[&str] = &[
    "conference", "registration", "coworking", "wework", "seminar", "consulting", "membership",
];

/// Guess an expense category from the vendor name, then from surrounding text
pub fn guess_expense_type(vendor: &str, text: &str) -> ExpenseType {
    let by_vendor = classify_keywords(&vendor.to_lowercase());
    if by_vendor != ExpenseType::Other {
        return by_vendor;
    }
    classify_keywords(&text.to_lowercase())
}

fn classify_keywords(haystack: &str) -> ExpenseType {
    if haystack.is_empty() {
        return ExpenseType::Other;
    }

    let table: [(&[&str], ExpenseType); 6] = [
        (MEALS_KEYWORDS, ExpenseType::Meals),
        (ACCOMMODATION_KEYWORDS, ExpenseType::Accommodation),
        (TRANSPORTATION_KEYWORDS, ExpenseType::Transportation),
        (ENTERTAINMENT_KEYWORDS, ExpenseType::Entertainment),
        (OFFICE_KEYWORDS, ExpenseType::Office),
        (BUSINESS_KEYWORDS, ExpenseType::Business),
    ];

    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| contains_word(haystack, k)))
        .map(|(_, kind)| *kind)
        .unwrap_or_default()
}

/// Whole-word containment on already-lowercased text
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
