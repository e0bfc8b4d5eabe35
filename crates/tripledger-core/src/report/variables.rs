//! Record aggregates and the flat variable map

use std::collections::HashMap;

use chrono::Local;

use crate::models::{Expense, ExpenseType, MileageRecord, RecordFilter, Trip};
use crate::schema::ContentAggregates;
use crate::template::substitute::VariableMap;

/// Round to whole cents; never negative zero
pub(crate) fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0 + 0.0
}

/// Sum starting from positive zero (an empty `f64` sum is `-0.0`)
pub(crate) fn total(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

pub(crate) fn money(value: f64) -> String {
    format!("${:.2}", cents(value))
}

/// Everything one report is built from
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub trip: Option<Trip>,
    pub expenses: Vec<Expense>,
    pub mileage: Vec<MileageRecord>,
    pub trip_names: HashMap<i64, String>,
    /// Human-readable covered period, empty when unbounded
    pub period: String,
    pub currency: String,
}

impl ReportData {
    pub fn new(
        filter: &RecordFilter,
        trip: Option<Trip>,
        expenses: Vec<Expense>,
        mileage: Vec<MileageRecord>,
        trip_names: HashMap<i64, String>,
        default_currency: &str,
    ) -> Self {
        let period = match (filter, trip.as_ref()) {
            (RecordFilter::DateRange { start, end }, _) => format!("{} to {}", start, end),
            (RecordFilter::Trip(_), Some(t)) => match (t.start_date, t.end_date) {
                (Some(s), Some(e)) => format!("{} to {}", s, e),
                (Some(s), None) => format!("from {}", s),
                _ => record_span(&expenses, &mileage),
            },
            _ => record_span(&expenses, &mileage),
        };

        // A single shared currency wins over the configured default
        let mut currencies = expenses.iter().map(|e| e.currency.as_str());
        let currency = match currencies.next() {
            Some(first) if currencies.all(|c| c == first) => first.to_string(),
            _ => default_currency.to_string(),
        };

        Self {
            trip,
            expenses,
            mileage,
            trip_names,
            period,
            currency,
        }
    }

    pub fn title(&self) -> String {
        match self.trip {
            Some(ref t) => format!("Expense Report: {}", t.name),
            None => "Expense Report".to_string(),
        }
    }

    /// Display name of the trip a record belongs to
    pub fn trip_name(&self, trip_id: Option<i64>) -> String {
        let Some(id) = trip_id else {
            return String::new();
        };
        match self.trip {
            Some(ref t) if t.id == id => t.name.clone(),
            _ => self.trip_names.get(&id).cloned().unwrap_or_default(),
        }
    }

    pub fn expense_total(&self) -> f64 {
        cents(total(self.expenses.iter().map(|e| e.amount)))
    }

    pub fn total_distance(&self) -> f64 {
        total(self.mileage.iter().map(|m| m.distance))
    }

    pub fn mileage_total(&self) -> f64 {
        cents(total(self.mileage.iter().map(|m| m.cost)))
    }

    pub fn grand_total(&self) -> f64 {
        cents(self.expense_total() + self.mileage_total())
    }

    /// Per-category expense totals in declaration order, zero categories skipped
    pub fn category_totals(&self) -> Vec<(ExpenseType, f64)> {
        ExpenseType::all()
            .iter()
            .map(|kind| {
                let sum = total(
                    self.expenses
                        .iter()
                        .filter(|e| e.expense_type == *kind)
                        .map(|e| e.amount),
                );
                (*kind, cents(sum))
            })
            .filter(|(_, total)| *total != 0.0)
            .collect()
    }

    pub fn aggregates(&self) -> ContentAggregates {
        ContentAggregates::from_records(
            &self.expenses,
            &self.mileage,
            self.trip.as_ref().map(|t| t.name.as_str()),
            &self.period,
            &self.currency,
        )
    }
}

fn record_span(expenses: &[Expense], mileage: &[MileageRecord]) -> String {
    let dates = expenses.iter().map(|e| e.date).chain(mileage.iter().map(|m| m.date));
    let (min, max) = dates.fold((None, None), |(lo, hi), d| {
        (
            Some(lo.map_or(d, |l: chrono::NaiveDate| l.min(d))),
            Some(hi.map_or(d, |h: chrono::NaiveDate| h.max(d))),
        )
    });
    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => lo.to_string(),
        (Some(lo), Some(hi)) => format!("{} to {}", lo, hi),
        _ => String::new(),
    }
}

/// Deterministic variables for one report
///
/// Dynamic prose is merged in afterwards by the assembler; the map is
/// complete before any cell is substituted.
pub fn build_variables(data: &ReportData) -> VariableMap {
    let mut vars = VariableMap::new();
    let mut put = |name: &str, value: String| {
        vars.insert(name.to_string(), value);
    };

    let today = Local::now().date_naive().to_string();
    put("date.today", today.clone());
    put("report.date", today);
    put("report.title", data.title());
    put("report.period", data.period.clone());
    put("report.currency", data.currency.clone());

    let trip = data.trip.as_ref();
    put("trip.name", trip.map(|t| t.name.clone()).unwrap_or_default());
    put(
        "trip.description",
        trip.and_then(|t| t.description.clone()).unwrap_or_default(),
    );
    put(
        "trip.location",
        trip.and_then(|t| t.location.clone()).unwrap_or_default(),
    );
    put(
        "trip.purpose",
        trip.and_then(|t| t.purpose.clone()).unwrap_or_default(),
    );
    put(
        "trip.start_date",
        trip.and_then(|t| t.start_date).map(|d| d.to_string()).unwrap_or_default(),
    );
    put(
        "trip.end_date",
        trip.and_then(|t| t.end_date).map(|d| d.to_string()).unwrap_or_default(),
    );

    let expense_total = data.expense_total();
    let mileage_total = data.mileage_total();
    let grand_total = data.grand_total();

    put("expenses.count", data.expenses.len().to_string());
    put("expenses.total", format!("{:.2}", expense_total));
    put("expenses.total.currency", money(expense_total));
    put("mileage.count", data.mileage.len().to_string());
    put("mileage.total_distance", format!("{:.1}", data.total_distance()));
    put("mileage.total", format!("{:.2}", mileage_total));
    put("mileage.total.currency", money(mileage_total));
    put("grand_total", format!("{:.2}", grand_total));
    put("grand_total.currency", money(grand_total));

    for (kind, total) in data.category_totals() {
        put(&format!("category.{}.total", kind.as_str()), format!("{:.2}", total));
    }

    for (i, e) in data.expenses.iter().enumerate() {
        let prefix = format!("expense.{}", i + 1);
        put(&format!("{}.date", prefix), e.date.to_string());
        put(&format!("{}.type", prefix), e.expense_type.label().to_string());
        put(&format!("{}.vendor", prefix), e.vendor.clone());
        put(
            &format!("{}.description", prefix),
            e.description.clone().unwrap_or_default(),
        );
        put(&format!("{}.amount", prefix), format!("{:.2}", e.amount));
        put(&format!("{}.amount.currency", prefix), money(e.amount));
        put(&format!("{}.currency", prefix), e.currency.clone());
        put(
            &format!("{}.location", prefix),
            e.location.clone().unwrap_or_default(),
        );
        put(&format!("{}.trip", prefix), data.trip_name(e.trip_id));
    }

    for (i, m) in data.mileage.iter().enumerate() {
        let prefix = format!("mileage.{}", i + 1);
        put(&format!("{}.date", prefix), m.date.to_string());
        put(&format!("{}.start", prefix), m.start_location.clone());
        put(&format!("{}.end", prefix), m.end_location.clone());
        put(&format!("{}.distance", prefix), format!("{:.1}", m.distance));
        put(
            &format!("{}.purpose", prefix),
            m.purpose.clone().unwrap_or_default(),
        );
        put(&format!("{}.cost", prefix), format!("{:.2}", m.cost));
        put(&format!("{}.trip", prefix), data.trip_name(m.trip_id));
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn data() -> ReportData {
        let expenses = vec![
            Expense {
                id: 1,
                trip_id: Some(7),
                date: day(2),
                expense_type: ExpenseType::Meals,
                vendor: "Olive Garden".into(),
                description: Some("Team dinner".into()),
                amount: 85.75,
                currency: "USD".into(),
                location: None,
                created_at: Utc::now(),
            },
            Expense {
                id: 2,
                trip_id: None,
                date: day(4),
                expense_type: ExpenseType::Transportation,
                vendor: "Uber".into(),
                description: None,
                amount: 28.50,
                currency: "USD".into(),
                location: None,
                created_at: Utc::now(),
            },
        ];
        let mileage = vec![MileageRecord {
            id: 1,
            trip_id: Some(7),
            date: day(1),
            start_location: "Office".into(),
            end_location: "Client".into(),
            distance: 75.0,
            purpose: None,
            rate: 0.58,
            cost: 75.0 * 0.58,
            created_at: Utc::now(),
        }];
        let names = HashMap::from([(7, "Client Visit".to_string())]);
        ReportData::new(&RecordFilter::All, None, expenses, mileage, names, "EUR")
    }

    #[test]
    fn test_totals_are_rounded_to_cents() {
        let data = data();
        assert_eq!(data.expense_total(), 114.25);
        assert_eq!(data.mileage_total(), 43.5);
        assert_eq!(data.grand_total(), 157.75);
        assert_eq!(data.currency, "USD");
        assert_eq!(data.period, "2024-03-01 to 2024-03-04");
    }

    #[test]
    fn test_build_variables() {
        let vars = build_variables(&data());
        assert_eq!(vars["expenses.count"], "2");
        assert_eq!(vars["expenses.total.currency"], "$114.25");
        assert_eq!(vars["mileage.total_distance"], "75.0");
        assert_eq!(vars["grand_total"], "157.75");
        assert_eq!(vars["expense.1.vendor"], "Olive Garden");
        assert_eq!(vars["expense.1.trip"], "Client Visit");
        assert_eq!(vars["expense.2.trip"], "");
        assert_eq!(vars["expense.2.type"], "Transportation");
        assert_eq!(vars["category.meals.total"], "85.75");
        assert!(!vars.contains_key("category.office.total"));
        assert_eq!(vars["trip.name"], "");
    }

    #[test]
    fn test_empty_report_variables() {
        let data = ReportData::new(
            &RecordFilter::All,
            None,
            Vec::new(),
            Vec::new(),
            HashMap::new(),
            "USD",
        );
        let vars = build_variables(&data);
        assert_eq!(vars["grand_total.currency"], "$0.00");
        assert_eq!(vars["grand_total"], "0.00");
        assert_eq!(vars["expenses.total.currency"], "$0.00");
        assert_eq!(vars["mileage.total_distance"], "0.0");
        assert!(data.grand_total().is_sign_positive());
        assert!(data.total_distance().is_sign_positive());
        assert!(data.aggregates().expense_total.is_sign_positive());
        assert_eq!(vars["report.period"], "");
        assert!(!vars.keys().any(|k| k.starts_with("expense.")));
    }
}
