//! Trip, expense and mileage commands

use anyhow::{Context, Result};
use tripledger_core::models::{ExpenseType, NewExpense, NewMileage, NewTrip, RecordFilter};
use tripledger_core::{Database, Settings};

use super::{parse_date, truncate};

/// Fields for `trips add`
#[derive(Debug, Default)]
pub struct TripArgs<'a> {
    pub name: &'a str,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    pub location: Option<&'a str>,
    pub purpose: Option<&'a str>,
    pub description: Option<&'a str>,
}

pub fn cmd_trips_add(db: &Database, args: &TripArgs) -> Result<i64> {
    let trip = NewTrip {
        name: args.name.to_string(),
        description: args.description.map(str::to_string),
        start_date: args.start.map(|s| parse_date(s, "--start")).transpose()?,
        end_date: args.end.map(|s| parse_date(s, "--end")).transpose()?,
        location: args.location.map(str::to_string),
        purpose: args.purpose.map(str::to_string),
    };

    let id = db.create_trip(&trip).context("Failed to create trip")?;
    println!("✅ Created trip #{}: {}", id, trip.name);
    Ok(id)
}

pub fn cmd_trips_list(db: &Database) -> Result<()> {
    let trips = db.list_trips()?;

    if trips.is_empty() {
        println!("No trips yet. Create one with: tripledger trips add \"Trip name\"");
        return Ok(());
    }

    println!("\n🧳 Trips ({})", trips.len());
    println!("{}", "─".repeat(70));
    for trip in &trips {
        let dates = match (trip.start_date, trip.end_date) {
            (Some(s), Some(e)) => format!("{} → {}", s, e),
            (Some(s), None) => format!("from {}", s),
            _ => "no dates".to_string(),
        };
        println!("  #{:<5} {:<30} {}", trip.id, truncate(&trip.name, 30), dates);
        if let Some(ref location) = trip.location {
            println!("         📍 {}", location);
        }
    }
    println!();
    Ok(())
}

/// Fields for `expenses add`
#[derive(Debug, Default)]
pub struct ExpenseArgs<'a> {
    pub vendor: &'a str,
    pub amount: f64,
    pub date: &'a str,
    pub expense_type: &'a str,
    pub currency: Option<&'a str>,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub trip: Option<i64>,
}

pub fn cmd_expenses_add(db: &Database, settings: &Settings, args: &ExpenseArgs) -> Result<i64> {
    let expense = NewExpense {
        trip_id: args.trip,
        date: parse_date(args.date, "--date")?,
        expense_type: ExpenseType::parse_lossy(args.expense_type),
        vendor: args.vendor.to_string(),
        description: args.description.map(str::to_string),
        amount: args.amount,
        currency: args
            .currency
            .unwrap_or(settings.default_currency.as_str())
            .to_string(),
        location: args.location.map(str::to_string),
    };

    let id = db.add_expense(&expense).context("Failed to record expense")?;
    println!(
        "✅ Recorded expense #{}: {} ${:.2} ({})",
        id,
        expense.vendor,
        expense.amount,
        expense.expense_type.label()
    );
    Ok(id)
}

pub fn cmd_expenses_list(db: &Database, filter: &RecordFilter) -> Result<()> {
    let expenses = db.list_expenses(filter)?;

    if expenses.is_empty() {
        println!("No expenses found");
        return Ok(());
    }

    println!("\n🧾 Expenses ({})", expenses.len());
    println!("{}", "─".repeat(70));
    let mut total = 0.0;
    for e in &expenses {
        total += e.amount;
        println!(
            "  #{:<5} {} {:<25} {:>10.2} {} {}",
            e.id,
            e.date,
            truncate(&e.vendor, 25),
            e.amount,
            e.currency,
            e.expense_type.label()
        );
    }
    println!("{}", "─".repeat(70));
    println!("  Total: ${:.2}", total);
    println!();
    Ok(())
}

/// Fields for `mileage add`
#[derive(Debug, Default)]
pub struct MileageArgs<'a> {
    pub date: &'a str,
    pub start: &'a str,
    pub end: &'a str,
    pub distance: f64,
    pub rate: Option<f64>,
    pub cost: Option<f64>,
    pub purpose: Option<&'a str>,
    pub trip: Option<i64>,
}

pub fn cmd_mileage_add(db: &Database, settings: &Settings, args: &MileageArgs) -> Result<i64> {
    let entry = NewMileage {
        trip_id: args.trip,
        date: parse_date(args.date, "--date")?,
        start_location: args.start.to_string(),
        end_location: args.end.to_string(),
        distance: args.distance,
        purpose: args.purpose.map(str::to_string),
        rate: args.rate.unwrap_or(settings.default_mileage_rate),
        cost: args.cost,
    };

    let id = db.add_mileage(&entry).context("Failed to record mileage")?;
    println!(
        "✅ Recorded mileage #{}: {} → {} ({:.1} mi, ${:.2})",
        id,
        entry.start_location,
        entry.end_location,
        entry.distance,
        entry.resolved_cost()
    );
    Ok(id)
}

pub fn cmd_mileage_list(db: &Database, filter: &RecordFilter) -> Result<()> {
    let records = db.list_mileage(filter)?;

    if records.is_empty() {
        println!("No mileage entries found");
        return Ok(());
    }

    println!("\n🚗 Mileage ({})", records.len());
    println!("{}", "─".repeat(70));
    let (mut miles, mut cost) = (0.0, 0.0);
    for m in &records {
        miles += m.distance;
        cost += m.cost;
        println!(
            "  #{:<5} {} {} → {} {:>7.1} mi {:>9.2}",
            m.id,
            m.date,
            truncate(&m.start_location, 18),
            truncate(&m.end_location, 18),
            m.distance,
            m.cost
        );
    }
    println!("{}", "─".repeat(70));
    println!("  Total: {:.1} miles, ${:.2}", miles, cost);
    println!();
    Ok(())
}
