//! Expense operations

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{filter_clause, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Expense, ExpenseType, NewExpense, RecordFilter};

const EXPENSE_COLUMNS: &str =
    "id, trip_id, date, expense_type, vendor, description, amount, currency, location, created_at";

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    let date_str: String = row.get(2)?;
    let type_str: String = row.get(3)?;
    let created_at_str: String = row.get(9)?;
    Ok(Expense {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        date: parse_date(&date_str),
        expense_type: ExpenseType::parse_lossy(&type_str),
        vendor: row.get(4)?,
        description: row.get(5)?,
        amount: row.get(6)?,
        currency: row.get(7)?,
        location: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Insert an expense
    ///
    /// The referenced trip, when given, must exist.
    pub fn add_expense(&self, expense: &NewExpense) -> Result<i64> {
        let vendor = expense.vendor.trim();
        if vendor.is_empty() {
            return Err(Error::InvalidData("Expense vendor is required".into()));
        }
        if !expense.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "Expense amount is not a number: {}",
                expense.amount
            )));
        }
        if let Some(trip_id) = expense.trip_id {
            if self.get_trip(trip_id)?.is_none() {
                return Err(Error::NotFound(format!("Trip {}", trip_id)));
            }
        }

        let currency = match expense.currency.trim() {
            "" => "USD".to_string(),
            code => code.to_uppercase(),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (trip_id, date, expense_type, vendor, description, amount, currency, location)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                expense.trip_id,
                expense.date.to_string(),
                expense.expense_type.as_str(),
                vendor,
                expense.description,
                expense.amount,
                currency,
                expense.location
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get an expense by ID
    pub fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let expense = conn
            .query_row(
                &format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS),
                params![id],
                row_to_expense,
            )
            .optional()?;
        Ok(expense)
    }

    /// List expenses matching a filter, oldest first
    pub fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>> {
        let (clause, values) = filter_clause(filter);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses {} ORDER BY date, id",
            EXPENSE_COLUMNS, clause
        ))?;

        let expenses = stmt
            .query_map(params_from_iter(values), row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }
}
