//! Expense record handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::{parse_date_param, read_json, record_filter};
use crate::{AppError, AppState, MAX_JSON_BODY};
use tripledger_core::models::{Expense, ExpenseType, NewExpense, RecordFilter};

/// Record selectors shared by the expense and mileage listings
#[derive(Debug, Default, Deserialize)]
pub struct RecordQuery {
    pub trip_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RecordQuery {
    /// Filter for a listing; no selector lists everything
    pub(crate) fn filter(&self) -> Result<RecordFilter, AppError> {
        let filter = record_filter(
            self.trip_id,
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            false,
        )?;
        Ok(filter.unwrap_or(RecordFilter::All))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub trip_id: Option<i64>,
    pub date: String,
    /// Category name; unknown values become "other"
    pub expense_type: Option<String>,
    pub vendor: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub location: Option<String>,
}

/// POST /api/expenses - Record an expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Expense>, AppError> {
    let body: CreateExpenseRequest = read_json(request, MAX_JSON_BODY).await?;

    let new_expense = NewExpense {
        trip_id: body.trip_id,
        date: parse_date_param(&body.date, "date")?,
        expense_type: body
            .expense_type
            .as_deref()
            .map(ExpenseType::parse_lossy)
            .unwrap_or(ExpenseType::Other),
        vendor: body.vendor,
        description: body.description,
        amount: body.amount,
        currency: body
            .currency
            .unwrap_or_else(|| state.settings.default_currency.clone()),
        location: body.location,
    };

    let id = state.db.add_expense(&new_expense)?;
    let expense = state
        .db
        .get_expense(id)?
        .ok_or_else(|| AppError::internal("Failed to fetch created expense"))?;

    info!(id, vendor = %expense.vendor, amount = expense.amount, "Recorded expense");
    Ok(Json(expense))
}

/// GET /api/expenses - List expenses by trip, date range, or all
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecordQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let expenses = state.db.list_expenses(&params.filter()?)?;
    Ok(Json(expenses))
}
