//! Async record store over the blocking pool

use std::collections::HashMap;

use async_trait::async_trait;

use super::Database;
use crate::error::Result;
use crate::models::{Expense, MileageRecord, RecordFilter, Trip};
use crate::report::RecordStore;

#[async_trait]
impl RecordStore for Database {
    async fn trip(&self, id: i64) -> Result<Option<Trip>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.get_trip(id)).await?
    }

    async fn expenses(&self, filter: RecordFilter) -> Result<Vec<Expense>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.list_expenses(&filter)).await?
    }

    async fn mileage(&self, filter: RecordFilter) -> Result<Vec<MileageRecord>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.list_mileage(&filter)).await?
    }

    async fn trip_names(&self) -> Result<HashMap<i64, String>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.trip_names()).await?
    }
}
