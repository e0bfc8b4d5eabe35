//! Mileage operations

use rusqlite::{params, params_from_iter, OptionalExtension, Row};

use super::{filter_clause, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{MileageRecord, NewMileage, RecordFilter};

const MILEAGE_COLUMNS: &str =
    "id, trip_id, date, start_location, end_location, distance, purpose, rate, cost, created_at";

fn row_to_mileage(row: &Row) -> rusqlite::Result<MileageRecord> {
    let date_str: String = row.get(2)?;
    let created_at_str: String = row.get(9)?;
    Ok(MileageRecord {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        date: parse_date(&date_str),
        start_location: row.get(3)?,
        end_location: row.get(4)?,
        distance: row.get(5)?,
        purpose: row.get(6)?,
        rate: row.get(7)?,
        cost: row.get(8)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Insert a mileage record; cost defaults to distance × rate
    pub fn add_mileage(&self, entry: &NewMileage) -> Result<i64> {
        if !entry.distance.is_finite() || entry.distance < 0.0 {
            return Err(Error::InvalidData(format!(
                "Invalid distance: {}",
                entry.distance
            )));
        }
        if !entry.rate.is_finite() || entry.rate < 0.0 {
            return Err(Error::InvalidData(format!("Invalid rate: {}", entry.rate)));
        }
        if let Some(trip_id) = entry.trip_id {
            if self.get_trip(trip_id)?.is_none() {
                return Err(Error::NotFound(format!("Trip {}", trip_id)));
            }
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO mileage (trip_id, date, start_location, end_location, distance, purpose, rate, cost)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.trip_id,
                entry.date.to_string(),
                entry.start_location.trim(),
                entry.end_location.trim(),
                entry.distance,
                entry.purpose,
                entry.rate,
                entry.resolved_cost()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a mileage record by ID
    pub fn get_mileage(&self, id: i64) -> Result<Option<MileageRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM mileage WHERE id = ?", MILEAGE_COLUMNS),
                params![id],
                row_to_mileage,
            )
            .optional()?;
        Ok(record)
    }

    /// List mileage records matching a filter, oldest first
    pub fn list_mileage(&self, filter: &RecordFilter) -> Result<Vec<MileageRecord>> {
        let (clause, values) = filter_clause(filter);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM mileage {} ORDER BY date, id",
            MILEAGE_COLUMNS, clause
        ))?;

        let records = stmt
            .query_map(params_from_iter(values), row_to_mileage)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
