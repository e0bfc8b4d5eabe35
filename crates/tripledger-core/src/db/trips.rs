//! Trip operations

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTrip, Trip};

const TRIP_COLUMNS: &str =
    "id, name, description, start_date, end_date, location, purpose, created_at";

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    let start_str: Option<String> = row.get(3)?;
    let end_str: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(7)?;
    Ok(Trip {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        start_date: start_str.and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        end_date: end_str.and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        location: row.get(5)?,
        purpose: row.get(6)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create a new trip
    pub fn create_trip(&self, trip: &NewTrip) -> Result<i64> {
        let name = trip.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Trip name is required".into()));
        }
        if let (Some(start), Some(end)) = (trip.start_date, trip.end_date) {
            if end < start {
                return Err(Error::InvalidData(format!(
                    "Trip ends ({}) before it starts ({})",
                    end, start
                )));
            }
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO trips (name, description, start_date, end_date, location, purpose)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                name,
                trip.description,
                trip.start_date.map(|d| d.to_string()),
                trip.end_date.map(|d| d.to_string()),
                trip.location,
                trip.purpose
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get a trip by ID
    pub fn get_trip(&self, id: i64) -> Result<Option<Trip>> {
        let conn = self.conn()?;
        let trip = conn
            .query_row(
                &format!("SELECT {} FROM trips WHERE id = ?", TRIP_COLUMNS),
                params![id],
                trip_from_row,
            )
            .optional()?;
        Ok(trip)
    }

    /// List all trips, most recent first
    pub fn list_trips(&self) -> Result<Vec<Trip>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM trips ORDER BY start_date DESC NULLS LAST, id DESC",
            TRIP_COLUMNS
        ))?;

        let trips = stmt
            .query_map([], trip_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(trips)
    }

    /// Map of trip id to trip name
    pub fn trip_names(&self) -> Result<HashMap<i64, String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM trips")?;
        let names: HashMap<i64, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(names)
    }
}
