//! Database tests

use super::*;
use crate::error::Error;
use crate::models::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn expense(trip_id: Option<i64>, day: u32, vendor: &str, amount: f64) -> NewExpense {
    NewExpense {
        trip_id,
        date: date(2024, 3, day),
        expense_type: ExpenseType::Meals,
        vendor: vendor.to_string(),
        description: None,
        amount,
        currency: "usd".to_string(),
        location: None,
    }
}

fn mileage(trip_id: Option<i64>, day: u32, distance: f64) -> NewMileage {
    NewMileage {
        trip_id,
        date: date(2024, 3, day),
        start_location: "Office".to_string(),
        end_location: "Client HQ".to_string(),
        distance,
        purpose: Some("Client meeting".to_string()),
        rate: 0.58,
        cost: None,
    }
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_trips().unwrap().is_empty());
    assert!(db.list_expenses(&RecordFilter::All).unwrap().is_empty());
}

#[test]
fn test_trip_crud() {
    let db = Database::in_memory().unwrap();
    let id = db
        .create_trip(&NewTrip {
            name: "Client Visit".to_string(),
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 3, 3)),
            location: Some("Austin, TX".to_string()),
            ..Default::default()
        })
        .unwrap();

    let trip = db.get_trip(id).unwrap().unwrap();
    assert_eq!(trip.name, "Client Visit");
    assert_eq!(trip.end_date, Some(date(2024, 3, 3)));
    assert!(db.get_trip(id + 100).unwrap().is_none());

    let names = db.trip_names().unwrap();
    assert_eq!(names.get(&id).map(String::as_str), Some("Client Visit"));
}

#[test]
fn test_trip_validation() {
    let db = Database::in_memory().unwrap();
    let blank = db.create_trip(&NewTrip {
        name: "  ".to_string(),
        ..Default::default()
    });
    assert!(matches!(blank, Err(Error::InvalidData(_))));

    let backwards = db.create_trip(&NewTrip {
        name: "Backwards".to_string(),
        start_date: Some(date(2024, 3, 5)),
        end_date: Some(date(2024, 3, 1)),
        ..Default::default()
    });
    assert!(matches!(backwards, Err(Error::InvalidData(_))));
}

#[test]
fn test_expense_filters() {
    let db = Database::in_memory().unwrap();
    let trip = db
        .create_trip(&NewTrip {
            name: "Conference".to_string(),
            ..Default::default()
        })
        .unwrap();

    db.add_expense(&expense(Some(trip), 2, "Hotel", 200.0)).unwrap();
    db.add_expense(&expense(None, 5, "Diner", 15.0)).unwrap();
    db.add_expense(&expense(None, 20, "Cafe", 4.5)).unwrap();

    let by_trip = db.list_expenses(&RecordFilter::Trip(trip)).unwrap();
    assert_eq!(by_trip.len(), 1);
    assert_eq!(by_trip[0].vendor, "Hotel");
    assert_eq!(by_trip[0].currency, "USD");

    // Both ends inclusive
    let range = db
        .list_expenses(&RecordFilter::DateRange {
            start: date(2024, 3, 2),
            end: date(2024, 3, 5),
        })
        .unwrap();
    assert_eq!(range.len(), 2);

    let all = db.list_expenses(&RecordFilter::All).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].vendor, "Cafe");
}

#[test]
fn test_get_single_records() {
    let db = Database::in_memory().unwrap();
    let expense_id = db.add_expense(&expense(None, 4, "Diner", 12.0)).unwrap();
    let mileage_id = db.add_mileage(&mileage(None, 4, 20.0)).unwrap();

    let fetched = db.get_expense(expense_id).unwrap().unwrap();
    assert_eq!(fetched.vendor, "Diner");
    assert_eq!(fetched.date, date(2024, 3, 4));
    assert!(db.get_expense(expense_id + 1).unwrap().is_none());

    let record = db.get_mileage(mileage_id).unwrap().unwrap();
    assert_eq!(record.end_location, "Client HQ");
    assert!(db.get_mileage(999).unwrap().is_none());
}

#[test]
fn test_expense_for_missing_trip_is_rejected() {
    let db = Database::in_memory().unwrap();
    let result = db.add_expense(&expense(Some(42), 1, "Ghost", 1.0));
    assert!(matches!(result, Err(Error::NotFound(_))));

    let result = db.add_expense(&expense(None, 1, "", 1.0));
    assert!(matches!(result, Err(Error::InvalidData(_))));
}

#[test]
fn test_mileage_cost_defaults_to_distance_times_rate() {
    let db = Database::in_memory().unwrap();
    db.add_mileage(&mileage(None, 1, 50.0)).unwrap();
    db.add_mileage(&NewMileage {
        cost: Some(10.0),
        ..mileage(None, 2, 25.0)
    })
    .unwrap();

    let records = db.list_mileage(&RecordFilter::All).unwrap();
    assert_eq!(records.len(), 2);
    assert!((records[0].cost - 29.0).abs() < 1e-9);
    assert!((records[1].cost - 10.0).abs() < 1e-9);

    let negative = db.add_mileage(&mileage(None, 3, -1.0));
    assert!(matches!(negative, Err(Error::InvalidData(_))));
}

#[tokio::test]
async fn test_record_store_impl() {
    use crate::report::RecordStore;

    let db = Database::in_memory().unwrap();
    let trip = db
        .create_trip(&NewTrip {
            name: "Store".to_string(),
            ..Default::default()
        })
        .unwrap();
    db.add_expense(&expense(Some(trip), 1, "Vendor", 9.99)).unwrap();
    db.add_mileage(&mileage(Some(trip), 1, 10.0)).unwrap();

    assert_eq!(db.trip(trip).await.unwrap().unwrap().name, "Store");
    assert_eq!(db.expenses(RecordFilter::Trip(trip)).await.unwrap().len(), 1);
    assert_eq!(db.mileage(RecordFilter::Trip(trip)).await.unwrap().len(), 1);
    assert_eq!(RecordStore::trip_names(&db).await.unwrap().len(), 1);
}
