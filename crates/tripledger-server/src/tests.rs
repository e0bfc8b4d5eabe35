//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tripledger_core::models::{ExpenseType, NewExpense, NewMileage, NewTrip};
use tripledger_core::template::sheet::{cell_text, set_text};
use tripledger_core::test_utils::MockUpstream;
use tripledger_core::Workbook;

fn test_state(db: Database, ai: Option<AIClient>) -> AppState {
    AppState {
        db,
        config: ServerConfig::default(),
        settings: Settings::default(),
        ai,
        document_ai: None,
        http: reqwest::Client::new(),
    }
}

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router_with_state(test_state(db, Some(AIClient::mock())))
}

/// App over a database holding one trip with a meal and a drive
fn setup_seeded_app() -> (Router, i64) {
    let db = Database::in_memory().unwrap();
    let trip = db
        .create_trip(&NewTrip {
            name: "Client Visit".to_string(),
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 3),
            ..Default::default()
        })
        .unwrap();
    db.add_expense(&NewExpense {
        trip_id: Some(trip),
        date: chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        expense_type: ExpenseType::Meals,
        vendor: "Olive Garden".to_string(),
        description: None,
        amount: 85.75,
        currency: "USD".to_string(),
        location: None,
    })
    .unwrap();
    db.add_mileage(&NewMileage {
        trip_id: Some(trip),
        date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        start_location: "Office".to_string(),
        end_location: "Client HQ".to_string(),
        distance: 75.0,
        purpose: None,
        rate: 0.58,
        cost: None,
    })
    .unwrap();

    let app = create_router_with_state(test_state(db, None));
    (app, trip)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health_reports_ai_status() {
    let app = setup_test_app();
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ai_available"], true);
    assert_eq!(json["document_ai_configured"], false);
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();
    let response = app.oneshot(get("/api/health")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

// ========== Trips ==========

#[tokio::test]
async fn test_create_and_get_trip() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/trips",
            serde_json::json!({
                "name": "Denver Conference",
                "start_date": "2024-05-01",
                "end_date": "2024-05-04",
                "location": "Denver, CO"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let trip = get_body_json(response).await;
    assert_eq!(trip["name"], "Denver Conference");
    assert_eq!(trip["start_date"], "2024-05-01");

    let id = trip["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/trips/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["location"], "Denver, CO");

    let response = app.oneshot(get("/api/trips")).await.unwrap();
    let trips = get_body_json(response).await;
    assert_eq!(trips.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_missing_trip() {
    let app = setup_test_app();
    let response = app.oneshot(get("/api/trips/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(get_body_json(response).await["error"], "Trip not found");
}

#[tokio::test]
async fn test_create_trip_validation() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/trips",
            serde_json::json!({"name": "Trip", "start_date": "05/01/2024"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json("/api/trips", serde_json::json!({"name": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/trips")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "Invalid JSON");
}

// ========== Expenses and mileage ==========

#[tokio::test]
async fn test_create_and_filter_expenses() {
    let (app, trip) = setup_seeded_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/expenses",
            serde_json::json!({
                "date": "2024-04-10",
                "expense_type": "hotel",
                "vendor": "Marriott",
                "amount": 189.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let expense = get_body_json(response).await;
    assert_eq!(expense["expense_type"], "accommodation");
    assert_eq!(expense["currency"], "USD");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/expenses?trip_id={}", trip)))
        .await
        .unwrap();
    let listed = get_body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["vendor"], "Olive Garden");

    let response = app
        .clone()
        .oneshot(get("/api/expenses?start_date=2024-04-01&end_date=2024-04-30"))
        .await
        .unwrap();
    let listed = get_body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["vendor"], "Marriott");

    let response = app.oneshot(get("/api/expenses")).await.unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_expense_query_selectors_are_exclusive() {
    let (app, trip) = setup_seeded_app();

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/expenses?trip_id={}&start_date=2024-03-01&end_date=2024-03-31",
            trip
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/api/mileage?start_date=2024-03-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expense_for_unknown_trip() {
    let app = setup_test_app();
    let response = app
        .oneshot(post_json(
            "/api/expenses",
            serde_json::json!({
                "trip_id": 42,
                "date": "2024-04-10",
                "vendor": "Cafe",
                "amount": 4.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_mileage_uses_default_rate() {
    let app = setup_test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/mileage",
            serde_json::json!({
                "date": "2024-04-02",
                "start_location": "Home",
                "end_location": "Airport",
                "distance": 50.0
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = get_body_json(response).await;
    assert!((record["rate"].as_f64().unwrap() - 0.58).abs() < 1e-9);
    assert!((record["cost"].as_f64().unwrap() - 29.0).abs() < 1e-9);

    let response = app.oneshot(get("/api/mileage")).await.unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);
}

// ========== Reports ==========

#[tokio::test]
async fn test_generate_trip_report() {
    let (app, trip) = setup_seeded_app();

    let response = app
        .oneshot(post_json(
            "/api/reports/generate",
            serde_json::json!({"trip_id": trip}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), tripledger_core::XLSX_MIME);
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=\"client-visit-expense-report.xlsx\""
    );
    assert_eq!(headers.get("x-template-used").unwrap(), "false");

    let bytes = get_body_bytes(response).await;
    let wb = Workbook::from_bytes(&bytes).unwrap();
    assert_eq!(wb.sheet_names(), vec!["Summary", "Expenses", "Mileage"]);
    assert_eq!(
        cell_text(wb.sheet_by_name("Expenses").unwrap(), 3, 2),
        "Olive Garden"
    );
}

#[tokio::test]
async fn test_generate_report_requires_one_selector() {
    let (app, trip) = setup_seeded_app();

    for body in [
        serde_json::json!({}),
        serde_json::json!({"trip_id": trip, "all": true}),
        serde_json::json!({"start_date": "2024-03-01", "all": true}),
        serde_json::json!({"start_date": "2024-03-31", "end_date": "2024-03-01"}),
    ] {
        let response = app
            .clone()
            .oneshot(post_json("/api/reports/generate", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

#[tokio::test]
async fn test_generate_report_for_missing_trip() {
    let app = setup_test_app();
    let response = app
        .oneshot(post_json(
            "/api/reports/generate",
            serde_json::json!({"trip_id": 77}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_report_from_template_url() {
    let (app, trip) = setup_seeded_app();
    let upstream = MockUpstream::start().await;

    let mut template = Workbook::new_report();
    set_text(
        template.sheet_mut(0).unwrap(),
        1,
        1,
        "{{trip.name}}: {{grand_total.currency}}",
    );
    upstream.set_template("trip.xlsx", template.to_bytes().unwrap());

    let response = app
        .oneshot(post_json(
            "/api/reports/generate",
            serde_json::json!({
                "trip_id": trip,
                "template_url": upstream.template_url("trip.xlsx")
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-template-used").unwrap(), "true");

    let wb = Workbook::from_bytes(&get_body_bytes(response).await).unwrap();
    assert_eq!(
        cell_text(wb.sheet(0).unwrap(), 1, 1),
        "Client Visit: $129.25"
    );
}

// ========== Templates ==========

#[tokio::test]
async fn test_analyze_template() {
    let app = setup_test_app();

    let mut template = Workbook::new_report();
    let ws = template.sheet_mut(0).unwrap();
    set_text(ws, 1, 1, "{{trip.name}}");
    set_text(ws, 1, 2, "{{report.summary}}");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/templates/analyze")
                .header("content-type", tripledger_core::XLSX_MIME)
                .body(Body::from(template.to_bytes().unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert!(json["analysis"]["variables"]["trip.name"].is_object());
    assert_eq!(json["schema"]["source"], "ai");
    assert_eq!(json["schema"]["dynamicContent"][0], "report.summary");
}

#[tokio::test]
async fn test_analyze_rejects_non_workbook() {
    let app = setup_test_app();

    for body in [Vec::new(), b"plain text".to_vec()] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/templates/analyze")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// ========== Extraction ==========

#[tokio::test]
async fn test_extract_receipt() {
    let app = setup_test_app();
    let image = STANDARD.encode(b"fake-jpeg-bytes");

    let response = app
        .oneshot(post_json(
            "/api/receipts/extract",
            serde_json::json!({"image": image, "mime_type": "image/jpeg"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let receipt = get_body_json(response).await;
    assert_eq!(receipt["vendor"], "Mock Cafe");
    assert_eq!(receipt["expenseType"], "meals");
    assert!(receipt.get("_fallback").is_none());
}

#[tokio::test]
async fn test_extract_receipt_without_services_falls_back() {
    let db = Database::in_memory().unwrap();
    let app = create_router_with_state(test_state(db, None));
    let image = format!("data:image/png;base64,{}", STANDARD.encode(b"png"));

    let response = app
        .oneshot(post_json(
            "/api/receipts/extract",
            serde_json::json!({"image": image}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let receipt = get_body_json(response).await;
    assert_eq!(receipt["_fallback"], true);
    assert_eq!(receipt["amount"], 0.0);
}

#[tokio::test]
async fn test_extract_rejects_bad_images() {
    let app = setup_test_app();

    for image in ["", "!!! not base64 !!!", "data:image/png;base64,"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/receipts/extract",
                serde_json::json!({"image": image}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "image: {:?}", image);
    }
}

#[tokio::test]
async fn test_describe_receipt() {
    let app = setup_test_app();
    let receipt = serde_json::json!({
        "vendor": "Olive Garden",
        "amount": 45.99,
        "currency": "USD",
        "date": "2024-03-15",
        "items": [],
        "location": {"city": "Austin", "state": "TX", "country": "USA"},
        "expenseType": "meals",
        "total": 45.99,
        "confidence": 0.9
    });

    let response = app
        .oneshot(post_json(
            "/api/receipts/describe",
            serde_json::json!({"receipt": receipt}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(
        json["description"],
        "Business expense at Olive Garden for 45.99 USD."
    );
}

#[tokio::test]
async fn test_extract_odometer() {
    let app = setup_test_app();
    let response = app
        .oneshot(post_json(
            "/api/odometer/extract",
            serde_json::json!({"image": STANDARD.encode(b"dash")}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reading = get_body_json(response).await;
    assert_eq!(reading["reading"], 12345.6);
}

// ========== Error mapping ==========

#[test]
fn test_core_error_mapping() {
    use tripledger_core::Error;

    assert_eq!(
        AppError::from(Error::NotFound("Trip 1".into())).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::from(Error::InvalidData("bad".into())).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        AppError::from(Error::Report("empty".into())).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AppError::from(anyhow::anyhow!("boom")).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
