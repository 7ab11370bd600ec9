//! The HTTP surface driven through the router, against a file database.
//!
//! The connection is a process-wide singleton, so the whole flow lives in a
//! single test.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use backend::routes::configure_routes;
use backend::shared::data::db::{get_connection, initialize_database};
use backend::system::initialization::ensure_admin_user_exists;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/system/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn dealership_day_over_http() {
    let db_file = std::env::temp_dir().join(format!("dealerdesk-{}.db", uuid::Uuid::new_v4()));
    initialize_database(&db_file).await.unwrap();
    ensure_admin_user_exists(get_connection()).await.unwrap();
    let app = configure_routes();

    let (status, _) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", "/api/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/api/system/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = login(&app, "admin", "admin").await;
    let (status, me) = call(&app, "GET", "/api/system/auth/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "ADMIN");

    let (status, _) = call(
        &app,
        "POST",
        "/api/system/users",
        Some(&admin),
        Some(json!({ "username": "ravi", "password": "workshop1", "role": "TECHNICIAN" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tech = login(&app, "ravi", "workshop1").await;

    // Technicians neither sell nor manage users
    let (status, _) = call(&app, "GET", "/api/sales", Some(&tech), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "GET", "/api/system/users", Some(&tech), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, lead) = call(
        &app,
        "POST",
        "/api/leads",
        Some(&admin),
        Some(json!({ "name": "Asha Rao", "phone": "9845012345" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lead["code"], "LEAD-0001");
    assert_eq!(lead["stage"], "NEW");

    let (status, vehicle) = call(
        &app,
        "POST",
        "/api/inventory",
        Some(&admin),
        Some(json!({
            "sku": "S1-RED-01",
            "model": "Volt S1",
            "kind": "VEHICLE",
            "chassis_no": "CH-0001",
            "purchase_price": 80000.0,
            "selling_price": 95000.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(&app, "GET", "/api/leads/not-a-uuid", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, sale) = call(
        &app,
        "POST",
        "/api/sales",
        Some(&admin),
        Some(json!({
            "lead_id": lead["id"],
            "vehicle_id": vehicle["id"],
            "payments": { "cash": 20000.0, "upi": 5000.0, "upi_reference": "UPI-1" },
            "uptime_pass": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "sale failed: {}", sale);
    assert_eq!(sale["sale_no"], "SALE-0001");
    assert_eq!(sale["balance_due"], 70000.0);

    // Converting the same lead again
    let (status, _) = call(
        &app,
        "POST",
        "/api/sales",
        Some(&admin),
        Some(json!({
            "lead_id": lead["id"],
            "vehicle_id": vehicle["id"],
            "payments": { "cash": 1000.0 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/sales/{}", sale["id"].as_str().unwrap());
    let (status, details) = call(&app, "GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["payments"].as_array().unwrap().len(), 2);

    let (status, summary) = call(&app, "GET", "/api/d400/summary", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["sales_count"], 1);
    assert_eq!(summary["sales_revenue"], 95000.0);
    assert_eq!(summary["outstanding_balance"], 70000.0);
    assert_eq!(summary["active_uptime_passes"], 1);

    let _ = std::fs::remove_file(&db_file);
}
