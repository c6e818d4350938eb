mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let body = app
        .expect(Method::GET, "/api/v1/health", None, StatusCode::OK)
        .await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let doc = app
        .expect(Method::GET, "/api-docs/openapi.json", None, StatusCode::OK)
        .await;
    assert_eq!(doc["info"]["title"], "Atelier API");
    assert!(doc["paths"]["/api/v1/payments/record"].is_object());
}

#[tokio::test]
async fn events_can_be_listed_and_cancelled_once() {
    let app = TestApp::new().await;
    let created = app
        .expect(
            Method::POST,
            "/api/v1/events",
            Some(serde_json::json!({
                "name": "Open studio day",
                "start_date": "2030-09-01",
                "end_date": "2030-09-01",
                "price": "0",
            })),
            StatusCode::CREATED,
        )
        .await;
    let id = common::data_id(&created);

    let listed = app
        .expect(Method::GET, "/api/v1/events?status=active", None, StatusCode::OK)
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    app.expect(
        Method::POST,
        &format!("/api/v1/events/{id}/cancel"),
        None,
        StatusCode::OK,
    )
    .await;
    app.expect(
        Method::POST,
        &format!("/api/v1/events/{id}/cancel"),
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}
