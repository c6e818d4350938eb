//! HTTP-level tests for installment plans and payments.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_plan(app: &TestApp, total: &str, installments: i32) -> String {
    let body = app
        .expect(
            Method::POST,
            "/api/v1/payment-plans",
            Some(json!({
                "student_id": Uuid::new_v4(),
                "course_id": Uuid::new_v4(),
                "total_amount": total,
                "installments": installments,
                "start_date": "2030-03-10",
            })),
            StatusCode::CREATED,
        )
        .await;
    data_id(&body)
}

async fn pay(app: &TestApp, plan_id: &str, amount: &str) -> Value {
    app.expect(
        Method::POST,
        "/api/v1/payments/record",
        Some(json!({
            "payment_plan_id": plan_id,
            "amount": amount,
            "payment_date": "2030-03-15",
            "payment_method": "bank_transfer",
        })),
        StatusCode::CREATED,
    )
    .await
}

#[tokio::test]
async fn plan_moves_from_pending_to_partial_to_completed() {
    let app = TestApp::new().await;
    let plan_id = create_plan(&app, "1200", 3).await;

    let plan = app
        .expect(Method::GET, &format!("/api/v1/payment-plans/{plan_id}"), None, StatusCode::OK)
        .await;
    assert_eq!(plan["data"]["status"], "pending");
    assert_eq!(decimal(&plan["data"]["remaining_amount"]), dec!(1200));
    let schedule = plan["data"]["installment_schedule"].as_array().unwrap();
    assert_eq!(schedule.len(), 3);
    assert_eq!(schedule[1]["due_date"], "2030-04-10");

    let first = pay(&app, &plan_id, "400").await;
    assert_eq!(first["data"]["plan"]["status"], "partial");
    assert_eq!(decimal(&first["data"]["plan"]["paid_amount"]), dec!(400));
    assert_eq!(decimal(&first["data"]["plan"]["remaining_amount"]), dec!(800));

    let second = pay(&app, &plan_id, "800").await;
    assert_eq!(second["data"]["plan"]["status"], "completed");
    assert_eq!(decimal(&second["data"]["plan"]["remaining_amount"]), dec!(0));

    let payments = app
        .expect(
            Method::GET,
            &format!("/api/v1/payment-plans/{plan_id}/payments"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(payments["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn payments_after_completion_are_kept_as_overpayment() {
    let app = TestApp::new().await;
    let plan_id = create_plan(&app, "500", 1).await;
    pay(&app, &plan_id, "500").await;

    let extra = pay(&app, &plan_id, "50").await;
    let plan = &extra["data"]["plan"];
    assert_eq!(plan["status"], "completed");
    assert_eq!(decimal(&plan["paid_amount"]), dec!(550));
    assert_eq!(decimal(&plan["remaining_amount"]), dec!(0));
    assert_eq!(decimal(&plan["overpaid_amount"]), dec!(50));
}

#[tokio::test]
async fn cancelling_writes_off_the_unpaid_balance() {
    let app = TestApp::new().await;
    let plan_id = create_plan(&app, "1000", 4).await;
    pay(&app, &plan_id, "300").await;

    let response = app
        .request_with_headers(
            Method::POST,
            &format!("/api/v1/payment-plans/{plan_id}/cancel"),
            Some(json!({ "reason": "student moved abroad" })),
            &[("x-actor-id", "ayse"), ("x-actor-role", "admin")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let plan = &body["data"];
    assert_eq!(plan["status"], "cancelled");
    assert_eq!(plan["cancelled_by"], "ayse");
    assert_eq!(decimal(&plan["paid_amount"]), dec!(300));
    assert_eq!(decimal(&plan["remaining_amount"]), dec!(0));
    assert_eq!(decimal(&plan["written_off_amount"]), dec!(700));

    // No further payments once cancelled
    let rejected = app
        .request(
            Method::POST,
            "/api/v1/payments/record",
            Some(json!({ "payment_plan_id": plan_id, "amount": "100" })),
        )
        .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    // A second cancel is refused, but the reason can still be edited
    app.expect(
        Method::POST,
        &format!("/api/v1/payment-plans/{plan_id}/cancel"),
        Some(json!({ "reason": "again" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
    let edited = app
        .expect(
            Method::PUT,
            &format!("/api/v1/payment-plans/{plan_id}/cancellation-reason"),
            Some(json!({ "reason": "family relocated" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(edited["data"]["cancellation_reason"], "family relocated");
}

#[tokio::test]
async fn invalid_plans_and_payments_are_rejected() {
    let app = TestApp::new().await;

    let error = app
        .expect(
            Method::POST,
            "/api/v1/payment-plans",
            Some(json!({
                "student_id": Uuid::new_v4(),
                "total_amount": "0",
                "installments": 3,
                "start_date": "2030-03-10",
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(error["message"].as_str().unwrap().contains("total_amount"));

    app.expect(
        Method::POST,
        "/api/v1/payment-plans",
        Some(json!({
            "student_id": Uuid::new_v4(),
            "total_amount": "900",
            "installments": 0,
            "start_date": "2030-03-10",
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let plan_id = create_plan(&app, "900", 3).await;
    app.expect(
        Method::POST,
        "/api/v1/payments/record",
        Some(json!({ "payment_plan_id": plan_id, "amount": "-5" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn amounts_below_one_kurus_are_rejected() {
    let app = TestApp::new().await;

    let error = app
        .expect(
            Method::POST,
            "/api/v1/payment-plans",
            Some(json!({
                "student_id": Uuid::new_v4(),
                "course_id": Uuid::new_v4(),
                "total_amount": "0.004",
                "installments": 1,
                "start_date": "2030-03-10",
            })),
            StatusCode::BAD_REQUEST,
        )
        .await;
    assert!(error["message"].as_str().unwrap().contains("total_amount"));

    let plan_id = create_plan(&app, "900", 3).await;
    app.expect(
        Method::POST,
        "/api/v1/payments/record",
        Some(json!({ "payment_plan_id": plan_id, "amount": "0.001" })),
        StatusCode::BAD_REQUEST,
    )
    .await;

    let payments = app
        .expect(
            Method::GET,
            &format!("/api/v1/payment-plans/{plan_id}/payments"),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(payments["data"].as_array().unwrap().is_empty());

    let rounded = pay(&app, &plan_id, "100.005").await;
    assert_eq!(decimal(&rounded["data"]["payment"]["amount"]), dec!(100.01));
}

#[tokio::test]
async fn unknown_plans_return_not_found() {
    let app = TestApp::new().await;
    let missing = Uuid::new_v4();

    let body = app
        .expect(
            Method::GET,
            &format!("/api/v1/payment-plans/{missing}"),
            None,
            StatusCode::NOT_FOUND,
        )
        .await;
    assert_eq!(body["error"], "Not Found");

    app.expect(
        Method::POST,
        "/api/v1/payments/record",
        Some(json!({ "payment_plan_id": missing, "amount": "10" })),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn plans_cannot_be_opened_for_cancelled_events() {
    let app = TestApp::new().await;
    let event = app
        .expect(
            Method::POST,
            "/api/v1/events",
            Some(json!({
                "name": "Summer ceramics camp",
                "start_date": "2030-07-01",
                "end_date": "2030-07-05",
                "price": "2500",
            })),
            StatusCode::CREATED,
        )
        .await;
    let event_id = data_id(&event);
    app.expect(
        Method::POST,
        &format!("/api/v1/events/{event_id}/cancel"),
        None,
        StatusCode::OK,
    )
    .await;

    app.expect(
        Method::POST,
        "/api/v1/payment-plans",
        Some(json!({
            "student_id": Uuid::new_v4(),
            "event_id": event_id,
            "total_amount": "2500",
            "installments": 2,
            "start_date": "2030-06-01",
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn list_filters_by_student() {
    let app = TestApp::new().await;
    let student = Uuid::new_v4();
    for total in ["600", "900"] {
        app.expect(
            Method::POST,
            "/api/v1/payment-plans",
            Some(json!({
                "student_id": student,
                "course_id": Uuid::new_v4(),
                "total_amount": total,
                "installments": 3,
                "start_date": "2030-01-01",
            })),
            StatusCode::CREATED,
        )
        .await;
    }
    create_plan(&app, "100", 1).await;

    let listed = app
        .expect(
            Method::GET,
            &format!("/api/v1/payment-plans?student_id={student}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn responses_echo_the_request_id() {
    let app = TestApp::new().await;
    let response = app
        .request_with_headers(Method::GET, "/api/v1/status", None, &[("x-request-id", "req-42")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
    let body = response_json(response).await;
    assert_eq!(body["meta"]["request_id"], "req-42");
}
