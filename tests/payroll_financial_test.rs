//! Teacher payroll and monthly financial figures.

mod common;

use axum::http::{Method, StatusCode};
use common::{data_id, decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn payroll_total_is_hours_times_rate_plus_trial_fee() {
    let app = TestApp::new().await;
    let teacher_id = Uuid::new_v4();

    let created = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments",
            Some(json!({
                "teacher_id": teacher_id,
                "month_year": "2030-03",
                "total_hours": "12.5",
                "hourly_rate": "350",
                "trial_lessons_fee": "200",
            })),
            StatusCode::CREATED,
        )
        .await;
    let payroll = &created["data"]["payment"];
    assert_eq!(decimal(&payroll["total_amount"]), dec!(4575));
    assert_eq!(payroll["status"], "pending");
    let id = payroll["id"].as_str().unwrap().to_string();

    let partial = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments/record",
            Some(json!({
                "teacher_payment_id": id,
                "amount": "2000",
                "payment_date": "2030-03-31",
            })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(partial["data"]["payment"]["status"], "partial");
    assert_eq!(decimal(&partial["data"]["remaining_amount"]), dec!(2575));

    let paid = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments/record",
            Some(json!({ "teacher_payment_id": id, "amount": "2575" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(paid["data"]["payment"]["status"], "paid");
    assert_eq!(paid["data"]["records"].as_array().unwrap().len(), 2);

    let fetched = app
        .expect(
            Method::GET,
            &format!("/api/v1/teacher-payments/{id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(decimal(&fetched["data"]["remaining_amount"]), dec!(0));
}

#[tokio::test]
async fn stored_payroll_fields_reproduce_the_total() {
    let app = TestApp::new().await;

    let created = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments",
            Some(json!({
                "teacher_id": Uuid::new_v4(),
                "month_year": "2030-05",
                "total_hours": "3",
                "hourly_rate": "100.005",
                "trial_lessons_fee": "0.004",
            })),
            StatusCode::CREATED,
        )
        .await;
    let payroll = &created["data"]["payment"];
    let hours = decimal(&payroll["total_hours"]);
    let rate = decimal(&payroll["hourly_rate"]);
    let fee = decimal(&payroll["trial_lessons_fee"]);
    let total = decimal(&payroll["total_amount"]);

    assert_eq!(rate, dec!(100.01));
    assert_eq!(fee, dec!(0));
    assert_eq!(total, dec!(300.03));
    assert_eq!(total, hours * rate + fee);
    let id = payroll["id"].as_str().unwrap().to_string();

    app.expect(
        Method::POST,
        "/api/v1/teacher-payments/record",
        Some(json!({ "teacher_payment_id": id, "amount": "0.001" })),
        StatusCode::BAD_REQUEST,
    )
    .await;
    let fetched = app
        .expect(
            Method::GET,
            &format!("/api/v1/teacher-payments/{id}"),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(fetched["data"]["records"].as_array().unwrap().is_empty());

    app.expect(
        Method::POST,
        "/api/v1/expenses",
        Some(json!({
            "category": "supplies",
            "amount": "0.004",
            "expense_date": "2030-05-02",
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn second_payroll_for_the_same_month_conflicts() {
    let app = TestApp::new().await;
    let payload = json!({
        "teacher_id": Uuid::new_v4(),
        "month_year": "2030-04",
        "total_hours": "10",
        "hourly_rate": "300",
    });

    app.expect(
        Method::POST,
        "/api/v1/teacher-payments",
        Some(payload.clone()),
        StatusCode::CREATED,
    )
    .await;
    app.expect(
        Method::POST,
        "/api/v1/teacher-payments",
        Some(payload),
        StatusCode::CONFLICT,
    )
    .await;

    let listed = app
        .expect(
            Method::GET,
            "/api/v1/teacher-payments?month_year=2030-04",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn hours_default_to_lessons_with_a_present_student() {
    let app = TestApp::new().await;
    let teacher_id = Uuid::new_v4();

    let lessons = app
        .expect(
            Method::POST,
            "/api/v1/schedules/recurring",
            Some(json!({
                "course_id": Uuid::new_v4(),
                "teacher_id": teacher_id,
                "day_of_week": "monday",
                "start_time": "14:00:00",
                "end_time": "15:30:00",
                "start_date": "2030-03-04",
                "end_date": "2030-03-17",
            })),
            StatusCode::CREATED,
        )
        .await;
    let lessons = lessons["data"]["schedules"].as_array().unwrap().clone();
    assert_eq!(lessons.len(), 2);

    app.expect(
        Method::POST,
        "/api/v1/attendance/bulk",
        Some(json!({
            "items": [
                { "schedule_id": lessons[0]["id"], "student_id": Uuid::new_v4(), "status": "present" },
                { "schedule_id": lessons[1]["id"], "student_id": Uuid::new_v4(), "status": "absent" },
            ]
        })),
        StatusCode::OK,
    )
    .await;

    let created = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments",
            Some(json!({
                "teacher_id": teacher_id,
                "month_year": "2030-03",
                "hourly_rate": "400",
                "trial_lessons_fee": "100",
            })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(decimal(&created["data"]["payment"]["total_hours"]), dec!(1.5));
    assert_eq!(decimal(&created["data"]["payment"]["total_amount"]), dec!(700));
}

#[tokio::test]
async fn monthly_summary_combines_actual_and_planned_figures() {
    let app = TestApp::new().await;

    let plan = app
        .expect(
            Method::POST,
            "/api/v1/payment-plans",
            Some(json!({
                "student_id": Uuid::new_v4(),
                "course_id": Uuid::new_v4(),
                "total_amount": "1200",
                "installments": 3,
                "start_date": "2030-03-10",
            })),
            StatusCode::CREATED,
        )
        .await;
    app.expect(
        Method::POST,
        "/api/v1/payments/record",
        Some(json!({
            "payment_plan_id": data_id(&plan),
            "amount": "150",
            "payment_date": "2030-03-12",
            "payment_method": "cash",
        })),
        StatusCode::CREATED,
    )
    .await;

    app.expect(
        Method::POST,
        "/api/v1/expenses",
        Some(json!({
            "category": "Clay",
            "description": "Stoneware, 10 bags",
            "amount": "250",
            "expense_date": "2030-03-05",
        })),
        StatusCode::CREATED,
    )
    .await;

    let payroll = app
        .expect(
            Method::POST,
            "/api/v1/teacher-payments",
            Some(json!({
                "teacher_id": Uuid::new_v4(),
                "month_year": "2030-03",
                "total_hours": "10",
                "hourly_rate": "100",
            })),
            StatusCode::CREATED,
        )
        .await;
    app.expect(
        Method::POST,
        "/api/v1/teacher-payments/record",
        Some(json!({
            "teacher_payment_id": payroll["data"]["payment"]["id"],
            "amount": "600",
            "payment_date": "2030-03-28",
        })),
        StatusCode::CREATED,
    )
    .await;

    let summary = app
        .expect(
            Method::GET,
            "/api/v1/financial/summary?month=2030-03",
            None,
            StatusCode::OK,
        )
        .await;
    let data = &summary["data"];
    assert_eq!(data["month"], "2030-03");
    assert_eq!(decimal(&data["actual_income"]), dec!(150));
    assert_eq!(decimal(&data["actual_expense"]), dec!(850));
    assert_eq!(decimal(&data["planned_income"]), dec!(250));
    assert_eq!(decimal(&data["planned_expense"]), dec!(400));
    assert_eq!(decimal(&data["net_profit"]), dec!(-700));
    assert_eq!(decimal(&data["projected_profit"]), dec!(-850));

    let report = app
        .expect(
            Method::GET,
            "/api/v1/financial/report?month=2030-03",
            None,
            StatusCode::OK,
        )
        .await;
    let totals = &report["data"]["totals"];
    assert_eq!(totals["student_income"]["display"], "₺150,00");
    assert_eq!(totals["total_expense"]["display"], "₺850,00");
    assert_eq!(totals["teacher_payroll_due"]["display"], "₺1.000,00");
    assert_eq!(totals["net_profit"]["display"], "-₺700,00");
    assert_eq!(report["data"]["expenses"].as_array().unwrap().len(), 1);

    // Nothing leaks into the neighbouring month
    let april = app
        .expect(
            Method::GET,
            "/api/v1/financial/summary?month=2030-04",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(decimal(&april["data"]["actual_income"]), dec!(0));
    assert_eq!(decimal(&april["data"]["planned_income"]), dec!(400));
}

#[tokio::test]
async fn malformed_months_are_bad_requests() {
    let app = TestApp::new().await;
    for uri in [
        "/api/v1/financial/summary?month=2030-13",
        "/api/v1/financial/report?month=March",
        "/api/v1/expenses?month=2030-3",
    ] {
        app.expect(Method::GET, uri, None, StatusCode::BAD_REQUEST).await;
    }
}
