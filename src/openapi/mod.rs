use crate::{
    entities, errors,
    handlers::{attendance, events, expenses, financial, payment_plans, schedules, teacher_payments},
    services,
    AppState,
};
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier API",
        version = "0.1.0",
        description = r#"
# Atelier Studio Ledger API

Back office for an art studio: installment plans for students, the lesson
calendar, attendance, teacher payroll and monthly financial reports.

## Caller identity

An upstream gateway authenticates users and forwards `x-actor-id` and
`x-actor-role`. Both are optional; they are recorded on cancellations and
attendance marks.

## Error Handling

Errors share one shape:

```json
{
  "error": "Bad Request",
  "message": "amount must be greater than zero",
  "request_id": "5b0f...",
  "timestamp": "2026-10-01T09:00:00Z"
}
```

## Amounts

Monetary values are decimal strings in Turkish lira with two fraction digits.
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "payment-plans", description = "Student installment plans"),
        (name = "payments", description = "Payments against plans"),
        (name = "schedules", description = "Lessons, workshops and appointments"),
        (name = "attendance", description = "Attendance marks"),
        (name = "teacher-payments", description = "Teacher payroll"),
        (name = "events", description = "Studio events"),
        (name = "expenses", description = "Studio expenses"),
        (name = "financial", description = "Monthly summaries and reports"),
    ),
    paths(
        payment_plans::create_plan,
        payment_plans::list_plans,
        payment_plans::get_plan,
        payment_plans::list_payments,
        payment_plans::cancel_remaining,
        payment_plans::update_cancellation_reason,
        payment_plans::record_payment,
        schedules::create_appointment,
        schedules::expand_recurring,
        schedules::list_schedules,
        schedules::get_schedule,
        schedules::delete_schedule,
        attendance::mark,
        attendance::mark_bulk,
        attendance::get_by_student,
        attendance::get_by_teacher,
        teacher_payments::create,
        teacher_payments::list,
        teacher_payments::get_one,
        teacher_payments::record_payment,
        events::create_event,
        events::list_events,
        events::get_event,
        events::cancel_event,
        expenses::create_expense,
        expenses::list_expenses,
        financial::get_summary,
        financial::get_report,
    ),
    components(
        schemas(
            services::payment_plans::CreatePaymentPlanRequest,
            services::payment_plans::RecordPaymentRequest,
            services::payment_plans::CancelPlanRequest,
            services::payment_plans::PlanView,
            services::payment_plans::PlanProgress,
            services::payment_plans::Installment,
            services::payment_plans::InstallmentStatus,
            services::payment_plans::RecordPaymentResponse,
            services::schedules::CreateScheduleRequest,
            services::schedules::ExpandRecurringRequest,
            services::schedules::ScheduleDetails,
            services::schedules::ScheduleCreated,
            services::attendance::MarkAttendanceRequest,
            services::attendance::BulkAttendanceRequest,
            services::attendance::AttendanceOverview,
            services::attendance::AttendanceRecord,
            services::attendance::AttendanceCounts,
            services::teacher_payments::CreateTeacherPaymentRequest,
            services::teacher_payments::RecordTeacherPaymentRequest,
            services::teacher_payments::TeacherPaymentView,
            services::events::CreateEventRequest,
            services::expenses::CreateExpenseRequest,
            services::financial::FinancialSummary,
            services::financial::FinancialReport,
            services::financial::ReportTotals,
            services::financial::PaymentLine,
            services::financial::PayrollLine,
            services::financial::ExpenseLine,
            services::financial::CancellationLine,
            crate::money::Money,
            entities::event::Model,
            entities::event::EventStatus,
            entities::payment_plan::PlanStatus,
            entities::payment::Model,
            entities::payment::PaymentMethod,
            entities::schedule::Model,
            entities::schedule::ScheduleKind,
            entities::attendance::Model,
            entities::attendance::AttendanceStatus,
            entities::teacher_payment::Model,
            entities::teacher_payment::TeacherPaymentStatus,
            entities::teacher_payment_record::Model,
            entities::expense::Model,
            crate::calendar::DayOfWeek,
            errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_area() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Atelier API"));
        assert!(json.contains("/api/v1/payment-plans/{id}/cancel"));
        assert!(json.contains("/api/v1/payments/record"));
        assert!(json.contains("/api/v1/attendance/bulk"));
        assert!(json.contains("/api/v1/financial/report"));
    }
}
