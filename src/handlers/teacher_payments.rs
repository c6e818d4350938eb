use super::common::{created, ok, Created};
use crate::{
    entities::teacher_payment,
    errors::ServiceError,
    services::teacher_payments::{
        CreateTeacherPaymentRequest, RecordTeacherPaymentRequest, TeacherPaymentFilter,
        TeacherPaymentView,
    },
    ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Open a payroll row for a teacher and month
#[utoipa::path(
    post,
    path = "/api/v1/teacher-payments",
    request_body = CreateTeacherPaymentRequest,
    responses(
        (status = 201, description = "Payroll created", body = crate::ApiResponse<TeacherPaymentView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payroll already exists for the month", body = crate::errors::ErrorResponse),
    ),
    tag = "teacher-payments"
)]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateTeacherPaymentRequest>,
) -> Result<Created<TeacherPaymentView>, ServiceError> {
    let view = state.services.teacher_payments.create(payload).await?;
    Ok(created(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/teacher-payments",
    params(TeacherPaymentFilter),
    responses(
        (status = 200, description = "Payroll rows", body = crate::ApiResponse<Vec<crate::entities::teacher_payment::Model>>),
        (status = 400, description = "Invalid month", body = crate::errors::ErrorResponse),
    ),
    tag = "teacher-payments"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TeacherPaymentFilter>,
) -> ApiResult<Vec<teacher_payment::Model>> {
    let rows = state.services.teacher_payments.list(filter).await?;
    Ok(ok(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/teacher-payments/{id}",
    params(("id" = Uuid, Path, description = "Teacher payment ID")),
    responses(
        (status = 200, description = "Payroll with its payouts", body = crate::ApiResponse<TeacherPaymentView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "teacher-payments"
)]
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TeacherPaymentView> {
    let view = state.services.teacher_payments.get(id).await?;
    Ok(ok(view))
}

/// Record a payout against a payroll row
#[utoipa::path(
    post,
    path = "/api/v1/teacher-payments/record",
    request_body = RecordTeacherPaymentRequest,
    responses(
        (status = 201, description = "Payout recorded", body = crate::ApiResponse<TeacherPaymentView>),
        (status = 400, description = "Invalid amount", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "teacher-payments"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<RecordTeacherPaymentRequest>,
) -> Result<Created<TeacherPaymentView>, ServiceError> {
    let view = state
        .services
        .teacher_payments
        .record_payment(payload, state.config.studio_today())
        .await?;
    Ok(created(view))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/teacher-payments", post(create).get(list))
        .route("/teacher-payments/record", post(record_payment))
        .route("/teacher-payments/:id", get(get_one))
}
