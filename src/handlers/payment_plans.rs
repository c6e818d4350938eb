use super::common::{created, ok, Created};
use crate::{
    auth::Actor,
    entities::payment,
    errors::ServiceError,
    services::payment_plans::{
        CancelPlanRequest, CreatePaymentPlanRequest, PlanFilter, PlanView, RecordPaymentRequest,
        RecordPaymentResponse,
    },
    ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

/// Create an installment plan for a student
#[utoipa::path(
    post,
    path = "/api/v1/payment-plans",
    request_body = CreatePaymentPlanRequest,
    responses(
        (status = 201, description = "Plan created", body = crate::ApiResponse<PlanView>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Referenced event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "payment-plans"
)]
pub async fn create_plan(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentPlanRequest>,
) -> Result<Created<PlanView>, ServiceError> {
    let plan = state
        .services
        .payment_plans
        .create_plan(payload, state.config.studio_today())
        .await?;
    Ok(created(plan))
}

/// List plans with their derived amounts
#[utoipa::path(
    get,
    path = "/api/v1/payment-plans",
    params(PlanFilter),
    responses(
        (status = 200, description = "Plans", body = crate::ApiResponse<Vec<PlanView>>),
    ),
    tag = "payment-plans"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(filter): Query<PlanFilter>,
) -> ApiResult<Vec<PlanView>> {
    let plans = state
        .services
        .payment_plans
        .list_plans(filter, state.config.studio_today())
        .await?;
    Ok(ok(plans))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-plans/{id}",
    params(("id" = Uuid, Path, description = "Payment plan ID")),
    responses(
        (status = 200, description = "Plan with installments and payments", body = crate::ApiResponse<PlanView>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "payment-plans"
)]
pub async fn get_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanView> {
    let plan = state
        .services
        .payment_plans
        .get_plan(id, state.config.studio_today())
        .await?;
    Ok(ok(plan))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment-plans/{id}/payments",
    params(("id" = Uuid, Path, description = "Payment plan ID")),
    responses(
        (status = 200, description = "Payments, newest first", body = crate::ApiResponse<Vec<crate::entities::payment::Model>>),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "payment-plans"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<payment::Model>> {
    let payments = state.services.payment_plans.list_payments(id).await?;
    Ok(ok(payments))
}

/// Write off the unpaid balance of a plan
#[utoipa::path(
    post,
    path = "/api/v1/payment-plans/{id}/cancel",
    params(("id" = Uuid, Path, description = "Payment plan ID")),
    request_body = CancelPlanRequest,
    responses(
        (status = 200, description = "Plan cancelled", body = crate::ApiResponse<PlanView>),
        (status = 400, description = "Plan is not active", body = crate::errors::ErrorResponse),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Plan changed concurrently", body = crate::errors::ErrorResponse),
    ),
    tag = "payment-plans"
)]
pub async fn cancel_remaining(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelPlanRequest>,
) -> ApiResult<PlanView> {
    let plan = state
        .services
        .payment_plans
        .cancel_remaining(id, payload, actor.audit_name(), state.config.studio_today())
        .await?;
    Ok(ok(plan))
}

#[utoipa::path(
    put,
    path = "/api/v1/payment-plans/{id}/cancellation-reason",
    params(("id" = Uuid, Path, description = "Payment plan ID")),
    request_body = CancelPlanRequest,
    responses(
        (status = 200, description = "Reason updated", body = crate::ApiResponse<PlanView>),
        (status = 400, description = "Plan is not cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
    ),
    tag = "payment-plans"
)]
pub async fn update_cancellation_reason(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelPlanRequest>,
) -> ApiResult<PlanView> {
    let plan = state
        .services
        .payment_plans
        .update_cancellation_reason(id, payload, actor.audit_name(), state.config.studio_today())
        .await?;
    Ok(ok(plan))
}

/// Record a payment against a plan
#[utoipa::path(
    post,
    path = "/api/v1/payments/record",
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = crate::ApiResponse<RecordPaymentResponse>),
        (status = 400, description = "Invalid amount or cancelled plan", body = crate::errors::ErrorResponse),
        (status = 404, description = "Plan not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Plan changed concurrently", body = crate::errors::ErrorResponse),
    ),
    tag = "payments"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Created<RecordPaymentResponse>, ServiceError> {
    let recorded = state
        .services
        .payment_plans
        .record_payment(payload, state.config.studio_today())
        .await?;
    Ok(created(recorded))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment-plans", post(create_plan).get(list_plans))
        .route("/payment-plans/:id", get(get_plan))
        .route("/payment-plans/:id/payments", get(list_payments))
        .route("/payment-plans/:id/cancel", post(cancel_remaining))
        .route(
            "/payment-plans/:id/cancellation-reason",
            put(update_cancellation_reason),
        )
        .route("/payments/record", post(record_payment))
}
