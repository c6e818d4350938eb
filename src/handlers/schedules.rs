use super::common::{created, done, ok, Created};
use crate::{
    entities::schedule,
    errors::ServiceError,
    services::schedules::{
        CreateScheduleRequest, ExpandRecurringRequest, ScheduleCreated, ScheduleFilter,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Create a one-off calendar entry
#[utoipa::path(
    post,
    path = "/api/v1/schedules",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Entry created, with any overlapping entries", body = crate::ApiResponse<ScheduleCreated>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "schedules"
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<Created<ScheduleCreated>, ServiceError> {
    let result = state.services.schedules.create_appointment(payload).await?;
    Ok(created(result))
}

/// Expand a weekly lesson into one entry per matching date
#[utoipa::path(
    post,
    path = "/api/v1/schedules/recurring",
    request_body = ExpandRecurringRequest,
    responses(
        (status = 201, description = "Lessons created", body = crate::ApiResponse<ScheduleCreated>),
        (status = 400, description = "Invalid range", body = crate::errors::ErrorResponse),
    ),
    tag = "schedules"
)]
pub async fn expand_recurring(
    State(state): State<AppState>,
    Json(payload): Json<ExpandRecurringRequest>,
) -> Result<Created<ScheduleCreated>, ServiceError> {
    let result = state.services.schedules.expand_recurring(payload).await?;
    Ok(created(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/schedules",
    params(ScheduleFilter),
    responses(
        (status = 200, description = "Calendar entries", body = crate::ApiResponse<Vec<crate::entities::schedule::Model>>),
    ),
    tag = "schedules"
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(filter): Query<ScheduleFilter>,
) -> ApiResult<Vec<schedule::Model>> {
    let schedules = state.services.schedules.list_schedules(filter).await?;
    Ok(ok(schedules))
}

#[utoipa::path(
    get,
    path = "/api/v1/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Calendar entry", body = crate::ApiResponse<crate::entities::schedule::Model>),
        (status = 404, description = "Schedule not found", body = crate::errors::ErrorResponse),
    ),
    tag = "schedules"
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<schedule::Model> {
    let schedule = state.services.schedules.get_schedule(id).await?;
    Ok(ok(schedule))
}

/// Delete an entry and its attendance marks
#[utoipa::path(
    delete,
    path = "/api/v1/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule ID")),
    responses(
        (status = 200, description = "Schedule deleted"),
        (status = 404, description = "Schedule not found", body = crate::errors::ErrorResponse),
    ),
    tag = "schedules"
)]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ServiceError> {
    state.services.schedules.delete_schedule(id).await?;
    Ok(done("schedule deleted"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/schedules", post(create_appointment).get(list_schedules))
        .route("/schedules/recurring", post(expand_recurring))
        .route("/schedules/:id", get(get_schedule).delete(delete_schedule))
}
