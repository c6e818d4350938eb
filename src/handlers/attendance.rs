use super::common::ok;
use crate::{
    auth::Actor,
    entities::attendance,
    services::attendance::{AttendanceOverview, BulkAttendanceRequest, MarkAttendanceRequest},
    ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

/// Mark one student for one lesson date; re-marking replaces the status
#[utoipa::path(
    post,
    path = "/api/v1/attendance/confirm",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = crate::ApiResponse<crate::entities::attendance::Model>),
        (status = 404, description = "Schedule not found", body = crate::errors::ErrorResponse),
    ),
    tag = "attendance"
)]
pub async fn mark(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<MarkAttendanceRequest>,
) -> ApiResult<attendance::Model> {
    let saved = state
        .services
        .attendance
        .mark(payload, actor.audit_name())
        .await?;
    Ok(ok(saved))
}

/// Mark a batch; either every item is saved or none is
#[utoipa::path(
    post,
    path = "/api/v1/attendance/bulk",
    request_body = BulkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = crate::ApiResponse<Vec<crate::entities::attendance::Model>>),
        (status = 400, description = "Invalid batch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Schedule not found", body = crate::errors::ErrorResponse),
    ),
    tag = "attendance"
)]
pub async fn mark_bulk(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<BulkAttendanceRequest>,
) -> ApiResult<Vec<attendance::Model>> {
    let saved = state
        .services
        .attendance
        .mark_bulk(payload, actor.audit_name())
        .await?;
    Ok(ok(saved))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/student/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student attendance", body = crate::ApiResponse<AttendanceOverview>),
    ),
    tag = "attendance"
)]
pub async fn get_by_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AttendanceOverview> {
    let overview = state
        .services
        .attendance
        .get_by_student(id, state.config.studio_today())
        .await?;
    Ok(ok(overview))
}

#[utoipa::path(
    get,
    path = "/api/v1/attendance/teacher/{id}",
    params(("id" = Uuid, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Attendance across the teacher's lessons", body = crate::ApiResponse<AttendanceOverview>),
    ),
    tag = "attendance"
)]
pub async fn get_by_teacher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AttendanceOverview> {
    let overview = state
        .services
        .attendance
        .get_by_teacher(id, state.config.studio_today())
        .await?;
    Ok(ok(overview))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/confirm", post(mark))
        .route("/attendance/bulk", post(mark_bulk))
        .route("/attendance/student/:id", get(get_by_student))
        .route("/attendance/teacher/:id", get(get_by_teacher))
}
