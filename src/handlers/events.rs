use super::common::{created, ok, Created};
use crate::{
    entities::event,
    errors::ServiceError,
    services::events::{CreateEventRequest, EventFilter},
    ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = crate::ApiResponse<crate::entities::event::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Created<event::Model>, ServiceError> {
    let event = state.services.events.create_event(payload).await?;
    Ok(created(event))
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(EventFilter),
    responses(
        (status = 200, description = "Events by start date", body = crate::ApiResponse<Vec<crate::entities::event::Model>>),
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> ApiResult<Vec<event::Model>> {
    let events = state.services.events.list_events(filter).await?;
    Ok(ok(events))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = crate::ApiResponse<crate::entities::event::Model>),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<event::Model> {
    let event = state.services.events.get_event(id).await?;
    Ok(ok(event))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/cancel",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event cancelled", body = crate::ApiResponse<crate::entities::event::Model>),
        (status = 400, description = "Already cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Event not found", body = crate::errors::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<event::Model> {
    let event = state.services.events.cancel_event(id).await?;
    Ok(ok(event))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/:id", get(get_event))
        .route("/events/:id/cancel", post(cancel_event))
}
