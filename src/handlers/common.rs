use crate::ApiResponse;
use axum::{http::StatusCode, Json};
use serde::Serialize;

pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

/// 200 with the standard envelope
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// 201 with the standard envelope
pub fn created<T: Serialize>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// 200 with a message and no payload
pub fn done(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse::message(message.into()))
}
