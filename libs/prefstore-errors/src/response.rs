use axum::{Json, http::StatusCode, response::IntoResponse};

#[must_use]
/// 200 OK + JSON
pub fn json_ok<T: serde::Serialize>(value: T) -> impl IntoResponse {
    (StatusCode::OK, Json(value))
}

/// 204 No Content
#[must_use]
pub fn no_content() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
