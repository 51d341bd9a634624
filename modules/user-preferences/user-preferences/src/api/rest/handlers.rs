use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{
        Extension, Path,
        rejection::{BytesRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use prefstore_auth::Authz;
use prefstore_errors::{ApiError, json_ok, no_content};
use user_preferences_sdk::Preferences;

use super::dto::{self, HealthDto, PreferenceDto, PreferencesDto};
use super::error::{Operation, domain_error_to_api};
use crate::domain::service::Service;

type ApiResult<T> = Result<T, ApiError>;

pub async fn healthz() -> impl IntoResponse {
    json_ok(HealthDto::ok())
}

/// Authenticated requests to paths that match no route.
pub async fn not_found() -> ApiError {
    ApiError::not_found("not found")
}

pub async fn get_preferences(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<PreferencesDto>> {
    let user_id = user_path(path)?;
    let preferences = svc
        .get_preferences(&ctx, &user_id)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::GetAll))?;
    Ok(Json(PreferencesDto::new(user_id, preferences)))
}

pub async fn get_preference(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<PreferenceDto>> {
    let (user_id, key) = key_path(path)?;
    let value = svc
        .get_preference(&ctx, &user_id, &key)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::GetOne))?;
    Ok(Json(PreferenceDto { key, value }))
}

/// PUT and POST both land here.
pub async fn replace_preferences(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<PreferencesDto>> {
    let user_id = user_path(path)?;
    svc.authorize(&ctx, &user_id)
        .map_err(|e| domain_error_to_api(e, Operation::ReplaceAll))?;
    let preferences = decode_body(body)?;

    let written = svc
        .replace_preferences(&ctx, &user_id, preferences)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::ReplaceAll))?;
    Ok(Json(PreferencesDto::new(user_id, written)))
}

pub async fn merge_preferences(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<PreferencesDto>> {
    let user_id = user_path(path)?;
    svc.authorize(&ctx, &user_id)
        .map_err(|e| domain_error_to_api(e, Operation::Merge))?;
    let patch = decode_body(body)?;

    let merged = svc
        .merge_preferences(&ctx, &user_id, patch)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::Merge))?;
    Ok(Json(PreferencesDto::new(user_id, merged)))
}

pub async fn delete_preferences(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let user_id = user_path(path)?;
    svc.delete_preferences(&ctx, &user_id)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::DeleteAll))?;
    Ok(no_content())
}

pub async fn delete_preference(
    Authz(ctx): Authz,
    Extension(svc): Extension<Arc<Service>>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let (user_id, key) = key_path(path)?;
    svc.delete_preference(&ctx, &user_id, &key)
        .await
        .map_err(|e| domain_error_to_api(e, Operation::DeleteKey))?;
    Ok(no_content())
}

fn user_path(path: Result<Path<String>, PathRejection>) -> ApiResult<String> {
    path.map(|Path(user_id)| user_id).map_err(|rejection| {
        tracing::debug!(error = %rejection, "bad user path");
        ApiError::bad_request("missing userId")
    })
}

fn key_path(path: Result<Path<(String, String)>, PathRejection>) -> ApiResult<(String, String)> {
    path.map(|Path(parts)| parts).map_err(|rejection| {
        tracing::debug!(error = %rejection, "bad preference path");
        ApiError::bad_request("missing key")
    })
}

fn decode_body(body: Result<Bytes, BytesRejection>) -> ApiResult<Preferences> {
    let bytes = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "request body rejected");
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::new(status, "request body too large")
        } else {
            ApiError::bad_request("invalid JSON body")
        }
    })?;
    dto::decode_preferences(&bytes).map_err(|e| {
        tracing::debug!(error = %e, "request body is not a flat string map");
        ApiError::bad_request("invalid JSON body")
    })
}
