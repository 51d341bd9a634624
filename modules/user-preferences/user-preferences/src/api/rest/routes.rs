use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn_with_state, routing::get};
use prefstore_auth::{AuthMode, authenticate};

use super::handlers;
use crate::domain::service::Service;

pub const PREFERENCES_PATH: &str = "/api/v1/users/{user_id}/preferences";
pub const PREFERENCE_PATH: &str = "/api/v1/users/{user_id}/preferences/{key}";

#[must_use]
/// Authenticated preference routes.
///
/// Authentication wraps the fallback too, so an unknown path or method
/// answers 401 to an unauthenticated caller before it can answer 404.
pub fn router(service: Arc<Service>, auth: AuthMode) -> Router {
    Router::new()
        .route(
            PREFERENCES_PATH,
            get(handlers::get_preferences)
                .put(handlers::replace_preferences)
                .post(handlers::replace_preferences)
                .patch(handlers::merge_preferences)
                .delete(handlers::delete_preferences),
        )
        .route(
            PREFERENCE_PATH,
            get(handlers::get_preference).delete(handlers::delete_preference),
        )
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(auth, authenticate))
        .layer(Extension(service))
}

#[must_use]
/// Public liveness route.
pub fn health_router() -> Router {
    Router::new().route("/healthz", get(handlers::healthz))
}
