use std::{any::Any, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use prefstore_auth::{AuthMode, Hs256Validator};
use prefstore_errors::ApiError;
use tokio::{net::TcpListener, sync::Notify};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::field::Empty;
use user_preferences::{
    api::rest,
    domain::{repo::PreferencesRepository, service::Service},
    infra::storage::{DynamoPreferencesRepository, InMemoryPreferencesRepository},
};

use crate::config::{AppConfig, StoreBackend};
use crate::signals;

/// How long in-flight requests may run after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Copy, Default)]
pub struct MakeReqId;

impl MakeRequestId for MakeReqId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the preference store selected by `STORE_BACKEND`.
///
/// # Errors
/// Fails if the DynamoDB table must be created and cannot be.
pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn PreferencesRepository>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory preference store; data is lost on restart");
            Ok(Arc::new(InMemoryPreferencesRepository::new()))
        }
        StoreBackend::Dynamodb => {
            let dynamo = config.dynamo_config();
            let repo = DynamoPreferencesRepository::connect(&dynamo).await;
            if dynamo.create_table {
                repo.ensure_table()
                    .await
                    .with_context(|| format!("failed to prepare table {}", repo.table_name()))?;
            }
            Ok(Arc::new(repo))
        }
    }
}

/// Token verification, or the development bypass when enabled.
///
/// # Errors
/// Fails without a signing secret, in bypass mode too.
pub fn build_auth(config: &AppConfig) -> anyhow::Result<AuthMode> {
    let secret = config.jwt_secret()?;
    if config.dev_bypass_auth {
        return Ok(AuthMode::dev_bypass(config.dev_bypass_subject.clone()));
    }
    let validator = Hs256Validator::new(secret, config.validation_config());
    Ok(AuthMode::verify(Arc::new(validator)))
}

/// CORS policy from `CORS_ALLOW_ORIGIN`: `*` or a comma-separated origin list.
#[must_use]
pub fn build_cors_layer(allow_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allow_origin.trim() == "*" {
        return layer.allow_origin(AnyOrigin);
    }

    let origins: Vec<HeaderValue> = allow_origin
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match HeaderValue::from_str(s) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = s, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "panic recovered");
    ApiError::internal("internal server error").into_response()
}

/// Routes plus the full middleware stack.
///
/// Runtime order, outermost first: request id, panic recovery, trace, CORS,
/// timeout, body limit, router.
#[must_use]
pub fn build_app(config: &AppConfig, service: Arc<Service>, auth: AuthMode) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let mut router = rest::router(service, auth).merge(rest::health_router());

    router = router
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes));

    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        Duration::from_secs(config.request_timeout_seconds),
    ));

    router = router.layer(build_cors_layer(&config.cors_allow_origin));

    router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &Response<Body>, latency: Duration, span: &tracing::Span| {
                    let ms = latency.as_millis();
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", ms);
                    tracing::info!(
                        status = res.status().as_u16(),
                        latency_ms = ms,
                        "request completed"
                    );
                },
            ),
    );

    router = router.layer(CatchPanicLayer::custom(panic_response));
    router = router.layer(PropagateRequestIdLayer::new(request_id.clone()));
    router.layer(SetRequestIdLayer::new(request_id, MakeReqId))
}

/// Bind, serve until a shutdown signal, then drain for [`SHUTDOWN_GRACE`].
///
/// # Errors
/// Fails on backend setup, bind, or server errors.
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let auth = build_auth(config)?;
    let repo = build_store(config).await?;
    let service = Arc::new(Service::new(repo, config.preferences_config()));
    let app = build_app(config, service, auth);

    let listener = TcpListener::bind((config.server_host.as_str(), config.server_port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server_host, config.server_port
            )
        })?;
    tracing::info!(
        addr = %listener.local_addr()?,
        backend = ?config.store_backend,
        "HTTP server listening"
    );

    let stop = Arc::new(Notify::new());
    let mut server = tokio::spawn({
        let stop = Arc::clone(&stop);
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .await
        }
    });

    let signal = tokio::select! {
        joined = &mut server => {
            joined.context("server task failed")??;
            return Ok(());
        }
        signal = signals::wait_for_shutdown() => signal?,
    };

    tracing::info!(
        %signal,
        grace_secs = SHUTDOWN_GRACE.as_secs(),
        "shutdown requested; draining connections"
    );
    stop.notify_one();
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(joined) => joined.context("server task failed")??,
        Err(_) => tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "graceful shutdown timed out; dropping open connections"
        ),
    }
    tracing::info!("server stopped");
    Ok(())
}
