use crate::access::{guard_layer, AccessGuard};
use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;
use workpass::passes::{pass_router, Clock, PassRepository, WorkPassService};

/// Pass routes behind the access guard, plus the unguarded welcome and probe endpoints.
pub(crate) fn with_pass_routes<R>(
    service: Arc<WorkPassService<R>>,
    clock: Arc<dyn Clock>,
    guard: Arc<AccessGuard>,
) -> Router
where
    R: PassRepository + 'static,
{
    pass_router(service, clock)
        .layer(middleware::from_fn_with_state(guard, guard_layer))
        .route("/", get(welcome))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn welcome() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Work Pass Extension API" }))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
