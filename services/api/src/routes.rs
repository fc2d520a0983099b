use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use hse_portal::compliance::exams::exam_router;
use hse_portal::compliance::instructions::instruction_router;
use hse_portal::compliance::notices::notice_router;
use hse_portal::compliance::trainings::training_router;
use hse_portal::compliance::dashboard_router;
use hse_portal::directory::directory_router;
use hse_portal::store::PortalRepository;
use serde_json::json;

use crate::infra::{AppState, Portal};

/// Feature routers plus the operational endpoints. The caller resolver is installed for every
/// route so handlers can extract a [`hse_portal::access::Caller`].
pub(crate) fn with_portal_routes<S>(portal: &Portal<S>) -> Router
where
    S: PortalRepository + 'static,
{
    Router::new()
        .merge(directory_router(portal.directory.clone()))
        .merge(notice_router(portal.notices.clone()))
        .merge(training_router(portal.trainings.clone()))
        .merge(exam_router(portal.exams.clone()))
        .merge(instruction_router(portal.instructions.clone()))
        .merge(dashboard_router(portal.dashboard.clone()))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(portal.resolver.clone()))
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
