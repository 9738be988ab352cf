use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use recruit_intake::workflows::intake::{
    intake_router, AtsScorer, CandidateIntakeService, CandidateStore, Mailer, ResumeParser,
};

use crate::infra::AppState;

/// Intake surface plus the operational endpoints every deployment carries.
pub(crate) fn with_intake_routes<P, S, M, C>(
    service: Arc<CandidateIntakeService<P, S, M, C>>,
) -> axum::Router
where
    P: ResumeParser + 'static,
    S: AtsScorer + 'static,
    M: Mailer + 'static,
    C: CandidateStore + 'static,
{
    intake_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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
