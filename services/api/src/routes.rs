use std::sync::Arc;

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::json;

use staffvote::scheduler::{JobRunOutcome, SchedulerError};
use staffvote::workflows::attendance::{LateEvent, LateEventOutcome};
use staffvote::workflows::governance::{
    ballot_router, GovernanceStore, NotificationOutbox, TriggerReport,
};

use crate::infra::{AppState, Ballots};

pub(crate) fn router(ballots: Arc<Ballots>) -> axum::Router {
    ballot_router(ballots)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/admin/jobs", axum::routing::get(job_status_endpoint))
        .route(
            "/api/v1/admin/jobs/:name/run",
            axum::routing::post(run_job_endpoint),
        )
        .route(
            "/api/v1/admin/checks/promotions",
            axum::routing::post(promotion_check_endpoint),
        )
        .route(
            "/api/v1/admin/checks/demotions",
            axum::routing::post(demotion_check_endpoint),
        )
        .route(
            "/api/v1/admin/campaigns/process-expired",
            axum::routing::post(process_expired_endpoint),
        )
        .route(
            "/api/v1/admin/attendance/reset",
            axum::routing::post(attendance_reset_endpoint),
        )
        .route(
            "/api/v1/admin/system",
            axum::routing::get(system_status_endpoint),
        )
        .route(
            "/api/v1/attendance/late-events",
            axum::routing::post(late_event_endpoint),
        )
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

pub(crate) async fn job_status_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    Json(state.scheduler.statuses())
}

pub(crate) async fn run_job_endpoint(
    Extension(state): Extension<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.scheduler.run_now(&name) {
        Ok(JobRunOutcome::Completed(report)) => (
            StatusCode::OK,
            Json(json!({
                "job": name,
                "outcome": "completed",
                "items": report.items,
                "detail": report.detail,
            })),
        ),
        Ok(JobRunOutcome::Failed(error)) => (
            StatusCode::OK,
            Json(json!({ "job": name, "outcome": "failed", "error": error })),
        ),
        Ok(JobRunOutcome::Skipped) => (
            StatusCode::CONFLICT,
            Json(json!({ "job": name, "outcome": "skipped", "reason": "previous run still in flight" })),
        ),
        Err(SchedulerError::UnknownJob(name)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no job registered under '{name}'") })),
        ),
    }
}

fn trigger_response(report: TriggerReport) -> Json<serde_json::Value> {
    Json(json!({
        "examined": report.examined,
        "created": report.created.iter().map(|id| id.0.clone()).collect::<Vec<_>>(),
        "skipped": report.skipped,
    }))
}

pub(crate) async fn promotion_check_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    match state.trigger.check_promotions(Utc::now()) {
        Ok(report) => (StatusCode::OK, trigger_response(report)),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}

pub(crate) async fn demotion_check_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    match state.trigger.check_demotions(Utc::now()) {
        Ok(report) => (StatusCode::OK, trigger_response(report)),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}

pub(crate) async fn process_expired_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    match state.resolution.process_expired(Utc::now()) {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "closed": report.closed.iter().map(|id| id.0.clone()).collect::<Vec<_>>(),
                "passed": report.passed,
                "failed": report.failed,
                "executed": report.executed,
            })),
        ),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}

pub(crate) async fn attendance_reset_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    match state.aggregator.reset_current_period(Utc::now()) {
        Ok(rows) => (StatusCode::OK, Json(json!({ "rows_reset": rows }))),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}

pub(crate) async fn system_status_endpoint(
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    let now = Utc::now();
    let open = state.store.open_campaigns().map(|list| list.len());
    let backlog = state.store.expired_active(now).map(|list| list.len());
    let outbox_pending = state.outbox.pending_count();

    match (open, backlog, outbox_pending) {
        (Ok(open), Ok(backlog), Ok(outbox_pending)) => {
            let healthy = backlog <= state.config.expiry_backlog_threshold;
            (
                StatusCode::OK,
                Json(json!({
                    "open_campaigns": open,
                    "expired_unprocessed": backlog,
                    "outbox_pending": outbox_pending,
                    "healthy": healthy,
                })),
            )
        }
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "store unavailable" })),
        ),
    }
}

pub(crate) async fn late_event_endpoint(
    Extension(state): Extension<AppState>,
    Json(event): Json<LateEvent>,
) -> impl IntoResponse {
    match state.aggregator.record_late_event(&event) {
        Ok(LateEventOutcome::Recorded { punishment_due }) => (
            StatusCode::ACCEPTED,
            Json(json!({ "outcome": "recorded", "punishment_due": punishment_due })),
        ),
        Ok(LateEventOutcome::Duplicate) => (
            StatusCode::OK,
            Json(json!({ "outcome": "duplicate" })),
        ),
        Ok(LateEventOutcome::NotLate) => (
            StatusCode::OK,
            Json(json!({ "outcome": "ignored" })),
        ),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}
