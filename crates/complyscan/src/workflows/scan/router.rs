use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::super::leads::repository::LeadRepository;
use super::collector::PageFetcher;
use super::domain::ScanId;
use super::orchestrator::{
    ProgressError, ResultsError, ScanOrchestrator, StartScanError, StartScanRequest,
};
use super::repository::{NotificationPublisher, ScanRepository};

/// Router builder exposing the scan pipeline endpoints.
pub fn scan_router<R, F, L, N>(orchestrator: ScanOrchestrator<R, F, L, N>) -> Router
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/scans", post(start_scan_handler::<R, F, L, N>))
        .route(
            "/api/v1/scans/:scan_id/progress",
            get(progress_handler::<R, F, L, N>),
        )
        .route(
            "/api/v1/scans/:scan_id/results",
            get(results_handler::<R, F, L, N>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn start_scan_handler<R, F, L, N>(
    State(orchestrator): State<ScanOrchestrator<R, F, L, N>>,
    axum::Json(request): axum::Json<StartScanRequest>,
) -> Response
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match orchestrator.start_scan(request) {
        Ok(scan_id) => {
            let payload = json!({ "scan_id": scan_id.0, "status": "queued" });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(StartScanError::InvalidDomain(error)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn progress_handler<R, F, L, N>(
    State(orchestrator): State<ScanOrchestrator<R, F, L, N>>,
    Path(scan_id): Path<String>,
) -> Response
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match orchestrator.progress(&ScanId(scan_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(ProgressError::NotFound(id)) => {
            let payload = json!({ "error": format!("scan {id} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn results_handler<R, F, L, N>(
    State(orchestrator): State<ScanOrchestrator<R, F, L, N>>,
    Path(scan_id): Path<String>,
) -> Response
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match orchestrator.results(&ScanId(scan_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(ResultsError::NotFound(id)) => {
            let payload = json!({ "error": format!("scan {id} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(ResultsError::NotReady { scan_id, status }) => {
            // Keep polling: the scan has not reached a readable terminal state.
            let payload = json!({
                "error": format!("scan {scan_id} is not complete"),
                "status": status.label(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
