use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json, Router};
use serde_json::json;

use complyscan::workflows::leads::{lead_router, LeadLifecycleManager, LeadRepository};
use complyscan::workflows::scan::repository::{NotificationPublisher, ScanRepository};
use complyscan::workflows::scan::{scan_router, PageFetcher, ScanOrchestrator};

use crate::infra::AppState;

/// Compose the workflow routers with the operational endpoints.
pub(crate) fn with_workflow_routes<R, F, L, N>(
    orchestrator: ScanOrchestrator<R, F, L, N>,
    manager: Arc<LeadLifecycleManager<L>>,
) -> Router
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    scan_router(orchestrator)
        .merge(lead_router(manager))
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

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    use complyscan::workflows::leads::{LeadLifecycleManager, LeadScorePolicy};
    use complyscan::workflows::scan::{
        CollectorConfig, ComplianceAnalyzer, HttpPageFetcher, RiskPolicy, ScanConfig,
        ScanOrchestrator, SiteCollector,
    };

    use super::*;
    use crate::infra::{
        AppState, InMemoryLeadRepository, InMemoryScanRepository, LogNotificationPublisher,
    };

    fn test_app(ready: bool) -> Router {
        let repository = Arc::new(InMemoryScanRepository::default());
        let lead_repository = Arc::new(InMemoryLeadRepository::default());
        let manager = Arc::new(LeadLifecycleManager::new(
            lead_repository,
            LeadScorePolicy::default(),
        ));
        let fetcher =
            HttpPageFetcher::new(Duration::from_secs(1)).expect("client builds");
        let orchestrator = ScanOrchestrator::new(
            repository,
            SiteCollector::new(fetcher, CollectorConfig::default()),
            ComplianceAnalyzer::default(),
            RiskPolicy::default(),
            manager.clone(),
            Arc::new(LogNotificationPublisher),
            ScanConfig::default(),
        );

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(handle),
        };
        state.readiness.store(ready, Ordering::Release);

        with_workflow_routes(orchestrator, manager).layer(Extension(state))
    }

    #[tokio::test]
    async fn healthcheck_is_always_ok() {
        let app = test_app(false);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_the_flag() {
        let response = test_app(false)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = test_app(true)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_plain_text() {
        let response = test_app(true)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
