use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;

use complyscan::config::AppConfig;
use complyscan::error::AppError;
use complyscan::telemetry;
use complyscan::workflows::leads::{LeadLifecycleManager, LeadScorePolicy};
use complyscan::workflows::scan::{
    CollectorConfig, ComplianceAnalyzer, HttpPageFetcher, RiskPolicy, ScanConfig,
    ScanOrchestrator, SiteCollector,
};

use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryLeadRepository, InMemoryScanRepository, LogNotificationPublisher,
};
use crate::routes::with_workflow_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryScanRepository::default());
    let lead_repository = Arc::new(InMemoryLeadRepository::default());
    let manager = Arc::new(LeadLifecycleManager::new(
        lead_repository,
        LeadScorePolicy::default(),
    ));

    let fetcher = HttpPageFetcher::new(config.scan.fetch_timeout())?;
    let collector = SiteCollector::new(
        fetcher,
        CollectorConfig {
            page_budget: config.scan.page_budget,
            ..CollectorConfig::default()
        },
    );
    let orchestrator = ScanOrchestrator::new(
        repository,
        collector,
        ComplianceAnalyzer::default(),
        RiskPolicy::default(),
        manager.clone(),
        Arc::new(LogNotificationPublisher),
        ScanConfig {
            probe_dns: config.scan.probe_dns,
            overall_budget: config.scan.overall_budget(),
        },
    );

    let app = with_workflow_routes(orchestrator, manager)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compliance scan service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
