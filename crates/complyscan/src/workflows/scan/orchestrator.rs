use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::super::leads::manager::LeadLifecycleManager;
use super::super::leads::repository::LeadRepository;
use super::analyzer::ComplianceAnalyzer;
use super::collector::{PageFetcher, SiteCollector};
use super::domain::{
    Company, FailureClass, Finding, FindingId, IssueCounts, Scan, ScanFailure, ScanId, ScanStatus,
    ScanType,
};
use super::repository::{
    NotificationPublisher, RepositoryError, ScanEvent, ScanNotice, ScanRepository,
};
use super::risk::{aggregate, RiskPolicy};
use super::validator::{normalize_domain, probe_reachability, DomainValidationError};

const PROGRESS_SCRAPING_START: u8 = 10;
const PROGRESS_ANALYZING_START: u8 = 60;

static SCAN_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static FINDING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_scan_id() -> ScanId {
    let id = SCAN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScanId(format!("scan-{id:06}"))
}

fn next_finding_id() -> FindingId {
    let id = FINDING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    FindingId(format!("fnd-{id:06}"))
}

/// Pipeline-level knobs.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Advisory DNS probe before scraping; may be disabled under load.
    pub probe_dns: bool,
    /// Wall-clock budget for one scan; exceeding it forces `failed` with a
    /// timeout class instead of hanging.
    pub overall_budget: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            probe_dns: true,
            overall_budget: Duration::from_secs(120),
        }
    }
}

/// Inbound request to start a scan.
#[derive(Debug, Clone, Deserialize)]
pub struct StartScanRequest {
    pub domain: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Error surfaced synchronously by `start_scan`, before any async work.
#[derive(Debug, thiserror::Error)]
pub enum StartScanError {
    #[error(transparent)]
    InvalidDomain(#[from] DomainValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Error raised by the progress read path.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("scan {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Error raised by the results read path.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("scan {0} not found")]
    NotFound(String),
    #[error("scan {scan_id} is not complete (status {status})")]
    NotReady { scan_id: String, status: ScanStatus },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Latest known state of a scan; always servable, never blocks on the
/// pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgressView {
    pub scan_id: ScanId,
    pub status: &'static str,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScanFailure>,
}

/// Full results payload for a completed scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResultsView {
    pub scan: Scan,
    pub company: Company,
    pub findings: Vec<Finding>,
    pub findings_by_category: BTreeMap<&'static str, Vec<FindingId>>,
    pub issue_counts: IssueCounts,
    pub summary: String,
}

struct OrchestratorInner<R, F, L, N> {
    repository: Arc<R>,
    collector: SiteCollector<F>,
    analyzer: ComplianceAnalyzer,
    risk_policy: RiskPolicy,
    leads: Arc<LeadLifecycleManager<L>>,
    notifier: Arc<N>,
    config: ScanConfig,
}

/// Owns the scan lifecycle: validates, persists, drives collector and
/// analyzer as a spawned task, and exposes poll-friendly reads. Cheap to
/// clone; all clones share one inner state.
pub struct ScanOrchestrator<R, F, L, N> {
    inner: Arc<OrchestratorInner<R, F, L, N>>,
}

impl<R, F, L, N> Clone for ScanOrchestrator<R, F, L, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, F, L, N> ScanOrchestrator<R, F, L, N>
where
    R: ScanRepository + 'static,
    F: PageFetcher + 'static,
    L: LeadRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        collector: SiteCollector<F>,
        analyzer: ComplianceAnalyzer,
        risk_policy: RiskPolicy,
        leads: Arc<LeadLifecycleManager<L>>,
        notifier: Arc<N>,
        config: ScanConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                repository,
                collector,
                analyzer,
                risk_policy,
                leads,
                notifier,
                config,
            }),
        }
    }

    /// Validate, persist a queued scan, and kick off the pipeline. Returns
    /// the scan id immediately; all later failures are observed via polling,
    /// never thrown back to this caller.
    pub fn start_scan(&self, request: StartScanRequest) -> Result<ScanId, StartScanError> {
        let domain = normalize_domain(&request.domain)?;
        let company = self.inner.repository.upsert_company(&domain, &domain)?;

        let scan = Scan::new(
            next_scan_id(),
            company.id.clone(),
            ScanType::Api,
            request.contact_email,
            Utc::now(),
        );
        let scan = self.inner.repository.insert_scan(scan)?;
        let scan_id = scan.id.clone();

        info!(scan_id = %scan_id.0, %domain, "scan accepted");

        let worker = self.clone();
        let task_scan_id = scan_id.clone();
        tokio::spawn(async move {
            worker.run_pipeline(task_scan_id, domain).await;
        });

        Ok(scan_id)
    }

    /// Latest persisted state; concurrent with any in-flight pipeline.
    pub fn progress(&self, scan_id: &ScanId) -> Result<ScanProgressView, ProgressError> {
        let scan = self
            .inner
            .repository
            .fetch_scan(scan_id)?
            .ok_or_else(|| ProgressError::NotFound(scan_id.0.clone()))?;

        Ok(ScanProgressView {
            scan_id: scan.id.clone(),
            status: scan.status.label(),
            progress: scan.progress,
            message: scan.message.clone(),
            error: scan.failure,
        })
    }

    /// Full results; answers `NotReady` until the scan is `complete`, at
    /// which point the finding set is guaranteed fully populated.
    pub fn results(&self, scan_id: &ScanId) -> Result<ScanResultsView, ResultsError> {
        let scan = self
            .inner
            .repository
            .fetch_scan(scan_id)?
            .ok_or_else(|| ResultsError::NotFound(scan_id.0.clone()))?;

        if scan.status != ScanStatus::Complete {
            return Err(ResultsError::NotReady {
                scan_id: scan_id.0.clone(),
                status: scan.status,
            });
        }

        let company = self
            .inner
            .repository
            .fetch_company(&scan.company_id)?
            .ok_or_else(|| {
                RepositoryError::Unavailable(format!(
                    "company {} missing for scan {}",
                    scan.company_id.0, scan.id.0
                ))
            })?;
        let findings = self.inner.repository.findings_for_scan(scan_id)?;

        let mut findings_by_category: BTreeMap<&'static str, Vec<FindingId>> = BTreeMap::new();
        for finding in &findings {
            findings_by_category
                .entry(finding.detail.category.label())
                .or_default()
                .push(finding.id.clone());
        }

        let summary = scan_summary(&scan, &findings);

        Ok(ScanResultsView {
            issue_counts: scan.issue_counts,
            scan,
            company,
            findings,
            findings_by_category,
            summary,
        })
    }

    async fn run_pipeline(self, scan_id: ScanId, domain: String) {
        let budget = self.inner.config.overall_budget;
        match tokio::time::timeout(budget, self.execute(&scan_id, &domain)).await {
            Ok(Ok(())) => {}
            Ok(Err(failure)) => self.finish_failed(&scan_id, &domain, failure),
            Err(_elapsed) => self.finish_failed(
                &scan_id,
                &domain,
                ScanFailure {
                    class: FailureClass::Timeout,
                    message: format!("scan exceeded the {}s wall-clock budget", budget.as_secs()),
                },
            ),
        }
    }

    async fn execute(&self, scan_id: &ScanId, domain: &str) -> Result<(), ScanFailure> {
        if self.inner.config.probe_dns {
            if let Err(err) = probe_reachability(domain).await {
                return Err(ScanFailure {
                    class: FailureClass::UnreachableDomain,
                    message: err.to_string(),
                });
            }
        }

        self.transition(
            scan_id,
            ScanStatus::Scraping,
            PROGRESS_SCRAPING_START,
            format!("fetching pages from {domain}"),
        )?;

        let bundle = self
            .inner
            .collector
            .collect(domain, |fetched, budget| {
                let span = (PROGRESS_ANALYZING_START - PROGRESS_SCRAPING_START - 5) as usize;
                let progress =
                    PROGRESS_SCRAPING_START + ((span * fetched) / budget.max(1)) as u8;
                if let Err(err) = self.update_progress(
                    scan_id,
                    progress,
                    format!("probed {fetched}/{budget} candidate pages"),
                ) {
                    warn!(scan_id = %scan_id.0, error = %err, "progress update dropped");
                }
            })
            .await
            .map_err(|err| ScanFailure {
                class: FailureClass::CollectionFailed,
                message: err.to_string(),
            })?;

        self.transition(
            scan_id,
            ScanStatus::Analyzing,
            PROGRESS_ANALYZING_START,
            format!(
                "analyzing {} page(s) of policy text ({} bytes)",
                bundle.pages.len(),
                bundle.total_bytes
            ),
        )?;

        let outcome = self.inner.analyzer.analyze(&bundle).map_err(|err| ScanFailure {
            class: FailureClass::Analysis,
            message: err.to_string(),
        })?;

        let assessment = aggregate(
            &outcome.findings,
            &outcome.jurisdiction_scores,
            &self.inner.risk_policy,
        );

        let findings: Vec<Finding> = outcome
            .findings
            .into_iter()
            .map(|detail| Finding {
                id: next_finding_id(),
                scan_id: scan_id.clone(),
                detail,
            })
            .collect();
        let finding_count = findings.len();

        // All finding writes land before the scan turns complete, so any
        // observer of `complete` sees the full set.
        self.inner
            .repository
            .insert_findings(findings)
            .map_err(internal_failure)?;

        let mut scan = self.fetch_scan(scan_id)?;
        scan.risk_score = Some(assessment.overall_score);
        scan.risk_level = Some(assessment.level);
        scan.jurisdictions = assessment.jurisdictions;
        scan.issue_counts = assessment.issue_counts;
        scan.advance(
            ScanStatus::Complete,
            100,
            format!(
                "scan complete: {} finding(s), {} risk",
                finding_count,
                assessment.level.label()
            ),
        )
        .map_err(|err| ScanFailure {
            class: FailureClass::Internal,
            message: err.to_string(),
        })?;
        scan.completed_at = Some(Utc::now());
        self.inner
            .repository
            .update_scan(scan.clone())
            .map_err(internal_failure)?;

        match self.inner.repository.fetch_company(&scan.company_id) {
            Ok(Some(company)) => match self.inner.leads.record_completed_scan(&scan, &company) {
                Ok(lead) => {
                    info!(scan_id = %scan_id.0, lead_id = %lead.id.0, score = lead.score, "lead upserted");
                }
                Err(err) => {
                    error!(scan_id = %scan_id.0, error = %err, "lead upsert failed");
                }
            },
            Ok(None) => error!(scan_id = %scan_id.0, "company vanished before lead upsert"),
            Err(err) => error!(scan_id = %scan_id.0, error = %err, "company lookup failed"),
        }

        self.notify(scan_id, domain, ScanEvent::Completed, scan.contact_email.clone());
        Ok(())
    }

    fn finish_failed(&self, scan_id: &ScanId, domain: &str, failure: ScanFailure) {
        warn!(
            scan_id = %scan_id.0,
            class = failure.class.label(),
            message = %failure.message,
            "scan failed"
        );

        match self.fetch_scan(scan_id) {
            Ok(mut scan) => {
                if let Err(err) = scan.mark_failed(failure.class, failure.message, Utc::now()) {
                    error!(scan_id = %scan_id.0, error = %err, "could not record scan failure");
                    return;
                }
                let contact_email = scan.contact_email.clone();
                if let Err(err) = self.inner.repository.update_scan(scan) {
                    error!(scan_id = %scan_id.0, error = %err, "failed scan state not persisted");
                    return;
                }
                self.notify(scan_id, domain, ScanEvent::Failed, contact_email);
            }
            Err(err) => {
                error!(scan_id = %scan_id.0, error = %err.message, "scan record unavailable during failure handling");
            }
        }
    }

    fn transition(
        &self,
        scan_id: &ScanId,
        status: ScanStatus,
        progress: u8,
        message: String,
    ) -> Result<(), ScanFailure> {
        let mut scan = self.fetch_scan(scan_id)?;
        scan.advance(status, progress, message).map_err(|err| ScanFailure {
            class: FailureClass::Internal,
            message: err.to_string(),
        })?;
        self.inner
            .repository
            .update_scan(scan)
            .map_err(internal_failure)
    }

    fn update_progress(
        &self,
        scan_id: &ScanId,
        progress: u8,
        message: String,
    ) -> Result<(), RepositoryError> {
        let mut scan = match self.inner.repository.fetch_scan(scan_id)? {
            Some(scan) => scan,
            None => return Err(RepositoryError::NotFound),
        };
        scan.progress = scan.progress.max(progress);
        scan.message = message;
        self.inner.repository.update_scan(scan)
    }

    fn fetch_scan(&self, scan_id: &ScanId) -> Result<Scan, ScanFailure> {
        self.inner
            .repository
            .fetch_scan(scan_id)
            .map_err(internal_failure)?
            .ok_or_else(|| ScanFailure {
                class: FailureClass::Internal,
                message: format!("scan {} missing from repository", scan_id.0),
            })
    }

    fn notify(
        &self,
        scan_id: &ScanId,
        domain: &str,
        event: ScanEvent,
        contact_email: Option<String>,
    ) {
        let notice = ScanNotice {
            scan_id: scan_id.clone(),
            domain: domain.to_string(),
            event,
            contact_email,
        };
        if let Err(err) = self.inner.notifier.publish(notice) {
            warn!(scan_id = %scan_id.0, event = event.label(), error = %err, "notification dropped");
        }
    }
}

fn internal_failure(err: RepositoryError) -> ScanFailure {
    ScanFailure {
        class: FailureClass::Internal,
        message: err.to_string(),
    }
}

/// One-line summary shown on dashboards and in notification mails.
pub fn scan_summary(scan: &Scan, findings: &[Finding]) -> String {
    let blocking = findings.iter().filter(|f| f.detail.is_blocking).count();
    match scan.risk_level {
        Some(level) if findings.is_empty() => {
            format!("no compliance issues detected; risk level {}", level.label())
        }
        Some(level) if blocking > 0 => format!(
            "{} risk: {} finding(s), {} blocking launch",
            level.label(),
            findings.len(),
            blocking
        ),
        Some(level) => format!("{} risk: {} finding(s)", level.label(), findings.len()),
        None => "scan has no recorded assessment".to_string(),
    }
}
