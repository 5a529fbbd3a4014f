//! Compliance scan pipeline: domain validation, bounded page collection,
//! rule-based analysis, risk aggregation, and the orchestrating state
//! machine that ties the stages together.

pub mod analyzer;
pub mod collector;
pub mod domain;
pub mod orchestrator;
pub mod repository;
pub mod risk;
pub mod router;
pub mod validator;

#[cfg(test)]
mod tests;

pub use analyzer::{AnalysisError, AnalysisOutcome, AnalyzerConfig, ComplianceAnalyzer};
pub use collector::{
    CollectionFailed, CollectorConfig, FetchError, FetchedPage, HttpPageFetcher, PageBundle,
    PageFetcher, PageKind, SiteCollector,
};
pub use domain::{
    Company, CompanyId, FailureClass, Finding, FindingCategory, FindingDetail, FindingId,
    FixDifficulty, IssueCounts, Jurisdiction, JurisdictionAssessment, RiskLevel, Scan,
    ScanFailure, ScanId, ScanStatus, ScanType, Severity,
};
pub use orchestrator::{
    ProgressError, ResultsError, ScanConfig, ScanOrchestrator, ScanProgressView, ScanResultsView,
    StartScanError, StartScanRequest,
};
pub use repository::{
    NotificationError, NotificationPublisher, RepositoryError, ScanEvent, ScanNotice,
    ScanRepository,
};
pub use risk::{aggregate, RiskAssessment, RiskPolicy};
pub use router::scan_router;
pub use validator::{normalize_domain, probe_reachability, DomainValidationError};
