use serde::{Deserialize, Serialize};

use super::domain::{Company, CompanyId, Finding, Scan, ScanId};

/// Persistence port for companies, scans, and findings so the orchestrator
/// can be exercised without a live backend.
pub trait ScanRepository: Send + Sync {
    /// Insert-or-fetch a company keyed by its normalized domain. The domain
    /// is a unique key; concurrent upserts for the same domain must resolve
    /// to one row.
    fn upsert_company(&self, domain: &str, display_name: &str) -> Result<Company, RepositoryError>;
    fn fetch_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn insert_scan(&self, scan: Scan) -> Result<Scan, RepositoryError>;
    fn update_scan(&self, scan: Scan) -> Result<(), RepositoryError>;
    fn fetch_scan(&self, id: &ScanId) -> Result<Option<Scan>, RepositoryError>;
    /// Findings are append-only; all writes for a scan land before the scan
    /// turns `complete`.
    fn insert_findings(&self, findings: Vec<Finding>) -> Result<(), RepositoryError>;
    fn findings_for_scan(&self, scan_id: &ScanId) -> Result<Vec<Finding>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Terminal scan event forwarded to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEvent {
    Completed,
    Failed,
}

impl ScanEvent {
    pub const fn label(self) -> &'static str {
        match self {
            ScanEvent::Completed => "completed",
            ScanEvent::Failed => "failed",
        }
    }
}

/// Best-effort notification payload emitted when a scan reaches a terminal
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanNotice {
    pub scan_id: ScanId,
    pub domain: String,
    pub event: ScanEvent,
    pub contact_email: Option<String>,
}

/// Outbound notification port. Failures here are logged and swallowed; they
/// never fail the scan.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notice: ScanNotice) -> Result<(), NotificationError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
