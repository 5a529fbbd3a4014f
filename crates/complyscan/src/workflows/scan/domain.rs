use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier wrapper for scanned organizations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Identifier wrapper for individual scan executions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanId(pub String);

/// Identifier wrapper for persisted compliance findings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingId(pub String);

/// Organization record keyed by its normalized domain. Created on first scan
/// and updated opportunistically; never deleted while scans reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub domain: String,
    pub display_name: String,
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// How a scan was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    Api,
    Scheduled,
}

impl ScanType {
    pub const fn label(self) -> &'static str {
        match self {
            ScanType::Api => "api",
            ScanType::Scheduled => "scheduled",
        }
    }
}

/// Lifecycle state of a scan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Queued,
    Scraping,
    Analyzing,
    Complete,
    Failed,
}

impl ScanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScanStatus::Queued => "queued",
            ScanStatus::Scraping => "scraping",
            ScanStatus::Analyzing => "analyzing",
            ScanStatus::Complete => "complete",
            ScanStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Complete | ScanStatus::Failed)
    }

    /// The only transitions the pipeline is allowed to make.
    pub const fn can_transition_to(self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Queued, ScanStatus::Scraping)
                | (ScanStatus::Queued, ScanStatus::Failed)
                | (ScanStatus::Scraping, ScanStatus::Analyzing)
                | (ScanStatus::Scraping, ScanStatus::Failed)
                | (ScanStatus::Analyzing, ScanStatus::Complete)
                | (ScanStatus::Analyzing, ScanStatus::Failed)
        )
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered severity scale shared by findings and issue counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Categorical bucket derived from the numeric risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Compliance topic a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    AiDisclosure,
    Gdpr,
    Ccpa,
    Consent,
    Security,
    AiAct,
}

impl FindingCategory {
    pub const fn label(self) -> &'static str {
        match self {
            FindingCategory::AiDisclosure => "ai_disclosure",
            FindingCategory::Gdpr => "gdpr",
            FindingCategory::Ccpa => "ccpa",
            FindingCategory::Consent => "consent",
            FindingCategory::Security => "security",
            FindingCategory::AiAct => "ai_act",
        }
    }
}

/// Regulatory regime each finding and sub-score is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    Gdpr,
    Ccpa,
    AiAct,
}

impl Jurisdiction {
    pub const ALL: [Jurisdiction; 3] = [Jurisdiction::Gdpr, Jurisdiction::Ccpa, Jurisdiction::AiAct];

    pub const fn label(self) -> &'static str {
        match self {
            Jurisdiction::Gdpr => "gdpr",
            Jurisdiction::Ccpa => "ccpa",
            Jurisdiction::AiAct => "ai_act",
        }
    }
}

/// Rough effort tag attached to each remediation recommendation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixDifficulty {
    Easy,
    Moderate,
    Hard,
}

/// Analyzer output for one failed check, before ids are stamped on.
///
/// Kept separate from [`Finding`] so analyzer determinism can be asserted
/// without id sequences getting in the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingDetail {
    pub category: FindingCategory,
    pub severity: Severity,
    pub jurisdiction: Jurisdiction,
    pub title: String,
    pub description: String,
    pub article_refs: Vec<String>,
    pub is_blocking: bool,
    pub recommendations: Vec<String>,
    pub fix_difficulty: FixDifficulty,
    pub estimated_fix_time: String,
}

/// Persisted compliance issue. Written once by the analyzing stage and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: FindingId,
    pub scan_id: ScanId,
    #[serde(flatten)]
    pub detail: FindingDetail,
}

/// Per-jurisdiction coverage score and compliance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionAssessment {
    pub score: f32,
    pub compliant: bool,
}

/// Finding totals bucketed by severity, materialized on scan completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl IssueCounts {
    pub fn tally<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        let mut counts = Self::default();
        for severity in severities {
            match severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
        }
        counts
    }

    pub const fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low
    }
}

/// Error classification retained on scans that reach `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    UnreachableDomain,
    CollectionFailed,
    Analysis,
    Timeout,
    Internal,
}

impl FailureClass {
    pub const fn label(self) -> &'static str {
        match self {
            FailureClass::UnreachableDomain => "unreachable_domain",
            FailureClass::CollectionFailed => "collection_failed",
            FailureClass::Analysis => "analysis",
            FailureClass::Timeout => "timeout",
            FailureClass::Internal => "internal",
        }
    }
}

/// Last error class and message recorded on a failed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub class: FailureClass,
    pub message: String,
}

/// One execution of the compliance pipeline. Owned exclusively by the
/// orchestrator until a terminal status is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: ScanId,
    pub company_id: CompanyId,
    pub status: ScanStatus,
    pub scan_type: ScanType,
    pub contact_email: Option<String>,
    pub progress: u8,
    pub message: String,
    pub risk_score: Option<f32>,
    pub risk_level: Option<RiskLevel>,
    pub jurisdictions: BTreeMap<Jurisdiction, JurisdictionAssessment>,
    pub issue_counts: IssueCounts,
    pub failure: Option<ScanFailure>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Raised when a caller asks for a transition the state machine forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid scan transition {from:?} -> {to:?}")]
pub struct InvalidScanTransition {
    pub from: ScanStatus,
    pub to: ScanStatus,
}

impl Scan {
    pub fn new(
        id: ScanId,
        company_id: CompanyId,
        scan_type: ScanType,
        contact_email: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            company_id,
            status: ScanStatus::Queued,
            scan_type,
            contact_email,
            progress: 0,
            message: "queued for processing".to_string(),
            risk_score: None,
            risk_level: None,
            jurisdictions: BTreeMap::new(),
            issue_counts: IssueCounts::default(),
            failure: None,
            created_at: now,
            completed_at: None,
        }
    }

    /// Transition-validating setter. Progress never decreases, terminal
    /// re-entry is a logged no-op so repeated completion attempts stay
    /// idempotent.
    pub fn advance(
        &mut self,
        next: ScanStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> Result<(), InvalidScanTransition> {
        if self.status.is_terminal() {
            warn!(
                scan_id = %self.id.0,
                current = self.status.label(),
                requested = next.label(),
                "ignoring transition out of terminal scan state"
            );
            return Ok(());
        }

        if !self.status.can_transition_to(next) {
            return Err(InvalidScanTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.progress = self.progress.max(progress);
        self.message = message.into();
        if next == ScanStatus::Complete {
            self.progress = 100;
        }
        Ok(())
    }

    /// Record a terminal failure with its error class. Keeps whatever
    /// progress was already reported.
    pub fn mark_failed(
        &mut self,
        class: FailureClass,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidScanTransition> {
        let message = message.into();
        self.advance(ScanStatus::Failed, self.progress, message.clone())?;
        if self.status == ScanStatus::Failed && self.failure.is_none() {
            self.failure = Some(ScanFailure { class, message });
            self.completed_at = Some(now);
        }
        Ok(())
    }
}
