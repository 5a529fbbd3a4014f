//! Pure aggregation of findings into an overall risk assessment.

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{
    FindingDetail, IssueCounts, Jurisdiction, JurisdictionAssessment, RiskLevel, Severity,
};

/// Scoring policy: severity weights, the ordered level threshold table, and
/// the per-jurisdiction compliance bar. These are deployment policy, not
/// business logic, so tests can assert boundaries precisely.
#[derive(Debug, Clone)]
pub struct RiskPolicy {
    pub critical_weight: f32,
    pub high_weight: f32,
    pub medium_weight: f32,
    pub low_weight: f32,
    pub score_cap: f32,
    /// Descending `(minimum score, level)` pairs; anything below the last
    /// entry is low.
    pub thresholds: Vec<(f32, RiskLevel)>,
    pub jurisdiction_bar: f32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            critical_weight: 6.0,
            high_weight: 4.0,
            medium_weight: 1.5,
            low_weight: 0.5,
            score_cap: 10.0,
            thresholds: vec![
                (8.0, RiskLevel::Critical),
                (5.0, RiskLevel::High),
                (2.0, RiskLevel::Medium),
            ],
            jurisdiction_bar: 6.0,
        }
    }
}

impl RiskPolicy {
    pub fn severity_weight(&self, severity: Severity) -> f32 {
        match severity {
            Severity::Critical => self.critical_weight,
            Severity::High => self.high_weight,
            Severity::Medium => self.medium_weight,
            Severity::Low => self.low_weight,
        }
    }

    pub fn level_for(&self, score: f32) -> RiskLevel {
        for (minimum, level) in &self.thresholds {
            if score >= *minimum {
                return *level;
            }
        }
        RiskLevel::Low
    }
}

/// Aggregated view consumed by the orchestrator at completion.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub overall_score: f32,
    pub level: RiskLevel,
    pub jurisdictions: BTreeMap<Jurisdiction, JurisdictionAssessment>,
    pub issue_counts: IssueCounts,
}

/// Total over all inputs: the empty findings list yields score 0, level low,
/// and every jurisdiction compliant. Monotonic: adding a finding never
/// decreases the overall score.
pub fn aggregate(
    findings: &[FindingDetail],
    sub_scores: &BTreeMap<Jurisdiction, f32>,
    policy: &RiskPolicy,
) -> RiskAssessment {
    let raw: f32 = findings
        .iter()
        .map(|finding| policy.severity_weight(finding.severity))
        .sum();
    let overall_score = raw.min(policy.score_cap);
    let level = policy.level_for(overall_score);

    let mut jurisdictions = BTreeMap::new();
    for jurisdiction in Jurisdiction::ALL {
        let score = sub_scores.get(&jurisdiction).copied().unwrap_or(10.0);
        let has_severe_finding = findings.iter().any(|finding| {
            finding.jurisdiction == jurisdiction && finding.severity >= Severity::High
        });
        jurisdictions.insert(
            jurisdiction,
            JurisdictionAssessment {
                score,
                compliant: !has_severe_finding && score > policy.jurisdiction_bar,
            },
        );
    }

    RiskAssessment {
        overall_score,
        level,
        jurisdictions,
        issue_counts: IssueCounts::tally(findings.iter().map(|finding| finding.severity)),
    }
}
