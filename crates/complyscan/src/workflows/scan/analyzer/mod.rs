//! Rule-based compliance analysis over collected page text.
//!
//! Every check is evaluated from a fixed table, so re-running the analyzer on
//! identical text reproduces byte-identical findings. The idempotence contract
//! lives at the check level, not at any underlying classifier.

mod checks;
mod config;

pub use config::{standard_checks, AnalyzerConfig, CheckDefinition, CheckSignal};

use std::collections::BTreeMap;

use serde::Serialize;

use super::collector::PageBundle;
use super::domain::{FindingDetail, Jurisdiction};

/// Raised when the analyzing stage cannot run at all.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no page text available for analysis")]
    EmptyBundle,
}

/// Findings plus per-jurisdiction coverage sub-scores in [0, 10].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub findings: Vec<FindingDetail>,
    pub jurisdiction_scores: BTreeMap<Jurisdiction, f32>,
    pub checks_evaluated: usize,
    pub pages_analyzed: usize,
}

/// Stateless evaluator applying the check table to a page bundle.
pub struct ComplianceAnalyzer {
    config: AnalyzerConfig,
}

impl Default for ComplianceAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl ComplianceAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, bundle: &PageBundle) -> Result<AnalysisOutcome, AnalysisError> {
        if bundle.pages.is_empty() {
            return Err(AnalysisError::EmptyBundle);
        }

        let corpus = bundle.corpus();
        let mut findings = Vec::new();
        let mut passed_weight: BTreeMap<Jurisdiction, f32> = BTreeMap::new();
        let mut total_weight: BTreeMap<Jurisdiction, f32> = BTreeMap::new();

        for check in &self.config.checks {
            let passed = checks::check_passes(check, bundle, &corpus);
            *total_weight.entry(check.jurisdiction).or_default() += check.weight;
            if passed {
                *passed_weight.entry(check.jurisdiction).or_default() += check.weight;
            } else {
                findings.push(checks::finding_for(check));
            }
        }

        // A jurisdiction with no checks configured has no signal against it.
        let mut jurisdiction_scores = BTreeMap::new();
        for jurisdiction in Jurisdiction::ALL {
            let total = total_weight.get(&jurisdiction).copied().unwrap_or(0.0);
            let score = if total > 0.0 {
                let passed = passed_weight.get(&jurisdiction).copied().unwrap_or(0.0);
                10.0 * passed / total
            } else {
                10.0
            };
            jurisdiction_scores.insert(jurisdiction, score);
        }

        Ok(AnalysisOutcome {
            findings,
            jurisdiction_scores,
            checks_evaluated: self.config.checks.len(),
            pages_analyzed: bundle.pages.len(),
        })
    }
}
