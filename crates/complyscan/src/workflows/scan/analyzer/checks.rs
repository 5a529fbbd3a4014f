use super::super::collector::PageBundle;
use super::super::domain::FindingDetail;
use super::config::{CheckDefinition, CheckSignal};

/// Evaluate one check against the bundle and its lower-cased corpus.
/// Pure and deterministic: identical input text always yields the same
/// verdict.
pub(crate) fn check_passes(check: &CheckDefinition, bundle: &PageBundle, corpus: &str) -> bool {
    match &check.signal {
        CheckSignal::PagePresent(kind) => bundle.has_page(*kind),
        CheckSignal::TextContainsAny(phrases) => contains_any(corpus, phrases),
        CheckSignal::DisclosureForTopic { topic, disclosure } => {
            !contains_any(corpus, topic) || contains_any(corpus, disclosure)
        }
    }
}

fn contains_any(corpus: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| corpus.contains(phrase))
}

/// Materialize the finding recorded when a check fails.
pub(crate) fn finding_for(check: &CheckDefinition) -> FindingDetail {
    FindingDetail {
        category: check.category,
        severity: check.severity,
        jurisdiction: check.jurisdiction,
        title: check.title.to_string(),
        description: check.description.to_string(),
        article_refs: check.article_refs.iter().map(|s| s.to_string()).collect(),
        is_blocking: check.is_blocking,
        recommendations: check
            .recommendations
            .iter()
            .map(|s| s.to_string())
            .collect(),
        fix_difficulty: check.fix_difficulty,
        estimated_fix_time: check.estimated_fix_time.to_string(),
    }
}
