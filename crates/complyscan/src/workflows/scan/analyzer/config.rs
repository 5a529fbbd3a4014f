use super::super::collector::PageKind;
use super::super::domain::{FindingCategory, FixDifficulty, Jurisdiction, Severity};

/// Signal a check evaluates against the collected page bundle. Phrase
/// matching runs over the lower-cased visible-text corpus.
#[derive(Debug, Clone)]
pub enum CheckSignal {
    /// Fails when the page kind was never retrieved.
    PagePresent(PageKind),
    /// Fails when none of the phrases appear anywhere in the corpus.
    TextContainsAny(&'static [&'static str]),
    /// Fails when a topic is mentioned without any matching disclosure
    /// phrase. Passes vacuously when the topic never comes up.
    DisclosureForTopic {
        topic: &'static [&'static str],
        disclosure: &'static [&'static str],
    },
}

/// One entry in the compliance check table. The table is policy, not code:
/// deployments tune weights and phrasing without touching the analyzer.
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    pub id: &'static str,
    pub category: FindingCategory,
    pub jurisdiction: Jurisdiction,
    pub severity: Severity,
    pub weight: f32,
    pub is_blocking: bool,
    pub title: &'static str,
    pub description: &'static str,
    pub article_refs: &'static [&'static str],
    pub recommendations: &'static [&'static str],
    pub fix_difficulty: FixDifficulty,
    pub estimated_fix_time: &'static str,
    pub signal: CheckSignal,
}

/// Check table configuration for the analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub checks: Vec<CheckDefinition>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            checks: standard_checks(),
        }
    }
}

const AI_TOPIC_TERMS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "ai-powered",
    "ai assistant",
    "our ai",
    "chatbot",
    "automated decision",
];

/// The default check set inferred from GDPR, CCPA, and AI-Act obligations.
pub fn standard_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition {
            id: "privacy-policy-page",
            category: FindingCategory::Gdpr,
            jurisdiction: Jurisdiction::Gdpr,
            severity: Severity::High,
            weight: 3.0,
            is_blocking: true,
            title: "No privacy policy page found",
            description: "Neither /privacy nor /privacy-policy returned a retrievable page, so \
                          visitors have no accessible statement of how their data is processed.",
            article_refs: &["GDPR Art. 12", "GDPR Art. 13"],
            recommendations: &[
                "Publish a privacy policy page at a conventional path such as /privacy",
                "Link the policy from every page footer",
            ],
            fix_difficulty: FixDifficulty::Moderate,
            estimated_fix_time: "1-2 days",
            signal: CheckSignal::PagePresent(PageKind::PrivacyPolicy),
        },
        CheckDefinition {
            id: "legal-basis",
            category: FindingCategory::Gdpr,
            jurisdiction: Jurisdiction::Gdpr,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "No legal basis for processing stated",
            description: "The collected policy text never names a lawful basis (consent, \
                          contract, legitimate interest) for processing personal data.",
            article_refs: &["GDPR Art. 6"],
            recommendations: &[
                "State the lawful basis relied on for each processing purpose",
            ],
            fix_difficulty: FixDifficulty::Easy,
            estimated_fix_time: "half a day",
            signal: CheckSignal::TextContainsAny(&[
                "legal basis",
                "lawful basis",
                "legitimate interest",
            ]),
        },
        CheckDefinition {
            id: "data-retention",
            category: FindingCategory::Gdpr,
            jurisdiction: Jurisdiction::Gdpr,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "No data-retention statement detected",
            description: "No text describes how long personal data is kept or when it is deleted.",
            article_refs: &["GDPR Art. 5(1)(e)"],
            recommendations: &[
                "Document retention periods per data category",
                "Describe the deletion or anonymization process",
            ],
            fix_difficulty: FixDifficulty::Easy,
            estimated_fix_time: "half a day",
            signal: CheckSignal::TextContainsAny(&[
                "retention",
                "retain your",
                "how long we keep",
            ]),
        },
        CheckDefinition {
            id: "cookie-consent",
            category: FindingCategory::Consent,
            jurisdiction: Jurisdiction::Gdpr,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "No cookie-consent language detected",
            description: "No cookie banner or consent-management wording was found on the \
                          collected pages.",
            article_refs: &["GDPR Art. 7", "ePrivacy Directive Art. 5(3)"],
            recommendations: &[
                "Add a consent banner gating non-essential cookies",
                "Offer a cookie preferences control",
            ],
            fix_difficulty: FixDifficulty::Moderate,
            estimated_fix_time: "1 day",
            signal: CheckSignal::TextContainsAny(&[
                "cookie consent",
                "cookie banner",
                "manage cookies",
                "cookie preferences",
            ]),
        },
        CheckDefinition {
            id: "security-statement",
            category: FindingCategory::Security,
            jurisdiction: Jurisdiction::Gdpr,
            severity: Severity::Low,
            weight: 1.0,
            is_blocking: false,
            title: "No security measures described",
            description: "The site text never mentions encryption or organizational security \
                          measures protecting personal data.",
            article_refs: &["GDPR Art. 32"],
            recommendations: &[
                "Describe technical and organizational security measures in the privacy policy",
            ],
            fix_difficulty: FixDifficulty::Easy,
            estimated_fix_time: "2 hours",
            signal: CheckSignal::TextContainsAny(&[
                "encrypt",
                "security measures",
                "tls",
                "ssl",
            ]),
        },
        CheckDefinition {
            id: "ccpa-opt-out",
            category: FindingCategory::Ccpa,
            jurisdiction: Jurisdiction::Ccpa,
            severity: Severity::High,
            weight: 3.0,
            is_blocking: false,
            title: "No Do-Not-Sell or opt-out language for CCPA",
            description: "California visitors are given no way to opt out of the sale or \
                          sharing of their personal information.",
            article_refs: &["CCPA \u{a7}1798.120"],
            recommendations: &[
                "Add a 'Do Not Sell or Share My Personal Information' link",
                "Honor opt-out preference signals such as GPC",
            ],
            fix_difficulty: FixDifficulty::Moderate,
            estimated_fix_time: "2-3 days",
            signal: CheckSignal::TextContainsAny(&[
                "do not sell",
                "opt-out of sale",
                "opt out of the sale",
            ]),
        },
        CheckDefinition {
            id: "ccpa-notice",
            category: FindingCategory::Ccpa,
            jurisdiction: Jurisdiction::Ccpa,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "No California privacy notice detected",
            description: "No CCPA-specific notice describing California consumer rights was \
                          found in the collected text.",
            article_refs: &["CCPA \u{a7}1798.100"],
            recommendations: &[
                "Add a California-residents section to the privacy policy",
            ],
            fix_difficulty: FixDifficulty::Easy,
            estimated_fix_time: "1 day",
            signal: CheckSignal::TextContainsAny(&[
                "california",
                "ccpa",
                "california consumer privacy",
            ]),
        },
        CheckDefinition {
            id: "ai-disclosure",
            category: FindingCategory::AiDisclosure,
            jurisdiction: Jurisdiction::AiAct,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "AI use undisclosed",
            description: "The site advertises AI-driven functionality but publishes no \
                          AI-specific disclosure explaining where automated systems are used.",
            article_refs: &["EU AI Act Art. 50"],
            recommendations: &[
                "Publish an AI disclosure describing which features are AI-driven",
                "Tell users when they are interacting with an automated system",
            ],
            fix_difficulty: FixDifficulty::Easy,
            estimated_fix_time: "1 day",
            signal: CheckSignal::DisclosureForTopic {
                topic: AI_TOPIC_TERMS,
                disclosure: &[
                    "ai disclosure",
                    "use of artificial intelligence",
                    "interacting with an ai",
                    "automated decision-making policy",
                ],
            },
        },
        CheckDefinition {
            id: "ai-act-transparency",
            category: FindingCategory::AiAct,
            jurisdiction: Jurisdiction::AiAct,
            severity: Severity::Medium,
            weight: 2.0,
            is_blocking: false,
            title: "No AI-Act transparency statement",
            description: "AI functionality is mentioned without any reference to EU AI Act \
                          transparency obligations or risk classification.",
            article_refs: &["EU AI Act Art. 13", "EU AI Act Art. 52"],
            recommendations: &[
                "Classify the AI system under the EU AI Act risk tiers",
                "Document the applicable transparency obligations",
            ],
            fix_difficulty: FixDifficulty::Moderate,
            estimated_fix_time: "3-5 days",
            signal: CheckSignal::DisclosureForTopic {
                topic: AI_TOPIC_TERMS,
                disclosure: &[
                    "eu ai act",
                    "ai act",
                    "high-risk ai",
                    "transparency obligations",
                ],
            },
        },
    ]
}
