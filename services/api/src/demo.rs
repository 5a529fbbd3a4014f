use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Args;

use complyscan::error::AppError;
use complyscan::workflows::leads::{LeadLifecycleManager, LeadScorePolicy, LeadStatus};
use complyscan::workflows::scan::{
    CollectorConfig, ComplianceAnalyzer, FetchError, FetchedPage, PageFetcher, RiskPolicy,
    ScanConfig, ScanOrchestrator, SiteCollector, StartScanRequest,
};

use crate::infra::{InMemoryLeadRepository, InMemoryScanRepository, LogNotificationPublisher};

const DEMO_HOME_PAGE: &str = r#"<html><body>
<h1>Acme Analytics</h1>
<p>Our machine learning platform scores your sales pipeline in real time.</p>
<p>We follow eu ai act transparency obligations for our models.</p>
<p>Processing rests on a legal basis of consent; retention is 12 months.</p>
<p>Cookie consent is collected via our cookie preferences banner.</p>
<p>All traffic is encrypted; we do not sell data. California notice: CCPA.</p>
</body></html>"#;

const DEMO_PRIVACY_PAGE: &str = r#"<html><body>
<h1>Privacy Policy</h1>
<p>Our legal basis for processing is consent or legitimate interest.</p>
<p>Data retention: personal data is retained for 12 months, then deleted.</p>
<p>Cookie consent: manage cookies via the cookie preferences panel.</p>
<p>We encrypt data in transit with TLS and apply strict security measures.</p>
<p>AI disclosure: we document our use of artificial intelligence, in line
with eu ai act transparency obligations.</p>
<p>California residents: we do not sell personal information (CCPA).</p>
</body></html>"#;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Domain label used for the canned website
    #[arg(long, default_value = "acme-analytics.example")]
    pub(crate) domain: String,
    /// Contact email recorded on the scan and resulting lead
    #[arg(long)]
    pub(crate) contact_email: Option<String>,
    /// Serve a fully compliant site instead of the default gap-ridden one
    #[arg(long)]
    pub(crate) compliant: bool,
}

/// Serves the demo site from memory so the command works offline.
struct CannedSiteFetcher {
    pages: HashMap<&'static str, &'static str>,
}

impl CannedSiteFetcher {
    fn new(compliant: bool) -> Self {
        let mut pages = HashMap::new();
        pages.insert("/", DEMO_HOME_PAGE);
        if compliant {
            pages.insert("/privacy", DEMO_PRIVACY_PAGE);
        }
        Self { pages }
    }
}

#[async_trait]
impl PageFetcher for CannedSiteFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let without_scheme = url.split("://").nth(1).unwrap_or(url);
        let path = without_scheme
            .find('/')
            .map(|index| &without_scheme[index..])
            .unwrap_or("/");

        match self.pages.get(path) {
            Some(body) => Ok(FetchedPage {
                status: 200,
                body: (*body).to_string(),
            }),
            None => Ok(FetchedPage {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        domain,
        contact_email,
        compliant,
    } = args;

    println!("Compliance scan demo");
    println!(
        "Target: {} ({})",
        domain,
        if compliant {
            "canned compliant site"
        } else {
            "canned site with compliance gaps"
        }
    );

    let repository = Arc::new(InMemoryScanRepository::default());
    let lead_repository = Arc::new(InMemoryLeadRepository::default());
    let manager = Arc::new(LeadLifecycleManager::new(
        lead_repository,
        LeadScorePolicy::default(),
    ));
    let orchestrator = ScanOrchestrator::new(
        repository,
        SiteCollector::new(
            CannedSiteFetcher::new(compliant),
            CollectorConfig {
                backoff_base: Duration::ZERO,
                ..CollectorConfig::default()
            },
        ),
        ComplianceAnalyzer::default(),
        RiskPolicy::default(),
        manager.clone(),
        Arc::new(LogNotificationPublisher),
        ScanConfig {
            probe_dns: false,
            overall_budget: Duration::from_secs(30),
        },
    );

    let scan_id = orchestrator.start_scan(StartScanRequest {
        domain,
        contact_email,
    })?;
    println!("Scan accepted: {}", scan_id.0);

    println!("\nProgress");
    let mut last_message = String::new();
    loop {
        let view = match orchestrator.progress(&scan_id) {
            Ok(view) => view,
            Err(err) => {
                println!("Progress unavailable: {err}");
                return Ok(());
            }
        };
        if view.message != last_message {
            println!("  [{:>3}%] {}: {}", view.progress, view.status, view.message);
            last_message = view.message.clone();
        }
        match view.status {
            "complete" => break,
            "failed" => {
                if let Some(failure) = view.error {
                    println!(
                        "\nScan failed ({}): {}",
                        failure.class.label(),
                        failure.message
                    );
                }
                return Ok(());
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }

    let results = match orchestrator.results(&scan_id) {
        Ok(results) => results,
        Err(err) => {
            println!("Results unavailable: {err}");
            return Ok(());
        }
    };

    println!("\nSummary: {}", results.summary);
    if let (Some(score), Some(level)) = (results.scan.risk_score, results.scan.risk_level) {
        println!("Risk score: {score:.1} / 10 ({})", level.label());
    }

    println!("\nJurisdictions");
    for (jurisdiction, assessment) in &results.scan.jurisdictions {
        println!(
            "  - {}: {:.1} / 10 {}",
            jurisdiction.label(),
            assessment.score,
            if assessment.compliant {
                "(compliant)"
            } else {
                "(non-compliant)"
            }
        );
    }

    if results.findings.is_empty() {
        println!("\nFindings: none");
    } else {
        println!("\nFindings");
        for finding in &results.findings {
            let detail = &finding.detail;
            println!(
                "  - [{}] {} ({}){}",
                detail.severity.label(),
                detail.title,
                detail.category.label(),
                if detail.is_blocking { " [blocking]" } else { "" }
            );
            if !detail.article_refs.is_empty() {
                println!("      refs: {}", detail.article_refs.join(", "));
            }
            for recommendation in &detail.recommendations {
                println!("      fix: {recommendation}");
            }
            println!(
                "      effort: {:?}, about {}",
                detail.fix_difficulty, detail.estimated_fix_time
            );
        }
    }

    println!("\nLead pipeline");
    let leads = manager.list(None)?;
    let Some(lead) = leads.first() else {
        println!("  No lead was derived from this scan.");
        return Ok(());
    };
    println!(
        "  Created {} (status {}, score {}/100)",
        lead.id.0,
        lead.status.label(),
        lead.score
    );

    let contacted = manager.set_status(&lead.id, LeadStatus::Contacted)?;
    println!(
        "  Moved to {} at {}",
        contacted.status.label(),
        contacted
            .contacted_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    );
    let noted = manager.add_note(&lead.id, "demo: sent compliance report".to_string())?;
    println!("  Notes: {}", noted.notes.join("; "));

    match serde_json::to_string_pretty(&noted) {
        Ok(json) => println!("\nLead payload:\n{json}"),
        Err(err) => println!("\nLead payload unavailable: {err}"),
    }

    Ok(())
}
