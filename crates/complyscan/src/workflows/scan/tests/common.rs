use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::workflows::leads::manager::{LeadLifecycleManager, LeadScorePolicy};
use crate::workflows::leads::repository::LeadRepository;
use crate::workflows::leads::{Lead, LeadId, LeadStatus};
use crate::workflows::scan::analyzer::ComplianceAnalyzer;
use crate::workflows::scan::collector::{
    CollectedPage, CollectorConfig, FetchError, FetchedPage, PageBundle, PageFetcher,
    SiteCollector,
};
use crate::workflows::scan::domain::{Company, CompanyId, Finding, Scan, ScanId};
use crate::workflows::scan::orchestrator::{
    ScanConfig, ScanOrchestrator, ScanProgressView,
};
use crate::workflows::scan::repository::{
    NotificationError, NotificationPublisher, RepositoryError, ScanNotice, ScanRepository,
};
use crate::workflows::scan::risk::RiskPolicy;
use crate::workflows::scan::PageKind;

/// Page that satisfies every default check: GDPR/CCPA wording present and no
/// AI topic mentioned, so the AI checks pass vacuously.
pub(super) const COMPLIANT_PRIVACY_HTML: &str = r#"<html><body>
<h1>Privacy Policy</h1>
<p>Our legal basis for processing is consent or legitimate interest.</p>
<p>Data retention: we retain your data for 12 months, then delete it.</p>
<p>Cookie consent: manage cookies via the cookie preferences panel.</p>
<p>We encrypt data in transit with TLS and apply strict security measures.</p>
<p>California residents: we do not sell personal information (CCPA).</p>
</body></html>"#;

/// Home page for an undisclosed-AI vendor: machine learning is advertised,
/// the AI Act is referenced, every textual GDPR/CCPA signal is present, but
/// there is no AI disclosure and no privacy policy page anywhere on the site.
pub(super) const NONCOMPLIANT_HOME_HTML: &str = r#"<html><body>
<h1>Acme Analytics</h1>
<p>Our machine learning platform scores your pipeline in real time.</p>
<p>We follow eu ai act transparency obligations for our models.</p>
<p>Processing rests on a legal basis of consent; retention is 12 months.</p>
<p>Cookie consent is collected via our cookie preferences banner.</p>
<p>All traffic is encrypted; we do not sell data. California notice: CCPA.</p>
</body></html>"#;

#[derive(Debug, Clone)]
pub(super) enum Scripted {
    Page(u16, &'static str),
    Timeout,
    Transport,
    Hang,
}

/// Deterministic [`PageFetcher`] replaying scripted responses per path. The
/// last entry of a script repeats; unscripted paths answer 404.
#[derive(Default)]
pub(super) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    hits: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub(super) fn script(self, path: &str, responses: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .expect("scripts mutex poisoned")
            .insert(path.to_string(), responses.into());
        self
    }

    pub(super) fn with_page(self, path: &str, body: &'static str) -> Self {
        self.script(path, vec![Scripted::Page(200, body)])
    }

    pub(super) fn hits_for(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits mutex poisoned")
            .iter()
            .filter(|hit| hit.as_str() == path)
            .count()
    }
}

fn path_of(url: &str) -> String {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    match without_scheme.find('/') {
        Some(index) => without_scheme[index..].to_string(),
        None => "/".to_string(),
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let path = path_of(url);
        self.hits
            .lock()
            .expect("hits mutex poisoned")
            .push(path.clone());

        let scripted = {
            let mut scripts = self.scripts.lock().expect("scripts mutex poisoned");
            match scripts.get_mut(&path) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match scripted {
            Some(Scripted::Page(status, body)) => Ok(FetchedPage {
                status,
                body: body.to_string(),
            }),
            Some(Scripted::Timeout) => Err(FetchError::Timeout),
            Some(Scripted::Transport) => Err(FetchError::Transport("connection reset".to_string())),
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Err(FetchError::Timeout)
            }
            None => Ok(FetchedPage {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

#[derive(Default)]
pub(super) struct MemoryScanRepository {
    companies: Mutex<HashMap<String, Company>>,
    scans: Mutex<HashMap<String, Scan>>,
    findings: Mutex<Vec<Finding>>,
    company_sequence: AtomicU64,
}

impl ScanRepository for MemoryScanRepository {
    fn upsert_company(&self, domain: &str, display_name: &str) -> Result<Company, RepositoryError> {
        let mut companies = self.companies.lock().expect("companies mutex poisoned");
        if let Some(existing) = companies.get(domain) {
            return Ok(existing.clone());
        }
        let id = self.company_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let company = Company {
            id: CompanyId(format!("co-{id:06}")),
            domain: domain.to_string(),
            display_name: display_name.to_string(),
            industry: None,
            created_at: Utc::now(),
        };
        companies.insert(domain.to_string(), company.clone());
        Ok(company)
    }

    fn fetch_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self
            .companies
            .lock()
            .expect("companies mutex poisoned")
            .values()
            .find(|company| &company.id == id)
            .cloned())
    }

    fn insert_scan(&self, scan: Scan) -> Result<Scan, RepositoryError> {
        let mut scans = self.scans.lock().expect("scans mutex poisoned");
        if scans.contains_key(&scan.id.0) {
            return Err(RepositoryError::Conflict);
        }
        scans.insert(scan.id.0.clone(), scan.clone());
        Ok(scan)
    }

    fn update_scan(&self, scan: Scan) -> Result<(), RepositoryError> {
        let mut scans = self.scans.lock().expect("scans mutex poisoned");
        if !scans.contains_key(&scan.id.0) {
            return Err(RepositoryError::NotFound);
        }
        scans.insert(scan.id.0.clone(), scan);
        Ok(())
    }

    fn fetch_scan(&self, id: &ScanId) -> Result<Option<Scan>, RepositoryError> {
        Ok(self
            .scans
            .lock()
            .expect("scans mutex poisoned")
            .get(&id.0)
            .cloned())
    }

    fn insert_findings(&self, findings: Vec<Finding>) -> Result<(), RepositoryError> {
        self.findings
            .lock()
            .expect("findings mutex poisoned")
            .extend(findings);
        Ok(())
    }

    fn findings_for_scan(&self, scan_id: &ScanId) -> Result<Vec<Finding>, RepositoryError> {
        Ok(self
            .findings
            .lock()
            .expect("findings mutex poisoned")
            .iter()
            .filter(|finding| &finding.scan_id == scan_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryLeadRepository {
    leads: Mutex<HashMap<String, Lead>>,
}

impl LeadRepository for MemoryLeadRepository {
    fn insert_lead(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut leads = self.leads.lock().expect("leads mutex poisoned");
        if leads.contains_key(&lead.company_id.0) {
            return Err(RepositoryError::Conflict);
        }
        leads.insert(lead.company_id.0.clone(), lead.clone());
        Ok(lead)
    }

    fn lead_for_company(&self, company_id: &CompanyId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .expect("leads mutex poisoned")
            .get(&company_id.0)
            .cloned())
    }

    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .expect("leads mutex poisoned")
            .values()
            .find(|lead| &lead.id == id)
            .cloned())
    }

    fn update_lead(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.lock().expect("leads mutex poisoned");
        leads.insert(lead.company_id.0.clone(), lead);
        Ok(())
    }

    fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, RepositoryError> {
        Ok(self
            .leads
            .lock()
            .expect("leads mutex poisoned")
            .values()
            .filter(|lead| status.map_or(true, |wanted| lead.status == wanted))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<ScanNotice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn fail_next_publishes(&self) {
        self.failing.store(true, Ordering::Relaxed);
    }

    pub(super) fn notices(&self) -> Vec<ScanNotice> {
        self.notices.lock().expect("notices mutex poisoned").clone()
    }
}

impl NotificationPublisher for RecordingNotifier {
    fn publish(&self, notice: ScanNotice) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(NotificationError::Transport("smtp offline".to_string()));
        }
        self.notices
            .lock()
            .expect("notices mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) type TestOrchestrator = ScanOrchestrator<
    MemoryScanRepository,
    Arc<ScriptedFetcher>,
    MemoryLeadRepository,
    RecordingNotifier,
>;

pub(super) struct Harness {
    pub(super) orchestrator: TestOrchestrator,
    pub(super) repository: Arc<MemoryScanRepository>,
    pub(super) leads: Arc<MemoryLeadRepository>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

pub(super) fn collector_config() -> CollectorConfig {
    CollectorConfig {
        page_budget: 5,
        max_retries: 2,
        backoff_base: Duration::ZERO,
    }
}

pub(super) fn harness(fetcher: Arc<ScriptedFetcher>) -> Harness {
    harness_with(
        fetcher,
        ScanConfig {
            probe_dns: false,
            overall_budget: Duration::from_secs(5),
        },
    )
}

pub(super) fn harness_with(fetcher: Arc<ScriptedFetcher>, config: ScanConfig) -> Harness {
    let repository = Arc::new(MemoryScanRepository::default());
    let leads_repository = Arc::new(MemoryLeadRepository::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let leads = Arc::new(LeadLifecycleManager::new(
        leads_repository.clone(),
        LeadScorePolicy::default(),
    ));

    let orchestrator = ScanOrchestrator::new(
        repository.clone(),
        SiteCollector::new(fetcher, collector_config()),
        ComplianceAnalyzer::default(),
        RiskPolicy::default(),
        leads,
        notifier.clone(),
        config,
    );

    Harness {
        orchestrator,
        repository,
        leads: leads_repository,
        notifier,
    }
}

pub(super) async fn wait_for_terminal(
    orchestrator: &TestOrchestrator,
    scan_id: &ScanId,
) -> ScanProgressView {
    for _ in 0..500 {
        let view = orchestrator.progress(scan_id).expect("progress readable");
        if view.status == "complete" || view.status == "failed" {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("scan {} never reached a terminal state", scan_id.0);
}

pub(super) fn bundle(domain: &str, pages: Vec<(PageKind, &str)>) -> PageBundle {
    let total_bytes = pages.iter().map(|(_, text)| text.len()).sum();
    PageBundle {
        domain: domain.to_string(),
        pages: pages
            .into_iter()
            .map(|(kind, text)| CollectedPage {
                kind,
                url: format!("https://{domain}/"),
                text: text.to_string(),
            })
            .collect(),
        total_bytes,
        duration_ms: 0,
    }
}
