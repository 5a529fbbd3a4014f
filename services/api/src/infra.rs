use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use complyscan::workflows::leads::domain::Lead;
use complyscan::workflows::leads::{LeadId, LeadRepository, LeadStatus};
use complyscan::workflows::scan::repository::{
    NotificationError, NotificationPublisher, RepositoryError, ScanNotice, ScanRepository,
};
use complyscan::workflows::scan::{Company, CompanyId, Finding, Scan, ScanId};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local scan store. Companies are keyed by their normalized domain,
/// which makes the upsert naturally race-free under the single mutex.
#[derive(Default)]
pub(crate) struct InMemoryScanRepository {
    companies: Mutex<HashMap<String, Company>>,
    scans: Mutex<HashMap<String, Scan>>,
    findings: Mutex<Vec<Finding>>,
    company_sequence: AtomicU64,
}

impl ScanRepository for InMemoryScanRepository {
    fn upsert_company(&self, domain: &str, display_name: &str) -> Result<Company, RepositoryError> {
        let mut guard = self.companies.lock().expect("company mutex poisoned");
        if let Some(existing) = guard.get(domain) {
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
        guard.insert(domain.to_string(), company.clone());
        Ok(company)
    }

    fn fetch_company(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let guard = self.companies.lock().expect("company mutex poisoned");
        Ok(guard.values().find(|company| &company.id == id).cloned())
    }

    fn insert_scan(&self, scan: Scan) -> Result<Scan, RepositoryError> {
        let mut guard = self.scans.lock().expect("scan mutex poisoned");
        if guard.contains_key(&scan.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(scan.id.0.clone(), scan.clone());
        Ok(scan)
    }

    fn update_scan(&self, scan: Scan) -> Result<(), RepositoryError> {
        let mut guard = self.scans.lock().expect("scan mutex poisoned");
        if !guard.contains_key(&scan.id.0) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(scan.id.0.clone(), scan);
        Ok(())
    }

    fn fetch_scan(&self, id: &ScanId) -> Result<Option<Scan>, RepositoryError> {
        let guard = self.scans.lock().expect("scan mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn insert_findings(&self, findings: Vec<Finding>) -> Result<(), RepositoryError> {
        self.findings
            .lock()
            .expect("finding mutex poisoned")
            .extend(findings);
        Ok(())
    }

    fn findings_for_scan(&self, scan_id: &ScanId) -> Result<Vec<Finding>, RepositoryError> {
        let guard = self.findings.lock().expect("finding mutex poisoned");
        Ok(guard
            .iter()
            .filter(|finding| &finding.scan_id == scan_id)
            .cloned()
            .collect())
    }
}

/// Process-local lead store. The one-lead-per-company invariant is enforced
/// by inserting under a single mutex keyed on the company id.
#[derive(Default)]
pub(crate) struct InMemoryLeadRepository {
    leads: Mutex<HashMap<String, Lead>>,
}

impl LeadRepository for InMemoryLeadRepository {
    fn insert_lead(&self, lead: Lead) -> Result<Lead, RepositoryError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        if guard.contains_key(&lead.company_id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(lead.company_id.0.clone(), lead.clone());
        Ok(lead)
    }

    fn lead_for_company(&self, company_id: &CompanyId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard.get(&company_id.0).cloned())
    }

    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard.values().find(|lead| &lead.id == id).cloned())
    }

    fn update_lead(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut guard = self.leads.lock().expect("lead mutex poisoned");
        guard.insert(lead.company_id.0.clone(), lead);
        Ok(())
    }

    fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, RepositoryError> {
        let guard = self.leads.lock().expect("lead mutex poisoned");
        Ok(guard
            .values()
            .filter(|lead| status.map_or(true, |wanted| lead.status == wanted))
            .cloned()
            .collect())
    }
}

/// Notification adapter that writes terminal scan events to the log. Swap in
/// a mail or webhook publisher for real outreach.
#[derive(Default)]
pub(crate) struct LogNotificationPublisher;

impl NotificationPublisher for LogNotificationPublisher {
    fn publish(&self, notice: ScanNotice) -> Result<(), NotificationError> {
        info!(
            scan_id = %notice.scan_id.0,
            domain = %notice.domain,
            event = notice.event.label(),
            contact = notice.contact_email.as_deref().unwrap_or("-"),
            "scan notification"
        );
        Ok(())
    }
}
