use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use super::super::scan::domain::{Company, CompanyId, Scan};
use super::super::scan::repository::RepositoryError;
use super::domain::{InvalidLeadTransition, Lead, LeadId, LeadStatus};
use super::repository::LeadRepository;

static LEAD_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_lead_id() -> LeadId {
    let id = LEAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LeadId(format!("lead-{id:06}"))
}

/// Deterministic lead-score inputs. The score is always recomputed from
/// (risk, engagement) rather than incremented in place, so replaying history
/// is idempotent.
#[derive(Debug, Clone)]
pub struct LeadScorePolicy {
    /// Multiplier applied to the 0-10 risk score; higher risk means higher
    /// commercial urgency.
    pub risk_weight: f32,
    /// Points per recorded scan, capped at `scan_cap` scans.
    pub scan_weight: u32,
    pub scan_cap: u32,
    /// Bonus for having a reachable contact.
    pub email_bonus: u32,
}

impl Default for LeadScorePolicy {
    fn default() -> Self {
        Self {
            risk_weight: 6.0,
            scan_weight: 6,
            scan_cap: 5,
            email_bonus: 10,
        }
    }
}

/// Compute the 0-100 lead score from risk and engagement signals.
pub fn lead_score(
    risk_score: f32,
    total_scans: u32,
    has_contact_email: bool,
    policy: &LeadScorePolicy,
) -> u8 {
    let risk = (risk_score.clamp(0.0, 10.0) * policy.risk_weight).round() as u32;
    let engagement = total_scans.min(policy.scan_cap) * policy.scan_weight;
    let contact = if has_contact_email {
        policy.email_bonus
    } else {
        0
    };
    (risk + engagement + contact).min(100) as u8
}

/// Error raised by lead lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("lead not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidLeadTransition),
    #[error("lead upsert for company {0} raced and the retry failed")]
    ConcurrencyConflict(String),
}

/// Derives and maintains one sales lead per scanned company.
pub struct LeadLifecycleManager<L> {
    repository: Arc<L>,
    policy: LeadScorePolicy,
    upsert_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<L: LeadRepository> LeadLifecycleManager<L> {
    pub fn new(repository: Arc<L>, policy: LeadScorePolicy) -> Self {
        Self {
            repository,
            policy,
            upsert_locks: Mutex::new(HashMap::new()),
        }
    }

    fn upsert_lock(&self, company_id: &CompanyId) -> Arc<Mutex<()>> {
        let mut locks = self
            .upsert_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(company_id.0.clone()).or_default().clone()
    }

    /// Upsert the company's lead from a completed scan. A lost insert race is
    /// retried once by folding the scan into the winner's row.
    pub fn record_completed_scan(&self, scan: &Scan, company: &Company) -> Result<Lead, LeadError> {
        // Single writer per company key: the read-modify-write below would
        // otherwise drop scan counts when completions land together.
        let company_lock = self.upsert_lock(&company.id);
        let _serialized = company_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Utc::now();

        if let Some(mut lead) = self.repository.lead_for_company(&company.id)? {
            self.apply_scan(&mut lead, scan);
            self.repository.update_lead(lead.clone())?;
            return Ok(lead);
        }

        let mut lead = Lead {
            id: next_lead_id(),
            company_id: company.id.clone(),
            latest_scan_id: scan.id.clone(),
            status: LeadStatus::New,
            score: 0,
            contact_email: scan.contact_email.clone(),
            contact_name: None,
            first_scan_at: now,
            last_scan_at: now,
            total_scans: 1,
            contacted_at: None,
            converted_at: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        lead.score = lead_score(
            scan.risk_score.unwrap_or(0.0),
            lead.total_scans,
            lead.contact_email.is_some(),
            &self.policy,
        );

        match self.repository.insert_lead(lead) {
            Ok(lead) => {
                info!(lead_id = %lead.id.0, company = %company.domain, "lead created from scan");
                Ok(lead)
            }
            Err(RepositoryError::Conflict) => {
                warn!(company = %company.domain, "lead insert raced; folding scan into existing lead");
                let mut lead = self
                    .repository
                    .lead_for_company(&company.id)?
                    .ok_or_else(|| LeadError::ConcurrencyConflict(company.domain.clone()))?;
                self.apply_scan(&mut lead, scan);
                self.repository.update_lead(lead.clone())?;
                Ok(lead)
            }
            Err(other) => Err(other.into()),
        }
    }

    fn apply_scan(&self, lead: &mut Lead, scan: &Scan) {
        let now = Utc::now();
        lead.latest_scan_id = scan.id.clone();
        lead.last_scan_at = now;
        lead.total_scans += 1;
        if lead.contact_email.is_none() {
            lead.contact_email = scan.contact_email.clone();
        }
        lead.score = lead_score(
            scan.risk_score.unwrap_or(0.0),
            lead.total_scans,
            lead.contact_email.is_some(),
            &self.policy,
        );
        lead.updated_at = now;
    }

    /// Operator-driven status move through the pipeline.
    pub fn set_status(&self, lead_id: &LeadId, status: LeadStatus) -> Result<Lead, LeadError> {
        let mut lead = self
            .repository
            .fetch_lead(lead_id)?
            .ok_or(LeadError::NotFound)?;
        lead.set_status(status, Utc::now())?;
        self.repository.update_lead(lead.clone())?;
        Ok(lead)
    }

    pub fn add_note(&self, lead_id: &LeadId, note: String) -> Result<Lead, LeadError> {
        let mut lead = self
            .repository
            .fetch_lead(lead_id)?
            .ok_or(LeadError::NotFound)?;
        lead.notes.push(note);
        lead.updated_at = Utc::now();
        self.repository.update_lead(lead.clone())?;
        Ok(lead)
    }

    pub fn get(&self, lead_id: &LeadId) -> Result<Lead, LeadError> {
        self.repository
            .fetch_lead(lead_id)?
            .ok_or(LeadError::NotFound)
    }

    /// Leads sorted by most recent scan activity.
    pub fn list(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, LeadError> {
        let mut leads = self.repository.list_leads(status)?;
        leads.sort_by(|a, b| b.last_scan_at.cmp(&a.last_scan_at));
        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::super::super::scan::domain::{
        Company, CompanyId, Scan, ScanId, ScanStatus, ScanType,
    };
    use super::*;

    #[derive(Default)]
    struct MemoryLeads {
        inner: Mutex<HashMap<String, Lead>>,
        fail_first_insert: Mutex<Option<Lead>>,
    }

    impl LeadRepository for MemoryLeads {
        fn insert_lead(&self, lead: Lead) -> Result<Lead, RepositoryError> {
            // Simulates losing an upsert race: the configured winner lands
            // first and the caller's insert conflicts.
            if let Some(winner) = self.fail_first_insert.lock().expect("lock").take() {
                let mut guard = self.inner.lock().expect("lock");
                guard.insert(winner.company_id.0.clone(), winner);
                return Err(RepositoryError::Conflict);
            }
            let mut guard = self.inner.lock().expect("lock");
            if guard.contains_key(&lead.company_id.0) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(lead.company_id.0.clone(), lead.clone());
            Ok(lead)
        }

        fn lead_for_company(&self, company_id: &CompanyId) -> Result<Option<Lead>, RepositoryError> {
            Ok(self.inner.lock().expect("lock").get(&company_id.0).cloned())
        }

        fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .expect("lock")
                .values()
                .find(|lead| &lead.id == id)
                .cloned())
        }

        fn update_lead(&self, lead: Lead) -> Result<(), RepositoryError> {
            let mut guard = self.inner.lock().expect("lock");
            guard.insert(lead.company_id.0.clone(), lead);
            Ok(())
        }

        fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, RepositoryError> {
            Ok(self
                .inner
                .lock()
                .expect("lock")
                .values()
                .filter(|lead| status.map_or(true, |wanted| lead.status == wanted))
                .cloned()
                .collect())
        }
    }

    fn company() -> Company {
        Company {
            id: CompanyId("co-000001".to_string()),
            domain: "example.com".to_string(),
            display_name: "example.com".to_string(),
            industry: None,
            created_at: Utc::now(),
        }
    }

    fn completed_scan(id: &str, risk: f32, email: Option<&str>) -> Scan {
        let mut scan = Scan::new(
            ScanId(id.to_string()),
            CompanyId("co-000001".to_string()),
            ScanType::Api,
            email.map(str::to_string),
            Utc::now(),
        );
        scan.status = ScanStatus::Complete;
        scan.risk_score = Some(risk);
        scan
    }

    fn manager(repository: Arc<MemoryLeads>) -> LeadLifecycleManager<MemoryLeads> {
        LeadLifecycleManager::new(repository, LeadScorePolicy::default())
    }

    #[test]
    fn score_formula_is_deterministic_and_capped() {
        let policy = LeadScorePolicy::default();
        assert_eq!(lead_score(0.0, 1, false, &policy), 6);
        assert_eq!(lead_score(5.5, 1, true, &policy), 49);
        assert_eq!(lead_score(5.5, 1, true, &policy), 49);
        assert_eq!(lead_score(10.0, 10, true, &policy), 100, "score is capped");
    }

    #[test]
    fn first_completed_scan_creates_a_new_lead() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let lead = manager
            .record_completed_scan(&completed_scan("scan-1", 0.0, None), &company())
            .expect("lead created");

        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.total_scans, 1);
        assert_eq!(lead.score, 6, "single scan, no contact email: engagement only");
    }

    #[test]
    fn repeat_scan_updates_the_existing_lead() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let first = manager
            .record_completed_scan(&completed_scan("scan-1", 2.0, None), &company())
            .expect("lead created");
        let second = manager
            .record_completed_scan(
                &completed_scan("scan-2", 4.0, Some("ops@example.com")),
                &company(),
            )
            .expect("lead updated");

        assert_eq!(first.id, second.id, "no duplicate lead row");
        assert_eq!(second.total_scans, 2);
        assert_eq!(second.latest_scan_id.0, "scan-2");
        assert_eq!(second.contact_email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn lost_insert_race_folds_into_the_winning_lead() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let mut winner = Lead {
            id: LeadId("lead-race".to_string()),
            company_id: CompanyId("co-000001".to_string()),
            latest_scan_id: ScanId("scan-0".to_string()),
            status: LeadStatus::New,
            score: 10,
            contact_email: None,
            contact_name: None,
            first_scan_at: Utc::now(),
            last_scan_at: Utc::now(),
            total_scans: 1,
            contacted_at: None,
            converted_at: None,
            notes: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        winner.score = lead_score(3.0, 1, false, &LeadScorePolicy::default());
        *repository.fail_first_insert.lock().expect("lock") = Some(winner);

        let lead = manager
            .record_completed_scan(&completed_scan("scan-2", 3.0, None), &company())
            .expect("race resolves to one row");

        assert_eq!(lead.id.0, "lead-race");
        assert_eq!(lead.total_scans, 2);
        let all = repository.list_leads(None).expect("list");
        assert_eq!(all.len(), 1, "exactly one lead per company");
    }

    #[test]
    fn simultaneous_completions_never_drop_scan_counts() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = Arc::new(manager(repository.clone()));

        manager
            .record_completed_scan(&completed_scan("scan-0", 2.0, None), &company())
            .expect("seed lead");

        let workers: Vec<_> = (1..=16)
            .map(|n| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    manager
                        .record_completed_scan(&completed_scan(&format!("scan-{n}"), 2.0, None), &company())
                        .expect("update applies")
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker finishes");
        }

        let lead = repository
            .lead_for_company(&CompanyId("co-000001".to_string()))
            .expect("readable")
            .expect("lead present");
        assert_eq!(lead.total_scans, 17, "every completion is counted");
    }

    #[test]
    fn contacted_at_is_set_once_and_backward_moves_are_rejected() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let lead = manager
            .record_completed_scan(&completed_scan("scan-1", 0.0, None), &company())
            .expect("lead created");

        let contacted = manager
            .set_status(&lead.id, LeadStatus::Contacted)
            .expect("new -> contacted");
        let contacted_at = contacted.contacted_at.expect("timestamp populated");

        let responded = manager
            .set_status(&lead.id, LeadStatus::Responded)
            .expect("contacted -> responded");
        assert_eq!(responded.contacted_at, Some(contacted_at));

        match manager.set_status(&lead.id, LeadStatus::Contacted) {
            Err(LeadError::InvalidTransition(err)) => {
                assert_eq!(err.from, LeadStatus::Responded);
                assert_eq!(err.to, LeadStatus::Contacted);
            }
            other => panic!("expected rejected backward move, got {other:?}"),
        }
    }

    #[test]
    fn converted_at_populates_on_first_conversion() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let lead = manager
            .record_completed_scan(&completed_scan("scan-1", 0.0, None), &company())
            .expect("lead created");
        let converted = manager
            .set_status(&lead.id, LeadStatus::Converted)
            .expect("new -> converted");
        assert!(converted.converted_at.is_some());

        match manager.set_status(&lead.id, LeadStatus::Lost) {
            Err(LeadError::InvalidTransition(_)) => {}
            other => panic!("converted is absorbing, got {other:?}"),
        }
    }

    #[test]
    fn notes_append_and_listing_filters_by_status() {
        let repository = Arc::new(MemoryLeads::default());
        let manager = manager(repository.clone());

        let lead = manager
            .record_completed_scan(&completed_scan("scan-1", 0.0, None), &company())
            .expect("lead created");
        manager
            .add_note(&lead.id, "left a voicemail".to_string())
            .expect("note added");
        let lead = manager.get(&lead.id).expect("lead present");
        assert_eq!(lead.notes, vec!["left a voicemail".to_string()]);

        assert_eq!(manager.list(Some(LeadStatus::New)).expect("list").len(), 1);
        assert!(manager
            .list(Some(LeadStatus::Contacted))
            .expect("list")
            .is_empty());
    }
}
