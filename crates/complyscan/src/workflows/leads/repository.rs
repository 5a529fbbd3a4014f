use super::super::scan::domain::CompanyId;
use super::super::scan::repository::RepositoryError;
use super::domain::{Lead, LeadId, LeadStatus};

/// Persistence port for leads. The one concurrency-sensitive operation is
/// `insert_lead`: implementations must enforce the one-lead-per-company
/// invariant atomically (unique constraint or compare-and-set on the company
/// key) and answer `Conflict` when it is violated.
pub trait LeadRepository: Send + Sync {
    fn insert_lead(&self, lead: Lead) -> Result<Lead, RepositoryError>;
    fn lead_for_company(&self, company_id: &CompanyId) -> Result<Option<Lead>, RepositoryError>;
    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError>;
    fn update_lead(&self, lead: Lead) -> Result<(), RepositoryError>;
    fn list_leads(&self, status: Option<LeadStatus>) -> Result<Vec<Lead>, RepositoryError>;
}
