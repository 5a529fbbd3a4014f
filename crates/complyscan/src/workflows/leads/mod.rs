//! Sales lead lifecycle derived from completed compliance scans.

pub mod domain;
pub mod manager;
pub mod repository;
pub mod router;

pub use domain::{InvalidLeadTransition, Lead, LeadId, LeadStatus};
pub use manager::{lead_score, LeadError, LeadLifecycleManager, LeadScorePolicy};
pub use repository::LeadRepository;
pub use router::lead_router;
