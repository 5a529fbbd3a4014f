use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::scan::domain::{CompanyId, ScanId};

/// Identifier wrapper for sales leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Ordered CRM pipeline with two absorbing ends (`converted`, `lost`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Responded,
    Qualified,
    MeetingScheduled,
    ProposalSent,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Responded => "responded",
            LeadStatus::Qualified => "qualified",
            LeadStatus::MeetingScheduled => "meeting_scheduled",
            LeadStatus::ProposalSent => "proposal_sent",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Lost)
    }

    /// Position in the forward pipeline; `lost` sits outside it.
    const fn pipeline_rank(self) -> Option<u8> {
        match self {
            LeadStatus::New => Some(0),
            LeadStatus::Contacted => Some(1),
            LeadStatus::Responded => Some(2),
            LeadStatus::Qualified => Some(3),
            LeadStatus::MeetingScheduled => Some(4),
            LeadStatus::ProposalSent => Some(5),
            LeadStatus::Converted => Some(6),
            LeadStatus::Lost => None,
        }
    }

    /// Operators may only move leads forward. `lost` is reachable from any
    /// non-terminal state; backward moves are rejected so timestamps like
    /// `contacted_at` stay authoritative.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == LeadStatus::Lost {
            return true;
        }
        match (self.pipeline_rank(), next.pipeline_rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }
}

/// Raised when an operator requests a move the pipeline forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid lead transition {from:?} -> {to:?}")]
pub struct InvalidLeadTransition {
    pub from: LeadStatus,
    pub to: LeadStatus,
}

/// Sales-pipeline record derived from completed scans. Exactly one lead
/// exists per company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub company_id: CompanyId,
    pub latest_scan_id: ScanId,
    pub status: LeadStatus,
    pub score: u8,
    pub contact_email: Option<String>,
    pub contact_name: Option<String>,
    pub first_scan_at: DateTime<Utc>,
    pub last_scan_at: DateTime<Utc>,
    pub total_scans: u32,
    pub contacted_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Transition-validating setter. `contacted_at` and `converted_at` are
    /// populated exactly once, on first entry into their states.
    pub fn set_status(
        &mut self,
        next: LeadStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidLeadTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidLeadTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        if next == LeadStatus::Contacted && self.contacted_at.is_none() {
            self.contacted_at = Some(now);
        }
        if next == LeadStatus::Converted && self.converted_at.is_none() {
            self.converted_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }
}
