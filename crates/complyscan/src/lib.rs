//! Compliance scan pipeline and lead lifecycle engine.
//!
//! Given a company domain the scan workflow fetches a bounded set of policy
//! pages, runs a deterministic compliance check table over the extracted
//! text, aggregates a risk score across jurisdictions, and feeds completed
//! scans into a CRM lead pipeline.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
