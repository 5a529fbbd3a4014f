use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LeadId, LeadStatus};
use super::manager::{LeadError, LeadLifecycleManager};
use super::repository::LeadRepository;

/// Router builder exposing the CRM lead endpoints.
pub fn lead_router<L>(manager: Arc<LeadLifecycleManager<L>>) -> Router
where
    L: LeadRepository + 'static,
{
    Router::new()
        .route("/api/v1/leads", get(list_leads_handler::<L>))
        .route(
            "/api/v1/leads/:lead_id/status",
            put(set_status_handler::<L>),
        )
        .route("/api/v1/leads/:lead_id/notes", post(add_note_handler::<L>))
        .with_state(manager)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeadListQuery {
    pub(crate) status: Option<LeadStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetLeadStatusRequest {
    pub(crate) status: LeadStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddLeadNoteRequest {
    pub(crate) note: String,
}

pub(crate) async fn list_leads_handler<L>(
    State(manager): State<Arc<LeadLifecycleManager<L>>>,
    Query(query): Query<LeadListQuery>,
) -> Response
where
    L: LeadRepository + 'static,
{
    match manager.list(query.status) {
        Ok(leads) => (StatusCode::OK, axum::Json(leads)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn set_status_handler<L>(
    State(manager): State<Arc<LeadLifecycleManager<L>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<SetLeadStatusRequest>,
) -> Response
where
    L: LeadRepository + 'static,
{
    match manager.set_status(&LeadId(lead_id), request.status) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead)).into_response(),
        Err(LeadError::NotFound) => {
            let payload = json!({ "error": "lead not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(LeadError::InvalidTransition(err)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn add_note_handler<L>(
    State(manager): State<Arc<LeadLifecycleManager<L>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<AddLeadNoteRequest>,
) -> Response
where
    L: LeadRepository + 'static,
{
    match manager.add_note(&LeadId(lead_id), request.note) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead)).into_response(),
        Err(LeadError::NotFound) => {
            let payload = json!({ "error": "lead not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
