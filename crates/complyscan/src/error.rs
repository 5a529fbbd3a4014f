use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::leads::manager::LeadError;
use crate::workflows::scan::collector::HttpClientError;
use crate::workflows::scan::orchestrator::StartScanError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    HttpClient(HttpClientError),
    Scan(StartScanError),
    Lead(LeadError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {err}"),
            AppError::Telemetry(err) => write!(f, "telemetry error: {err}"),
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Server(err) => write!(f, "server error: {err}"),
            AppError::HttpClient(err) => write!(f, "http client error: {err}"),
            AppError::Scan(err) => write!(f, "scan error: {err}"),
            AppError::Lead(err) => write!(f, "lead error: {err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::HttpClient(err) => Some(err),
            AppError::Scan(err) => Some(err),
            AppError::Lead(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Scan(StartScanError::InvalidDomain(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Lead(LeadError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Lead(LeadError::InvalidTransition(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<HttpClientError> for AppError {
    fn from(value: HttpClientError) -> Self {
        Self::HttpClient(value)
    }
}

impl From<StartScanError> for AppError {
    fn from(value: StartScanError) -> Self {
        Self::Scan(value)
    }
}

impl From<LeadError> for AppError {
    fn from(value: LeadError) -> Self {
        Self::Lead(value)
    }
}
