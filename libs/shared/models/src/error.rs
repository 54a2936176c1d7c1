use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Stable, machine-distinguishable error codes shared by every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidSchedule,
    SlotInPast,
    SlotFull,
    SlotUnavailable,
    DuplicateBooking,
    InvalidTransition,
    NotFound,
    Forbidden,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSchedule => "invalid_schedule",
            ErrorKind::SlotInPast => "slot_in_past",
            ErrorKind::SlotFull => "slot_full",
            ErrorKind::SlotUnavailable => "slot_unavailable",
            ErrorKind::DuplicateBooking => "duplicate_booking",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidSchedule => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::SlotInPast => StatusCode::CONFLICT,
            ErrorKind::SlotFull => StatusCode::CONFLICT,
            ErrorKind::SlotUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::DuplicateBooking => StatusCode::CONFLICT,
            ErrorKind::InvalidTransition => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Booking conflicts can be retried against another slot; nothing else is
    /// retried without the caller changing something.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::SlotFull | ErrorKind::SlotInPast)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{message}")]
    Domain { kind: ErrorKind, message: String },
}

impl AppError {
    pub fn domain(kind: ErrorKind, message: impl Into<String>) -> Self {
        AppError::Domain {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthorized",
            AppError::NotFound(_) => ErrorKind::NotFound.as_str(),
            AppError::BadRequest(_) => ErrorKind::Validation.as_str(),
            AppError::Internal(_) => ErrorKind::Internal.as_str(),
            AppError::Forbidden(_) => ErrorKind::Forbidden.as_str(),
            AppError::Domain { kind, .. } => kind.as_str(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Domain { kind, .. } => kind.status(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg)
            | AppError::Forbidden(msg) => msg.clone(),
            AppError::Domain { message, .. } => message.clone(),
        };

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::debug!("Request rejected: {} ({}): {}", status, code, message);
        }

        let body = Json(json!({
            "error": message,
            "code": code
        }));

        (status, body).into_response()
    }
}
