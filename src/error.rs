// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Broad error classes, used for status codes and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// User-correctable input problem
    Validation,
    NotFound,
    /// Request is well-formed but conflicts with ledger state
    Conflict,
    /// Store read/write failure
    Persistence,
    Internal,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid Ethereum address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid login method: {0}")]
    InvalidLoginMethod(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Cannot trade a card to yourself")]
    SelfTradeNotAllowed,

    #[error("Session {0} does not belong to the sending wallet")]
    InvalidSenderSession(String),

    #[error("Sender does not own card {0}")]
    CardNotOwned(String),

    #[error("Recipient wallet {0} is not registered")]
    RecipientNotRegistered(String),

    #[error("Recipient wallet {0} has no game progress")]
    RecipientHasNoProgress(String),

    #[error("Progress version conflict: expected {expected}, stored {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidAddress(_)
            | AppError::InvalidLoginMethod(_)
            | AppError::MissingField(_)
            | AppError::BadRequest(_) => ErrorKind::Validation,
            AppError::SessionNotFound(_) => ErrorKind::NotFound,
            AppError::SelfTradeNotAllowed
            | AppError::InvalidSenderSession(_)
            | AppError::CardNotOwned(_)
            | AppError::RecipientNotRegistered(_)
            | AppError::RecipientHasNoProgress(_)
            | AppError::VersionConflict { .. } => ErrorKind::Conflict,
            AppError::Persistence(_) => ErrorKind::Persistence,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code returned in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidAddress(_) => "invalid_address",
            AppError::InvalidLoginMethod(_) => "invalid_login_method",
            AppError::MissingField(_) => "missing_field",
            AppError::BadRequest(_) => "bad_request",
            AppError::SessionNotFound(_) => "session_not_found",
            AppError::SelfTradeNotAllowed => "self_trade_not_allowed",
            AppError::InvalidSenderSession(_) => "invalid_sender_session",
            AppError::CardNotOwned(_) => "card_not_owned",
            AppError::RecipientNotRegistered(_) => "recipient_not_registered",
            AppError::RecipientHasNoProgress(_) => "recipient_has_no_progress",
            AppError::VersionConflict { .. } => "version_conflict",
            AppError::Persistence(_) => "persistence_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => match self {
                AppError::VersionConflict { .. } => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<crate::db::StoreError> for AppError {
    fn from(err: crate::db::StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match self.kind() {
            ErrorKind::Persistence => {
                tracing::error!(error = %self, "Persistence error");
                None
            }
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Internal server error");
                None
            }
            _ => Some(self.to_string()),
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
