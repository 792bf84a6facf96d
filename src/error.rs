use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Outcome of every failed workflow operation.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{action} is not allowed while the contract is {from}")]
    InvalidTransition { action: &'static str, from: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("you already have a pending offer on this contract")]
    DuplicateOffer,

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl WorkflowError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn invalid_transition(action: &'static str, from: impl std::fmt::Display) -> Self {
        Self::InvalidTransition {
            action,
            from: from.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Forbidden(_) => "forbidden",
            WorkflowError::InvalidTransition { .. } => "invalid_transition",
            WorkflowError::InvalidState(_) => "invalid_state",
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::DuplicateOffer => "duplicate_offer",
            WorkflowError::Database(_) => "internal_error",
        }
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::InvalidState(_)
            | WorkflowError::DuplicateOffer => StatusCode::CONFLICT,
            WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            WorkflowError::Validation(fields) => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({
                    "error": "Validation failed",
                    "code": self.code(),
                    "fields": fields,
                }))
            }
            WorkflowError::Database(e) => {
                // Never leak storage details to the caller.
                tracing::error!(error = %e, "database error");
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Internal server error",
                    "code": self.code(),
                }))
            }
            other => HttpResponse::build(other.status_code()).json(serde_json::json!({
                "error": other.to_string(),
                "code": other.code(),
            })),
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
