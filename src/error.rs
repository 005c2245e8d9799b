//! Application error types

use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("{entity} not found: {key}")]
    ReferenceNotFound { entity: String, key: String },

    #[error("{entity} with {} '{value}' already exists", .fields.join(", "))]
    DuplicateEntity {
        entity: String,
        fields: Vec<String>,
        value: String,
    },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Build a `MissingField` error from static field names
    pub fn missing(fields: &[&str]) -> Self {
        AppError::MissingField(fields.iter().map(|f| f.to_string()).collect())
    }

    /// Build a `DuplicateEntity` error
    pub fn duplicate(entity: &str, fields: &[&str], value: impl Into<String>) -> Self {
        AppError::DuplicateEntity {
            entity: entity.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            value: value.into(),
        }
    }

    /// Build a `ReferenceNotFound` error
    pub fn reference_not_found(entity: &str, key: impl Into<String>) -> Self {
        AppError::ReferenceNotFound {
            entity: entity.to_string(),
            key: key.into(),
        }
    }
}

/// Serializable error response for callers
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::MissingField(_) => "MISSING_FIELD",
            AppError::ReferenceNotFound { .. } => "REFERENCE_NOT_FOUND",
            AppError::DuplicateEntity { .. } => "DUPLICATE_ENTITY",
            AppError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            AppError::InvalidValue { .. } => "INVALID_VALUE",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
