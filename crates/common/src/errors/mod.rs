//! Error types for Folio
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for integrity failures and infrastructure failures
//! - Stable numeric error codes
//! - A recoverable/fatal split for callers of the write path

use crate::db::models::EntityKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidDateRange,

    // Referential errors (2xxx)
    MissingReference,
    CyclicPolicyAncestry,
    PolicyChainTooDeep,
    IneligibleJournalReference,
    UncoveredInstitutionalCharge,

    // Resource errors (4xxx)
    NotFound,

    // Conflict errors (5xxx)
    Conflict,
    StillReferenced,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::ValidationError,
        ErrorCode::InvalidDateRange,
        ErrorCode::MissingReference,
        ErrorCode::CyclicPolicyAncestry,
        ErrorCode::PolicyChainTooDeep,
        ErrorCode::IneligibleJournalReference,
        ErrorCode::UncoveredInstitutionalCharge,
        ErrorCode::NotFound,
        ErrorCode::Conflict,
        ErrorCode::StillReferenced,
        ErrorCode::DatabaseError,
        ErrorCode::ConnectionError,
        ErrorCode::InternalError,
        ErrorCode::ConfigurationError,
        ErrorCode::SerializationError,
    ];

    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidDateRange => 1002,

            // Referential (2xxx)
            ErrorCode::MissingReference => 2001,
            ErrorCode::CyclicPolicyAncestry => 2002,
            ErrorCode::PolicyChainTooDeep => 2003,
            ErrorCode::IneligibleJournalReference => 2004,
            ErrorCode::UncoveredInstitutionalCharge => 2005,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::StillReferenced => 5002,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }

    /// Label used for metrics and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::InvalidDateRange => "invalid_date_range",
            ErrorCode::MissingReference => "missing_reference",
            ErrorCode::CyclicPolicyAncestry => "cyclic_policy_ancestry",
            ErrorCode::PolicyChainTooDeep => "policy_chain_too_deep",
            ErrorCode::IneligibleJournalReference => "ineligible_journal_reference",
            ErrorCode::UncoveredInstitutionalCharge => "uncovered_institutional_charge",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::StillReferenced => "still_referenced",
            ErrorCode::DatabaseError => "database_error",
            ErrorCode::ConnectionError => "connection_error",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::ConfigurationError => "configuration_error",
            ErrorCode::SerializationError => "serialization_error",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    #[error("Invalid date range for {subject}: {start} is after {end}")]
    InvalidDateRange {
        subject: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    // Referential errors
    #[error("Missing reference: {entity} {id} does not exist")]
    MissingReference { entity: EntityKind, id: i32 },

    #[error("Cyclic pricing policy ancestry starting at policy {policy_id}: {cycle:?}")]
    CyclicPolicyAncestry { policy_id: i32, cycle: Vec<i32> },

    #[error("Pricing policy {policy_id} exceeds the maximum ancestry depth of {max_depth}")]
    PolicyChainTooDeep { policy_id: i32, max_depth: usize },

    #[error(
        "Journal {journal_id} belongs to publisher {journal_publisher_id}, \
         not to agreement publisher {agreement_publisher_id}"
    )]
    IneligibleJournalReference {
        journal_id: i32,
        journal_publisher_id: i32,
        agreement_publisher_id: i32,
    },

    #[error(
        "No agreement covers institution {institution_id} for journal {journal_id} on {date}"
    )]
    UncoveredInstitutionalCharge {
        institution_id: i32,
        journal_id: i32,
        date: NaiveDate,
    },

    // Resource errors
    #[error("Resource not found: {entity} with id {id}")]
    NotFound { entity: EntityKind, id: i32 },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("{entity} {id} is still referenced by {count} {dependents} row(s)")]
    StillReferenced {
        entity: EntityKind,
        id: i32,
        dependents: EntityKind,
        count: u64,
    },

    // Database errors
    #[error("Database error: {0}")]
    Database(sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidDateRange { .. } => ErrorCode::InvalidDateRange,
            AppError::MissingReference { .. } => ErrorCode::MissingReference,
            AppError::CyclicPolicyAncestry { .. } => ErrorCode::CyclicPolicyAncestry,
            AppError::PolicyChainTooDeep { .. } => ErrorCode::PolicyChainTooDeep,
            AppError::IneligibleJournalReference { .. } => ErrorCode::IneligibleJournalReference,
            AppError::UncoveredInstitutionalCharge { .. } => ErrorCode::UncoveredInstitutionalCharge,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::StillReferenced { .. } => ErrorCode::StillReferenced,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the error rejects a write that the caller can correct and retry.
    ///
    /// Everything else is an infrastructure failure.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidDateRange { .. }
                | AppError::MissingReference { .. }
                | AppError::CyclicPolicyAncestry { .. }
                | AppError::PolicyChainTooDeep { .. }
                | AppError::IneligibleJournalReference { .. }
                | AppError::UncoveredInstitutionalCharge { .. }
                | AppError::NotFound { .. }
                | AppError::Duplicate { .. }
                | AppError::StillReferenced { .. }
        )
    }

    /// Shorthand for a field-level validation error
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(message)) => {
                AppError::Duplicate { message }
            }
            Some(sea_orm::SqlErr::ForeignKeyConstraintViolation(message)) => {
                AppError::Validation { message, field: None }
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|name| name.to_string());

        AppError::Validation {
            message: errors.to_string(),
            field,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}
