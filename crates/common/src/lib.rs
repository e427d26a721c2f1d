//! Folio Common Library
//!
//! Shared code for the Folio publishing model:
//! - Database models, schema and repository
//! - Write-path drafts and identifier checks
//! - Referential integrity rules and the in-memory catalog
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod input;
pub mod integrity;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{CatalogSource, DbPool, Repository};
pub use errors::{AppError, ErrorCode, Result};
pub use integrity::{AuditReport, Catalog, Finding, PolicyChain};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
