//! CiteNet Common Library
//!
//! Shared code for the CiteNet crates including:
//! - The canonical paper model and identifiers
//! - Error types and handling
//! - Configuration management
//! - The explicitly scoped paper cache
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{Paper, PaperId};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
