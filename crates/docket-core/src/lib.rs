//! Docket Core Library
//!
//! This crate provides the domain models, error types, configuration, and metadata
//! validation shared by the document store, the batch engine, and the HTTP API.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, BatchConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::{MetadataValidator, StandardMetadataValidator, ValidationReport};
