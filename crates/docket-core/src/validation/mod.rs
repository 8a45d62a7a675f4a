//! Validation modules

pub mod metadata;
pub mod tax_id;

pub use metadata::{
    StandardMetadataValidator, MAX_AUTHOR_LENGTH, MAX_SHORT_TEXT_LENGTH, MAX_SUBJECT_LENGTH,
    MAX_TITLE_LENGTH, VALID_DOC_TYPES,
};
pub use tax_id::{validate_cnpj, validate_cpf, validate_cpf_cnpj};

use crate::models::MetadataPatch;
use serde::Serialize;

/// Outcome of validating a metadata patch. `valid` is true exactly when `errors` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks a metadata patch before it is applied to a document.
///
/// With `partial` set, missing required fields are not reported. Implementations
/// report problems in the returned [`ValidationReport`] and never fail.
pub trait MetadataValidator: Send + Sync {
    fn validate(&self, patch: &MetadataPatch, partial: bool) -> ValidationReport;
}
