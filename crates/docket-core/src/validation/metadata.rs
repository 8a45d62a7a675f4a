//! Document metadata validation
//!
//! Rules applied by [`StandardMetadataValidator`]:
//! - Required fields: `author`, `doc_type` (skipped for partial updates)
//! - Title: 3-500 characters of letters, digits, whitespace and `-_.,:;()/`
//! - Author: full name of at least two words, letters only
//! - Document type: one of [`VALID_DOC_TYPES`]
//! - Tax ids: CPF/CNPJ checksums
//! - Length limits on the remaining text fields

use regex::Regex;
use std::sync::LazyLock;

use super::tax_id::{validate_cnpj, validate_cpf_cnpj};
use super::{MetadataValidator, ValidationReport};
use crate::models::batch::supplied;
use crate::models::MetadataPatch;

pub const MIN_TEXT_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 500;
pub const MAX_AUTHOR_LENGTH: usize = 200;
pub const MAX_SUBJECT_LENGTH: usize = 1000;
pub const MAX_DIGITIZER_NAME_LENGTH: usize = 200;
/// Limit for equipment, company and classification fields.
pub const MAX_SHORT_TEXT_LENGTH: usize = 255;
pub const MIN_RESOLUTION_DPI: i32 = 72;
pub const MAX_RESOLUTION_DPI: i32 = 2400;

pub const VALID_DOC_TYPES: &[&str] = &[
    "contrato",
    "ata",
    "relatorio",
    "nota_fiscal",
    "comprovante",
    "certidao",
    "procuracao",
    "declaracao",
    "estatuto",
    "balanco",
    "documento_fiscal",
    "documento_trabalhista",
    "documento_societario",
    "laudo_tecnico",
    "outro",
];

// Letters include the Latin-1 accented range.
static TEXT_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÿ0-9\s\-_.,:;()/]+$").ok());
static PERSON_NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÿ\s]+$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern
        .as_ref()
        .is_some_and(|regex| regex.is_match(value))
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn is_valid_person_name(name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    words.len() >= 2
        && words.iter().all(|word| char_len(word) >= 2)
        && matches(&PERSON_NAME_PATTERN, name)
}

/// Default validator for batch metadata updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardMetadataValidator;

impl StandardMetadataValidator {
    pub fn new() -> Self {
        Self
    }

    fn check_required(&self, patch: &MetadataPatch, errors: &mut Vec<String>) {
        for (field, value) in [("author", &patch.author), ("doc_type", &patch.doc_type)] {
            if supplied(value).is_none_or(|v| v.trim().is_empty()) {
                errors.push(format!("missing required field: {}", field));
            }
        }
    }

    fn check_title(&self, title: &str, errors: &mut Vec<String>) {
        let title = title.trim();
        let len = char_len(title);
        if len < MIN_TEXT_LENGTH {
            errors.push(format!(
                "title must be at least {} characters",
                MIN_TEXT_LENGTH
            ));
        }
        if len > MAX_TITLE_LENGTH {
            errors.push(format!("title exceeds {} characters", MAX_TITLE_LENGTH));
        }
        if !matches(&TEXT_PATTERN, title) {
            errors.push("title contains invalid characters".to_string());
        }
    }

    fn check_author(&self, author: &str, errors: &mut Vec<String>) {
        let author = author.trim();
        let len = char_len(author);
        if len < MIN_TEXT_LENGTH {
            errors.push(format!(
                "author must be at least {} characters",
                MIN_TEXT_LENGTH
            ));
        }
        if len > MAX_AUTHOR_LENGTH {
            errors.push(format!("author exceeds {} characters", MAX_AUTHOR_LENGTH));
        }
        if !is_valid_person_name(author) {
            errors.push("invalid author name (use full name)".to_string());
        }
    }

    fn check_max_len(&self, field: &str, value: &str, max: usize, errors: &mut Vec<String>) {
        if char_len(value.trim()) > max {
            errors.push(format!("{} exceeds {} characters", field, max));
        }
    }
}

impl MetadataValidator for StandardMetadataValidator {
    fn validate(&self, patch: &MetadataPatch, partial: bool) -> ValidationReport {
        let mut errors = Vec::new();

        if !partial {
            self.check_required(patch, &mut errors);
        }

        if let Some(title) = supplied(&patch.title) {
            self.check_title(title, &mut errors);
        }

        if let Some(author) = supplied(&patch.author) {
            self.check_author(author, &mut errors);
        }

        if let Some(doc_type) = supplied(&patch.doc_type) {
            if !VALID_DOC_TYPES.contains(&doc_type) {
                errors.push(format!(
                    "invalid document type. Valid types: {}",
                    VALID_DOC_TYPES.join(", ")
                ));
            }
        }

        if let Some(subject) = supplied(&patch.subject) {
            self.check_max_len("subject", subject, MAX_SUBJECT_LENGTH, &mut errors);
        }

        if let Some(name) = &patch.digitizer_name {
            let len = char_len(name.trim());
            if !(MIN_TEXT_LENGTH..=MAX_DIGITIZER_NAME_LENGTH).contains(&len) {
                errors.push(format!(
                    "digitizer_name must be between {} and {} characters",
                    MIN_TEXT_LENGTH, MAX_DIGITIZER_NAME_LENGTH
                ));
            }
        }

        if let Some(tax_id) = &patch.digitizer_cpf_cnpj {
            if !validate_cpf_cnpj(tax_id) {
                errors.push("invalid digitizer CPF/CNPJ".to_string());
            }
        }

        if let Some(cnpj) = &patch.company_cnpj {
            if !validate_cnpj(cnpj) {
                errors.push("invalid company CNPJ".to_string());
            }
        }

        if let Some(dpi) = patch.resolution_dpi {
            if !(MIN_RESOLUTION_DPI..=MAX_RESOLUTION_DPI).contains(&dpi) {
                errors.push(format!(
                    "resolution_dpi must be between {} and {}",
                    MIN_RESOLUTION_DPI, MAX_RESOLUTION_DPI
                ));
            }
        }

        for (field, value) in [
            ("equipment_info", &patch.equipment_info),
            ("company_name", &patch.company_name),
            ("document_type", &patch.document_type),
            ("document_category", &patch.document_category),
        ] {
            if let Some(value) = value {
                self.check_max_len(field, value, MAX_SHORT_TEXT_LENGTH, &mut errors);
            }
        }

        ValidationReport::from_errors(errors)
    }
}
