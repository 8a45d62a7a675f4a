//! Batch metadata task models
//!
//! A [`BatchTask`] applies one [`MetadataPatch`] to many documents. Its progress is
//! exposed as a [`TaskStatus`] record, which carries a [`BatchResult`] once the task
//! reaches a terminal [`TaskState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::document::{Document, DocumentId, UserId};

/// Updatable metadata fields, in the order they are reported in audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Title,
    Author,
    Subject,
    DocType,
    DigitizerName,
    DigitizerCpfCnpj,
    ResolutionDpi,
    EquipmentInfo,
    CompanyName,
    CompanyCnpj,
    DocumentType,
    DocumentCategory,
}

impl MetadataField {
    pub const ALL: [MetadataField; 12] = [
        MetadataField::Title,
        MetadataField::Author,
        MetadataField::Subject,
        MetadataField::DocType,
        MetadataField::DigitizerName,
        MetadataField::DigitizerCpfCnpj,
        MetadataField::ResolutionDpi,
        MetadataField::EquipmentInfo,
        MetadataField::CompanyName,
        MetadataField::CompanyCnpj,
        MetadataField::DocumentType,
        MetadataField::DocumentCategory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Author => "author",
            MetadataField::Subject => "subject",
            MetadataField::DocType => "doc_type",
            MetadataField::DigitizerName => "digitizer_name",
            MetadataField::DigitizerCpfCnpj => "digitizer_cpf_cnpj",
            MetadataField::ResolutionDpi => "resolution_dpi",
            MetadataField::EquipmentInfo => "equipment_info",
            MetadataField::CompanyName => "company_name",
            MetadataField::CompanyCnpj => "company_cnpj",
            MetadataField::DocumentType => "document_type",
            MetadataField::DocumentCategory => "document_category",
        }
    }
}

impl Display for MetadataField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Sparse metadata update. Only `Some` fields are touched.
///
/// The set of fields is closed: unknown keys are rejected when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digitizer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digitizer_cpf_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_dpi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_cnpj: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_category: Option<String>,
}

/// A text field counts as supplied when it is present and not the empty string.
/// Whitespace-only values are supplied, so they are validated and stored like
/// any other value.
pub(crate) fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl MetadataPatch {
    /// Value supplied for `field`, rendered as text.
    pub fn value_of(&self, field: MetadataField) -> Option<String> {
        match field {
            MetadataField::Title => self.title.clone(),
            MetadataField::Author => self.author.clone(),
            MetadataField::Subject => self.subject.clone(),
            MetadataField::DocType => self.doc_type.clone(),
            MetadataField::DigitizerName => self.digitizer_name.clone(),
            MetadataField::DigitizerCpfCnpj => self.digitizer_cpf_cnpj.clone(),
            MetadataField::ResolutionDpi => self.resolution_dpi.map(|dpi| dpi.to_string()),
            MetadataField::EquipmentInfo => self.equipment_info.clone(),
            MetadataField::CompanyName => self.company_name.clone(),
            MetadataField::CompanyCnpj => self.company_cnpj.clone(),
            MetadataField::DocumentType => self.document_type.clone(),
            MetadataField::DocumentCategory => self.document_category.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        MetadataField::ALL
            .iter()
            .all(|field| self.value_of(*field).is_none())
    }

    /// Supplied, non-empty fields with their values, in canonical order.
    pub fn changes(&self) -> Vec<(MetadataField, String)> {
        MetadataField::ALL
            .iter()
            .filter_map(|field| {
                self.value_of(*field)
                    .filter(|value| !value.is_empty())
                    .map(|value| (*field, value))
            })
            .collect()
    }

    /// Apply the supplied fields to `document` and return the fields written.
    ///
    /// Empty strings are ignored for `title`, `author`, `subject` and `doc_type`.
    /// `doc_type` is stored lower-cased.
    pub fn apply_to(&self, document: &mut Document) -> Vec<MetadataField> {
        let mut applied = Vec::new();

        if let Some(title) = supplied(&self.title) {
            document.title = Some(title.to_string());
            applied.push(MetadataField::Title);
        }
        if let Some(author) = supplied(&self.author) {
            document.author = Some(author.to_string());
            applied.push(MetadataField::Author);
        }
        if let Some(subject) = supplied(&self.subject) {
            document.subject = Some(subject.to_string());
            applied.push(MetadataField::Subject);
        }
        if let Some(doc_type) = supplied(&self.doc_type) {
            document.doc_type = Some(doc_type.to_lowercase());
            applied.push(MetadataField::DocType);
        }
        if let Some(name) = &self.digitizer_name {
            document.digitizer_name = Some(name.clone());
            applied.push(MetadataField::DigitizerName);
        }
        if let Some(tax_id) = &self.digitizer_cpf_cnpj {
            document.digitizer_cpf_cnpj = Some(tax_id.clone());
            applied.push(MetadataField::DigitizerCpfCnpj);
        }
        if let Some(dpi) = self.resolution_dpi {
            document.resolution_dpi = Some(dpi);
            applied.push(MetadataField::ResolutionDpi);
        }
        if let Some(info) = &self.equipment_info {
            document.equipment_info = Some(info.clone());
            applied.push(MetadataField::EquipmentInfo);
        }
        if let Some(name) = &self.company_name {
            document.company_name = Some(name.clone());
            applied.push(MetadataField::CompanyName);
        }
        if let Some(cnpj) = &self.company_cnpj {
            document.company_cnpj = Some(cnpj.clone());
            applied.push(MetadataField::CompanyCnpj);
        }
        if let Some(kind) = &self.document_type {
            document.document_type = Some(kind.clone());
            applied.push(MetadataField::DocumentType);
        }
        if let Some(category) = &self.document_category {
            document.document_category = Some(category.clone());
            applied.push(MetadataField::DocumentCategory);
        }

        applied
    }
}

/// `ids` with repeats removed, keeping the first occurrence of each.
pub fn unique_document_ids(ids: &[DocumentId]) -> Vec<DocumentId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// One submitted batch metadata update. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTask {
    pub task_id: String,
    pub document_ids: Vec<DocumentId>,
    pub metadata_patch: MetadataPatch,
    pub submitted_by: UserId,
    pub origin_address: String,
    pub submitted_at: DateTime<Utc>,
}

impl BatchTask {
    /// Build a task, dropping repeated document ids (first occurrence wins) so each
    /// document is processed at most once.
    pub fn new(
        task_id: impl Into<String>,
        document_ids: Vec<DocumentId>,
        metadata_patch: MetadataPatch,
        submitted_by: UserId,
        origin_address: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            document_ids: unique_document_ids(&document_ids),
            metadata_patch,
            submitted_by,
            origin_address: origin_address.into(),
            submitted_at: Utc::now(),
        }
    }

    pub fn total(&self) -> usize {
        self.document_ids.len()
    }
}

/// Lifecycle state of a batch task: `queued -> processing -> {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether moving from `self` to `next` follows the state machine.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Queued, TaskState::Processing)
                | (TaskState::Queued, TaskState::Failed)
                | (TaskState::Processing, TaskState::Completed)
                | (TaskState::Processing, TaskState::Failed)
        )
    }
}

impl Display for TaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskState::Queued => write!(f, "queued"),
            TaskState::Processing => write!(f, "processing"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TaskState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskState::Queued),
            "processing" => Ok(TaskState::Processing),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            _ => Err(anyhow::anyhow!("Invalid task state: {}", s)),
        }
    }
}

/// Outcome of applying the patch to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub document_id: DocumentId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
}

impl DocumentOutcome {
    pub fn succeeded(document_id: DocumentId, document_title: Option<String>) -> Self {
        Self {
            document_id,
            success: true,
            error: None,
            document_title,
        }
    }

    pub fn failed(
        document_id: DocumentId,
        error: impl Into<String>,
        document_title: Option<String>,
    ) -> Self {
        Self {
            document_id,
            success: false,
            error: Some(error.into()),
            document_title,
        }
    }
}

/// Aggregated result of a finished batch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<DocumentOutcome>,
    /// Task-level error, set only when the task as a whole could not run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    /// Result for a task whose documents were all attempted.
    pub fn from_outcomes(total: usize, results: Vec<DocumentOutcome>) -> Self {
        let success = results.iter().filter(|r| r.success).count();
        Self {
            total,
            success,
            failed: total.saturating_sub(success),
            results,
            error: None,
        }
    }

    /// Result for a task that failed before processing any of its documents.
    pub fn engine_failure(total: usize, error: impl Into<String>) -> Self {
        Self::interrupted(total, Vec::new(), error)
    }

    /// Result for a task that failed part way. The counts are those of a failed task,
    /// and `results` lists the documents that finished before the failure, so
    /// callers can still see which documents were written.
    pub fn interrupted(
        total: usize,
        results: Vec<DocumentOutcome>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            total,
            success: 0,
            failed: total,
            results,
            error: Some(error.into()),
        }
    }
}

/// Status record for one task, as returned to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub result: Option<BatchResult>,
}

impl TaskStatus {
    pub fn queued(submitted_at: DateTime<Utc>) -> Self {
        Self {
            status: TaskState::Queued,
            submitted_at,
            updated_at: None,
            result: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Number of tracked tasks per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn record(&mut self, state: TaskState) {
        match state {
            TaskState::Queued => self.queued += 1,
            TaskState::Processing => self.processing += 1,
            TaskState::Completed => self.completed += 1,
            TaskState::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.processing + self.completed + self.failed
    }
}
