pub mod batch;
pub mod document;

pub use batch::{
    unique_document_ids, BatchResult, BatchTask, DocumentOutcome, MetadataField, MetadataPatch,
    TaskCounts, TaskState, TaskStatus,
};
pub use document::{AuditRecord, Document, DocumentId, NewAuditRecord, UserId};
