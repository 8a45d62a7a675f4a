use anyhow::Result;
use docket_core::models::{Document, DocumentId, NewAuditRecord};

/// Source of document sessions. Shared by all workers.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a session scoped to one unit of work. Sessions are never shared between tasks.
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>>;
}

/// A unit of work against the document store.
#[async_trait::async_trait]
pub trait DocumentSession: Send {
    async fn find_document(&mut self, id: DocumentId) -> Result<Option<Document>>;

    /// Persist `document` and append `audit` atomically: either both are stored or neither.
    async fn save(&mut self, document: &Document, audit: &NewAuditRecord) -> Result<()>;
}
