//! In-memory document store
//!
//! Used by the test suites and for running the API without a database. Supports
//! fault injection so failure paths of the batch engine can be exercised.

use anyhow::Result;
use chrono::Utc;
use docket_core::models::{AuditRecord, Document, DocumentId, NewAuditRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::store::{DocumentSession, DocumentStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Faults {
    failing_saves: HashSet<DocumentId>,
    panicking_reads: HashSet<DocumentId>,
    latency: Option<Duration>,
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<DocumentId, Document>>>,
    audit: Arc<Mutex<Vec<AuditRecord>>>,
    faults: Arc<Mutex<Faults>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) {
        lock(&self.documents).insert(document.id, document);
    }

    pub fn get(&self, id: DocumentId) -> Option<Document> {
        lock(&self.documents).get(&id).cloned()
    }

    pub fn audit_records(&self) -> Vec<AuditRecord> {
        lock(&self.audit).clone()
    }

    pub fn audit_records_for(&self, id: DocumentId) -> Vec<AuditRecord> {
        lock(&self.audit)
            .iter()
            .filter(|record| record.document_id == id)
            .cloned()
            .collect()
    }

    /// Make every save of `id` fail without persisting anything.
    pub fn fail_saves_for(&self, id: DocumentId) {
        lock(&self.faults).failing_saves.insert(id);
    }

    /// Make reading `id` panic, simulating a defect in the executing task.
    pub fn panic_on_read(&self, id: DocumentId) {
        lock(&self.faults).panicking_reads.insert(id);
    }

    /// Delay every document read by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.faults).latency = Some(latency);
    }

    /// When set, opening a session fails.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("document store unavailable");
        }
        Ok(Box::new(InMemorySession {
            store: self.clone(),
        }))
    }
}

struct InMemorySession {
    store: InMemoryDocumentStore,
}

#[async_trait::async_trait]
impl DocumentSession for InMemorySession {
    async fn find_document(&mut self, id: DocumentId) -> Result<Option<Document>> {
        let (latency, panics) = {
            let faults = lock(&self.store.faults);
            (faults.latency, faults.panicking_reads.contains(&id))
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if panics {
            panic!("injected read panic for document {}", id);
        }

        Ok(self.store.get(id))
    }

    async fn save(&mut self, document: &Document, audit: &NewAuditRecord) -> Result<()> {
        if lock(&self.store.faults)
            .failing_saves
            .contains(&document.id)
        {
            anyhow::bail!("write rejected for document {}", document.id);
        }

        let mut documents = lock(&self.store.documents);
        if !documents.contains_key(&document.id) {
            anyhow::bail!("document {} no longer exists", document.id);
        }
        let mut audit_log = lock(&self.store.audit);

        documents.insert(document.id, document.clone());
        let id = audit_log.len() as i64 + 1;
        audit_log.push(AuditRecord {
            id,
            document_id: audit.document_id,
            user_id: audit.user_id,
            action: audit.action.clone(),
            description: audit.description.clone(),
            ip_address: audit.ip_address.clone(),
            user_agent: audit.user_agent.clone(),
            timestamp: Utc::now(),
        });

        Ok(())
    }
}
