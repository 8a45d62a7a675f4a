//! PostgreSQL document store

use anyhow::{Context, Result};
use docket_core::models::{Document, DocumentId, NewAuditRecord};
use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres};

use crate::store::{DocumentSession, DocumentStore};

const DOCUMENT_COLUMNS: &str = r#"
    id, filename, original_filename, file_size, file_hash,
    title, author, subject, doc_type,
    digitizer_name, digitizer_cpf_cnpj, resolution_dpi, equipment_info,
    company_name, company_cnpj, document_type, document_category,
    uploaded_at, updated_at, uploaded_by
"#;

/// Document store backed by a PostgreSQL pool. Each session holds one pooled connection.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn open_session(&self) -> Result<Box<dyn DocumentSession>> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire database connection")?;
        Ok(Box::new(PgDocumentSession { conn }))
    }
}

pub struct PgDocumentSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait::async_trait]
impl DocumentSession for PgDocumentSession {
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = id))]
    async fn find_document(&mut self, id: DocumentId) -> Result<Option<Document>> {
        let query = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        let document = sqlx::query_as::<Postgres, Document>(&query)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("Failed to load document {}", id))?;
        Ok(document)
    }

    #[tracing::instrument(skip(self, document, audit), fields(db.table = "documents", db.record_id = document.id))]
    async fn save(&mut self, document: &Document, audit: &NewAuditRecord) -> Result<()> {
        let mut tx = self
            .conn
            .begin()
            .await
            .context("Failed to begin database transaction")?;

        let updated = sqlx::query(
            r#"
            UPDATE documents SET
                title = $1, author = $2, subject = $3, doc_type = $4,
                digitizer_name = $5, digitizer_cpf_cnpj = $6, resolution_dpi = $7,
                equipment_info = $8, company_name = $9, company_cnpj = $10,
                document_type = $11, document_category = $12, updated_at = $13
            WHERE id = $14
            "#,
        )
        .bind(&document.title)
        .bind(&document.author)
        .bind(&document.subject)
        .bind(&document.doc_type)
        .bind(&document.digitizer_name)
        .bind(&document.digitizer_cpf_cnpj)
        .bind(document.resolution_dpi)
        .bind(&document.equipment_info)
        .bind(&document.company_name)
        .bind(&document.company_cnpj)
        .bind(&document.document_type)
        .bind(&document.document_category)
        .bind(document.updated_at)
        .bind(document.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update document")?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("Failed to rollback database transaction")?;
            anyhow::bail!("document {} no longer exists", document.id);
        }

        sqlx::query(
            r#"
            INSERT INTO audit_logs (document_id, user_id, action, description, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(audit.document_id)
        .bind(audit.user_id)
        .bind(&audit.action)
        .bind(&audit.description)
        .bind(&audit.ip_address)
        .bind(&audit.user_agent)
        .execute(&mut *tx)
        .await
        .context("Failed to insert audit record")?;

        tx.commit()
            .await
            .context("Failed to commit database transaction")?;

        Ok(())
    }
}
