use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DocumentId = i64;
pub type UserId = i64;

/// Audit action recorded for every document touched by a batch metadata update.
pub const AUDIT_ACTION_BATCH_UPDATE: &str = "metadata_batch_update";

/// An uploaded PDF and its descriptive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub original_filename: String,
    pub file_size: i64,
    pub file_hash: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub doc_type: Option<String>,
    pub digitizer_name: Option<String>,
    pub digitizer_cpf_cnpj: Option<String>,
    pub resolution_dpi: Option<i32>,
    pub equipment_info: Option<String>,
    pub company_name: Option<String>,
    pub company_cnpj: Option<String>,
    pub document_type: Option<String>,
    pub document_category: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub uploaded_by: UserId,
}

impl Document {
    /// Title shown to users: the metadata title when set, otherwise the uploaded filename.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.original_filename)
    }
}

/// Audit entry to be written together with a document mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub document_id: DocumentId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditRecord {
    pub id: i64,
    pub document_id: DocumentId,
    pub user_id: Option<UserId>,
    pub action: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}
