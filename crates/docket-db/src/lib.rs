//! Document persistence
//!
//! The batch engine only talks to [`DocumentStore`] and [`DocumentSession`]. Two
//! implementations are provided: [`PgDocumentStore`] for PostgreSQL and
//! [`InMemoryDocumentStore`] for tests and local runs.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{DocumentSession, DocumentStore};
