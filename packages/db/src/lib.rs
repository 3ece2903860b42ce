//! SurrealDB integration for the print spooler.
//!
//! This crate provides database connectivity and the completion registry
//! that records finished print jobs.
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
mod schema;
pub mod repositories;

pub use connection::{Database, DbConfig, DbError, connect_db};
pub use repositories::CompletionRegistry;
pub use schema::init_schema;

/// Open the database and make sure the schema exists.
///
/// Call once at startup and hand the returned handle to every component
/// that needs it.
pub async fn init(config: DbConfig) -> Result<Database, DbError> {
    let db = connect_db(&config).await?;
    init_schema(&db).await?;
    Ok(db)
}
