//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(JOB_RECORD_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Completed job records. The record id is the job id.
const JOB_RECORD_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS job_record SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS job_id ON job_record TYPE string;
DEFINE FIELD IF NOT EXISTS filename ON job_record TYPE string;
DEFINE FIELD IF NOT EXISTS arrived_at ON job_record TYPE string;
DEFINE FIELD IF NOT EXISTS worker_id ON job_record TYPE string;
DEFINE FIELD IF NOT EXISTS units ON job_record TYPE int;
DEFINE FIELD IF NOT EXISTS completed_at ON job_record TYPE string;
DEFINE FIELD IF NOT EXISTS output_path ON job_record TYPE string;
-- microseconds since epoch, used for newest-first listing
DEFINE FIELD IF NOT EXISTS created_at ON job_record TYPE int;

DEFINE INDEX IF NOT EXISTS job_record_job_id ON job_record FIELDS job_id UNIQUE;
DEFINE INDEX IF NOT EXISTS job_record_worker ON job_record FIELDS worker_id;
DEFINE INDEX IF NOT EXISTS job_record_created ON job_record FIELDS created_at;
"#;
