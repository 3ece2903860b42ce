use chrono::{DateTime, Duration, SubsecRound, Utc};
use spool_core::{JobId, RegistryRecord};

use db::{CompletionRegistry, DbConfig, DbError};

/// Fresh registry backed by its own in-memory database.
pub async fn setup_registry() -> Result<CompletionRegistry, DbError> {
    let db_conn = db::init(DbConfig::memory()).await?;
    Ok(CompletionRegistry::new(db_conn))
}

/// A record created `age_secs` seconds before `now`.
pub fn record(worker_id: &str, units: u32, now: DateTime<Utc>, age_secs: i64) -> RegistryRecord {
    let created_at = (now - Duration::seconds(age_secs)).trunc_subsecs(6);
    let job_id = JobId::new();
    RegistryRecord {
        job_id,
        filename: format!("{}.pdf", job_id),
        arrived_at: created_at - Duration::seconds(30),
        worker_id: worker_id.to_string(),
        units,
        completed_at: created_at,
        output_path: format!("uploads/{}.pdf", job_id),
        created_at,
    }
}
