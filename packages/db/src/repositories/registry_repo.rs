//! Completion registry: durable records of finished print jobs.

use serde::Deserialize;
use spool_core::{JobId, RegistryRecord, RegistryStatistics, WorkerStatistics};

use crate::{Database, DbError};

const TABLE: &str = "job_record";

/// Repository for completed job records.
///
/// Holds its own database handle; clone it freely into workers and request
/// handlers.
#[derive(Clone)]
pub struct CompletionRegistry {
    db: Database,
}

impl CompletionRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a record. Fails with `DuplicateJob` if the job is already
    /// registered; the stored record is left untouched.
    pub async fn register(&self, record: &RegistryRecord) -> Result<(), DbError> {
        let job_id = record.job_id.to_string();

        if self.exists(record.job_id).await? {
            return Err(DbError::DuplicateJob(job_id));
        }

        let created = self
            .db
            .query("CREATE type::thing('job_record', $id) CONTENT $record RETURN NONE")
            .bind(("id", job_id.clone()))
            .bind(("record", record.clone()))
            .await
            .and_then(|response| response.check());

        if let Err(e) = created {
            // Lost a race with a concurrent insert of the same id
            if self.exists(record.job_id).await? {
                return Err(DbError::DuplicateJob(job_id));
            }
            return Err(e.into());
        }

        tracing::debug!("Registered job {}", job_id);
        Ok(())
    }

    /// Check whether a job is registered.
    pub async fn exists(&self, job_id: JobId) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT VALUE job_id FROM type::thing('job_record', $id)")
            .bind(("id", job_id.to_string()))
            .await?;

        let ids: Vec<String> = result.take(0)?;
        Ok(!ids.is_empty())
    }

    /// Get a record by job ID.
    pub async fn get(&self, job_id: JobId) -> Result<RegistryRecord, DbError> {
        let record: Option<RegistryRecord> = self.db.select((TABLE, job_id.to_string())).await?;

        record.ok_or_else(|| DbError::JobNotFound(job_id.to_string()))
    }

    /// List records newest first. `limit = None` returns everything after `offset`.
    pub async fn list_all(
        &self,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<RegistryRecord>, DbError> {
        let limit_clause = limit
            .map(|l| format!("LIMIT {}", l))
            .unwrap_or_default();

        let query = format!(
            "SELECT * FROM {} ORDER BY created_at DESC {} START {}",
            TABLE, limit_clause, offset
        );

        let mut result = self.db.query(&query).await?;
        let records: Vec<RegistryRecord> = result.take(0)?;

        Ok(records)
    }

    /// List the records of one worker, newest first.
    pub async fn list_by_worker(&self, worker_id: &str) -> Result<Vec<RegistryRecord>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM job_record WHERE worker_id = $worker_id ORDER BY created_at DESC")
            .bind(("worker_id", worker_id.to_string()))
            .await?;

        let records: Vec<RegistryRecord> = result.take(0)?;

        Ok(records)
    }

    /// Delete a record, returning what was stored.
    pub async fn delete(&self, job_id: JobId) -> Result<RegistryRecord, DbError> {
        let deleted: Option<RegistryRecord> = self.db.delete((TABLE, job_id.to_string())).await?;

        deleted.ok_or_else(|| DbError::JobNotFound(job_id.to_string()))
    }

    /// Remove every record.
    pub async fn clear_all(&self) -> Result<(), DbError> {
        self.db
            .query("DELETE job_record")
            .await?
            .check()?;

        tracing::info!("Completion registry cleared");
        Ok(())
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS count FROM job_record GROUP ALL")
            .await?;

        #[derive(Deserialize)]
        struct CountResult {
            count: u64,
        }

        let counts: Vec<CountResult> = result.take(0)?;

        Ok(counts.first().map_or(0, |c| c.count))
    }

    /// Job and page totals, overall and per worker.
    pub async fn statistics(&self) -> Result<RegistryStatistics, DbError> {
        let mut result = self
            .db
            .query(
                r#"
                SELECT worker_id, count() AS job_count, math::sum(units) AS total_units
                FROM job_record
                GROUP BY worker_id
                "#,
            )
            .await?;

        let workers: Vec<WorkerStatistics> = result.take(0)?;

        Ok(RegistryStatistics::from_workers(workers))
    }
}
