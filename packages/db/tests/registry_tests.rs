#![allow(clippy::disallowed_methods)]

mod common;

use chrono::Utc;
use spool_core::JobId;
use std::error::Error;

use db::DbError;

#[tokio::test]
async fn test_register_and_get() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    let now = Utc::now();

    let record = common::record("printer-1", 3, now, 0);
    registry.register(&record).await?;

    assert!(registry.exists(record.job_id).await?);
    let loaded = registry.get(record.job_id).await?;
    assert_eq!(loaded, record);
    assert_eq!(registry.count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_register_keeps_original() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    let now = Utc::now();

    let original = common::record("printer-1", 3, now, 10);
    registry.register(&original).await?;

    let mut duplicate = original.clone();
    duplicate.worker_id = "printer-2".to_string();
    duplicate.units = 9;
    let err = registry.register(&duplicate).await.unwrap_err();
    assert!(matches!(err, DbError::DuplicateJob(_)));

    let stored = registry.get(original.job_id).await?;
    assert_eq!(stored, original);
    assert_eq!(registry.count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_unknown_job() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    registry
        .register(&common::record("printer-1", 1, Utc::now(), 0))
        .await?;

    let missing = JobId::new();
    assert!(!registry.exists(missing).await?);
    assert!(matches!(
        registry.get(missing).await,
        Err(DbError::JobNotFound(_))
    ));
    assert!(matches!(
        registry.delete(missing).await,
        Err(DbError::JobNotFound(_))
    ));
    assert_eq!(registry.count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_list_newest_first_with_paging() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    let now = Utc::now();

    let oldest = common::record("printer-1", 1, now, 30);
    let middle = common::record("printer-2", 2, now, 20);
    let newest = common::record("printer-1", 3, now, 10);
    for record in [&middle, &oldest, &newest] {
        registry.register(record).await?;
    }

    let all = registry.list_all(None, 0).await?;
    let ids: Vec<JobId> = all.iter().map(|r| r.job_id).collect();
    assert_eq!(ids, vec![newest.job_id, middle.job_id, oldest.job_id]);

    let page = registry.list_all(Some(1), 1).await?;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].job_id, middle.job_id);

    let tail = registry.list_all(None, 2).await?;
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].job_id, oldest.job_id);

    let by_worker = registry.list_by_worker("printer-1").await?;
    let ids: Vec<JobId> = by_worker.iter().map(|r| r.job_id).collect();
    assert_eq!(ids, vec![newest.job_id, oldest.job_id]);
    assert!(registry.list_by_worker("printer-9").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_and_clear() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    let now = Utc::now();

    let first = common::record("printer-1", 2, now, 5);
    let second = common::record("printer-2", 4, now, 1);
    registry.register(&first).await?;
    registry.register(&second).await?;

    let deleted = registry.delete(first.job_id).await?;
    assert_eq!(deleted, first);
    assert!(!registry.exists(first.job_id).await?);
    assert_eq!(registry.count().await?, 1);

    registry.clear_all().await?;
    assert_eq!(registry.count().await?, 0);
    assert!(registry.list_all(None, 0).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_statistics_partition_totals() -> Result<(), Box<dyn Error>> {
    let registry = common::setup_registry().await?;
    let empty = registry.statistics().await?;
    assert_eq!(empty.total_jobs, 0);
    assert!(empty.workers.is_empty());

    let now = Utc::now();
    registry.register(&common::record("printer-1", 2, now, 3)).await?;
    registry.register(&common::record("printer-1", 5, now, 2)).await?;
    registry.register(&common::record("printer-2", 4, now, 1)).await?;

    let stats = registry.statistics().await?;
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.total_units, 11);
    assert_eq!(stats.workers.len(), 2);
    assert_eq!(stats.workers[0].worker_id, "printer-1");
    assert_eq!(stats.workers[0].job_count, 2);
    assert_eq!(stats.workers[0].total_units, 7);
    assert_eq!(stats.workers[1].worker_id, "printer-2");
    assert_eq!(stats.workers[1].job_count, 1);
    assert_eq!(stats.workers[1].total_units, 4);

    Ok(())
}
