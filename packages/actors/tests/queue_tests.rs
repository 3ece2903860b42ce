#![allow(clippy::disallowed_methods)]

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use actors::{EventHub, JobQueue, SharedState};
use futures_util::StreamExt;
use spool_core::{Discipline, Event, JobId, JobStatus, Priority};

async fn spawn_queue(discipline: Discipline) -> (JobQueue, Arc<SharedState>) {
    let shared = Arc::new(SharedState::new(discipline));
    let (queue, _handle) = JobQueue::spawn(shared.clone()).await.unwrap();
    (queue, shared)
}

async fn dequeue_ids(queue: &JobQueue, n: usize) -> Vec<JobId> {
    let mut ids = Vec::new();
    for _ in 0..n {
        let (job, _) = queue.dequeue("printer-1").await.unwrap();
        ids.push(job.id);
    }
    ids
}

#[tokio::test]
async fn test_fifo_ignores_priority() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;

    let mut submitted = Vec::new();
    for priority in [5, 1, 3, 1, 9] {
        let job = common::job("doc.pdf", 1);
        submitted.push(job.id);
        queue.enqueue(job, priority).unwrap();
    }

    assert_eq!(dequeue_ids(&queue, 5).await, submitted);
}

#[tokio::test]
async fn test_priority_orders_by_value_then_arrival() {
    let (queue, _shared) = spawn_queue(Discipline::Priority).await;

    let mut submitted = Vec::new();
    for priority in [5, 1, 3, 1, 9] {
        let job = common::job("doc.pdf", 1);
        submitted.push((priority, job.id));
        queue.enqueue(job, priority).unwrap();
    }

    let mut expected = submitted.clone();
    expected.sort_by_key(|(priority, _)| *priority);
    let expected: Vec<JobId> = expected.into_iter().map(|(_, id)| id).collect();

    let snapshot: Vec<JobId> = queue
        .snapshot()
        .await
        .unwrap()
        .into_iter()
        .map(|j| j.job_id)
        .collect();
    assert_eq!(snapshot, expected);
    assert_eq!(dequeue_ids(&queue, 5).await, expected);
}

#[tokio::test]
async fn test_dequeued_job_is_leased() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;
    queue.enqueue(common::job("a.pdf", 2), 4).unwrap();

    let (job, priority) = queue.dequeue("printer-2").await.unwrap();
    assert_eq!(priority, Priority(4));
    assert_eq!(job.priority, Priority(4));
    assert_eq!(job.status, JobStatus::Printing);
    assert_eq!(job.worker_id.as_deref(), Some("printer-2"));
    assert!(job.started_at.is_some());

    queue.record_progress("printer-2", 1).unwrap();
    queue.record_progress("printer-9", 1).unwrap();

    let lost = queue.worker_lost("printer-2", "power cut").await.unwrap().unwrap();
    assert_eq!(lost.id, job.id);
    assert_eq!(lost.status, JobStatus::Failed);
    assert_eq!(lost.units_done, 1);
    assert!(lost.failure.as_deref().unwrap().contains("power cut"));
    assert!(queue.worker_lost("printer-2", "again").await.unwrap().is_none());

    let failed = queue.failed_jobs().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, job.id);
}

#[tokio::test]
async fn test_finish_keeps_only_failed_jobs() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;
    queue.enqueue(common::job("ok.pdf", 1), 1).unwrap();
    queue.enqueue(common::job("bad.pdf", 1), 1).unwrap();

    let (mut ok, _) = queue.dequeue("printer-1").await.unwrap();
    ok.complete(chrono::Utc::now()).unwrap();
    queue.finish("printer-1", ok).unwrap();

    let (mut bad, _) = queue.dequeue("printer-1").await.unwrap();
    bad.fail("out of toner").unwrap();
    queue.finish("printer-1", bad.clone()).unwrap();

    let failed = queue.failed_jobs().await.unwrap();
    assert_eq!(failed, vec![bad]);
    assert!(queue.worker_lost("printer-1", "gone").await.unwrap().is_none());

    assert_eq!(queue.clear_failed().await.unwrap(), 1);
    assert!(queue.failed_jobs().await.unwrap().is_empty());
    assert_eq!(queue.clear_failed().await.unwrap(), 0);
}

#[tokio::test]
async fn test_switching_discipline_loses_nothing() {
    let (queue, shared) = spawn_queue(Discipline::Fifo).await;

    let mut submitted = HashSet::new();
    for round in 0..4 {
        for priority in [3, 1, 2] {
            let job = common::job("doc.pdf", 1);
            submitted.insert(job.id);
            queue.enqueue(job, priority).unwrap();
        }
        let discipline = if round % 2 == 0 {
            Discipline::Priority
        } else {
            Discipline::Fifo
        };
        assert_eq!(queue.set_discipline(discipline).await.unwrap(), discipline);
        assert_eq!(shared.discipline(), discipline);

        // Take one job per round so switches happen with jobs in flight.
        let (job, _) = queue.dequeue("printer-1").await.unwrap();
        assert!(submitted.contains(&job.id));
    }

    let remaining = queue.snapshot().await.unwrap();
    assert_eq!(remaining.len(), submitted.len() - 4);

    let mut seen: HashSet<JobId> = HashSet::new();
    for id in dequeue_ids(&queue, remaining.len()).await {
        assert!(seen.insert(id), "job {} dequeued twice", id);
    }
    assert!(queue.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_is_exact() {
    let (queue, shared) = spawn_queue(Discipline::Fifo).await;

    let jobs: Vec<_> = (0..3).map(|_| common::job("doc.pdf", 1)).collect();
    for job in &jobs {
        queue.enqueue(job.clone(), 1).unwrap();
    }

    let snapshot = queue.snapshot().await.unwrap();
    let ids: Vec<JobId> = snapshot.iter().map(|j| j.job_id).collect();
    assert_eq!(ids, jobs.iter().map(|j| j.id).collect::<Vec<_>>());
    assert_eq!(snapshot[0].filename, "doc.pdf");
    assert_eq!(snapshot[0].arrived_at, jobs[0].arrived_at);
    assert_eq!(queue.snapshot().await.unwrap(), snapshot);

    let (first, _) = queue.dequeue("printer-1").await.unwrap();
    let ids: Vec<JobId> = queue
        .snapshot()
        .await
        .unwrap()
        .iter()
        .map(|j| j.job_id)
        .collect();
    assert!(!ids.contains(&first.id));
    assert_eq!(ids, vec![jobs[1].id, jobs[2].id]);

    // The queued view only shrinks when a worker announces the job.
    assert_eq!(shared.queued().len(), 3);
}

#[tokio::test]
async fn test_ab_scenarios() {
    let (queue, _shared) = spawn_queue(Discipline::Priority).await;
    let a = common::job("a.pdf", 2);
    let b = common::job("b.pdf", 1);
    queue.enqueue(a.clone(), 1).unwrap();
    queue.enqueue(b.clone(), 5).unwrap();
    assert_eq!(dequeue_ids(&queue, 2).await, vec![a.id, b.id]);

    let (queue, _shared) = spawn_queue(Discipline::Priority).await;
    queue.set_discipline(Discipline::Fifo).await.unwrap();
    let a = common::job("a.pdf", 2);
    let b = common::job("b.pdf", 1);
    queue.enqueue(b.clone(), 5).unwrap();
    queue.enqueue(a.clone(), 1).unwrap();
    assert_eq!(dequeue_ids(&queue, 2).await, vec![b.id, a.id]);
}

#[tokio::test]
async fn test_dequeue_blocks_until_enqueue() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;

    let waiting = tokio::spawn({
        let queue = queue.clone();
        async move { queue.dequeue("printer-1").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    let job = common::job("late.pdf", 1);
    queue.enqueue(job.clone(), 1).unwrap();

    let (dequeued, _) = tokio::time::timeout(common::WAIT, waiting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(dequeued.id, job.id);
}

#[tokio::test]
async fn test_abandoned_waiter_is_skipped() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;

    // Gives up before anything arrives.
    let abandoned = tokio::time::timeout(Duration::from_millis(20), queue.dequeue("printer-1")).await;
    assert!(abandoned.is_err());

    let waiting = tokio::spawn({
        let queue = queue.clone();
        async move { queue.dequeue("printer-2").await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let job = common::job("doc.pdf", 1);
    queue.enqueue(job.clone(), 1).unwrap();

    let (dequeued, _) = tokio::time::timeout(common::WAIT, waiting)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(dequeued.id, job.id);
    assert_eq!(dequeued.worker_id.as_deref(), Some("printer-2"));
    assert!(queue.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_enqueue_rejects_started_job() {
    let (queue, _shared) = spawn_queue(Discipline::Fifo).await;
    let mut job = common::job("doc.pdf", 1);
    job.start("printer-1").unwrap();

    assert!(queue.enqueue(job, 1).is_err());
    assert!(queue.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hub_updates_queued_view_and_fans_out() {
    let (queue, shared) = spawn_queue(Discipline::Fifo).await;
    let (hub, _handle) = EventHub::spawn(queue.clone(), shared.clone()).await.unwrap();

    let job = common::job("doc.pdf", 2);
    let other = common::job("other.pdf", 1);
    queue.enqueue(job.clone(), 1).unwrap();
    queue.enqueue(other.clone(), 1).unwrap();

    let mut first = hub.subscribe_job(job.id).await.unwrap();
    let second = hub.subscribe_job(job.id).await.unwrap();
    let mut monitor = hub.subscribe_monitor().await.unwrap();

    hub.publish(Event::printing("printer-1", job.id)).unwrap();
    hub.publish(Event::printing("printer-1", job.id)).unwrap();
    hub.publish(Event::progress("printer-2", other.id, 1, 1)).unwrap();
    hub.publish(Event::progress("printer-1", job.id, 1, 2)).unwrap();

    assert!(matches!(common::recv(&mut first).await, Event::WorkerStatus { .. }));
    assert!(matches!(common::recv(&mut first).await, Event::WorkerStatus { .. }));
    assert!(matches!(
        common::recv(&mut first).await,
        Event::Progress { units_done: 1, .. }
    ));
    assert_eq!(shared.queued(), vec![other.id]);

    let snapshot = common::recv(&mut monitor).await;
    assert_eq!(snapshot.discipline, Discipline::Fifo);
    assert_eq!(snapshot.queue.len(), 2);

    let mut stream = Box::pin(second.into_stream());
    assert!(matches!(stream.next().await, Some(Event::WorkerStatus { .. })));

    hub.unsubscribe_job(job.id, first.id()).unwrap();
    hub.publish(Event::idle("printer-1", job.id)).unwrap();
    assert_eq!(
        tokio::time::timeout(common::WAIT, first.recv()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_hub_refresh_reaches_monitors() {
    let (queue, shared) = spawn_queue(Discipline::Fifo).await;
    let (hub, _handle) = EventHub::spawn(queue.clone(), shared.clone()).await.unwrap();

    let mut monitor = hub.subscribe_monitor().await.unwrap();
    let dropped = hub.subscribe_monitor().await.unwrap();
    drop(dropped);

    queue.set_discipline(Discipline::Priority).await.unwrap();
    hub.refresh_monitor().unwrap();

    let snapshot = common::recv(&mut monitor).await;
    assert_eq!(snapshot.discipline, Discipline::Priority);
    assert!(snapshot.queue.is_empty());

    hub.unsubscribe_monitor(monitor.id()).unwrap();
    hub.refresh_monitor().unwrap();
    assert_eq!(
        tokio::time::timeout(common::WAIT, monitor.recv()).await.unwrap(),
        None
    );
}
