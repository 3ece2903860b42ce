#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actors::{FnExecutor, PageExecutor, Subscription};
use db::{CompletionRegistry, DbConfig};
use spool_core::{Job, JobId, RegistryRecord};
use tokio::sync::{Mutex, Notify};

pub const WAIT: Duration = Duration::from_secs(10);

/// Registry backed by a fresh in-memory database.
pub async fn registry() -> CompletionRegistry {
    let db_conn = db::init(DbConfig::memory())
        .await
        .expect("in-memory database");
    CompletionRegistry::new(db_conn)
}

pub fn job(filename: &str, pages: u32) -> Job {
    Job::new(JobId::new(), filename, format!("uploads/{}", filename), pages)
}

/// Next item, failing the test if nothing arrives in time.
pub async fn recv<T>(subscription: &mut Subscription<T>) -> T {
    tokio::time::timeout(WAIT, subscription.recv())
        .await
        .expect("timed out waiting for subscription")
        .expect("subscription closed")
}

/// Poll `check` until it yields a value.
pub async fn eventually<T, F, Fut>(mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held")
}

pub async fn wait_for_record(registry: &CompletionRegistry, job_id: JobId) -> RegistryRecord {
    eventually(|| async move { registry.get(job_id).await.ok() }).await
}

/// Prints every page immediately.
pub fn instant() -> Arc<dyn PageExecutor> {
    Arc::new(FnExecutor::new(|_job: &Job, _page: u32| {
        Box::pin(async { Ok(()) })
    }))
}

/// Records the order jobs start printing in. A job named `blocker.pdf`
/// holds its worker until the gate is notified.
pub struct Recorder {
    pub gate: Arc<Notify>,
    pub printed: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Notify::new()),
            printed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn executor(&self) -> Arc<dyn PageExecutor> {
        let gate = self.gate.clone();
        let printed = self.printed.clone();
        Arc::new(FnExecutor::new(move |job: &Job, page: u32| {
            let gate = gate.clone();
            let printed = printed.clone();
            let filename = job.filename.clone();
            Box::pin(async move {
                if page == 1 {
                    printed.lock().await.push(filename.clone());
                }
                if filename == "blocker.pdf" {
                    gate.notified().await;
                }
                Ok(())
            })
        }))
    }

    pub async fn printed(&self) -> Vec<String> {
        self.printed.lock().await.clone()
    }

    /// Wait until `filename` has started printing.
    pub async fn wait_started(&self, filename: &str) {
        eventually(|| async move {
            self.printed
                .lock()
                .await
                .iter()
                .any(|f| f == filename)
                .then_some(())
        })
        .await
    }
}
