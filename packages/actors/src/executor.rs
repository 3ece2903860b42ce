//! Page executors: how a worker prints one page.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use spool_core::Job;

/// Result of printing one page. The error is the failure reason.
pub type PageResult = Result<(), String>;

/// Future type for async page execution.
pub type PageFuture = Pin<Box<dyn Future<Output = PageResult> + Send>>;

/// Trait for page executors.
///
/// Workers call `print_page` once per page, in order, starting at page 1.
/// An error fails the whole job.
pub trait PageExecutor: Send + Sync + 'static {
    fn print_page(&self, job: &Job, page: u32) -> PageFuture;
}

/// Stand-in printer that takes a fixed time per page.
#[derive(Debug, Clone)]
pub struct SimulatedPrinter {
    page_duration: Duration,
}

impl SimulatedPrinter {
    pub fn new(page_duration: Duration) -> Self {
        Self { page_duration }
    }
}

impl Default for SimulatedPrinter {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl PageExecutor for SimulatedPrinter {
    fn print_page(&self, job: &Job, page: u32) -> PageFuture {
        tracing::debug!("Printing page {}/{} of {}", page, job.total_units, job.filename);
        let page_duration = self.page_duration;
        Box::pin(async move {
            tokio::time::sleep(page_duration).await;
            Ok(())
        })
    }
}

/// A simple function-based executor.
pub struct FnExecutor<F>
where
    F: Fn(&Job, u32) -> PageFuture + Send + Sync + 'static,
{
    executor: F,
}

impl<F> FnExecutor<F>
where
    F: Fn(&Job, u32) -> PageFuture + Send + Sync + 'static,
{
    pub fn new(executor: F) -> Self {
        Self { executor }
    }
}

impl<F> PageExecutor for FnExecutor<F>
where
    F: Fn(&Job, u32) -> PageFuture + Send + Sync + 'static,
{
    fn print_page(&self, job: &Job, page: u32) -> PageFuture {
        (self.executor)(job, page)
    }
}
