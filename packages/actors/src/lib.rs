//! Actor system for the print spooler.
//!
//! This crate provides the Ractor-based engine that orders, dispatches and
//! reports on print jobs.
//!
//! # Architecture
//!
//! - `Supervisor` - owns every other actor and restarts lost workers
//! - `QueueActor` - pending jobs, blocked workers and leases
//! - `WorkerActor` - prints one job at a time, page by page
//! - `EventHubActor` - single consumer of worker events, fans them out
//!
//! # Usage
//!
//! ```ignore
//! use actors::{SimulatedPrinter, Spooler, SpoolerConfig};
//!
//! let config = SpoolerConfig::from_env()?;
//! let printer = Arc::new(SimulatedPrinter::new(config.page_duration()));
//! let spooler = Spooler::start(&config, registry, printer).await?;
//!
//! spooler.submit_job(job, 1)?;
//! spooler.set_discipline_named("priority").await?;
//! ```

mod config;
mod event_hub;
mod executor;
mod messages;
mod pending;
mod queue_actor;
mod shared;
mod spooler;
mod supervisor;
mod worker_actor;

pub use config::{ConfigError, SpoolerConfig};
pub use event_hub::{EventHub, EventHubActor, SubscriberId, Subscription};
pub use executor::{FnExecutor, PageExecutor, PageFuture, PageResult, SimulatedPrinter};
pub use messages::{
    HubMessage, QueueMessage, SpoolerError, SpoolerResult, SupervisorMessage, WorkerMessage,
};
pub use queue_actor::{JobQueue, QueueActor};
pub use shared::SharedState;
pub use spooler::Spooler;
pub use supervisor::{Supervisor, SupervisorArgs, start_supervisor};
pub use worker_actor::{WorkerActor, WorkerArgs};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
