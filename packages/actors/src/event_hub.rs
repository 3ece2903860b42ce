//! Event hub: drains worker events in order and fans them out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef};
use spool_core::{Event, JobId, MonitorSnapshot, WorkerActivity};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messages::{HubMessage, SpoolerResult, call_result};
use crate::queue_actor::JobQueue;
use crate::shared::SharedState;

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifies one subscription on the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Receiving end of a subscription.
///
/// Dropping it unsubscribes lazily: the hub prunes the subscriber on the
/// next failed delivery.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next item, or `None` once the hub has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Consume the subscription as a stream.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures_util::stream::unfold(self.receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        })
    }
}

/// Subscribers of one topic.
#[derive(Debug)]
pub(crate) struct SubscriberSet<T> {
    subscribers: Vec<(SubscriberId, mpsc::UnboundedSender<T>)>,
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<T: Clone> SubscriberSet<T> {
    pub fn add(&mut self, id: SubscriberId) -> Subscription<T> {
        let (tx, receiver) = mpsc::unbounded_channel();
        self.subscribers.push((id, tx));
        Subscription { id, receiver }
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Deliver to everyone. Subscribers that cannot receive are dropped;
    /// returns how many were.
    pub fn send(&mut self, item: &T) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|(_, tx)| tx.send(item.clone()).is_ok());
        before - self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// State for the event hub actor.
pub struct EventHubState {
    queue: JobQueue,
    shared: Arc<SharedState>,
    jobs: HashMap<JobId, SubscriberSet<Event>>,
    monitors: SubscriberSet<MonitorSnapshot>,
    next_id: u64,
}

impl EventHubState {
    pub fn new(queue: JobQueue, shared: Arc<SharedState>) -> Self {
        Self {
            queue,
            shared,
            jobs: HashMap::new(),
            monitors: SubscriberSet::default(),
            next_id: 0,
        }
    }

    fn next_subscriber(&mut self) -> SubscriberId {
        self.next_id += 1;
        SubscriberId(self.next_id)
    }

    /// Drop one job subscriber, and the job's entry once nobody is left.
    fn unsubscribe_job(&mut self, job_id: JobId, subscriber: SubscriberId) {
        if let Some(subscribers) = self.jobs.get_mut(&job_id) {
            subscribers.remove(subscriber);
            if subscribers.is_empty() {
                self.jobs.remove(&job_id);
            }
        }
    }

    fn forward_to_job(&mut self, event: &Event) {
        let job_id = event.job_id();
        let Some(subscribers) = self.jobs.get_mut(&job_id) else {
            return;
        };

        let pruned = subscribers.send(event);
        if pruned > 0 {
            tracing::warn!("Pruned {} subscriber(s) of job {}", pruned, job_id);
        }
        if subscribers.is_empty() {
            self.jobs.remove(&job_id);
        }
    }

    async fn refresh_monitors(&mut self) {
        if self.monitors.is_empty() {
            return;
        }

        let queue = match self.queue.snapshot().await {
            Ok(queue) => queue,
            Err(e) => {
                tracing::warn!("Skipping monitor refresh: {}", e);
                return;
            }
        };
        let snapshot = MonitorSnapshot {
            queue,
            workers: self.shared.worker_states(),
            discipline: self.shared.discipline(),
        };

        let pruned = self.monitors.send(&snapshot);
        if pruned > 0 {
            tracing::warn!("Pruned {} monitor subscriber(s)", pruned);
        }
    }
}

/// Single consumer of all worker events.
pub struct EventHubActor;

impl Actor for EventHubActor {
    type Msg = HubMessage;
    type State = EventHubState;
    type Arguments = EventHubState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting event hub");
        Ok(args)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            HubMessage::Publish(event) => {
                tracing::debug!("{}", event.description());

                if let Event::WorkerStatus {
                    status: WorkerActivity::Printing,
                    job_id,
                    ..
                } = *event
                {
                    state.shared.remove_queued(job_id);
                }

                state.forward_to_job(&event);
                state.refresh_monitors().await;
            }

            HubMessage::SubscribeJob { job_id, reply } => {
                let id = state.next_subscriber();
                let subscription = state.jobs.entry(job_id).or_default().add(id);
                if reply.send(subscription).is_err() {
                    state.unsubscribe_job(job_id, id);
                }
            }

            HubMessage::UnsubscribeJob { job_id, subscriber } => {
                state.unsubscribe_job(job_id, subscriber);
            }

            HubMessage::SubscribeMonitor { reply } => {
                let id = state.next_subscriber();
                let subscription = state.monitors.add(id);
                if reply.send(subscription).is_err() {
                    state.monitors.remove(id);
                }
            }

            HubMessage::UnsubscribeMonitor { subscriber } => {
                state.monitors.remove(subscriber);
            }

            HubMessage::RefreshMonitor => {
                state.refresh_monitors().await;
            }
        }

        Ok(())
    }
}

/// Handle to a running event hub.
#[derive(Debug, Clone)]
pub struct EventHub {
    actor: ActorRef<HubMessage>,
}

impl EventHub {
    /// Start a standalone hub reading snapshots from `queue`.
    pub async fn spawn(
        queue: JobQueue,
        shared: Arc<SharedState>,
    ) -> SpoolerResult<(Self, JoinHandle<()>)> {
        let (actor, handle) =
            Actor::spawn(None, EventHubActor, EventHubState::new(queue, shared)).await?;
        Ok((Self { actor }, handle))
    }

    pub(crate) async fn spawn_linked(
        queue: JobQueue,
        shared: Arc<SharedState>,
        supervisor: ActorCell,
    ) -> SpoolerResult<Self> {
        let (actor, _handle) = Actor::spawn_linked(
            None,
            EventHubActor,
            EventHubState::new(queue, shared),
            supervisor,
        )
        .await?;
        Ok(Self { actor })
    }

    pub fn actor(&self) -> &ActorRef<HubMessage> {
        &self.actor
    }

    pub fn publish(&self, event: Event) -> SpoolerResult<()> {
        self.actor
            .send_message(HubMessage::Publish(Box::new(event)))?;
        Ok(())
    }

    /// Receive every later event about `job_id`.
    pub async fn subscribe_job(&self, job_id: JobId) -> SpoolerResult<Subscription<Event>> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| HubMessage::SubscribeJob { job_id, reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    pub fn unsubscribe_job(&self, job_id: JobId, subscriber: SubscriberId) -> SpoolerResult<()> {
        self.actor
            .send_message(HubMessage::UnsubscribeJob { job_id, subscriber })?;
        Ok(())
    }

    /// Receive a monitor snapshot after every event and discipline switch.
    pub async fn subscribe_monitor(&self) -> SpoolerResult<Subscription<MonitorSnapshot>> {
        call_result(
            ractor::rpc::call(
                &self.actor,
                |reply| HubMessage::SubscribeMonitor { reply },
                Some(RPC_TIMEOUT),
            )
            .await,
        )
    }

    pub fn unsubscribe_monitor(&self, subscriber: SubscriberId) -> SpoolerResult<()> {
        self.actor
            .send_message(HubMessage::UnsubscribeMonitor { subscriber })?;
        Ok(())
    }

    pub fn refresh_monitor(&self) -> SpoolerResult<()> {
        self.actor.send_message(HubMessage::RefreshMonitor)?;
        Ok(())
    }

    pub fn stop(&self) {
        self.actor.stop(None);
    }
}
