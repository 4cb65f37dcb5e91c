//! Group consumer facade
//!
//! [`Consumer`] wraps a [`ConsumerEngine`] with:
//! - Topic subscription with validation
//! - Single-flight `consume_next` backed by the pending operation registry
//! - Fire-and-forget and confirmed offset commits
//! - Multi-phase close bounded by the group session timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use tributary_client::{Consumer, ConsumerConfig, TopicPartition};
//!
//! let config = ConsumerConfig::builder().group_id("billing").build();
//! let consumer = Consumer::new(engine, config)?;
//! consumer.subscribe(["orders"])?;
//!
//! loop {
//!     let msg = consumer.consume_next().await?;
//!     handle(&msg);
//!     let next = TopicPartition::new(msg.topic.clone(), msg.partition)?
//!         .with_offset(msg.offset + 1);
//!     consumer.commit(&[next])?;
//! }
//! ```
//!
//! # Lifecycle
//!
//! `Created → Subscribed → Consuming ⇄ Committing → Closing → Closed`.
//! Every operation fails with [`Error::ClientClosed`] once closing began.
//! A fatal engine error moves the consumer to `Closing` and fails all pending
//! operations; call [`Consumer::close`] afterwards to release the engine.

use crate::config::ConsumerConfig;
use crate::dispatch::{escalate_fatal, ClientEvent, DispatchHooks, Dispatcher};
use crate::engine::{ConsumerEngine, EventSender, Outcome};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::registry::{OperationKind, PendingRegistry, PendingResult};
use crate::taxonomy::ErrorCode;
use crate::topic_partition::TopicPartition;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Consumer lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConsumerState {
    Created = 0,
    Subscribed = 1,
    Consuming = 2,
    Committing = 3,
    Closing = 4,
    Closed = 5,
}

impl ConsumerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConsumerState::Created,
            1 => ConsumerState::Subscribed,
            2 => ConsumerState::Consuming,
            3 => ConsumerState::Committing,
            4 => ConsumerState::Closing,
            _ => ConsumerState::Closed,
        }
    }

    pub fn is_shutting_down(self) -> bool {
        matches!(self, ConsumerState::Closing | ConsumerState::Closed)
    }
}

/// State the dispatcher task shares with the facade
struct ConsumerShared {
    state: AtomicU8,
    events_tx: broadcast::Sender<ClientEvent>,
    stats: ConsumerStats,
}

impl ConsumerShared {
    fn state(&self) -> ConsumerState {
        ConsumerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` unless the consumer is shutting down
    fn advance(&self, to: ConsumerState) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if ConsumerState::from_u8(current).is_shutting_down() {
                    None
                } else {
                    Some(to as u8)
                }
            })
            .is_ok()
    }

    fn transition(&self, from: ConsumerState, to: ConsumerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl DispatchHooks for ConsumerShared {
    fn on_rebalance(&self, assignment: &[TopicPartition]) {
        self.stats.rebalances.fetch_add(1, Ordering::Relaxed);
        // No receivers is fine
        let _ = self.events_tx.send(ClientEvent::Rebalance(assignment.to_vec()));
    }

    fn on_fatal(&self, code: ErrorCode) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match ConsumerState::from_u8(current) {
                    ConsumerState::Closed => None,
                    _ => Some(ConsumerState::Closing as u8),
                }
            });
        let _ = self.events_tx.send(ClientEvent::Fatal(code));
    }
}

/// Consumer group member
///
/// Cheap to clone; clones share the engine and the background task.
pub struct Consumer<E: ConsumerEngine> {
    inner: Arc<ConsumerInner<E>>,
}

struct ConsumerInner<E: ConsumerEngine> {
    engine: Arc<E>,
    config: ConsumerConfig,
    registry: Arc<PendingRegistry>,
    shared: Arc<ConsumerShared>,
    /// Locked while a `consume_next` call runs. Holds the engine read until
    /// the engine answers it, so a read outlives an abandoned call.
    consume_slot: tokio::sync::Mutex<Option<PendingResult>>,
    /// Set by the first `close()`
    close_started: AtomicBool,
    subscription: Mutex<Vec<String>>,
    dispatcher: Dispatcher,
}

impl<E: ConsumerEngine> Clone for Consumer<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: ConsumerEngine> Consumer<E> {
    /// Take ownership of `engine` and start the background task.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(engine: E, config: ConsumerConfig) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(engine);
        let registry = Arc::new(PendingRegistry::new());
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        let shared = Arc::new(ConsumerShared {
            state: AtomicU8::new(ConsumerState::Created as u8),
            events_tx,
            stats: ConsumerStats::new(),
        });

        let (sender, events) = EventSender::channel();
        engine.attach(sender);

        let dispatcher = Dispatcher::spawn(
            Arc::clone(&engine),
            Arc::clone(&registry),
            Arc::clone(&shared),
            events,
            config.poll_interval(),
        );

        info!(
            group_id = %config.group_id,
            client_id = config.client_id.as_deref().unwrap_or(""),
            "Consumer created"
        );

        Ok(Self {
            inner: Arc::new(ConsumerInner {
                engine,
                config,
                registry,
                shared,
                consume_slot: tokio::sync::Mutex::new(None),
                close_started: AtomicBool::new(false),
                subscription: Mutex::new(Vec::new()),
                dispatcher,
            }),
        })
    }

    /// Replace the subscription with `topics`.
    ///
    /// The list must be non-empty and free of duplicates; otherwise nothing
    /// changes and the engine is not contacted.
    pub fn subscribe<I, S>(&self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open()?;
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        validate_topics(&topics)?;

        let mut subscription = self.inner.subscription.lock();
        if !subscription.is_empty() {
            debug!(previous = ?*subscription, "Replacing subscription");
            self.inner
                .engine
                .unsubscribe()
                .map_err(|code| self.engine_error(code))?;
            subscription.clear();
        }

        if let Err(code) = self.inner.engine.subscribe(&topics) {
            self.inner.shared.advance(ConsumerState::Created);
            return Err(self.engine_error(code));
        }

        info!(group_id = %self.inner.config.group_id, ?topics, "Subscribed");
        *subscription = topics;
        self.inner.shared.advance(ConsumerState::Subscribed);
        Ok(())
    }

    /// Leave all subscribed topics
    pub fn unsubscribe(&self) -> Result<()> {
        self.ensure_open()?;
        let mut subscription = self.inner.subscription.lock();
        self.inner
            .engine
            .unsubscribe()
            .map_err(|code| self.engine_error(code))?;
        subscription.clear();
        self.inner.shared.advance(ConsumerState::Created);
        debug!(group_id = %self.inner.config.group_id, "Unsubscribed");
        Ok(())
    }

    /// Wait for the next message from the assigned partitions.
    ///
    /// Only one call may be outstanding; a concurrent second call fails with
    /// [`Error::OperationInProgress`] and leaves the first untouched.
    ///
    /// Dropping the returned future does not cancel the engine read. The next
    /// call resumes it instead of asking the engine again, so a message that
    /// arrives late is handed to that call.
    pub async fn consume_next(&self) -> Result<Message> {
        match self.state() {
            ConsumerState::Closing | ConsumerState::Closed => return Err(Error::ClientClosed),
            ConsumerState::Created => {
                return Err(Error::IllegalState(
                    "consume_next called before subscribe".into(),
                ))
            }
            _ => {}
        }

        let mut slot = self
            .inner
            .consume_slot
            .try_lock()
            .map_err(|_| Error::OperationInProgress("consume_next"))?;

        let pending = match slot.take() {
            Some(pending) => {
                trace!(token = %pending.token(), "Resuming outstanding read");
                pending
            }
            None => {
                let (token, pending) = self.inner.registry.register(OperationKind::Consume)?;
                self.inner
                    .shared
                    .transition(ConsumerState::Subscribed, ConsumerState::Consuming);

                trace!(%token, "Requesting next message");
                self.inner.engine.poll_message(token);
                pending
            }
        };
        // Parked in the slot so an abandoned call leaves it for the next one
        let pending = slot.insert(pending);
        let token = pending.token();
        let outcome = pending.await;
        *slot = None;
        drop(slot);

        let result = match outcome {
            Ok(Outcome::Message(message)) if message.error.is_success() => Ok(message),
            Ok(Outcome::Message(message)) => Err(self.engine_error(message.error)),
            Ok(other) => {
                warn!(%token, ?other, "Engine answered consume with the wrong outcome");
                Err(Error::InvalidResponse)
            }
            Err(e) => Err(e),
        };

        let stats = &self.inner.shared.stats;
        match &result {
            Ok(message) => {
                stats.messages_consumed.fetch_add(1, Ordering::Relaxed);
                stats
                    .bytes_consumed
                    .fetch_add(message.payload.len() as u64, Ordering::Relaxed);
            }
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                debug!(%token, error = %e, "consume_next failed");
            }
        }
        result
    }

    /// Commit offsets without waiting for the coordinator.
    pub fn commit(&self, offsets: &[TopicPartition]) -> Result<()> {
        self.check_commit(offsets)?;
        self.inner
            .engine
            .commit(offsets, None)
            .map_err(|code| self.engine_error(code))?;

        self.inner.shared.stats.commits.fetch_add(1, Ordering::Relaxed);
        debug!(partitions = offsets.len(), "Commit requested");
        Ok(())
    }

    /// Commit offsets and wait for the coordinator's answer.
    ///
    /// Returns the same partitions, in order, with the offset and error the
    /// engine reported for each.
    pub async fn commit_sync(&self, offsets: Vec<TopicPartition>) -> Result<Vec<TopicPartition>> {
        self.check_commit(&offsets)?;
        let (token, pending) = self.inner.registry.register(OperationKind::Commit)?;

        let previous = self.state();
        let committing = matches!(
            previous,
            ConsumerState::Subscribed | ConsumerState::Consuming
        ) && self
            .inner
            .shared
            .transition(previous, ConsumerState::Committing);

        let result = match self.inner.engine.commit(&offsets, Some(token)) {
            Ok(()) => pending.await,
            Err(code) => {
                self.inner.registry.discard(token);
                Err(self.engine_error(code))
            }
        };

        if committing {
            self.inner
                .shared
                .transition(ConsumerState::Committing, previous);
        }

        let stats = &self.inner.shared.stats;
        match result {
            Ok(Outcome::Committed(reported)) => {
                stats.commits.fetch_add(1, Ordering::Relaxed);
                debug!(%token, partitions = offsets.len(), "Commit confirmed");
                Ok(merge_commit_result(offsets, &reported))
            }
            Ok(other) => {
                warn!(%token, ?other, "Engine answered commit with the wrong outcome");
                Err(Error::InvalidResponse)
            }
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Leave the group and release the engine.
    ///
    /// Waits at most `session_timeout` for the engine to stop fetching,
    /// commit and leave; after that the shutdown is forced. Every operation
    /// still pending fails with [`Error::ClientClosed`].
    pub async fn close(&self) -> Result<()> {
        if self.inner.close_started.swap(true, Ordering::AcqRel) {
            return Err(Error::ClientClosed);
        }
        self.inner
            .shared
            .state
            .store(ConsumerState::Closing as u8, Ordering::Release);

        let budget = self.inner.config.session_timeout();
        info!(
            group_id = %self.inner.config.group_id,
            pending = self.inner.registry.pending_count(),
            "Closing consumer"
        );

        match self.inner.registry.register(OperationKind::Close) {
            Ok((token, pending)) => {
                self.inner.engine.shutdown(token, budget);
                match tokio::time::timeout(budget, pending).await {
                    Ok(Ok(Outcome::Closed)) => debug!("Engine shutdown complete"),
                    Ok(Ok(other)) => warn!(?other, "Engine answered shutdown with the wrong outcome"),
                    Ok(Err(e)) => warn!(error = %e, "Engine shutdown failed"),
                    Err(_) => warn!(?budget, "Engine shutdown exceeded session timeout, forcing close"),
                }
            }
            // Fatal teardown already happened
            Err(_) => debug!("Registry already torn down, skipping engine shutdown"),
        }

        let failed = self.inner.registry.teardown_all(Error::ClientClosed);
        self.inner.dispatcher.stop().await;
        self.inner.subscription.lock().clear();
        self.inner
            .shared
            .state
            .store(ConsumerState::Closed as u8, Ordering::Release);

        info!(group_id = %self.inner.config.group_id, failed, "Consumer closed");
        Ok(())
    }

    pub fn state(&self) -> ConsumerState {
        self.inner.shared.state()
    }

    /// Topics of the current subscription
    pub fn subscription(&self) -> Vec<String> {
        self.inner.subscription.lock().clone()
    }

    /// Partitions currently assigned by the group coordinator
    pub fn assignment(&self) -> Vec<TopicPartition> {
        if self.state() == ConsumerState::Closed {
            return Vec::new();
        }
        self.inner.engine.assignment()
    }

    /// Subscribe to rebalance and fatal-error notifications
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.shared.events_tx.subscribe()
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> ConsumerStatsSnapshot {
        let stats = &self.inner.shared.stats;
        ConsumerStatsSnapshot {
            messages_consumed: stats.messages_consumed.load(Ordering::Relaxed),
            bytes_consumed: stats.bytes_consumed.load(Ordering::Relaxed),
            commits: stats.commits.load(Ordering::Relaxed),
            errors: stats.errors.load(Ordering::Relaxed),
            rebalances: stats.rebalances.load(Ordering::Relaxed),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state().is_shutting_down() {
            return Err(Error::ClientClosed);
        }
        Ok(())
    }

    fn check_commit(&self, offsets: &[TopicPartition]) -> Result<()> {
        self.ensure_open()?;
        if offsets.is_empty() {
            return Err(Error::InvalidArgument(
                "commit requires at least one partition".into(),
            ));
        }
        if self.inner.engine.assignment().is_empty() {
            return Err(Error::IllegalState("no partitions assigned".into()));
        }
        Ok(())
    }

    /// Classify an engine code, escalating fatal ones to a teardown.
    fn engine_error(&self, code: ErrorCode) -> Error {
        if code.is_fatal() {
            escalate_fatal(&self.inner.registry, self.inner.shared.as_ref(), code);
        }
        Error::from_code(code)
    }
}

fn validate_topics(topics: &[String]) -> Result<()> {
    if topics.is_empty() {
        return Err(Error::InvalidArgument(
            "topic list must not be empty".into(),
        ));
    }
    let mut seen = HashSet::with_capacity(topics.len());
    for topic in topics {
        if topic.is_empty() {
            return Err(Error::InvalidArgument("topic name must not be empty".into()));
        }
        if !seen.insert(topic.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "duplicate topic '{}'",
                topic
            )));
        }
    }
    Ok(())
}

/// Copy the engine-reported offset and error onto the requested partitions
fn merge_commit_result(
    requested: Vec<TopicPartition>,
    reported: &[TopicPartition],
) -> Vec<TopicPartition> {
    requested
        .into_iter()
        .map(|tp| match reported.iter().find(|r| r.same_partition(&tp)) {
            Some(r) => tp.with_offset(r.offset()).with_error(r.error()),
            None => tp,
        })
        .collect()
}

// ============================================================================
// Statistics
// ============================================================================

struct ConsumerStats {
    messages_consumed: AtomicU64,
    bytes_consumed: AtomicU64,
    commits: AtomicU64,
    errors: AtomicU64,
    rebalances: AtomicU64,
}

impl ConsumerStats {
    fn new() -> Self {
        Self {
            messages_consumed: AtomicU64::new(0),
            bytes_consumed: AtomicU64::new(0),
            commits: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            rebalances: AtomicU64::new(0),
        }
    }
}

/// Consumer statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStatsSnapshot {
    pub messages_consumed: u64,
    pub bytes_consumed: u64,
    /// Commits accepted by the engine (both variants)
    pub commits: u64,
    pub errors: u64,
    pub rebalances: u64,
}
