//! Producer facade with delivery confirmation
//!
//! [`Producer`] hands records to a [`ProducerEngine`] and resolves each send
//! once the engine's delivery report for it arrives. Delivery reports are
//! collected by the client's background task, which also calls
//! [`Engine::poll`](crate::engine::Engine::poll) every `poll_interval` so
//! reports surface even when the application is idle.
//!
//! # Example
//!
//! ```rust,ignore
//! use tributary_client::{Producer, ProducerConfig};
//!
//! let producer = Producer::new(engine, ProducerConfig::default())?;
//!
//! // Share across tasks
//! for i in 0..1000 {
//!     let producer = producer.clone();
//!     tokio::spawn(async move {
//!         let offset = producer
//!             .produce("orders", format!("order-{}", i), None)
//!             .await?;
//!         tracing::debug!(offset, "delivered");
//!         Ok::<_, tributary_client::Error>(())
//!     });
//! }
//!
//! producer.flush(std::time::Duration::from_secs(5)).await?;
//! producer.close().await?;
//! ```

use crate::config::ProducerConfig;
use crate::dispatch::{escalate_fatal, ClientEvent, DispatchHooks, Dispatcher};
use crate::engine::{EventSender, Outcome, ProducerEngine};
use crate::error::{Error, Result};
use crate::message::{ProducerRecord, RecordMetadata};
use crate::registry::{OperationKind, PendingRegistry};
use crate::taxonomy::ErrorCode;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Producer lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProducerState {
    Created = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

impl ProducerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ProducerState::Created,
            1 => ProducerState::Active,
            2 => ProducerState::Closing,
            _ => ProducerState::Closed,
        }
    }
}

struct ProducerShared {
    state: AtomicU8,
    events_tx: broadcast::Sender<ClientEvent>,
}

impl ProducerShared {
    fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ProducerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl DispatchHooks for ProducerShared {
    fn on_fatal(&self, code: ErrorCode) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match ProducerState::from_u8(current) {
                    ProducerState::Closed => None,
                    _ => Some(ProducerState::Closing as u8),
                }
            });
        let _ = self.events_tx.send(ClientEvent::Fatal(code));
    }
}

/// Thread-safe producer
///
/// Cheap to clone; clones share the engine, the in-flight window and the
/// background task.
pub struct Producer<E: ProducerEngine> {
    inner: Arc<ProducerInner<E>>,
}

struct ProducerInner<E: ProducerEngine> {
    engine: Arc<E>,
    config: ProducerConfig,
    registry: Arc<PendingRegistry>,
    shared: Arc<ProducerShared>,
    /// Bounds records awaiting a delivery report
    in_flight: Arc<Semaphore>,
    close_started: AtomicBool,
    stats: ProducerStats,
    dispatcher: Dispatcher,
}

impl<E: ProducerEngine> Clone for Producer<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: ProducerEngine> Producer<E> {
    /// Take ownership of `engine` and start the delivery-report poller.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(engine: E, config: ProducerConfig) -> Result<Self> {
        config.validate()?;

        let engine = Arc::new(engine);
        let registry = Arc::new(PendingRegistry::new());
        let (events_tx, _) = broadcast::channel(config.event_capacity);
        let shared = Arc::new(ProducerShared {
            state: AtomicU8::new(ProducerState::Created as u8),
            events_tx,
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
        shared.set_state(ProducerState::Active);

        info!(
            client_id = config.client_id.as_deref().unwrap_or(""),
            poll_interval_ms = config.poll_interval_ms,
            max_in_flight = config.max_in_flight,
            "Producer created"
        );

        Ok(Self {
            inner: Arc::new(ProducerInner {
                engine,
                in_flight: Arc::new(Semaphore::new(config.max_in_flight)),
                config,
                registry,
                shared,
                close_started: AtomicBool::new(false),
                stats: ProducerStats::new(),
                dispatcher,
            }),
        })
    }

    /// Publish `payload` and wait for its delivery report.
    ///
    /// Returns the offset the broker assigned.
    pub async fn produce(
        &self,
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
        key: Option<&str>,
    ) -> Result<i64> {
        let mut record = ProducerRecord::new(topic, payload);
        record.key = key.map(str::to_owned);
        self.send(record).await.map(|metadata| metadata.offset)
    }

    /// Publish a record and wait for its delivery report
    pub async fn send(&self, record: ProducerRecord) -> Result<RecordMetadata> {
        self.ensure_active()?;
        validate_record(&record)?;

        // Released with the registry entry, not with this future
        let permit = Arc::clone(&self.inner.in_flight)
            .try_acquire_owned()
            .map_err(|_| {
                debug!(topic = %record.topic, "In-flight window full");
                Error::Transient(ErrorCode::QUEUE_FULL)
            })?;

        let (token, pending) = self
            .inner
            .registry
            .register_with_permit(OperationKind::Produce, permit)?;
        let stats = &self.inner.stats;
        stats.records_sent.fetch_add(1, Ordering::Relaxed);
        stats
            .bytes_sent
            .fetch_add(record.byte_size() as u64, Ordering::Relaxed);

        trace!(%token, topic = %record.topic, partition = ?record.partition, "Enqueueing record");
        if let Err(code) = self.inner.engine.send(token, record) {
            // Refused at enqueue time; no delivery report will follow
            self.inner.registry.discard(token);
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return Err(self.engine_error(code));
        }

        match pending.await {
            Ok(Outcome::Delivered(metadata)) => {
                stats.records_delivered.fetch_add(1, Ordering::Relaxed);
                trace!(%token, offset = metadata.offset, "Record delivered");
                Ok(metadata)
            }
            Ok(other) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(%token, ?other, "Engine answered produce with the wrong outcome");
                Err(Error::InvalidResponse)
            }
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                debug!(%token, error = %e, "Delivery failed");
                Err(e)
            }
        }
    }

    /// Wait until every record sent so far has a delivery report.
    ///
    /// Fails with [`Error::Timeout`] if reports are still missing after
    /// `timeout`; the records stay in flight.
    pub async fn flush(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            // Arm the notification before checking, so a drain between the
            // check and the wait is not missed
            let drained = self.inner.registry.drained();
            tokio::pin!(drained);
            drained.as_mut().enable();

            let pending = self.inner.registry.pending_of(OperationKind::Produce);
            if pending == 0 {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(format!(
                    "{} deliveries still pending after {:?}",
                    pending, timeout
                )));
            }

            tokio::select! {
                _ = &mut drained => {}
                // Produce may drain while other kinds are still pending
                _ = tokio::time::sleep(remaining.min(Duration::from_millis(10))) => {}
            }
        }
    }

    /// Flush and release the engine.
    ///
    /// Waits at most `close_timeout` for the engine to flush, then stops the
    /// poller and fails whatever is still pending with
    /// [`Error::ClientClosed`].
    pub async fn close(&self) -> Result<()> {
        if self.inner.close_started.swap(true, Ordering::AcqRel) {
            return Err(Error::ClientClosed);
        }
        self.inner.shared.set_state(ProducerState::Closing);

        let budget = self.inner.config.close_timeout();
        info!(
            pending = self.inner.registry.pending_of(OperationKind::Produce),
            "Closing producer"
        );

        match self.inner.registry.register(OperationKind::Close) {
            Ok((token, pending)) => {
                self.inner.engine.shutdown(token, budget);
                match tokio::time::timeout(budget, pending).await {
                    Ok(Ok(Outcome::Closed)) => debug!("Engine flush complete"),
                    Ok(Ok(other)) => warn!(?other, "Engine answered shutdown with the wrong outcome"),
                    Ok(Err(e)) => warn!(error = %e, "Engine flush failed"),
                    Err(_) => warn!(?budget, "Engine flush exceeded close timeout, forcing close"),
                }
            }
            Err(_) => debug!("Registry already torn down, skipping engine flush"),
        }

        self.inner.dispatcher.stop().await;
        let failed = self.inner.registry.teardown_all(Error::ClientClosed);
        self.inner.shared.set_state(ProducerState::Closed);

        let stats = self.stats();
        info!(
            failed,
            sent = stats.records_sent,
            delivered = stats.records_delivered,
            errors = stats.errors,
            "Producer closed"
        );
        Ok(())
    }

    pub fn state(&self) -> ProducerState {
        self.inner.shared.state()
    }

    /// Subscribe to fatal-error notifications
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.shared.events_tx.subscribe()
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.inner.config
    }

    /// Get producer statistics
    pub fn stats(&self) -> ProducerStatsSnapshot {
        let stats = &self.inner.stats;
        ProducerStatsSnapshot {
            records_sent: stats.records_sent.load(Ordering::Relaxed),
            records_delivered: stats.records_delivered.load(Ordering::Relaxed),
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            errors: stats.errors.load(Ordering::Relaxed),
        }
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state() {
            ProducerState::Active => Ok(()),
            ProducerState::Created => Err(Error::IllegalState("producer not started".into())),
            ProducerState::Closing | ProducerState::Closed => Err(Error::ClientClosed),
        }
    }

    fn engine_error(&self, code: ErrorCode) -> Error {
        if code.is_fatal() {
            escalate_fatal(&self.inner.registry, self.inner.shared.as_ref(), code);
        }
        Error::from_code(code)
    }
}

fn validate_record(record: &ProducerRecord) -> Result<()> {
    if record.topic.is_empty() {
        return Err(Error::InvalidArgument("topic must not be empty".into()));
    }
    if let Some(partition) = record.partition {
        if partition < 0 {
            return Err(Error::InvalidArgument(format!(
                "partition must be non-negative, got {}",
                partition
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Statistics
// ============================================================================

struct ProducerStats {
    records_sent: AtomicU64,
    records_delivered: AtomicU64,
    bytes_sent: AtomicU64,
    errors: AtomicU64,
}

impl ProducerStats {
    fn new() -> Self {
        Self {
            records_sent: AtomicU64::new(0),
            records_delivered: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// Producer statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerStatsSnapshot {
    /// Records handed to the engine
    pub records_sent: u64,
    /// Records with a successful delivery report
    pub records_delivered: u64,
    /// Payload and key bytes handed to the engine
    pub bytes_sent: u64,
    /// Refused or failed deliveries
    pub errors: u64,
}

impl ProducerStatsSnapshot {
    /// Calculate success rate
    pub fn success_rate(&self) -> f64 {
        if self.records_sent == 0 {
            1.0
        } else {
            self.records_delivered as f64 / self.records_sent as f64
        }
    }

    /// Records still waiting for a delivery report
    pub fn pending(&self) -> u64 {
        self.records_sent
            .saturating_sub(self.records_delivered + self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = ProducerStatsSnapshot {
            records_sent: 100,
            records_delivered: 90,
            bytes_sent: 4096,
            errors: 5,
        };

        assert!((stats.success_rate() - 0.9).abs() < 0.001);
        assert_eq!(stats.pending(), 5);
        assert_eq!(ProducerStatsSnapshot::default().success_rate(), 1.0);
    }

    #[test]
    fn test_validate_record() {
        assert!(validate_record(&ProducerRecord::new("orders", "v")).is_ok());
        assert!(validate_record(&ProducerRecord::new("orders", "v").partition(0)).is_ok());
        assert!(matches!(
            validate_record(&ProducerRecord::new("", "v")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_record(&ProducerRecord::new("orders", "v").partition(-3)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_state_encoding() {
        for state in [
            ProducerState::Created,
            ProducerState::Active,
            ProducerState::Closing,
            ProducerState::Closed,
        ] {
            assert_eq!(ProducerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_fatal_hook_keeps_closed() {
        let (events_tx, _rx) = broadcast::channel(4);
        let shared = ProducerShared {
            state: AtomicU8::new(ProducerState::Active as u8),
            events_tx,
        };

        shared.on_fatal(ErrorCode::FATAL);
        assert_eq!(shared.state(), ProducerState::Closing);

        shared.set_state(ProducerState::Closed);
        shared.on_fatal(ErrorCode::FATAL);
        assert_eq!(shared.state(), ProducerState::Closed);
    }
}
