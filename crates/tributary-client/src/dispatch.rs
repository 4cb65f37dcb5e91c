//! Background event dispatcher
//!
//! Each client owns one dispatcher task. It drains the engine's event
//! channel into the [`PendingRegistry`] and, when configured, calls
//! [`Engine::poll`] on a fixed interval so queued delivery reports and
//! rebalance callbacks are served even while the application is idle.

use crate::engine::{Engine, EngineEvent};
use crate::error::Error;
use crate::registry::PendingRegistry;
use crate::taxonomy::ErrorCode;
use crate::topic_partition::TopicPartition;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

/// Client-level notifications for the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The partition assignment changed
    Rebalance(Vec<TopicPartition>),
    /// The engine reported a connection-fatal error
    Fatal(ErrorCode),
}

/// Facade callbacks invoked from the dispatcher task
pub(crate) trait DispatchHooks: Send + Sync + 'static {
    fn on_rebalance(&self, _assignment: &[TopicPartition]) {}

    fn on_fatal(&self, code: ErrorCode);
}

/// Move a client towards shutdown after a fatal error.
///
/// Fails every pending operation with `Fatal(code)`; the application is
/// expected to call `close()` afterwards.
pub(crate) fn escalate_fatal<H: DispatchHooks + ?Sized>(
    registry: &PendingRegistry,
    hooks: &H,
    code: ErrorCode,
) {
    warn!(code = %code, "Fatal engine error, failing pending operations");
    hooks.on_fatal(code);
    registry.teardown_all(Error::Fatal(code));
}

/// Handle to a running dispatcher task
pub(crate) struct Dispatcher {
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn the dispatcher on the current tokio runtime
    pub(crate) fn spawn<E, H>(
        engine: Arc<E>,
        registry: Arc<PendingRegistry>,
        hooks: Arc<H>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        poll_interval: Option<Duration>,
    ) -> Self
    where
        E: Engine,
        H: DispatchHooks,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            dispatch_task(engine, registry, hooks, events, poll_interval, shutdown_rx).await;
        });

        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Stop the task and wait for it to exit
    pub(crate) async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatcher task ended abnormally");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn dispatch_task<E, H>(
    engine: Arc<E>,
    registry: Arc<PendingRegistry>,
    hooks: Arc<H>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    poll_interval: Option<Duration>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    E: Engine,
    H: DispatchHooks,
{
    let mut ticker = poll_interval.map(|period| {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    debug!(?poll_interval, "Dispatcher started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            event = events.recv() => {
                match event {
                    Some(event) => dispatch(&registry, hooks.as_ref(), event),
                    None => {
                        // No completion can arrive any more
                        if !registry.is_closed() {
                            escalate_fatal(&registry, hooks.as_ref(), ErrorCode::DESTROY);
                        }
                        break;
                    }
                }
            }
            _ = tick(&mut ticker) => {
                engine.poll();
            }
        }
    }

    // Deliver whatever the engine already queued
    while let Ok(event) = events.try_recv() {
        dispatch(&registry, hooks.as_ref(), event);
    }

    debug!("Dispatcher stopped");
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn dispatch<H: DispatchHooks + ?Sized>(registry: &PendingRegistry, hooks: &H, event: EngineEvent) {
    match event {
        EngineEvent::Completed { token, result } => {
            trace!(%token, ok = result.is_ok(), "Engine completion");
            match result {
                Ok(outcome) => {
                    registry.fulfill(token, Ok(outcome));
                }
                Err(code) if code.is_fatal() => {
                    registry.fulfill(token, Err(Error::Fatal(code)));
                    escalate_fatal(registry, hooks, code);
                }
                Err(code) => {
                    registry.fulfill(token, Err(Error::Transient(code)));
                }
            }
        }
        EngineEvent::Rebalance(assignment) => {
            debug!(partitions = assignment.len(), "Assignment changed");
            hooks.on_rebalance(&assignment);
        }
        EngineEvent::Fatal(code) => escalate_fatal(registry, hooks, code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EventSender, Outcome, Token};
    use crate::registry::OperationKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEngine {
        polls: AtomicUsize,
    }

    impl Engine for CountingEngine {
        fn attach(&self, _events: EventSender) {}

        fn poll(&self) {
            self.polls.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown(&self, _token: Token, _budget: Duration) {}
    }

    #[derive(Default)]
    struct RecordingHooks {
        fatal: Mutex<Vec<ErrorCode>>,
        rebalances: AtomicUsize,
    }

    impl DispatchHooks for RecordingHooks {
        fn on_rebalance(&self, _assignment: &[TopicPartition]) {
            self.rebalances.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fatal(&self, code: ErrorCode) {
            self.fatal.lock().push(code);
        }
    }

    fn setup(
        poll_interval: Option<Duration>,
    ) -> (
        Dispatcher,
        EventSender,
        Arc<PendingRegistry>,
        Arc<RecordingHooks>,
        Arc<CountingEngine>,
    ) {
        let engine = Arc::new(CountingEngine::default());
        let registry = Arc::new(PendingRegistry::new());
        let hooks = Arc::new(RecordingHooks::default());
        let (sender, rx) = EventSender::channel();
        let dispatcher = Dispatcher::spawn(
            Arc::clone(&engine),
            Arc::clone(&registry),
            Arc::clone(&hooks),
            rx,
            poll_interval,
        );
        (dispatcher, sender, registry, hooks, engine)
    }

    #[tokio::test]
    async fn test_completion_reaches_caller() {
        let (dispatcher, sender, registry, _hooks, _engine) = setup(None);
        let (token, pending) = registry.register(OperationKind::Commit).unwrap();

        sender.complete(token, Ok(Outcome::Committed(vec![])));
        assert!(matches!(pending.await, Ok(Outcome::Committed(_))));
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_transient_completion() {
        let (dispatcher, sender, registry, hooks, _engine) = setup(None);
        let (token, pending) = registry.register(OperationKind::Produce).unwrap();

        sender.complete(token, Err(ErrorCode::QUEUE_FULL));
        assert!(matches!(
            pending.await,
            Err(Error::Transient(ErrorCode::QUEUE_FULL))
        ));
        assert!(!registry.is_closed());
        assert!(hooks.fatal.lock().is_empty());
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_fatal_completion_tears_down() {
        let (dispatcher, sender, registry, hooks, _engine) = setup(None);
        let (failing, failing_rx) = registry.register(OperationKind::Produce).unwrap();
        let (_other, other_rx) = registry.register(OperationKind::Produce).unwrap();

        sender.complete(failing, Err(ErrorCode::ALL_BROKERS_DOWN));

        assert!(matches!(
            failing_rx.await,
            Err(Error::Fatal(ErrorCode::ALL_BROKERS_DOWN))
        ));
        assert!(matches!(
            other_rx.await,
            Err(Error::Fatal(ErrorCode::ALL_BROKERS_DOWN))
        ));
        assert!(registry.is_closed());
        assert_eq!(*hooks.fatal.lock(), vec![ErrorCode::ALL_BROKERS_DOWN]);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_fatal_event() {
        let (dispatcher, sender, registry, hooks, _engine) = setup(None);
        let (_token, pending) = registry.register(OperationKind::Consume).unwrap();

        sender.send(EngineEvent::Fatal(ErrorCode::FATAL));
        assert!(matches!(pending.await, Err(Error::Fatal(ErrorCode::FATAL))));
        assert_eq!(hooks.fatal.lock().len(), 1);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_rebalance_hook() {
        let (dispatcher, sender, _registry, hooks, _engine) = setup(None);
        let assignment = vec![TopicPartition::new("orders", 0).unwrap()];
        sender.send(EngineEvent::Rebalance(assignment));

        tokio::time::timeout(Duration::from_secs(1), async {
            while hooks.rebalances.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("rebalance dispatched");
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_poller_pumps_engine() {
        let (dispatcher, _sender, _registry, _hooks, engine) =
            setup(Some(Duration::from_millis(5)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        dispatcher.stop().await;

        let polls = engine.polls.load(Ordering::SeqCst);
        assert!(polls >= 2, "expected periodic polls, got {}", polls);

        // No more polls once stopped
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test]
    async fn test_dropped_event_channel_fails_pending() {
        let (dispatcher, sender, registry, hooks, _engine) = setup(None);
        let (_token, pending) = registry.register(OperationKind::Consume).unwrap();

        drop(sender);

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("pending operation resolved");
        assert!(matches!(result, Err(Error::Fatal(ErrorCode::DESTROY))));
        assert!(registry.is_closed());
        assert!(matches!(
            registry.register(OperationKind::Produce),
            Err(Error::ClientClosed)
        ));
        assert_eq!(*hooks.fatal.lock(), vec![ErrorCode::DESTROY]);
        dispatcher.stop().await;
    }

    #[tokio::test]
    async fn test_stop_does_not_escalate() {
        let (dispatcher, _sender, registry, hooks, _engine) = setup(None);
        dispatcher.stop().await;
        assert!(!registry.is_closed());
        assert!(hooks.fatal.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (dispatcher, sender, _registry, _hooks, _engine) = setup(None);
        dispatcher.stop().await;
        dispatcher.stop().await;
        assert!(sender.is_closed());
    }
}
