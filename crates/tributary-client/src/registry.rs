//! Pending operation registry
//!
//! Correlates engine completions with the callers waiting on them. Every
//! registered operation gets a fresh [`Token`] and a single-use result slot;
//! the slot is filled exactly once, either by [`PendingRegistry::fulfill`] or
//! by [`PendingRegistry::teardown_all`].
//!
//! Registration and fulfillment share one lock, so a token is always recorded
//! before the caller can hand it to the engine.
//!
//! An entry outlives its [`PendingResult`]: the engine still owns the request
//! after a caller stops waiting, so the entry (and any window permit attached
//! to it) is only released when the engine answers or on teardown.

use crate::engine::{Outcome, Token};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{oneshot, Notify, OwnedSemaphorePermit};
use tracing::{debug, trace};

/// What a pending operation is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Consume,
    Commit,
    Produce,
    Close,
}

struct PendingEntry {
    kind: OperationKind,
    tx: oneshot::Sender<Result<Outcome>>,
    permit: Option<OwnedSemaphorePermit>,
}

struct RegistryState {
    next_token: u64,
    pending: HashMap<Token, PendingEntry>,
    closed: bool,
}

/// Receiving half of a pending operation
pub struct PendingResult {
    token: Token,
    rx: oneshot::Receiver<Result<Outcome>>,
}

impl PendingResult {
    pub fn token(&self) -> Token {
        self.token
    }
}

impl Future for PendingResult {
    type Output = Result<Outcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // The sender is only dropped without a value if the registry itself
        // was dropped, which means the client is gone.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(Error::ClientClosed)))
    }
}

/// Thread-safe registry of in-flight engine requests
pub struct PendingRegistry {
    state: Mutex<RegistryState>,
    drained: Notify,
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_token: 1,
                pending: HashMap::new(),
                closed: false,
            }),
            drained: Notify::new(),
        }
    }

    /// Allocate a pending entry.
    ///
    /// Fails with [`Error::ClientClosed`] once teardown has begun.
    pub fn register(&self, kind: OperationKind) -> Result<(Token, PendingResult)> {
        self.insert(kind, None)
    }

    /// Allocate a pending entry holding `permit` until it is resolved.
    pub fn register_with_permit(
        &self,
        kind: OperationKind,
        permit: OwnedSemaphorePermit,
    ) -> Result<(Token, PendingResult)> {
        self.insert(kind, Some(permit))
    }

    fn insert(
        &self,
        kind: OperationKind,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<(Token, PendingResult)> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(Error::ClientClosed);
        }

        let token = Token(state.next_token);
        state.next_token += 1;

        let (tx, rx) = oneshot::channel();
        state.pending.insert(
            token,
            PendingEntry {
                kind,
                tx,
                permit,
            },
        );
        trace!(%token, ?kind, "Registered pending operation");

        Ok((token, PendingResult { token, rx }))
    }

    /// Resolve a pending operation.
    ///
    /// Unknown or already fulfilled tokens are ignored; engines may deliver
    /// duplicate callbacks when they retry. Returns whether an entry was
    /// resolved.
    pub fn fulfill(&self, token: Token, result: Result<Outcome>) -> bool {
        let (entry, now_empty) = {
            let mut state = self.state.lock();
            // Window slot is released under the lock, together with the entry
            let entry = state.pending.remove(&token).map(|entry| {
                drop(entry.permit);
                (entry.kind, entry.tx)
            });
            (entry, state.pending.is_empty())
        };

        let Some((kind, tx)) = entry else {
            debug!(%token, "Completion for unknown or already fulfilled token");
            return false;
        };

        if tx.send(result).is_err() {
            // Caller stopped waiting (dropped its future)
            debug!(%token, ?kind, "Completion for abandoned operation");
        }
        if now_empty {
            self.drained.notify_waiters();
        }
        true
    }

    /// Fail every pending operation with `error` and refuse new ones.
    ///
    /// Returns the number of operations that were failed.
    pub fn teardown_all(&self, error: Error) -> usize {
        let drained: Vec<(Token, PendingEntry)> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.pending.drain().collect()
        };

        let count = drained.len();
        for (token, PendingEntry { kind, tx, permit }) in drained {
            trace!(%token, ?kind, "Failing pending operation on teardown");
            drop(permit);
            let _ = tx.send(Err(error.clone()));
        }
        if count > 0 {
            debug!(count, %error, "Registry torn down");
        }
        self.drained.notify_waiters();
        count
    }

    /// Drop a single entry without resolving it.
    ///
    /// Used when the engine refuses a request synchronously, so the caller
    /// reports the error directly.
    pub(crate) fn discard(&self, token: Token) {
        let now_empty = {
            let mut state = self.state.lock();
            state.pending.remove(&token);
            state.pending.is_empty()
        };
        if now_empty {
            self.drained.notify_waiters();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn pending_of(&self, kind: OperationKind) -> usize {
        self.state
            .lock()
            .pending
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Resolves when the registry next becomes empty
    pub(crate) fn drained(&self) -> tokio::sync::futures::Notified<'_> {
        self.drained.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ErrorCode;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_register_then_fulfill() {
        let registry = PendingRegistry::new();
        let (token, pending) = registry.register(OperationKind::Close).unwrap();
        assert_eq!(pending.token(), token);
        assert_eq!(registry.pending_count(), 1);

        assert!(registry.fulfill(token, Ok(Outcome::Closed)));
        assert!(matches!(pending.await, Ok(Outcome::Closed)));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_second_fulfill_is_noop() {
        let registry = PendingRegistry::new();
        let (token, pending) = registry.register(OperationKind::Commit).unwrap();

        assert!(registry.fulfill(token, Ok(Outcome::Committed(vec![]))));
        assert!(!registry.fulfill(token, Err(Error::Transient(ErrorCode::TIMED_OUT))));

        // First value wins
        assert!(matches!(pending.await, Ok(Outcome::Committed(_))));
    }

    #[test]
    fn test_unknown_token_is_noop() {
        let registry = PendingRegistry::new();
        assert!(!registry.fulfill(Token(99), Ok(Outcome::Closed)));
        assert_eq!(registry.pending_count(), 0);
        assert!(!registry.is_closed());
    }

    #[test]
    fn test_tokens_are_unique() {
        let registry = PendingRegistry::new();
        let (a, _ra) = registry.register(OperationKind::Produce).unwrap();
        let (b, _rb) = registry.register(OperationKind::Produce).unwrap();
        registry.fulfill(a, Ok(Outcome::Closed));
        let (c, _rc) = registry.register(OperationKind::Produce).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[tokio::test]
    async fn test_teardown_fails_everything() {
        let registry = PendingRegistry::new();
        let mut waiters = Vec::new();
        for _ in 0..5 {
            waiters.push(registry.register(OperationKind::Produce).unwrap().1);
        }
        waiters.push(registry.register(OperationKind::Consume).unwrap().1);

        assert_eq!(registry.teardown_all(Error::ClientClosed), 6);
        assert!(registry.is_closed());

        for waiter in waiters {
            assert!(matches!(waiter.await, Err(Error::ClientClosed)));
        }
    }

    #[test]
    fn test_register_after_teardown() {
        let registry = PendingRegistry::new();
        registry.teardown_all(Error::ClientClosed);
        assert!(matches!(
            registry.register(OperationKind::Consume),
            Err(Error::ClientClosed)
        ));
    }

    #[tokio::test]
    async fn test_fulfill_after_teardown_is_noop() {
        let registry = PendingRegistry::new();
        let (token, pending) = registry.register(OperationKind::Produce).unwrap();
        registry.teardown_all(Error::Fatal(ErrorCode::ALL_BROKERS_DOWN));

        assert!(!registry.fulfill(token, Ok(Outcome::Closed)));
        assert!(matches!(
            pending.await,
            Err(Error::Fatal(ErrorCode::ALL_BROKERS_DOWN))
        ));
    }

    #[test]
    fn test_fulfill_abandoned_operation() {
        let registry = PendingRegistry::new();
        let (token, pending) = registry.register(OperationKind::Consume).unwrap();
        drop(pending);
        assert!(registry.fulfill(token, Ok(Outcome::Closed)));
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_permit_held_until_resolved() {
        let window = std::sync::Arc::new(tokio::sync::Semaphore::new(1));
        let registry = PendingRegistry::new();

        let permit = window.clone().try_acquire_owned().unwrap();
        let (token, pending) = registry
            .register_with_permit(OperationKind::Produce, permit)
            .unwrap();

        // Abandoning the result keeps the window occupied
        drop(pending);
        assert_eq!(window.available_permits(), 0);

        registry.fulfill(token, Ok(Outcome::Closed));
        assert_eq!(window.available_permits(), 1);

        let permit = window.clone().try_acquire_owned().unwrap();
        let (_token, _pending) = registry
            .register_with_permit(OperationKind::Produce, permit)
            .unwrap();
        registry.teardown_all(Error::ClientClosed);
        assert_eq!(window.available_permits(), 1);
    }

    #[test]
    fn test_pending_of_kind() {
        let registry = PendingRegistry::new();
        let _a = registry.register(OperationKind::Produce).unwrap();
        let _b = registry.register(OperationKind::Produce).unwrap();
        let (c, _rc) = registry.register(OperationKind::Commit).unwrap();
        assert_eq!(registry.pending_of(OperationKind::Produce), 2);
        assert_eq!(registry.pending_of(OperationKind::Commit), 1);

        registry.discard(c);
        assert_eq!(registry.pending_of(OperationKind::Commit), 0);
    }

    #[tokio::test]
    async fn test_drained_notifies() {
        let registry = std::sync::Arc::new(PendingRegistry::new());
        let (token, _pending) = registry.register(OperationKind::Produce).unwrap();

        let notified = registry.drained();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let r = std::sync::Arc::clone(&registry);
        tokio::spawn(async move {
            r.fulfill(token, Ok(Outcome::Closed));
        });

        tokio::time::timeout(std::time::Duration::from_secs(1), notified)
            .await
            .expect("drain notification");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Each registered operation resolves exactly once, whatever order
        /// (and however many duplicate) completions arrive in.
        #[test]
        fn prop_each_operation_resolves_once(
            count in 1usize..40,
            order in prop::collection::vec(any::<prop::sample::Index>(), 0..120),
        ) {
            let registry = PendingRegistry::new();
            let mut entries: Vec<_> = (0..count)
                .map(|_| registry.register(OperationKind::Produce).unwrap())
                .collect();

            let mut resolved = std::collections::HashSet::new();
            for idx in order {
                let (token, _) = &entries[idx.index(count)];
                let first = resolved.insert(*token);
                prop_assert_eq!(registry.fulfill(*token, Ok(Outcome::Closed)), first);
            }

            prop_assert_eq!(registry.pending_count(), count - resolved.len());
            let failed = registry.teardown_all(Error::ClientClosed);
            prop_assert_eq!(failed, count - resolved.len());

            for (token, mut pending) in entries.drain(..) {
                let value = pending.rx.try_recv();
                if resolved.contains(&token) {
                    prop_assert!(matches!(value, Ok(Ok(Outcome::Closed))));
                } else {
                    prop_assert!(matches!(value, Ok(Err(Error::ClientClosed))));
                }
            }
        }
    }
}
