//! Interface to the broker-protocol engine
//!
//! The engine owns the connection, the wire protocol and the group
//! membership protocol. The facades only issue requests tagged with a
//! [`Token`] and learn about their completion through the [`EngineEvent`]
//! channel handed over in [`Engine::attach`].
//!
//! Request methods must not block: they enqueue work and return. Anything
//! that finishes later is reported as an event carrying the same token.

use crate::message::{Message, ProducerRecord, RecordMetadata};
use crate::taxonomy::ErrorCode;
use crate::topic_partition::TopicPartition;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Correlation id for a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub(crate) u64);

impl Token {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Successful result of an engine operation
#[derive(Debug, Clone)]
pub enum Outcome {
    Message(Message),
    Delivered(RecordMetadata),
    Committed(Vec<TopicPartition>),
    Closed,
}

/// Everything the engine reports back to the facade
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A tokened request finished
    Completed {
        token: Token,
        result: Result<Outcome, ErrorCode>,
    },
    /// The group coordinator changed this member's assignment
    Rebalance(Vec<TopicPartition>),
    /// The connection is unusable; every pending operation must fail
    Fatal(ErrorCode),
}

/// Channel the engine reports on
///
/// Dropping every clone while the client is running counts as a destroyed
/// handle: pending operations fail with `_DESTROY` and the client moves to
/// `Closing`.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report an event. Returns `false` once the client has shut down.
    pub fn send(&self, event: EngineEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn complete(&self, token: Token, result: Result<Outcome, ErrorCode>) -> bool {
        self.send(EngineEvent::Completed { token, result })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Operations shared by consumer and producer engines
pub trait Engine: Send + Sync + 'static {
    /// Called once by the facade before any request is issued.
    fn attach(&self, events: EventSender);

    /// Serve queued callbacks (delivery reports, rebalances).
    ///
    /// Invoked periodically by the client's background task.
    fn poll(&self) {}

    /// Begin an orderly shutdown and report `Outcome::Closed` for `token`.
    ///
    /// Consumers release their assignment, stop fetching, commit outstanding
    /// offsets and leave the group. Producers flush their send queue. The
    /// engine should finish within `budget`; the facade stops waiting after it.
    fn shutdown(&self, token: Token, budget: Duration);
}

/// Group-member side of the engine
pub trait ConsumerEngine: Engine {
    fn subscribe(&self, topics: &[String]) -> Result<(), ErrorCode>;

    fn unsubscribe(&self) -> Result<(), ErrorCode>;

    /// Fetch the next message across the assigned partitions.
    ///
    /// At most one call is outstanding at a time.
    fn poll_message(&self, token: Token);

    /// Commit offsets. With a token the engine reports
    /// `Outcome::Committed` once the coordinator confirms.
    fn commit(&self, offsets: &[TopicPartition], token: Option<Token>) -> Result<(), ErrorCode>;

    /// Current partition assignment
    fn assignment(&self) -> Vec<TopicPartition>;
}

/// Publishing side of the engine
pub trait ProducerEngine: Engine {
    /// Enqueue a record; the delivery report arrives as
    /// `Outcome::Delivered` or an error for `token`.
    fn send(&self, token: Token, record: ProducerRecord) -> Result<(), ErrorCode>;
}
