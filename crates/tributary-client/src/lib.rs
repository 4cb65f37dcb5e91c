//! Asynchronous consumer and producer facades over a partitioned log broker
//! engine.
//!
//! The broker protocol itself lives behind the [`ConsumerEngine`] and
//! [`ProducerEngine`] traits. This crate turns the engine's tokened,
//! callback-style completions into awaitable operations with a strict
//! lifecycle and a typed error taxonomy.

pub mod config;
pub mod consumer;
mod dispatch;
pub mod engine;
pub mod error;
pub mod message;
pub mod producer;
pub mod registry;
pub mod taxonomy;
pub mod topic_partition;

pub use config::{ConsumerConfig, ConsumerConfigBuilder, ProducerConfig, ProducerConfigBuilder};
pub use consumer::{Consumer, ConsumerState, ConsumerStatsSnapshot};
pub use dispatch::ClientEvent;
pub use engine::{ConsumerEngine, Engine, EngineEvent, EventSender, Outcome, ProducerEngine, Token};
pub use error::{Error, Result};
pub use message::{Message, ProducerRecord, RecordMetadata, Timestamp};
pub use producer::{Producer, ProducerState, ProducerStatsSnapshot};
pub use registry::{OperationKind, PendingRegistry, PendingResult};
pub use taxonomy::{lookup, ErrorCode, ErrorEntry};
pub use topic_partition::{Offset, TopicPartition};
