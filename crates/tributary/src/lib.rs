//! # Tributary
//!
//! Async client for partitioned publish/subscribe log brokers.
//!
//! This crate provides a unified API, re-exporting the consumer and producer
//! facades from [`tributary_client`]. The broker protocol is supplied by an
//! engine implementing [`ConsumerEngine`](tributary_client::ConsumerEngine)
//! or [`ProducerEngine`](tributary_client::ProducerEngine).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tributary::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConsumerConfig::builder().group_id("billing").build();
//!     let consumer = Consumer::new(engine, config)?;
//!     consumer.subscribe(["orders"])?;
//!
//!     let msg = consumer.consume_next().await?;
//!     println!("{}[{}]@{}: {:?}", msg.topic, msg.partition, msg.offset, msg.payload);
//!
//!     consumer.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use tributary_client as client;

pub use tributary_client::{Consumer, Error, Producer, Result};

/// Error codes reported by the broker engine.
pub mod taxonomy {
    pub use tributary_client::taxonomy::*;
}

/// Engine interface implemented by broker protocol engines.
pub mod engine {
    pub use tributary_client::engine::*;
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use tributary::prelude::*;
/// ```
pub mod prelude {
    pub use tributary_client::{
        ClientEvent, Consumer, ConsumerConfig, ConsumerEngine, ConsumerState, Error, ErrorCode,
        Message, Offset, Producer, ProducerConfig, ProducerEngine, ProducerRecord,
        ProducerState, RecordMetadata, Result, TopicPartition,
    };
}
