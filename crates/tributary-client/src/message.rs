//! Consumed messages and delivery metadata

use crate::taxonomy::ErrorCode;
use bytes::Bytes;

/// Message timestamp as reported by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Set by the producer (milliseconds since epoch)
    CreateTime(i64),
    /// Set by the broker on append (milliseconds since epoch)
    LogAppendTime(i64),
}

impl Timestamp {
    pub fn millis(self) -> i64 {
        match self {
            Timestamp::CreateTime(ms) | Timestamp::LogAppendTime(ms) => ms,
        }
    }
}

/// A message delivered to the application.
///
/// The payload is always owned by the message; it never aliases a buffer the
/// engine may reuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub error: ErrorCode,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Bytes,
    pub key: Option<String>,
    pub timestamp: Option<Timestamp>,
}

impl Message {
    /// Build a message from a buffer the engine keeps ownership of.
    ///
    /// The payload is copied.
    pub fn from_engine_buffer(
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        payload: &[u8],
    ) -> Self {
        Self {
            error: ErrorCode::NO_ERROR,
            topic: topic.into(),
            partition,
            offset,
            payload: Bytes::copy_from_slice(payload),
            key: None,
            timestamp: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Human-readable form of `error`
    pub fn error_string(&self) -> &'static str {
        self.error.message()
    }
}

/// Record handed to the producer engine
#[derive(Debug, Clone)]
pub struct ProducerRecord {
    pub topic: String,
    /// Explicit partition; `None` lets the engine's partitioner decide
    pub partition: Option<i32>,
    pub key: Option<String>,
    pub payload: Bytes,
}

impl ProducerRecord {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            key: None,
            payload: payload.into(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub(crate) fn byte_size(&self) -> usize {
        self.payload.len() + self.key.as_ref().map(|k| k.len()).unwrap_or(0)
    }
}

/// Metadata returned after a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp: Option<Timestamp>,
}
