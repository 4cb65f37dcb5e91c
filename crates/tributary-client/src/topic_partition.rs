//! Topic/partition references used for subscription and offset commits

use crate::error::{Error, Result};
use crate::taxonomy::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

const OFFSET_BEGINNING: i64 = -2;
const OFFSET_END: i64 = -1;
const OFFSET_STORED: i64 = -1000;
const OFFSET_INVALID: i64 = -1001;

/// A partition offset, including the logical positions understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Offset {
    /// Start of the partition
    Beginning,
    /// End of the partition (next produced message)
    End,
    /// Last committed offset of the consumer group
    Stored,
    /// Not set
    #[default]
    Invalid,
    /// Concrete position
    Offset(i64),
}

impl Offset {
    /// Decode the raw engine representation
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            OFFSET_BEGINNING => Offset::Beginning,
            OFFSET_END => Offset::End,
            OFFSET_STORED => Offset::Stored,
            OFFSET_INVALID => Offset::Invalid,
            n if n >= 0 => Offset::Offset(n),
            _ => Offset::Invalid,
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Offset::Beginning => OFFSET_BEGINNING,
            Offset::End => OFFSET_END,
            Offset::Stored => OFFSET_STORED,
            Offset::Invalid => OFFSET_INVALID,
            Offset::Offset(n) => n,
        }
    }

    /// Concrete offset value, if any
    pub fn value(self) -> Option<i64> {
        match self {
            Offset::Offset(n) => Some(n),
            _ => None,
        }
    }
}

impl From<i64> for Offset {
    fn from(raw: i64) -> Self {
        Offset::from_raw(raw)
    }
}

impl From<Offset> for i64 {
    fn from(offset: Offset) -> Self {
        offset.to_raw()
    }
}

/// Identifies a partition of a topic along with a position and the error
/// the engine last reported for it.
///
/// Topic and partition are fixed at construction. The offset is read-write;
/// the error is only written by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicPartition {
    topic: String,
    partition: i32,
    offset: Offset,
    error: ErrorCode,
}

impl TopicPartition {
    /// Create a reference with an unset offset and no error.
    ///
    /// Rejects an empty topic or a negative partition.
    pub fn new(topic: impl Into<String>, partition: i32) -> Result<Self> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(Error::InvalidArgument("topic must not be empty".into()));
        }
        if partition < 0 {
            return Err(Error::InvalidArgument(format!(
                "partition must be non-negative, got {}",
                partition
            )));
        }
        Ok(Self {
            topic,
            partition,
            offset: Offset::Invalid,
            error: ErrorCode::NO_ERROR,
        })
    }

    /// Set the offset while building a commit list
    pub fn with_offset(mut self, offset: impl Into<Offset>) -> Self {
        self.offset = offset.into();
        self
    }

    /// Record the outcome of an engine operation on this partition.
    ///
    /// Intended for engine implementations reporting commit results.
    pub fn with_error(mut self, error: ErrorCode) -> Self {
        self.error = error;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn set_offset(&mut self, offset: impl Into<Offset>) {
        self.offset = offset.into();
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    /// Whether `other` names the same topic and partition
    pub fn same_partition(&self, other: &TopicPartition) -> bool {
        self.partition == other.partition && self.topic == other.topic
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.topic, self.partition)?;
        if let Some(offset) = self.offset.value() {
            write!(f, "@{}", offset)?;
        }
        Ok(())
    }
}
