//! Client configuration
//!
//! Both configs can be built in code through their builders or deserialized
//! from whatever file format the application already uses. Engine-specific
//! settings (brokers, security, ...) belong to the engine, not here.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default consumer session timeout, also the close budget
const DEFAULT_SESSION_TIMEOUT_MS: u64 = 10_000;
/// Default interval for pumping engine callbacks
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Default producer close (flush) budget
const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;
/// Default bound on records awaiting a delivery report
const DEFAULT_MAX_IN_FLIGHT: usize = 100_000;
/// Default capacity of the client event channel
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Consumer facade configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Consumer group this member joins
    pub group_id: String,
    /// Optional client identifier, used in logs
    pub client_id: Option<String>,
    /// Group session timeout in milliseconds. Bounds how long `close()`
    /// waits for the engine before forcing shutdown.
    pub session_timeout_ms: u64,
    /// How often the background task calls `Engine::poll` (0 = never)
    pub poll_interval_ms: u64,
    /// Capacity of the `ClientEvent` broadcast channel
    pub event_capacity: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: String::new(),
            client_id: None,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ConsumerConfig {
    pub fn builder() -> ConsumerConfigBuilder {
        ConsumerConfigBuilder::default()
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.group_id.trim().is_empty() {
            return Err(Error::Config("group_id is required".into()));
        }
        if self.session_timeout_ms == 0 {
            return Err(Error::Config("session_timeout_ms must be positive".into()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Builder for [`ConsumerConfig`]
#[derive(Default)]
pub struct ConsumerConfigBuilder {
    config: ConsumerConfig,
}

impl ConsumerConfigBuilder {
    pub fn group_id(mut self, group: impl Into<String>) -> Self {
        self.config.group_id = group.into();
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> ConsumerConfig {
        self.config
    }
}

/// Producer facade configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Optional client identifier, used in logs
    pub client_id: Option<String>,
    /// How often the background task calls `Engine::poll` to collect
    /// delivery reports (0 = never)
    pub poll_interval_ms: u64,
    /// Upper bound for the flush performed by `close()`
    pub close_timeout_ms: u64,
    /// Records allowed to await a delivery report at once. Beyond this,
    /// `send` fails with `_QUEUE_FULL`.
    pub max_in_flight: usize,
    /// Capacity of the `ClientEvent` broadcast channel
    pub event_capacity: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ProducerConfig {
    pub fn builder() -> ProducerConfigBuilder {
        ProducerConfigBuilder::default()
    }

    /// Poll aggressively so delivery reports surface quickly
    pub fn low_latency() -> Self {
        Self {
            poll_interval_ms: 5,
            ..Default::default()
        }
    }

    /// Large in-flight window, relaxed polling
    pub fn high_throughput() -> Self {
        Self {
            poll_interval_ms: 250,
            max_in_flight: 1_000_000,
            close_timeout_ms: 30_000,
            ..Default::default()
        }
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_ms > 0).then(|| Duration::from_millis(self.poll_interval_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.close_timeout_ms == 0 {
            return Err(Error::Config("close_timeout_ms must be positive".into()));
        }
        if self.max_in_flight == 0 {
            return Err(Error::Config("max_in_flight must be positive".into()));
        }
        if self.max_in_flight > Semaphore::MAX_PERMITS {
            return Err(Error::Config(format!(
                "max_in_flight must not exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Builder for [`ProducerConfig`]
#[derive(Default)]
pub struct ProducerConfigBuilder {
    config: ProducerConfig,
}

impl ProducerConfigBuilder {
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn max_in_flight(mut self, max: usize) -> Self {
        self.config.max_in_flight = max;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> ProducerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_builder() {
        let config = ConsumerConfig::builder()
            .group_id("billing")
            .client_id("billing-1")
            .session_timeout(Duration::from_secs(3))
            .poll_interval(Duration::ZERO)
            .build();

        assert_eq!(config.group_id, "billing");
        assert_eq!(config.client_id.as_deref(), Some("billing-1"));
        assert_eq!(config.session_timeout(), Duration::from_secs(3));
        assert_eq!(config.poll_interval(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_consumer_requires_group() {
        let config = ConsumerConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ConsumerConfig::builder()
            .group_id("g")
            .session_timeout(Duration::ZERO)
            .build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_producer_defaults() {
        let config = ProducerConfig::default();
        assert_eq!(config.poll_interval(), Some(Duration::from_millis(100)));
        assert_eq!(config.close_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_producer_presets() {
        assert_eq!(ProducerConfig::low_latency().poll_interval_ms, 5);
        let config = ProducerConfig::high_throughput();
        assert_eq!(config.max_in_flight, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_producer_rejects_zero_window() {
        let config = ProducerConfig::builder().max_in_flight(0).build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_producer_rejects_oversized_window() {
        let config = ProducerConfig::builder().max_in_flight(usize::MAX).build();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config: ProducerConfig =
            serde_json::from_str(&format!(r#"{{"max_in_flight": {}}}"#, usize::MAX)).unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = ProducerConfig::builder()
            .max_in_flight(Semaphore::MAX_PERMITS)
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ConsumerConfig =
            serde_json::from_str(r#"{"group_id": "orders", "session_timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.group_id, "orders");
        assert_eq!(config.session_timeout(), Duration::from_millis(2500));
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);

        let config: ProducerConfig = serde_json::from_str(r#"{"max_in_flight": 10}"#).unwrap();
        assert_eq!(config.max_in_flight, 10);
        assert_eq!(config.close_timeout_ms, DEFAULT_CLOSE_TIMEOUT_MS);
    }
}
