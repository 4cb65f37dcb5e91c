//! Test helpers and utilities

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use tributary::client::{ConsumerConfig, Message, ProducerConfig};

/// Initialize tracing for tests (call once at start of test)
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tributary_client=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Wait for a condition to become true with timeout
pub async fn wait_for<F, Fut>(
    condition: F,
    timeout_duration: Duration,
    poll_interval: Duration,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout_duration {
        if condition().await {
            return Ok(());
        }
        sleep(poll_interval).await;
    }

    anyhow::bail!("Condition not met within {:?}", timeout_duration)
}

/// Wait for a synchronous predicate, polling every 2ms for up to 2s
pub async fn eventually<F>(condition: F) -> Result<()>
where
    F: Fn() -> bool,
{
    wait_for(
        || {
            let met = condition();
            async move { met }
        },
        Duration::from_secs(2),
        Duration::from_millis(2),
    )
    .await
}

/// Consumer config with short timers suited to tests
pub fn test_consumer_config(group_id: &str) -> ConsumerConfig {
    ConsumerConfig::builder()
        .group_id(group_id)
        .session_timeout(Duration::from_millis(500))
        .poll_interval(Duration::from_millis(5))
        .build()
}

/// Producer config with short timers suited to tests
pub fn test_producer_config() -> ProducerConfig {
    ProducerConfig::builder()
        .poll_interval(Duration::from_millis(5))
        .close_timeout(Duration::from_millis(500))
        .build()
}

/// A message as an engine would hand it over
pub fn test_message(topic: &str, partition: i32, offset: i64, payload: &str) -> Message {
    debug!(topic, partition, offset, "Building test message");
    Message::from_engine_buffer(topic, partition, offset, payload.as_bytes())
}
