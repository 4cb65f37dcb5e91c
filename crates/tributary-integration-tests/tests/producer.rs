//! Producer facade tests
//!
//! - Delivery confirmation and error classification
//! - Background delivery-report polling
//! - Flush and the in-flight window
//!
//! Run with: cargo test -p tributary-integration-tests --test producer -- --nocapture

use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;
use tributary::prelude::*;
use tributary_integration_tests::*;

#[tokio::test]
async fn test_produce_returns_assigned_offset() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Immediate).with_next_offset(42);
    let producer = Producer::new(engine.clone(), test_producer_config())?;
    assert_eq!(producer.state(), ProducerState::Active);

    let offset = producer.produce("orders", "order-1", Some("customer-1")).await?;
    assert_eq!(offset, 42);

    let metadata = producer
        .send(ProducerRecord::new("orders", "order-2").partition(2))
        .await?;
    assert_eq!(metadata.topic, "orders");
    assert_eq!(metadata.partition, 2);
    assert_eq!(metadata.offset, 43);

    let stats = producer.stats();
    assert_eq!(stats.records_sent, 2);
    assert_eq!(stats.records_delivered, 2);
    assert_eq!(stats.pending(), 0);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_delivery_error_is_transient() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Fail(ErrorCode::QUEUE_FULL));
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    let err = producer.produce("orders", "x", None).await.unwrap_err();
    assert_eq!(err, Error::Transient(ErrorCode::QUEUE_FULL));
    assert_eq!(err.code(), Some(ErrorCode::QUEUE_FULL));
    assert!(err.is_retriable());
    assert_eq!(producer.state(), ProducerState::Active);

    // The failure did not poison the producer
    engine.set_mode(DeliveryMode::Immediate);
    assert_eq!(producer.produce("orders", "y", None).await?, 0);
    assert_eq!(producer.stats().errors, 1);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_enqueue_refusal_fails_immediately() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Immediate);
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    engine.refuse(Some(ErrorCode::MSG_SIZE_TOO_LARGE));
    assert_eq!(
        producer.produce("orders", vec![0u8; 1024], None).await,
        Err(Error::Transient(ErrorCode::MSG_SIZE_TOO_LARGE))
    );

    // Nothing left pending for the refused record
    producer.flush(Duration::from_millis(50)).await?;

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_empty_topic_never_reaches_engine() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Immediate);
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    assert!(matches!(
        producer.produce("", "x", None).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        producer
            .send(ProducerRecord::new("orders", "x").partition(-1))
            .await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(engine.calls().is_empty());

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_background_poller_collects_reports() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::OnPoll).with_next_offset(10);
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    // Resolves without any further application call
    let offset = tokio::time::timeout(
        Duration::from_secs(2),
        producer.produce("orders", "x", None),
    )
    .await??;
    assert_eq!(offset, 10);
    assert!(engine.polls() > 0);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_flush_waits_for_reports() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Hold);
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    let sends: Vec<_> = (0..3)
        .map(|i| {
            let producer = producer.clone();
            tokio::spawn(async move { producer.produce("orders", format!("m-{}", i), None).await })
        })
        .collect();
    eventually(|| engine.held() == 3).await?;

    let err = producer.flush(Duration::from_millis(30)).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));

    let flush = tokio::spawn({
        let producer = producer.clone();
        async move { producer.flush(Duration::from_secs(2)).await }
    });
    assert_eq!(engine.release(), 3);
    flush.await??;

    let mut offsets = HashSet::new();
    for send in sends {
        offsets.insert(send.await??);
    }
    assert_eq!(offsets.len(), 3);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_in_flight_window_applies_backpressure() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Hold);
    let config = ProducerConfig::builder()
        .poll_interval(Duration::from_millis(5))
        .max_in_flight(1)
        .build();
    let producer = Producer::new(engine.clone(), config)?;

    let first = tokio::spawn({
        let producer = producer.clone();
        async move { producer.produce("orders", "first", None).await }
    });
    eventually(|| engine.held() == 1).await?;

    assert_eq!(
        producer.produce("orders", "second", None).await,
        Err(Error::Transient(ErrorCode::QUEUE_FULL))
    );

    engine.release();
    assert_eq!(first.await??, 0);

    // Window is free again
    engine.set_mode(DeliveryMode::Immediate);
    assert_eq!(producer.produce("orders", "third", None).await?, 1);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_producers_share_engine() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Immediate);
    let producer = Producer::new(engine.clone(), test_producer_config())?;

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let producer = producer.clone();
            tokio::spawn(async move {
                producer
                    .produce("orders", format!("order-{}", i), Some("k"))
                    .await
            })
        })
        .collect();

    let mut offsets = HashSet::new();
    for handle in handles {
        offsets.insert(handle.await??);
    }
    assert_eq!(offsets.len(), 100);
    assert_eq!(producer.stats().records_delivered, 100);

    producer.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_abandoned_send_keeps_window_slot() -> Result<()> {
    init_tracing();
    let engine = ScriptedProducerEngine::new(DeliveryMode::Hold);
    let config = ProducerConfig::builder()
        .poll_interval(Duration::from_millis(5))
        .max_in_flight(1)
        .build();
    let producer = Producer::new(engine.clone(), config)?;

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        producer.produce("orders", "abandoned", None),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(engine.held(), 1);

    // The engine still holds the record, so the window stays full
    assert_eq!(
        producer.produce("orders", "second", None).await,
        Err(Error::Transient(ErrorCode::QUEUE_FULL))
    );

    // The delivery report frees the slot
    assert_eq!(engine.release(), 1);
    producer.flush(Duration::from_secs(2)).await?;
    engine.set_mode(DeliveryMode::Immediate);
    assert_eq!(producer.produce("orders", "third", None).await?, 1);

    producer.close().await?;
    Ok(())
}
