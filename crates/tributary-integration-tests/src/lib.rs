//! Tributary Integration Tests
//!
//! End-to-end tests for the consumer and producer facades. The broker engine
//! is replaced by the scripted engines in [`mocks`], so the suites run
//! without a broker. This crate is NOT published to crates.io.
//!
//! # Test Categories
//!
//! - **consumer**: subscription, single-flight consume, commits, rebalances
//! - **producer**: delivery confirmation, background polling, flush, backpressure
//! - **shutdown**: close budgets and fatal-error teardown for both facades
//!
//! # Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p tributary-integration-tests
//!
//! # Run specific test suite
//! cargo test -p tributary-integration-tests --test shutdown
//!
//! # Run with logging
//! RUST_LOG=tributary_client=trace cargo test -p tributary-integration-tests -- --nocapture
//! ```

pub mod helpers;
pub mod mocks;

pub use helpers::*;
pub use mocks::*;
