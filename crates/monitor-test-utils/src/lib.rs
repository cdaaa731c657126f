//! # Client Monitor Test Utilities
//!
//! Shared test utilities for the client monitor.
//!
//! This crate provides mock implementations and test fixtures for
//! exercising instrumented clients without a real object store.
//!
//! ## Modules
//!
//! - `mock_client` - In-memory object store implementing `Reader`, `Client`
//!   and `StatusWriter`, with a call log, injected failures and latency
//! - `recording_sink` - Latency sink capturing observations
//! - `fixtures` - Typed and dynamic resources (`Pod`, `ConfigMap`, `Widget`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monitor_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let (monitor, sink) = recording_monitor("app");
//!     let client = monitor.instrument_client(MockClient::new());
//!
//!     let mut pod = fixtures::pod("default", "web");
//!     client.create(&mut pod, &CreateOptions::default()).await.unwrap();
//!
//!     assert_eq!(sink.single().labels.kind, "Pod");
//! }
//! ```

pub mod fixtures;
pub mod mock_client;
pub mod recording_sink;

// Re-export commonly used items
pub use mock_client::{MockCall, MockClient, MockStatusWriter, StoreError};
pub use recording_sink::{recording_monitor, RecordingSink};
