//! Client Monitor Library
//!
//! Transparent latency instrumentation for an object-store client and its
//! read-through cache. Every call made through an instrumented wrapper is
//! timed and recorded into one histogram labeled by calling controller,
//! verb, resource kind, API version and representation.
//!
//! # Architecture
//!
//! ```text
//! caller -> instrumented::* -> timer::Monitor::start -> wrapped client/cache
//!                                        |
//!                           RequestTimer drop -> LatencySink
//! ```
//!
//! # Modules
//!
//! - `client` - Client, cache and status-writer capability traits
//! - `caller` - Caller identity for the `controller` label
//! - `labels` - Verb set and label derivation
//! - `timer` - Monitor and the drop-recording request timer
//! - `instrumented` - Timed client, status writer and cache wrappers
//! - `observability` - Histogram definition and the metrics sink
//! - `config` - Configuration from environment

pub mod caller;
pub mod client;
pub mod config;
pub mod instrumented;
pub mod labels;
pub mod observability;
pub mod timer;

pub use caller::{CallerResolver, ControllerRegistry, FixedCaller, ScopedCaller};
pub use client::{Client, Reader, StatusWriter};
pub use config::{ConfigError, MonitorConfig};
pub use instrumented::{InstrumentedCache, InstrumentedClient, InstrumentedStatusWriter};
pub use labels::{RequestLabels, Verb};
pub use observability::{LatencySink, MetricsSink, Observation};
pub use timer::{Monitor, RequestTimer};
