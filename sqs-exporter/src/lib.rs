//! sqs-exporter library crate.
//!
//! Periodically samples depth attributes of a fixed set of SQS queues and
//! republishes them as Prometheus gauges.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod queue;
pub mod shutdown;

pub use error::{Error, Result};
