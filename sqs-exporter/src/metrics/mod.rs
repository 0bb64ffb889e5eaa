//! Metrics storage and exposition.
//!
//! Holds the latest queue gauges and renders them for Prometheus scrapes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sqs_exporter::metrics::{MetricStore, PrometheusExporter};
//! use sqs_exporter::queue::MetricKind;
//!
//! let store = Arc::new(MetricStore::new());
//! store.set(MetricKind::Available, "orders", 10.0);
//!
//! let exporter = PrometheusExporter::new(store);
//! assert!(exporter.export().contains("sqs_approximatenumberofmessages{queue=\"orders\"} 10"));
//! ```

mod prometheus;
mod store;

pub use prometheus::{CONTENT_TYPE, PrometheusExporter};
pub use store::{MetricKey, MetricSample, MetricStore};
