//! Queue monitor module for polling queue attributes.
//!
//! The queue monitor is responsible for:
//! - Fetching attributes of every configured queue concurrently
//! - Bounding each fetch with a timeout and isolating its failure
//! - Applying the results to the metric store
//! - Stopping promptly on cancellation

mod aggregator;
mod fetch;
mod service;

pub use aggregator::{AggregateIssue, AggregateReport, aggregate};
pub use fetch::{FetchError, FetchResult, fetch};
pub use service::{
    CycleOutcome, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, MonitorState, QueueMonitor,
    QueueMonitorConfig,
};
