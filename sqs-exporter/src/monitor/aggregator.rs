//! Applies fetch results to the metric store.

use tracing::{debug, warn};

use super::fetch::{FetchError, FetchResult};
use crate::metrics::MetricStore;
use crate::queue::MetricKind;

/// Something skipped while aggregating a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateIssue {
    /// The queue could not be fetched; its metrics are left unchanged.
    FetchFailed { queue: String, error: FetchError },
    /// An attribute value was not a number.
    UnparsableValue {
        queue: String,
        attribute: String,
        raw: String,
    },
    /// An attribute outside the lookup table.
    UnrecognizedAttribute { queue: String, attribute: String },
}

impl AggregateIssue {
    /// Queue the issue belongs to.
    pub fn queue(&self) -> &str {
        match self {
            AggregateIssue::FetchFailed { queue, .. }
            | AggregateIssue::UnparsableValue { queue, .. }
            | AggregateIssue::UnrecognizedAttribute { queue, .. } => queue,
        }
    }
}

impl std::fmt::Display for AggregateIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateIssue::FetchFailed { queue, error } => {
                write!(f, "fetch failed for queue {}: {}", queue, error)
            }
            AggregateIssue::UnparsableValue {
                queue,
                attribute,
                raw,
            } => write!(
                f,
                "unparsable value {:?} for attribute {} on queue {}",
                raw, attribute, queue
            ),
            AggregateIssue::UnrecognizedAttribute { queue, attribute } => {
                write!(f, "unknown attribute {} on queue {}", attribute, queue)
            }
        }
    }
}

/// Result of aggregating one batch.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Number of gauges written.
    pub applied: usize,
    /// Results that were skipped in whole or in part.
    pub issues: Vec<AggregateIssue>,
}

impl AggregateReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queues whose fetch failed.
    pub fn failure_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, AggregateIssue::FetchFailed { .. }))
            .count()
    }

    /// Check if the batch applied without any issue.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Write every valid attribute of `batch` into `store`.
///
/// Results may be in any order. Failures and bad attributes are logged and
/// skipped without affecting the rest of the batch.
pub fn aggregate<I>(store: &MetricStore, batch: I) -> AggregateReport
where
    I: IntoIterator<Item = FetchResult>,
{
    let mut report = AggregateReport::new();

    for result in batch {
        let attributes = match result.outcome {
            Ok(attributes) => attributes,
            Err(error) => {
                report.issues.push(AggregateIssue::FetchFailed {
                    queue: result.queue,
                    error,
                });
                continue;
            }
        };

        for (attribute, raw) in attributes {
            let Some(kind) = MetricKind::from_attribute(&attribute) else {
                warn!(queue = %result.queue, attribute = %attribute, "Unknown attribute");
                report.issues.push(AggregateIssue::UnrecognizedAttribute {
                    queue: result.queue.clone(),
                    attribute,
                });
                continue;
            };

            let value = match raw.parse::<f64>() {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        queue = %result.queue,
                        attribute = %attribute,
                        raw = %raw,
                        error = %e,
                        "Unparsable attribute value"
                    );
                    report.issues.push(AggregateIssue::UnparsableValue {
                        queue: result.queue.clone(),
                        attribute,
                        raw,
                    });
                    continue;
                }
            };

            store.set(kind, &result.queue, value);
            report.applied += 1;
        }
    }

    debug!(
        applied = report.applied,
        issues = report.issues.len(),
        "Aggregated fetch results"
    );

    report
}
