//! Single-queue fetch task.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::queue::{AttributeMap, MetricKind, QueueAttributeClient, QueueTarget};

/// Why a fetch produced no attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The client did not answer within the per-call timeout.
    Timeout(Duration),
    /// The monitor was cancelled while the request was in flight.
    Cancelled,
    /// The client returned an error.
    Client(String),
    /// The fetch task panicked.
    Panicked(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout(timeout) => write!(f, "timed out after {:?}", timeout),
            FetchError::Cancelled => write!(f, "cancelled"),
            FetchError::Client(message) => write!(f, "{}", message),
            FetchError::Panicked(message) => write!(f, "fetch task panicked: {}", message),
        }
    }
}

/// Outcome of one poll of one queue.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Display name of the polled queue.
    pub queue: String,
    /// Raw attributes, or the failure reason.
    pub outcome: Result<AttributeMap, FetchError>,
}

impl FetchResult {
    pub fn success(queue: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            queue: queue.into(),
            outcome: Ok(attributes),
        }
    }

    pub fn failure(queue: impl Into<String>, error: FetchError) -> Self {
        Self {
            queue: queue.into(),
            outcome: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Fetch the monitored attributes of `target`.
///
/// Always returns a result: client errors, timeouts and cancellation are
/// reported as failures. Values are passed through unparsed.
pub async fn fetch(
    client: &dyn QueueAttributeClient,
    target: &QueueTarget,
    timeout: Duration,
    cancellation_token: &CancellationToken,
) -> FetchResult {
    let request = client.get_attributes(target.address(), &MetricKind::ALL);

    let outcome = tokio::select! {
        biased;

        _ = cancellation_token.cancelled() => Err(FetchError::Cancelled),
        response = tokio::time::timeout(timeout, request) => match response {
            Ok(Ok(attributes)) => Ok(attributes),
            Ok(Err(e)) => Err(FetchError::Client(e.to_string())),
            Err(_) => Err(FetchError::Timeout(timeout)),
        },
    };

    match &outcome {
        Ok(attributes) => {
            debug!(queue = %target.name(), count = attributes.len(), "Fetched queue attributes")
        }
        Err(FetchError::Cancelled) => debug!(queue = %target.name(), "Fetch cancelled"),
        Err(e) => warn!(queue = %target.name(), error = %e, "Error checking queue"),
    }

    FetchResult {
        queue: target.name().to_string(),
        outcome,
    }
}
