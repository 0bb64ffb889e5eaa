//! Queue monitor service implementation.
//!
//! The QueueMonitor drives the poll cycle: fan out one fetch per queue,
//! fan in exactly one result per queue, aggregate, then sleep.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::aggregator::{AggregateReport, aggregate};
use super::fetch::{FetchError, FetchResult, fetch};
use crate::metrics::MetricStore;
use crate::queue::{QueueAttributeClient, QueueTarget};

/// Default time between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default per-call fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the queue monitor.
#[derive(Debug, Clone)]
pub struct QueueMonitorConfig {
    /// Sleep between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Upper bound for a single queue attribute request.
    pub fetch_timeout: Duration,
}

impl Default for QueueMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Where the monitor is within its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Between cycles, about to fan out.
    Idle,
    /// Launching fetch tasks.
    FanningOut,
    /// Waiting for fetch results.
    FanningIn,
    /// Waiting for the next cycle.
    Sleeping,
    /// Stopped. Terminal.
    Cancelled,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "idle"),
            MonitorState::FanningOut => write!(f, "fanning-out"),
            MonitorState::FanningIn => write!(f, "fanning-in"),
            MonitorState::Sleeping => write!(f, "sleeping"),
            MonitorState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a single poll cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Every queue reported and the batch was aggregated.
    Completed(AggregateReport),
    /// Cancellation was observed; nothing was aggregated.
    Cancelled,
}

/// The queue monitor service.
pub struct QueueMonitor {
    /// Queue attribute client shared by all fetch tasks.
    client: Arc<dyn QueueAttributeClient>,
    /// Gauge store updated after each cycle.
    store: Arc<MetricStore>,
    /// Monitored queues, fixed at construction.
    targets: Arc<[QueueTarget]>,
    /// Configuration.
    config: QueueMonitorConfig,
    /// Current state, observable by subscribers.
    state: watch::Sender<MonitorState>,
    /// Cycles that reached aggregation.
    cycles_completed: AtomicU64,
}

impl QueueMonitor {
    /// Create a new queue monitor.
    pub fn new(
        client: Arc<dyn QueueAttributeClient>,
        store: Arc<MetricStore>,
        targets: Vec<QueueTarget>,
    ) -> Self {
        Self::with_config(client, store, targets, QueueMonitorConfig::default())
    }

    /// Create a new queue monitor with custom configuration.
    pub fn with_config(
        client: Arc<dyn QueueAttributeClient>,
        store: Arc<MetricStore>,
        targets: Vec<QueueTarget>,
        config: QueueMonitorConfig,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Idle);

        Self {
            client,
            store,
            targets: targets.into(),
            config,
            state,
            cycles_completed: AtomicU64::new(0),
        }
    }

    /// Current state.
    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state.subscribe()
    }

    /// Number of cycles that completed aggregation.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Monitored queues.
    pub fn targets(&self) -> &[QueueTarget] {
        &self.targets
    }

    /// Poll until `cancellation_token` is cancelled.
    ///
    /// Returns once the monitor reaches [`MonitorState::Cancelled`]. In-flight
    /// fetches are not awaited.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        info!(
            queues = self.targets.len(),
            interval = ?self.config.poll_interval,
            fetch_timeout = ?self.config.fetch_timeout,
            "Starting queue monitor"
        );

        loop {
            let started = Instant::now();

            match self.run_cycle(&cancellation_token).await {
                CycleOutcome::Completed(report) => {
                    let elapsed = started.elapsed();
                    if report.is_clean() {
                        debug!(applied = report.applied, elapsed = ?elapsed, "Poll cycle complete");
                    } else {
                        warn!(
                            applied = report.applied,
                            failed_queues = report.failure_count(),
                            issues = report.issues.len(),
                            elapsed = ?elapsed,
                            "Poll cycle complete with issues"
                        );
                    }
                }
                CycleOutcome::Cancelled => break,
            }

            self.set_state(MonitorState::Sleeping);

            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            self.set_state(MonitorState::Idle);
        }

        self.set_state(MonitorState::Cancelled);
        info!("Queue monitor stopped");
    }

    /// Run one fan-out, fan-in and aggregation pass.
    ///
    /// Every fetch is launched before any result is consumed. On
    /// cancellation the pending fetches are dropped and nothing is
    /// aggregated.
    pub async fn run_cycle(&self, cancellation_token: &CancellationToken) -> CycleOutcome {
        if cancellation_token.is_cancelled() {
            return self.cancelled();
        }

        self.set_state(MonitorState::FanningOut);

        let mut tasks = JoinSet::new();
        let mut queues = HashMap::with_capacity(self.targets.len());
        for target in self.targets.iter() {
            if cancellation_token.is_cancelled() {
                debug!(
                    launched = tasks.len(),
                    total = self.targets.len(),
                    "Cancelled while launching fetches"
                );
                return self.cancelled();
            }

            let client = self.client.clone();
            let target = target.clone();
            let timeout = self.config.fetch_timeout;
            let token = cancellation_token.clone();

            let queue = target.name().to_string();
            let handle = tasks.spawn(async move {
                let fetched = AssertUnwindSafe(fetch(client.as_ref(), &target, timeout, &token))
                    .catch_unwind()
                    .await;

                fetched.unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    error!(queue = %target.name(), error = %message, "Fetch task panicked");
                    FetchResult::failure(target.name(), FetchError::Panicked(message))
                })
            });
            queues.insert(handle.id(), queue);
        }

        self.set_state(MonitorState::FanningIn);

        let mut results = Vec::with_capacity(self.targets.len());
        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    debug!(
                        received = results.len(),
                        pending = tasks.len(),
                        "Cancelled while waiting for fetch results"
                    );
                    return self.cancelled();
                }
                next = tasks.join_next() => match next {
                    Some(Ok(result)) => results.push(result),
                    Some(Err(e)) => results.push(unjoined_result(&queues, e)),
                    None => break,
                },
            }
        }

        let report = aggregate(&self.store, results);
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);

        CycleOutcome::Completed(report)
    }

    fn cancelled(&self) -> CycleOutcome {
        self.set_state(MonitorState::Cancelled);
        CycleOutcome::Cancelled
    }

    fn set_state(&self, state: MonitorState) {
        self.state.send_replace(state);
    }
}

/// Failure result for a fetch task that could not be joined.
fn unjoined_result(queues: &HashMap<task::Id, String>, error: JoinError) -> FetchResult {
    let queue = queues
        .get(&error.id())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    error!(queue = %queue, error = %error, "Fetch task did not complete");

    let reason = if error.is_panic() {
        FetchError::Panicked(panic_message(error.into_panic().as_ref()))
    } else {
        FetchError::Cancelled
    };
    FetchResult::failure(queue, reason)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::Result;
    use crate::queue::{AttributeMap, MetricKind};

    struct FixedClient;

    #[async_trait]
    impl QueueAttributeClient for FixedClient {
        async fn get_attributes(
            &self,
            queue_address: &str,
            _attributes: &[MetricKind],
        ) -> Result<AttributeMap> {
            if queue_address.ends_with("panics") {
                panic!("client bug");
            }
            Ok([("ApproximateNumberOfMessages".to_string(), "1".to_string())]
                .into_iter()
                .collect())
        }
    }

    fn monitor(addresses: &[&str]) -> QueueMonitor {
        QueueMonitor::new(
            Arc::new(FixedClient),
            Arc::new(MetricStore::new()),
            QueueTarget::from_addresses(addresses.iter().copied()).unwrap(),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = QueueMonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_initial_state() {
        let monitor = monitor(&["a/q"]);
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert_eq!(monitor.cycles_completed(), 0);
        assert_eq!(monitor.targets().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_completes() {
        let monitor = monitor(&["a/one", "a/two"]);

        let outcome = monitor.run_cycle(&CancellationToken::new()).await;

        match outcome {
            CycleOutcome::Completed(report) => assert_eq!(report.applied, 2),
            CycleOutcome::Cancelled => panic!("cycle should complete"),
        }
        assert_eq!(monitor.cycles_completed(), 1);
        assert_eq!(monitor.store.get(MetricKind::Available, "two"), Some(1.0));
    }

    #[tokio::test]
    async fn test_cycle_with_pre_cancelled_token() {
        let monitor = monitor(&["a/one"]);
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            monitor.run_cycle(&token).await,
            CycleOutcome::Cancelled
        ));
        assert_eq!(monitor.state(), MonitorState::Cancelled);
        assert_eq!(monitor.cycles_completed(), 0);
        assert!(monitor.store.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_fetch_becomes_failure() {
        let monitor = monitor(&["a/fine", "a/panics"]);

        let report = match monitor.run_cycle(&CancellationToken::new()).await {
            CycleOutcome::Completed(report) => report,
            CycleOutcome::Cancelled => panic!("cycle should complete"),
        };

        assert_eq!(report.applied, 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.issues[0].queue(), "panics");
        assert!(report.issues[0].to_string().contains("client bug"));
    }

    #[tokio::test]
    async fn test_aborted_task_keeps_queue_name() {
        let mut tasks = JoinSet::new();
        let handle = tasks.spawn(std::future::pending::<FetchResult>());
        let queues = HashMap::from([(handle.id(), "orders".to_string())]);
        handle.abort();

        let error = tasks.join_next().await.unwrap().unwrap_err();
        let result = unjoined_result(&queues, error);

        assert_eq!(result.queue, "orders");
        assert_eq!(result.outcome.unwrap_err(), FetchError::Cancelled);
    }

    #[tokio::test]
    async fn test_panicked_task_keeps_queue_name() {
        let target = QueueTarget::new("a/panics").unwrap();
        let mut tasks = JoinSet::new();
        let handle = tasks.spawn(async move {
            fetch(
                &FixedClient,
                &target,
                Duration::from_secs(1),
                &CancellationToken::new(),
            )
            .await
        });
        let queues = HashMap::from([(handle.id(), "panics".to_string())]);

        let error = tasks.join_next().await.unwrap().unwrap_err();
        let result = unjoined_result(&queues, error);

        assert_eq!(result.queue, "panics");
        assert_eq!(
            result.outcome.unwrap_err(),
            FetchError::Panicked("client bug".to_string())
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
