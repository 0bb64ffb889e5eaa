use std::sync::Arc;

use sqs_exporter::api::{ApiServer, ApiServerConfig, AppState};
use sqs_exporter::config::{self, ExporterConfig};
use sqs_exporter::logging;
use sqs_exporter::metrics::MetricStore;
use sqs_exporter::monitor::QueueMonitor;
use sqs_exporter::queue::{QueueTarget, SqsAttributeClient};
use sqs_exporter::shutdown::shutdown_signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    let (log_format, log_dir) = config::logging_from_env();
    let _guard = logging::init_logging(log_format, log_dir.as_deref())?;

    let config = ExporterConfig::from_env().inspect_err(|e| tracing::error!("{}", e))?;
    let targets = QueueTarget::from_addresses(config.queue_urls.iter().cloned())?;

    tracing::info!(
        interval = ?config.poll_interval,
        queue_urls = ?config.queue_urls,
        port = config.port,
        "Starting queue monitors"
    );

    let client = Arc::new(SqsAttributeClient::from_env().await);
    let store = Arc::new(MetricStore::new());
    let cancel_token = CancellationToken::new();

    let server = ApiServer::with_cancel_token(
        ApiServerConfig::from(&config),
        AppState::new(store.clone()),
        cancel_token.clone(),
    );
    let listener = server.bind().await?;

    let monitor = QueueMonitor::with_config(client, store, targets, config.monitor_config());
    let monitor_handle = tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move { monitor.run(cancel_token).await }
    });

    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            shutdown_signal().await;
            cancel_token.cancel();
        }
    });

    let served = server.serve(listener).await;

    // Server errors also stop the monitor.
    cancel_token.cancel();
    if let Err(e) = monitor_handle.await {
        tracing::error!("Queue monitor task failed: {}", e);
    }

    served?;
    tracing::info!("sqs-exporter stopped");
    Ok(())
}
