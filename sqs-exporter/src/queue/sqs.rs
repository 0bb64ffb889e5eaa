//! Amazon SQS implementation of [`QueueAttributeClient`].

use async_trait::async_trait;
use aws_sdk_sqs::config::retry::RetryConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use tracing::{debug, info};

use super::{AttributeMap, MetricKind, QueueAttributeClient};
use crate::{Error, Result};

/// SQS-backed attribute client.
#[derive(Debug, Clone)]
pub struct SqsAttributeClient {
    client: aws_sdk_sqs::Client,
}

impl SqsAttributeClient {
    /// Build a client from the standard AWS environment and profile chain.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        match config.region() {
            Some(region) => info!(region = %region, "SQS client initialized"),
            None => info!("SQS client initialized without a region"),
        }

        Self::from_conf(aws_sdk_sqs::config::Builder::from(&config))
    }

    /// Build a client from an SDK config builder.
    ///
    /// SDK retries are disabled: each call sends exactly one request.
    pub fn from_conf(builder: aws_sdk_sqs::config::Builder) -> Self {
        let config = builder.retry_config(RetryConfig::disabled()).build();
        Self::with_client(aws_sdk_sqs::Client::from_conf(config))
    }

    /// Wrap an already configured SDK client as is.
    pub fn with_client(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueueAttributeClient for SqsAttributeClient {
    async fn get_attributes(
        &self,
        queue_address: &str,
        attributes: &[MetricKind],
    ) -> Result<AttributeMap> {
        let names = attributes
            .iter()
            .map(|kind| QueueAttributeName::from(kind.attribute_name()))
            .collect::<Vec<_>>();

        let output = self
            .client
            .get_queue_attributes()
            .queue_url(queue_address)
            .set_attribute_names(Some(names))
            .send()
            .await
            .map_err(|e| Error::queue_service(DisplayErrorContext(&e).to_string()))?;

        let attributes: AttributeMap = output
            .attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        debug!(queue = %queue_address, count = attributes.len(), "Fetched queue attributes");
        Ok(attributes)
    }
}
