//! Queue attribute client trait.

use std::collections::HashMap;

use async_trait::async_trait;

use super::MetricKind;
use crate::Result;

/// Attribute name to raw value, exactly as returned by the queue service.
pub type AttributeMap = HashMap<String, String>;

/// Fetches named numeric attributes of a queue.
///
/// Implementations must not apply their own retry loop: the monitor issues
/// exactly one request per queue per cycle and bounds it with a timeout.
#[async_trait]
pub trait QueueAttributeClient: Send + Sync {
    /// Request `attributes` for the queue at `queue_address`.
    async fn get_attributes(
        &self,
        queue_address: &str,
        attributes: &[MetricKind],
    ) -> Result<AttributeMap>;
}
