//! Queue targets and the attribute client seam.
//!
//! A [`QueueTarget`] is one configured queue address plus its display name.
//! The [`QueueAttributeClient`] trait is the only way the monitor talks to
//! the queue service; [`SqsAttributeClient`] is the production implementation.

mod attribute;
mod client;
mod sqs;
mod target;

pub use attribute::MetricKind;
pub use client::{AttributeMap, QueueAttributeClient};
pub use sqs::SqsAttributeClient;
pub use target::QueueTarget;
