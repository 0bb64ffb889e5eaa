//! Monitored queue identity.

use crate::{Error, Result};

/// A queue to monitor.
///
/// Created once at startup from the configured address list and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueTarget {
    address: String,
    name: String,
}

impl QueueTarget {
    /// Create a target from a queue address.
    ///
    /// Fails if the address is empty or only whitespace.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        if address.trim().is_empty() {
            return Err(Error::validation("queue address must not be empty"));
        }

        let name = derive_name(&address).to_string();
        Ok(Self { address, name })
    }

    /// Build targets for every address in order.
    pub fn from_addresses<I, S>(addresses: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        addresses.into_iter().map(Self::new).collect()
    }

    /// The opaque locator handed to the queue service.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The display label used as the `queue` metric label.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for QueueTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Text after the last `/`, ignoring trailing slashes.
///
/// Falls back to the whole address when no non-empty segment exists.
fn derive_name(address: &str) -> &str {
    let trimmed = address.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_queue_url() {
        let target =
            QueueTarget::new("https://sqs.us-west-2.amazonaws.com/123456789012/MyQueue").unwrap();
        assert_eq!(target.name(), "MyQueue");
        assert_eq!(
            target.address(),
            "https://sqs.us-west-2.amazonaws.com/123456789012/MyQueue"
        );
    }

    #[test]
    fn test_name_without_slash_is_whole_address() {
        let target = QueueTarget::new("orders").unwrap();
        assert_eq!(target.name(), "orders");
    }

    #[test]
    fn test_name_after_final_slash() {
        for (address, expected) in [
            ("a/b/c", "c"),
            ("/leading", "leading"),
            ("queue.fifo/jobs.fifo", "jobs.fifo"),
            ("http://localhost:4566/000000000000/local-queue", "local-queue"),
        ] {
            assert_eq!(QueueTarget::new(address).unwrap().name(), expected);
        }
    }

    #[test]
    fn test_trailing_slash_keeps_name_non_empty() {
        let target = QueueTarget::new("https://sqs.eu-west-1.amazonaws.com/1/Billing/").unwrap();
        assert_eq!(target.name(), "Billing");
    }

    #[test]
    fn test_only_slashes_falls_back_to_address() {
        let target = QueueTarget::new("///").unwrap();
        assert_eq!(target.name(), "///");
    }

    #[test]
    fn test_empty_address_rejected() {
        assert!(matches!(QueueTarget::new(""), Err(Error::Validation(_))));
        assert!(matches!(QueueTarget::new("   "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_from_addresses_preserves_order() {
        let targets = QueueTarget::from_addresses(["x/first", "x/second"]).unwrap();
        let names: Vec<_> = targets.iter().map(QueueTarget::name).collect();
        assert_eq!(names, ["first", "second"]);
    }
}
