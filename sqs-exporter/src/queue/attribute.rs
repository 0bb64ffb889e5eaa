//! The closed table of queue attributes the exporter understands.

/// Kind of gauge derived from a queue attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// Messages available for retrieval.
    Available,
    /// Messages delayed and not yet readable.
    Delayed,
    /// Messages received but not yet deleted.
    InFlight,
}

impl MetricKind {
    /// Every kind, in exposition order.
    pub const ALL: [MetricKind; 3] = [Self::Available, Self::Delayed, Self::InFlight];

    /// Upstream attribute name requested from the queue service.
    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::Available => "ApproximateNumberOfMessages",
            Self::Delayed => "ApproximateNumberOfMessagesDelayed",
            Self::InFlight => "ApproximateNumberOfMessagesNotVisible",
        }
    }

    /// Exposed metric family name.
    pub fn metric_name(self) -> &'static str {
        match self {
            Self::Available => "sqs_approximatenumberofmessages",
            Self::Delayed => "sqs_approximatenumberofmessagesdelayed",
            Self::InFlight => "sqs_approximatenumberofmessagesnotvisible",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Self::Available => {
                "The approximate number of messages available for retrieval from the queue."
            }
            Self::Delayed => {
                "The approximate number of messages in the queue that are delayed and not available for reading immediately."
            }
            Self::InFlight => "The approximate number of messages that are in flight.",
        }
    }

    /// Look up the kind for an upstream attribute name.
    ///
    /// Returns `None` for attributes outside the table.
    pub fn from_attribute(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.attribute_name() == name)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Available => write!(f, "available"),
            MetricKind::Delayed => write!(f, "delayed"),
            MetricKind::InFlight => write!(f, "in-flight"),
        }
    }
}
