//! Prometheus metrics exporter.
//!
//! Exports the metric store in Prometheus text format.

use std::sync::Arc;

use super::store::{MetricSample, MetricStore};
use crate::queue::MetricKind;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics exporter.
pub struct PrometheusExporter {
    store: Arc<MetricStore>,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self { store }
    }

    /// Export metrics in Prometheus text format.
    ///
    /// Families without any sample are omitted.
    pub fn export(&self) -> String {
        let snapshot = self.store.snapshot();
        let mut output = String::new();

        for kind in MetricKind::ALL {
            let mut samples = snapshot.iter().filter(|s| s.kind == kind).peekable();
            if samples.peek().is_none() {
                continue;
            }

            self.write_gauge_family(&mut output, kind, samples);
        }

        output
    }

    fn write_gauge_family<'a>(
        &self,
        output: &mut String,
        kind: MetricKind,
        samples: impl Iterator<Item = &'a MetricSample>,
    ) {
        let name = kind.metric_name();
        output.push_str(&format!("# HELP {} {}\n", name, kind.help()));
        output.push_str(&format!("# TYPE {} gauge\n", name));

        for sample in samples {
            output.push_str(&format!(
                "{}{{queue=\"{}\"}} {}\n",
                name,
                escape_label_value(&sample.queue),
                format_value(sample.value)
            ));
        }
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_export_empty() {
        let store = Arc::new(MetricStore::new());
        let exporter = PrometheusExporter::new(store);
        assert_eq!(exporter.export(), "");
    }

    #[test]
    fn test_prometheus_export_with_data() {
        let store = Arc::new(MetricStore::new());
        store.set(MetricKind::Available, "TestQueue", 10.0);
        store.set(MetricKind::Delayed, "TestQueue", 5.0);
        store.set(MetricKind::InFlight, "TestQueue", 2.0);

        let exporter = PrometheusExporter::new(store);
        let output = exporter.export();

        assert!(output.contains("# TYPE sqs_approximatenumberofmessages gauge"));
        assert!(output.contains("sqs_approximatenumberofmessages{queue=\"TestQueue\"} 10\n"));
        assert!(output.contains("sqs_approximatenumberofmessagesdelayed{queue=\"TestQueue\"} 5\n"));
        assert!(
            output.contains("sqs_approximatenumberofmessagesnotvisible{queue=\"TestQueue\"} 2\n")
        );
    }

    #[test]
    fn test_prometheus_export_omits_empty_families() {
        let store = Arc::new(MetricStore::new());
        store.set(MetricKind::Delayed, "orders", 1.5);

        let output = PrometheusExporter::new(store).export();

        assert!(output.contains("sqs_approximatenumberofmessagesdelayed{queue=\"orders\"} 1.5"));
        assert!(!output.contains("# HELP sqs_approximatenumberofmessages "));
        assert!(!output.contains("notvisible"));
    }

    #[test]
    fn test_prometheus_single_header_per_family() {
        let store = Arc::new(MetricStore::new());
        store.set(MetricKind::Available, "a", 1.0);
        store.set(MetricKind::Available, "b", 2.0);

        let output = PrometheusExporter::new(store).export();

        assert_eq!(
            output.matches("# TYPE sqs_approximatenumberofmessages gauge").count(),
            1
        );
        let a = output.find("queue=\"a\"").unwrap();
        let b = output.find("queue=\"b\"").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label_value("x\ny"), "x\\ny");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(42.0), "42");
    }
}
