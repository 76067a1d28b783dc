//! Prometheus text exposition of metrics payloads
//!
//! Resource attributes and data point attributes both become labels. Names are
//! sanitized to the Prometheus charset, so `k8s.hpa.current_replicas` is
//! exposed as `k8s_hpa_current_replicas`.

use std::collections::BTreeMap;

use crate::utils::metrics_builder::{Attributes, Metrics};

/// Trait for converting metrics to Prometheus text format
///
/// Implementations emit one HELP/TYPE header per metric family followed by
/// its samples.
pub trait PrometheusFormat {
    fn to_prometheus_format(&self) -> String;
}

/// Helper function to escape label values for Prometheus format
fn escape_label_value(value: &str) -> String {
    let mut result = String::new();
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(ch),
        }
    }
    result
}

/// Replace every character outside `[a-zA-Z0-9_:]` with `_`
fn sanitize_name(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == ':' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if result.starts_with(|ch: char| ch.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// `{key="value",...}` from resource attributes overlaid with point attributes
fn to_label_string(resource: &Attributes, point: &Attributes) -> String {
    let mut labels: BTreeMap<String, &str> = BTreeMap::new();
    for (key, value) in resource.iter().chain(point.iter()) {
        labels.insert(sanitize_name(key), value.as_str());
    }
    if labels.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = labels
        .iter()
        .map(|(key, value)| format!(r#"{}="{}""#, key, escape_label_value(value)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

/// Samples of one metric family
#[derive(Default)]
struct Family {
    help: String,
    samples: Vec<String>,
}

impl PrometheusFormat for Metrics {
    fn to_prometheus_format(&self) -> String {
        let mut families: BTreeMap<String, Family> = BTreeMap::new();

        for rm in &self.resource_metrics {
            for sm in &rm.scope_metrics {
                for metric in &sm.metrics {
                    let name = sanitize_name(&metric.name);
                    let family = families.entry(name.clone()).or_default();
                    if family.help.is_empty() {
                        family.help = metric.description.clone();
                    }
                    for dp in &metric.gauge.data_points {
                        family.samples.push(format!(
                            "{}{} {}",
                            name,
                            to_label_string(&rm.resource.attributes, &dp.attributes),
                            dp.value
                        ));
                    }
                }
            }
        }

        let mut output = String::new();
        for (name, family) in &families {
            if !family.help.is_empty() {
                output.push_str(&format!("# HELP {} {}\n", name, family.help));
            }
            output.push_str(&format!("# TYPE {} gauge\n", name));
            for sample in &family.samples {
                output.push_str(sample);
                output.push('\n');
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::metrics_builder::pdata::Resource;
    use crate::utils::metrics_builder::{
        Gauge, InstrumentationScope, Metric, NumberDataPoint, NumberValue, ResourceMetrics,
        ScopeMetrics, Timestamp,
    };

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resource_metrics(hpa: &str, metrics: Vec<Metric>) -> ResourceMetrics {
        ResourceMetrics {
            resource: Resource {
                attributes: attrs(&[("k8s.hpa.name", hpa), ("k8s.namespace.name", "default")]),
            },
            scope_metrics: vec![ScopeMetrics {
                scope: InstrumentationScope::default(),
                metrics,
            }],
        }
    }

    fn gauge(name: &str, help: &str, value: NumberValue, point: Attributes) -> Metric {
        Metric {
            name: name.to_string(),
            description: help.to_string(),
            unit: String::new(),
            gauge: Gauge {
                data_points: vec![NumberDataPoint {
                    attributes: point,
                    timestamp: Timestamp(1),
                    value,
                }],
            },
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(
            sanitize_name("k8s.hpa.metric.target.cpu.value"),
            "k8s_hpa_metric_target_cpu_value"
        );
        assert_eq!(sanitize_name("a-b/c:d"), "a_b_c:d");
        assert_eq!(sanitize_name("9lives"), "_9lives");
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(escape_label_value(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape_label_value("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_metrics_prometheus_format() {
        let metrics = Metrics {
            resource_metrics: vec![resource_metrics(
                "web",
                vec![
                    gauge(
                        "k8s.hpa.current_replicas",
                        "Current replicas.",
                        NumberValue::Int(5),
                        Attributes::new(),
                    ),
                    gauge(
                        "k8s.hpa.metric.target.cpu.average_value",
                        "Target average value.",
                        NumberValue::Double(1.5),
                        attrs(&[
                            ("k8s.hpa.metric.type", "ContainerResource"),
                            ("k8s.hpa.metric.container", "app"),
                        ]),
                    ),
                ],
            )],
        };

        let output = metrics.to_prometheus_format();
        assert!(output.contains("# HELP k8s_hpa_current_replicas Current replicas.\n"));
        assert!(output.contains("# TYPE k8s_hpa_current_replicas gauge\n"));
        assert!(output.contains(
            r#"k8s_hpa_current_replicas{k8s_hpa_name="web",k8s_namespace_name="default"} 5"#
        ));
        assert!(output.contains(
            r#"k8s_hpa_metric_target_cpu_average_value{k8s_hpa_metric_container="app",k8s_hpa_metric_type="ContainerResource",k8s_hpa_name="web",k8s_namespace_name="default"} 1.5"#
        ));
    }

    #[test]
    fn test_one_header_per_family() {
        let metrics = Metrics {
            resource_metrics: vec![
                resource_metrics(
                    "web",
                    vec![gauge(
                        "k8s.hpa.max_replicas",
                        "Max.",
                        NumberValue::Int(10),
                        Attributes::new(),
                    )],
                ),
                resource_metrics(
                    "api",
                    vec![gauge(
                        "k8s.hpa.max_replicas",
                        "Max.",
                        NumberValue::Int(4),
                        Attributes::new(),
                    )],
                ),
            ],
        };

        let output = metrics.to_prometheus_format();
        assert_eq!(output.matches("# TYPE k8s_hpa_max_replicas gauge").count(), 1);
        assert!(output.contains(r#"k8s_hpa_name="web""#));
        assert!(output.contains(r#"k8s_hpa_name="api""#));
        assert_eq!(output.lines().count(), 4);
    }

    #[test]
    fn test_empty_payload_renders_nothing() {
        assert!(Metrics::default().to_prometheus_format().is_empty());
    }
}
