//! Flattening of HPA metric targets into gauge series
//!
//! Each resolvable entry of `spec.metrics` becomes its own gauge named
//! `k8s.hpa.metric.target.<resource>.<kind>`, where `<kind>` is one of
//! `average_utilization`, `average_value` or `value`. Suffixing by target kind
//! keeps two targets on the same resource apart.

use tracing::{debug, warn};

use super::model::{HpaSnapshot, MetricSpec, MetricTarget};
use super::set_resource_attributes;
use crate::utils::metrics_builder::{
    semconv, Attributes, Gauge, InstrumentationScope, Metric, NumberDataPoint, NumberValue,
    ResourceBuilder, ResourceMetrics, ScopeMetrics, Settings, Timestamp, SCOPE_NAME,
};
use crate::utils::quantity::parse_quantity;

/// Target kind component of a flattened metric name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    AverageUtilization,
    AverageValue,
    Value,
}

impl TargetKind {
    fn suffix(self) -> &'static str {
        match self {
            TargetKind::AverageUtilization => "average_utilization",
            TargetKind::AverageValue => "average_value",
            TargetKind::Value => "value",
        }
    }

    fn description(self) -> &'static str {
        match self {
            TargetKind::AverageUtilization => {
                "Target average utilization, in percent of the requested resource."
            }
            TargetKind::AverageValue => "Target value of the metric averaged across pods.",
            TargetKind::Value => "Target value of the metric.",
        }
    }
}

/// `k8s.hpa.metric.target.<stem>.<kind>`
fn target_metric_name(stem: &str, kind: TargetKind) -> String {
    format!("{}.{}.{}", semconv::METRIC_TARGET_PREFIX, stem, kind.suffix())
}

/// Metric stem and point attributes for a supported source, `None` otherwise
fn resolve_source(spec: &MetricSpec) -> Option<(&str, Attributes, Option<&MetricTarget>)> {
    let mut attributes = Attributes::new();
    attributes.insert(
        semconv::METRIC_TYPE.to_string(),
        spec.source_type().to_string(),
    );

    match spec {
        MetricSpec::Resource { name, target } => {
            Some((name.as_str(), attributes, target.as_ref()))
        }
        MetricSpec::ContainerResource {
            name,
            container,
            target,
        } => {
            attributes.insert(semconv::METRIC_CONTAINER.to_string(), container.clone());
            Some((name.as_str(), attributes, target.as_ref()))
        }
        // TODO: name Pods/External/Object series once a naming scheme for
        // custom metric names (which may contain '/') is settled
        MetricSpec::Pods { .. }
        | MetricSpec::External { .. }
        | MetricSpec::Object { .. }
        | MetricSpec::Unknown { .. } => None,
    }
}

/// Target kind and numeric value; quantities that fail to parse yield `None`
fn resolve_target(target: &MetricTarget) -> Option<(TargetKind, NumberValue)> {
    match target {
        MetricTarget::AverageUtilization(percent) => Some((
            TargetKind::AverageUtilization,
            NumberValue::Int(i64::from(*percent)),
        )),
        MetricTarget::AverageValue(quantity) => match parse_quantity(&quantity.0) {
            Ok(v) => Some((TargetKind::AverageValue, NumberValue::Double(v))),
            Err(e) => {
                warn!(quantity = %quantity.0, error = %e, "Skipping average value target");
                None
            }
        },
        MetricTarget::Value(quantity) => match parse_quantity(&quantity.0) {
            Ok(v) => Some((TargetKind::Value, NumberValue::Double(v))),
            Err(e) => {
                warn!(quantity = %quantity.0, error = %e, "Skipping value target");
                None
            }
        },
    }
}

/// Flatten one metric specification into a gauge, `None` when it cannot be mapped
fn flatten_entry(spec: &MetricSpec, ts: Timestamp) -> Option<Metric> {
    let Some((stem, attributes, target)) = resolve_source(spec) else {
        if spec.is_missing_payload() {
            debug!(
                metric_type = spec.source_type(),
                "Skipping metric source with missing payload"
            );
        } else {
            debug!(
                metric_type = spec.source_type(),
                "Skipping unsupported metric source"
            );
        }
        return None;
    };

    let Some(target) = target else {
        debug!(
            metric_type = spec.source_type(),
            resource = stem,
            "Skipping metric without a target value"
        );
        return None;
    };

    let (kind, value) = resolve_target(target)?;

    Some(Metric {
        name: target_metric_name(stem, kind),
        description: kind.description().to_string(),
        unit: String::new(),
        gauge: Gauge {
            data_points: vec![NumberDataPoint {
                attributes,
                timestamp: ts,
                value,
            }],
        },
    })
}

/// Flatten the metric targets of `hpa` into a resource-scoped payload
///
/// The resource is built from `rb` after the HPA identity has been set on it.
/// An HPA without metric specifications yields no scope group at all.
pub fn custom_metrics(
    settings: &Settings,
    rb: &mut ResourceBuilder,
    hpa: &HpaSnapshot,
    ts: Timestamp,
) -> ResourceMetrics {
    set_resource_attributes(rb, hpa);
    let resource = rb.emit();

    let metrics: Vec<Metric> = hpa
        .metrics
        .iter()
        .filter_map(|spec| flatten_entry(spec, ts))
        .collect();

    debug!(
        hpa = %hpa.key(),
        specs = hpa.metrics.len(),
        emitted = metrics.len(),
        "Flattened HPA metric targets"
    );

    if metrics.is_empty() {
        return ResourceMetrics {
            resource,
            scope_metrics: Vec::new(),
        };
    }

    ResourceMetrics {
        resource,
        scope_metrics: vec![ScopeMetrics {
            scope: InstrumentationScope {
                name: SCOPE_NAME.to_string(),
                version: settings.build_info.version.clone(),
            },
            metrics,
        }],
    }
}
