//! Resource and metrics builders
//!
//! `ResourceBuilder` gates attribute setters behind the enabled switches of a
//! `ResourceAttributesConfig`. `MetricsBuilder` buffers the HPA status gauges
//! and groups them under a resource on `emit_for_resource`.

use super::config::{MetricConfig, MetricsBuilderConfig, ResourceAttributesConfig};
use super::pdata::{
    Attributes, Gauge, InstrumentationScope, Metric, Metrics, NumberDataPoint, NumberValue,
    Resource, ResourceMetrics, ScopeMetrics, Timestamp,
};
use super::{semconv, Settings, SCOPE_NAME};

/// Builds the resource attribute set for one HPA
///
/// Setters for disabled attributes are no-ops. `emit` hands out the collected
/// attributes and leaves the builder empty for the next resource.
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    config: ResourceAttributesConfig,
    attributes: Attributes,
}

impl ResourceBuilder {
    pub fn new(config: ResourceAttributesConfig) -> Self {
        Self {
            config,
            attributes: Attributes::new(),
        }
    }

    fn set(&mut self, enabled: bool, key: &str, value: &str) {
        if enabled {
            self.attributes.insert(key.to_string(), value.to_string());
        }
    }

    pub fn set_hpa_uid(&mut self, value: &str) {
        self.set(self.config.hpa_uid.enabled, semconv::HPA_UID, value);
    }

    pub fn set_hpa_name(&mut self, value: &str) {
        self.set(self.config.hpa_name.enabled, semconv::HPA_NAME, value);
    }

    pub fn set_namespace_name(&mut self, value: &str) {
        self.set(
            self.config.namespace_name.enabled,
            semconv::NAMESPACE_NAME,
            value,
        );
    }

    pub fn set_scaletargetref_kind(&mut self, value: &str) {
        self.set(
            self.config.scaletargetref_kind.enabled,
            semconv::SCALETARGETREF_KIND,
            value,
        );
    }

    pub fn set_scaletargetref_name(&mut self, value: &str) {
        self.set(
            self.config.scaletargetref_name.enabled,
            semconv::SCALETARGETREF_NAME,
            value,
        );
    }

    pub fn set_scaletargetref_apiversion(&mut self, value: &str) {
        self.set(
            self.config.scaletargetref_apiversion.enabled,
            semconv::SCALETARGETREF_APIVERSION,
            value,
        );
    }

    pub fn emit(&mut self) -> Resource {
        Resource {
            attributes: std::mem::take(&mut self.attributes),
        }
    }
}

/// Buffer for one gauge metric between record and emit
#[derive(Debug)]
struct GaugeBuffer {
    config: MetricConfig,
    name: &'static str,
    description: &'static str,
    unit: &'static str,
    data_points: Vec<NumberDataPoint>,
}

impl GaugeBuffer {
    fn new(
        config: MetricConfig,
        name: &'static str,
        description: &'static str,
        unit: &'static str,
    ) -> Self {
        Self {
            config,
            name,
            description,
            unit,
            data_points: Vec::new(),
        }
    }

    fn record(&mut self, ts: Timestamp, value: i64) {
        if !self.config.enabled {
            return;
        }
        self.data_points.push(NumberDataPoint {
            attributes: Attributes::new(),
            timestamp: ts,
            value: NumberValue::Int(value),
        });
    }

    fn emit_to(&mut self, metrics: &mut Vec<Metric>) {
        if self.data_points.is_empty() {
            return;
        }
        metrics.push(Metric {
            name: self.name.to_string(),
            description: self.description.to_string(),
            unit: self.unit.to_string(),
            gauge: Gauge {
                data_points: std::mem::take(&mut self.data_points),
            },
        });
    }
}

/// Accumulates HPA status gauges into a resource-scoped payload
#[derive(Debug)]
pub struct MetricsBuilder {
    resource_attributes: ResourceAttributesConfig,
    scope: InstrumentationScope,
    current_replicas: GaugeBuffer,
    desired_replicas: GaugeBuffer,
    max_replicas: GaugeBuffer,
    min_replicas: GaugeBuffer,
    buffer: Metrics,
}

impl MetricsBuilder {
    pub fn new(config: MetricsBuilderConfig, settings: &Settings) -> Self {
        let metrics = config.metrics;
        Self {
            resource_attributes: config.resource_attributes,
            scope: InstrumentationScope {
                name: SCOPE_NAME.to_string(),
                version: settings.build_info.version.clone(),
            },
            current_replicas: GaugeBuffer::new(
                metrics.current_replicas,
                semconv::CURRENT_REPLICAS,
                "Current number of pod replicas managed by this autoscaler.",
                "{pod}",
            ),
            desired_replicas: GaugeBuffer::new(
                metrics.desired_replicas,
                semconv::DESIRED_REPLICAS,
                "Desired number of pod replicas managed by this autoscaler.",
                "{pod}",
            ),
            max_replicas: GaugeBuffer::new(
                metrics.max_replicas,
                semconv::MAX_REPLICAS,
                "Maximum number of replicas to which the autoscaler can scale up.",
                "{pod}",
            ),
            min_replicas: GaugeBuffer::new(
                metrics.min_replicas,
                semconv::MIN_REPLICAS,
                "Minimum number of replicas to which the autoscaler can scale down.",
                "{pod}",
            ),
            buffer: Metrics::default(),
        }
    }

    /// Resource builder configured with this builder's resource attribute switches
    pub fn new_resource_builder(&self) -> ResourceBuilder {
        ResourceBuilder::new(self.resource_attributes.clone())
    }

    pub fn record_current_replicas_data_point(&mut self, ts: Timestamp, value: i64) {
        self.current_replicas.record(ts, value);
    }

    pub fn record_desired_replicas_data_point(&mut self, ts: Timestamp, value: i64) {
        self.desired_replicas.record(ts, value);
    }

    pub fn record_max_replicas_data_point(&mut self, ts: Timestamp, value: i64) {
        self.max_replicas.record(ts, value);
    }

    pub fn record_min_replicas_data_point(&mut self, ts: Timestamp, value: i64) {
        self.min_replicas.record(ts, value);
    }

    /// Move every buffered metric under `resource`
    ///
    /// Metrics come out sorted by name. Nothing is appended when no data point
    /// was recorded since the last emit.
    pub fn emit_for_resource(&mut self, resource: Resource) {
        let mut metrics = Vec::new();
        self.current_replicas.emit_to(&mut metrics);
        self.desired_replicas.emit_to(&mut metrics);
        self.max_replicas.emit_to(&mut metrics);
        self.min_replicas.emit_to(&mut metrics);

        if metrics.is_empty() {
            return;
        }

        self.buffer.resource_metrics.push(ResourceMetrics {
            resource,
            scope_metrics: vec![ScopeMetrics {
                scope: self.scope.clone(),
                metrics,
            }],
        });
    }

    /// Flush leftovers under an empty resource and return the accumulated payload
    pub fn emit(&mut self) -> Metrics {
        self.emit_for_resource(Resource::default());
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::metrics_builder::config::MetricsConfig;

    #[test]
    fn test_resource_builder_drops_disabled_attributes() {
        let mut rb = ResourceBuilder::new(ResourceAttributesConfig::default());
        rb.set_hpa_uid("uid-1");
        rb.set_hpa_name("web");
        rb.set_namespace_name("prod");
        rb.set_scaletargetref_kind("Deployment");
        rb.set_scaletargetref_name("web");
        rb.set_scaletargetref_apiversion("apps/v1");

        let resource = rb.emit();
        assert_eq!(resource.attributes.len(), 3);
        assert_eq!(resource.attributes["k8s.hpa.uid"], "uid-1");
        assert_eq!(resource.attributes["k8s.hpa.name"], "web");
        assert_eq!(resource.attributes["k8s.namespace.name"], "prod");
    }

    #[test]
    fn test_resource_builder_emit_resets() {
        let mut rb = ResourceBuilder::new(ResourceAttributesConfig::default());
        rb.set_hpa_name("web");
        assert_eq!(rb.emit().attributes.len(), 1);
        assert!(rb.emit().attributes.is_empty());
    }

    #[test]
    fn test_emit_for_resource_orders_metrics_by_name() {
        let mut mb = MetricsBuilder::new(MetricsBuilderConfig::default(), &Settings::default());
        let ts = Timestamp(1);
        mb.record_min_replicas_data_point(ts, 1);
        mb.record_max_replicas_data_point(ts, 4);
        mb.record_current_replicas_data_point(ts, 2);
        mb.record_desired_replicas_data_point(ts, 3);
        mb.emit_for_resource(Resource::default());

        let metrics = mb.emit();
        assert_eq!(metrics.resource_metrics.len(), 1);
        let names: Vec<_> = metrics.resource_metrics[0].scope_metrics[0]
            .metrics
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "k8s.hpa.current_replicas",
                "k8s.hpa.desired_replicas",
                "k8s.hpa.max_replicas",
                "k8s.hpa.min_replicas",
            ]
        );
    }

    #[test]
    fn test_disabled_metric_records_nothing() {
        let config = MetricsBuilderConfig {
            metrics: MetricsConfig {
                max_replicas: MetricConfig { enabled: false },
                ..MetricsConfig::default()
            },
            ..MetricsBuilderConfig::default()
        };
        let mut mb = MetricsBuilder::new(config, &Settings::default());
        mb.record_max_replicas_data_point(Timestamp(1), 10);
        mb.record_min_replicas_data_point(Timestamp(1), 1);

        let metrics = mb.emit();
        let scope = &metrics.resource_metrics[0].scope_metrics[0];
        assert_eq!(scope.metrics.len(), 1);
        assert_eq!(scope.metrics[0].name, "k8s.hpa.min_replicas");
    }

    #[test]
    fn test_emit_without_records_is_empty() {
        let mut mb = MetricsBuilder::new(MetricsBuilderConfig::default(), &Settings::default());
        mb.emit_for_resource(Resource::default());
        assert!(mb.emit().resource_metrics.is_empty());
    }

    #[test]
    fn test_scope_carries_build_version() {
        let settings = Settings::new("9.9.9");
        let mut mb = MetricsBuilder::new(MetricsBuilderConfig::default(), &settings);
        mb.record_current_replicas_data_point(Timestamp(1), 1);
        let metrics = mb.emit();
        let scope = &metrics.resource_metrics[0].scope_metrics[0].scope;
        assert_eq!(scope.name, SCOPE_NAME);
        assert_eq!(scope.version, "9.9.9");
    }
}
