//! Enable/disable switches for emitted metrics and resource attributes

use serde::Deserialize;

/// Switch for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MetricConfig {
    pub enabled: bool,
}

impl MetricConfig {
    pub const ENABLED: MetricConfig = MetricConfig { enabled: true };
}

/// Switch for a single resource attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResourceAttributeConfig {
    pub enabled: bool,
}

impl ResourceAttributeConfig {
    pub const ENABLED: ResourceAttributeConfig = ResourceAttributeConfig { enabled: true };
    pub const DISABLED: ResourceAttributeConfig = ResourceAttributeConfig { enabled: false };
}

/// Status metrics recorded by the metrics builder
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    #[serde(rename = "k8s.hpa.current_replicas")]
    pub current_replicas: MetricConfig,
    #[serde(rename = "k8s.hpa.desired_replicas")]
    pub desired_replicas: MetricConfig,
    #[serde(rename = "k8s.hpa.max_replicas")]
    pub max_replicas: MetricConfig,
    #[serde(rename = "k8s.hpa.min_replicas")]
    pub min_replicas: MetricConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            current_replicas: MetricConfig::ENABLED,
            desired_replicas: MetricConfig::ENABLED,
            max_replicas: MetricConfig::ENABLED,
            min_replicas: MetricConfig::ENABLED,
        }
    }
}

/// Resource attributes attached to every HPA resource
///
/// Identity attributes are on by default, scale target reference attributes
/// are opt-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceAttributesConfig {
    #[serde(rename = "k8s.hpa.uid")]
    pub hpa_uid: ResourceAttributeConfig,
    #[serde(rename = "k8s.hpa.name")]
    pub hpa_name: ResourceAttributeConfig,
    #[serde(rename = "k8s.namespace.name")]
    pub namespace_name: ResourceAttributeConfig,
    #[serde(rename = "k8s.hpa.scaletargetref.kind")]
    pub scaletargetref_kind: ResourceAttributeConfig,
    #[serde(rename = "k8s.hpa.scaletargetref.name")]
    pub scaletargetref_name: ResourceAttributeConfig,
    #[serde(rename = "k8s.hpa.scaletargetref.apiversion")]
    pub scaletargetref_apiversion: ResourceAttributeConfig,
}

impl Default for ResourceAttributesConfig {
    fn default() -> Self {
        Self {
            hpa_uid: ResourceAttributeConfig::ENABLED,
            hpa_name: ResourceAttributeConfig::ENABLED,
            namespace_name: ResourceAttributeConfig::ENABLED,
            scaletargetref_kind: ResourceAttributeConfig::DISABLED,
            scaletargetref_name: ResourceAttributeConfig::DISABLED,
            scaletargetref_apiversion: ResourceAttributeConfig::DISABLED,
        }
    }
}

impl ResourceAttributesConfig {
    /// Toggle the three `k8s.hpa.scaletargetref.*` attributes together
    pub fn with_scale_target_ref(mut self, enabled: bool) -> Self {
        let switch = ResourceAttributeConfig { enabled };
        self.scaletargetref_kind = switch;
        self.scaletargetref_name = switch;
        self.scaletargetref_apiversion = switch;
        self
    }
}

/// Full configuration of a metrics builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MetricsBuilderConfig {
    pub metrics: MetricsConfig,
    pub resource_attributes: ResourceAttributesConfig,
}
