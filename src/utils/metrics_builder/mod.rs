//! Metrics builder for HPA telemetry
//!
//! This module owns the structured payload the HPA mappers write into and the
//! builders that fill it.
//!
//! ## Architecture
//!
//! 1. **pdata** - Payload model (resource → scope → gauge → data point)
//! 2. **config** - Enable switches for metrics and resource attributes
//! 3. **ResourceBuilder** - Collects resource attributes, dropping disabled ones
//! 4. **MetricsBuilder** - Buffers the status gauges and emits them per resource
//!
//! A builder is created per HPA per collection tick and never shared between
//! concurrent collections.

pub mod builder;
pub mod config;
pub mod pdata;

pub use builder::{MetricsBuilder, ResourceBuilder};
pub use config::{MetricsBuilderConfig, ResourceAttributesConfig};
pub use pdata::{
    Attributes, Gauge, InstrumentationScope, Metric, Metrics, NumberDataPoint, NumberValue,
    ResourceMetrics, ScopeMetrics, Timestamp,
};

/// Instrumentation scope name for everything this crate produces
pub const SCOPE_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "/hpa");

/// Attribute keys and metric names
pub mod semconv {
    pub const HPA_UID: &str = "k8s.hpa.uid";
    pub const HPA_NAME: &str = "k8s.hpa.name";
    pub const NAMESPACE_NAME: &str = "k8s.namespace.name";
    pub const SCALETARGETREF_KIND: &str = "k8s.hpa.scaletargetref.kind";
    pub const SCALETARGETREF_NAME: &str = "k8s.hpa.scaletargetref.name";
    pub const SCALETARGETREF_APIVERSION: &str = "k8s.hpa.scaletargetref.apiversion";

    pub const METRIC_TYPE: &str = "k8s.hpa.metric.type";
    pub const METRIC_CONTAINER: &str = "k8s.hpa.metric.container";

    pub const CURRENT_REPLICAS: &str = "k8s.hpa.current_replicas";
    pub const DESIRED_REPLICAS: &str = "k8s.hpa.desired_replicas";
    pub const MAX_REPLICAS: &str = "k8s.hpa.max_replicas";
    pub const MIN_REPLICAS: &str = "k8s.hpa.min_replicas";

    /// Prefix of flattened metric target series
    pub const METRIC_TARGET_PREFIX: &str = "k8s.hpa.metric.target";
}

/// Build information of the running binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub command: String,
    pub description: String,
    pub version: String,
}

/// Producer settings shared by every collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub build_info: BuildInfo,
}

impl Settings {
    pub fn new(version: impl Into<String>) -> Self {
        Settings {
            build_info: BuildInfo {
                command: env!("CARGO_PKG_NAME").to_string(),
                description: env!("CARGO_PKG_DESCRIPTION").to_string(),
                version: version.into(),
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new(env!("CARGO_PKG_VERSION"))
    }
}
