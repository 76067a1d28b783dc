//! Structured telemetry payload
//!
//! Resource → scope → metric → data point, following the OTLP metrics layout.
//! Attribute maps are ordered so identical inputs serialize identically.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Attribute key → value
pub type Attributes = BTreeMap<String, String>;

/// Unix timestamp in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Timestamp(nanos)
    }
}

/// Numeric value of a data point, integer or floating
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Int(v) => write!(f, "{}", v),
            NumberValue::Double(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberDataPoint {
    pub attributes: Attributes,
    pub timestamp: Timestamp,
    pub value: NumberValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Gauge {
    pub data_points: Vec<NumberDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub gauge: Gauge,
}

/// Producer of a group of metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentationScope {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeMetrics {
    pub scope: InstrumentationScope,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scope_metrics: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    pub fn data_point_count(&self) -> usize {
        self.scope_metrics
            .iter()
            .flat_map(|sm| &sm.metrics)
            .map(|m| m.gauge.data_points.len())
            .sum()
    }
}

/// Complete payload for one or more resources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl Metrics {
    pub fn data_point_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .map(ResourceMetrics::data_point_count)
            .sum()
    }
}
