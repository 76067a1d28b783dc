//! Snapshot of a HorizontalPodAutoscaler as seen by the mappers
//!
//! The `autoscaling/v2` API encodes metric sources and targets as structs of
//! optional fields with a string discriminant. The snapshot resolves them once
//! into closed enums so the mappers can match exhaustively.

use k8s_openapi::api::autoscaling::v2 as autoscaling;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// Reference to another Kubernetes object (scale target, described object)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    pub api_version: Option<String>,
}

impl From<&autoscaling::CrossVersionObjectReference> for ObjectReference {
    fn from(reference: &autoscaling::CrossVersionObjectReference) -> Self {
        ObjectReference {
            kind: reference.kind.clone(),
            name: reference.name.clone(),
            api_version: reference.api_version.clone(),
        }
    }
}

/// Target of a single metric specification
///
/// Kubernetes requires exactly one of the three target fields; a target with
/// none of them populated does not convert into this type at all.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricTarget {
    /// Percentage of the requested resource, averaged across pods
    AverageUtilization(i32),
    /// Quantity averaged across pods
    AverageValue(Quantity),
    /// Raw quantity
    Value(Quantity),
}

impl MetricTarget {
    /// Resolve the API target. When several fields are set (invalid per the
    /// API) utilization wins over average value, which wins over value.
    pub fn from_api(target: &autoscaling::MetricTarget) -> Option<Self> {
        if let Some(utilization) = target.average_utilization {
            return Some(MetricTarget::AverageUtilization(utilization));
        }
        if let Some(average) = &target.average_value {
            return Some(MetricTarget::AverageValue(average.clone()));
        }
        target.value.clone().map(MetricTarget::Value)
    }
}

const KNOWN_SOURCE_TYPES: [&str; 5] = [
    "Resource",
    "ContainerResource",
    "Pods",
    "External",
    "Object",
];

/// One entry of `spec.metrics`
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSpec {
    Resource {
        name: String,
        target: Option<MetricTarget>,
    },
    ContainerResource {
        name: String,
        container: String,
        target: Option<MetricTarget>,
    },
    Pods {
        metric: String,
        target: Option<MetricTarget>,
    },
    External {
        metric: String,
        target: Option<MetricTarget>,
    },
    Object {
        metric: String,
        described_object: ObjectReference,
        target: Option<MetricTarget>,
    },
    /// Discriminant this build does not know, or a known one whose payload is missing
    Unknown { type_name: String },
}

impl MetricSpec {
    /// Source type as spelled in the API `type` field
    pub fn source_type(&self) -> &str {
        match self {
            MetricSpec::Resource { .. } => "Resource",
            MetricSpec::ContainerResource { .. } => "ContainerResource",
            MetricSpec::Pods { .. } => "Pods",
            MetricSpec::External { .. } => "External",
            MetricSpec::Object { .. } => "Object",
            MetricSpec::Unknown { type_name } => type_name,
        }
    }

    /// True when the `type` field names a known source but its payload is absent
    pub fn is_missing_payload(&self) -> bool {
        match self {
            MetricSpec::Unknown { type_name } => KNOWN_SOURCE_TYPES.contains(&type_name.as_str()),
            _ => false,
        }
    }
}

impl From<&autoscaling::MetricSpec> for MetricSpec {
    fn from(spec: &autoscaling::MetricSpec) -> Self {
        let converted = match spec.type_.as_str() {
            "Resource" => spec.resource.as_ref().map(|source| MetricSpec::Resource {
                name: source.name.clone(),
                target: MetricTarget::from_api(&source.target),
            }),
            "ContainerResource" => {
                spec.container_resource
                    .as_ref()
                    .map(|source| MetricSpec::ContainerResource {
                        name: source.name.clone(),
                        container: source.container.clone(),
                        target: MetricTarget::from_api(&source.target),
                    })
            }
            "Pods" => spec.pods.as_ref().map(|source| MetricSpec::Pods {
                metric: source.metric.name.clone(),
                target: MetricTarget::from_api(&source.target),
            }),
            "External" => spec.external.as_ref().map(|source| MetricSpec::External {
                metric: source.metric.name.clone(),
                target: MetricTarget::from_api(&source.target),
            }),
            "Object" => spec.object.as_ref().map(|source| MetricSpec::Object {
                metric: source.metric.name.clone(),
                described_object: ObjectReference::from(&source.described_object),
                target: MetricTarget::from_api(&source.target),
            }),
            _ => None,
        };

        converted.unwrap_or_else(|| MetricSpec::Unknown {
            type_name: spec.type_.clone(),
        })
    }
}

/// Immutable view of one HPA for a single collection tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HpaSnapshot {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub scale_target_ref: ObjectReference,
    pub current_replicas: i32,
    pub desired_replicas: i32,
    pub min_replicas: Option<i32>,
    pub max_replicas: i32,
    /// Metric specifications in declaration order
    pub metrics: Vec<MetricSpec>,
}

impl HpaSnapshot {
    /// Cache key: `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl From<&autoscaling::HorizontalPodAutoscaler> for HpaSnapshot {
    fn from(hpa: &autoscaling::HorizontalPodAutoscaler) -> Self {
        let metadata = &hpa.metadata;
        let spec = hpa.spec.as_ref();
        let status = hpa.status.as_ref();

        HpaSnapshot {
            uid: metadata.uid.clone().unwrap_or_default(),
            name: metadata.name.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            scale_target_ref: spec
                .map(|spec| ObjectReference::from(&spec.scale_target_ref))
                .unwrap_or_default(),
            current_replicas: status
                .and_then(|status| status.current_replicas)
                .unwrap_or_default(),
            desired_replicas: status
                .map(|status| status.desired_replicas)
                .unwrap_or_default(),
            min_replicas: spec.and_then(|spec| spec.min_replicas),
            max_replicas: spec.map(|spec| spec.max_replicas).unwrap_or_default(),
            metrics: spec
                .and_then(|spec| spec.metrics.as_ref())
                .map(|metrics| metrics.iter().map(MetricSpec::from).collect())
                .unwrap_or_default(),
        }
    }
}
