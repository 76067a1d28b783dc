//! HorizontalPodAutoscaler telemetry mapping
//!
//! Two mappers run once per HPA per collection tick:
//! - [`record_metrics`] records the replica status gauges into a [`MetricsBuilder`]
//! - [`custom_metrics`] flattens `spec.metrics` into one gauge per target
//!
//! Neither mapper fails. Entries that cannot be mapped are left out.

pub mod custom_metrics;
pub mod model;

pub use custom_metrics::custom_metrics;
pub use model::HpaSnapshot;

use crate::utils::metrics_builder::{MetricsBuilder, ResourceBuilder, Timestamp};

/// Record the four replica gauges of `hpa` and emit them under its resource
pub fn record_metrics(mb: &mut MetricsBuilder, hpa: &HpaSnapshot, ts: Timestamp) {
    mb.record_current_replicas_data_point(ts, i64::from(hpa.current_replicas));
    mb.record_desired_replicas_data_point(ts, i64::from(hpa.desired_replicas));
    mb.record_max_replicas_data_point(ts, i64::from(hpa.max_replicas));
    mb.record_min_replicas_data_point(ts, i64::from(hpa.min_replicas.unwrap_or(0)));

    let mut rb = mb.new_resource_builder();
    set_resource_attributes(&mut rb, hpa);
    mb.emit_for_resource(rb.emit());
}

/// Populate identity and scale target attributes; disabled ones are dropped by the builder
pub(crate) fn set_resource_attributes(rb: &mut ResourceBuilder, hpa: &HpaSnapshot) {
    rb.set_hpa_uid(&hpa.uid);
    rb.set_hpa_name(&hpa.name);
    rb.set_namespace_name(&hpa.namespace);
    rb.set_scaletargetref_kind(&hpa.scale_target_ref.kind);
    rb.set_scaletargetref_name(&hpa.scale_target_ref.name);
    if let Some(api_version) = &hpa.scale_target_ref.api_version {
        rb.set_scaletargetref_apiversion(api_version);
    }
}
