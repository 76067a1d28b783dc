use std::path::Path;

// HTTP endpoint paths
pub const METRICS_URL: &str = "/metrics";
pub const HPAS_URL: &str = "/hpas";
pub const PAYLOAD_URL: &str = "/payload";

// Manifests are JSON documents as printed by `kubectl get hpa -o json`
pub const MANIFEST_EXTENSION: &str = "json";

// Defaults applied to list items that omit their type metadata
pub const HPA_API_VERSION: &str = "autoscaling/v2";
pub const HPA_KIND: &str = "HorizontalPodAutoscaler";

// Check whether a directory entry should be loaded as an HPA manifest
pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}
