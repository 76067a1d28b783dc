pub mod hpa_cache;
pub mod manifest_loader;
pub mod metrics_cache;
pub mod metrics_collector;
