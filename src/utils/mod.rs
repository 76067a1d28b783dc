pub mod metrics_builder;
pub mod prometheus_format;
pub mod quantity;
