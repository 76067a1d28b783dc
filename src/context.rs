//! Application context and dependency injection
//!
//! This module provides a centralized container for all application singletons.
//! All services are created once during startup and accessed through this context.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::monitor::hpa_cache::HpaCache;
use crate::monitor::manifest_loader::ManifestLoader;
use crate::monitor::metrics_cache::MetricsCache;
use crate::monitor::metrics_collector::MetricsCollector;
use crate::utils::metrics_builder::MetricsBuilderConfig;

/// Application context holding all singleton instances
#[derive(Clone)]
pub struct AppContext {
    /// HPA cache - latest snapshot of every loaded HPA
    hpa_cache: Arc<HpaCache>,

    /// Metrics cache - double-buffered cache for payloads of all HPAs
    metrics_cache: Arc<MetricsCache>,

    /// Manifest loader - rescans the manifest directory
    manifest_loader: Arc<ManifestLoader>,

    /// Metrics collector - handles periodic payload collection
    metrics_collector: Arc<MetricsCollector>,
}

impl AppContext {
    /// Create a new application context with all singletons initialized
    ///
    /// This should be called once during startup before creating the HTTP server.
    pub fn new(
        manifest_dir: PathBuf,
        metrics_interval_secs: u64,
        builder_config: MetricsBuilderConfig,
    ) -> Result<Self> {
        tracing::info!("Initializing application context");

        if manifest_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("manifest directory missing"));
        }

        if metrics_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "metrics_interval_secs must be > 0, got {}",
                metrics_interval_secs
            ));
        }

        let hpa_cache = Arc::new(HpaCache::new());
        let metrics_cache = Arc::new(MetricsCache::new());
        tracing::info!("Core caches initialized");

        let manifest_loader = Arc::new(ManifestLoader::new(
            hpa_cache.clone(),
            metrics_cache.clone(),
            manifest_dir,
        ));
        tracing::info!("Manifest loader initialized");

        let metrics_collector = Arc::new(MetricsCollector::new(
            hpa_cache.clone(),
            metrics_cache.clone(),
            builder_config,
            metrics_interval_secs,
        ));
        tracing::info!("Metrics collector initialized");

        Ok(AppContext {
            hpa_cache,
            metrics_cache,
            manifest_loader,
            metrics_collector,
        })
    }

    /// Start background tasks for manifest loading and metrics collection
    pub fn start(&self) -> Result<()> {
        let manifest_loader = self.manifest_loader.clone();
        tokio::spawn(async move {
            if let Err(e) = manifest_loader.start().await {
                tracing::error!(error = %e, "Manifest loader error");
            }
        });

        let metrics_collector = self.metrics_collector.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics_collector.start().await {
                tracing::error!(error = %e, "Metrics collector error");
            }
        });

        Ok(())
    }

    /// Get reference to the HPA cache
    pub fn hpa_cache(&self) -> &Arc<HpaCache> {
        &self.hpa_cache
    }

    /// Get reference to the metrics cache
    pub fn metrics_cache(&self) -> &Arc<MetricsCache> {
        &self.metrics_cache
    }

    #[cfg(test)]
    pub fn manifest_loader(&self) -> &Arc<ManifestLoader> {
        &self.manifest_loader
    }

    #[cfg(test)]
    pub fn metrics_collector(&self) -> &Arc<MetricsCollector> {
        &self.metrics_collector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpa::model::testutil::new_hpa;
    use std::time::Duration;

    fn new_context(dir: &str, interval: u64) -> Result<AppContext> {
        AppContext::new(
            PathBuf::from(dir),
            interval,
            MetricsBuilderConfig::default(),
        )
    }

    #[test]
    fn test_app_context_creation() {
        let ctx = new_context("/tmp/hpas", 1).unwrap();
        let _ = ctx.hpa_cache();
        let _ = ctx.metrics_cache();
        let _ = ctx.manifest_loader();
        let _ = ctx.metrics_collector();
    }

    #[test]
    fn test_app_context_clone() {
        let context = new_context("/tmp/hpas", 1).unwrap();
        let cloned = context.clone();

        let ptr1 = Arc::as_ptr(context.hpa_cache());
        let ptr2 = Arc::as_ptr(cloned.hpa_cache());
        assert_eq!(ptr1, ptr2);
    }

    #[test]
    fn test_app_context_empty_manifest_dir() {
        assert!(new_context("", 1).is_err());
    }

    #[test]
    fn test_app_context_zero_metrics_interval() {
        assert!(
            new_context("/tmp/hpas", 0).is_err(),
            "Should reject zero metrics_interval_secs"
        );
    }

    #[tokio::test]
    async fn test_app_context_start_runs_background_tasks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("hpa.json"),
            serde_json::to_vec(&new_hpa("1")).unwrap(),
        )
        .unwrap();

        let ctx = AppContext::new(
            dir.path().to_path_buf(),
            1,
            MetricsBuilderConfig::default(),
        )
        .unwrap();
        ctx.start().unwrap();

        let key = "test-namespace/test-hpa-1";
        let mut collected = false;
        for _ in 0..100 {
            if ctx.metrics_cache().get_metrics(key).await.is_some() {
                collected = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(ctx.hpa_cache().len().await, 1);
        assert!(collected, "collector never published {}", key);
    }
}
