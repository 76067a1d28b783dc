//! Metrics collector - handles periodic mapping of cached HPAs to payloads
//!
//! Responsibilities:
//! - Periodically map every cached HPA to its telemetry payload
//! - Store payloads in double-buffered cache
//! - Track collection statistics (success/failure counts, timing)

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::hpa_cache::HpaCache;
use super::metrics_cache::MetricsCache;
use crate::hpa::{self, HpaSnapshot};
use crate::utils::metrics_builder::{
    Metrics, MetricsBuilder, MetricsBuilderConfig, ResourceBuilder, Settings, Timestamp,
};

/// Map one HPA to its full payload
///
/// The status gauges come first, followed by the flattened targets when the
/// HPA has any mappable metric specification.
pub fn collect_hpa(
    config: &MetricsBuilderConfig,
    settings: &Settings,
    hpa: &HpaSnapshot,
    ts: Timestamp,
) -> Metrics {
    let mut mb = MetricsBuilder::new(config.clone(), settings);
    hpa::record_metrics(&mut mb, hpa, ts);
    let mut metrics = mb.emit();

    let mut rb = ResourceBuilder::new(config.resource_attributes.clone());
    let targets = hpa::custom_metrics(settings, &mut rb, hpa, ts);
    if !targets.scope_metrics.is_empty() {
        metrics.resource_metrics.push(targets);
    }
    metrics
}

/// Collects payloads for all HPAs at regular intervals
pub struct MetricsCollector {
    hpa_cache: Arc<HpaCache>,
    metrics_cache: Arc<MetricsCache>,
    builder_config: Arc<MetricsBuilderConfig>,
    settings: Arc<Settings>,
    metrics_interval_secs: u64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new(
        hpa_cache: Arc<HpaCache>,
        metrics_cache: Arc<MetricsCache>,
        builder_config: MetricsBuilderConfig,
        metrics_interval_secs: u64,
    ) -> Self {
        MetricsCollector {
            hpa_cache,
            metrics_cache,
            builder_config: Arc::new(builder_config),
            settings: Arc::new(Settings::default()),
            metrics_interval_secs,
        }
    }

    /// Start the periodic metrics collection task
    ///
    /// This spawns a background task that runs [`collect_once`](Self::collect_once)
    /// at the configured interval.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let interval_secs = self.metrics_interval_secs;

        info!(
            interval_secs = interval_secs,
            "Starting metrics collector task"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                interval.tick().await;
                self.collect_once().await;
            }
        });

        Ok(())
    }

    /// Run a single collection cycle and swap the cache buffers
    ///
    /// Returns the number of HPAs whose payload was stored.
    pub async fn collect_once(&self) -> usize {
        let cycle_start = std::time::Instant::now();
        let ts = Timestamp::now();

        let hpas = self.hpa_cache.snapshots().await;
        debug!(
            hpa_count = hpas.len(),
            "Retrieved HPA list for metrics collection"
        );

        // Start collection - prepare staging cache
        self.metrics_cache.start_collection().await;

        let total_hpas = hpas.len();
        let tasks: Vec<_> = hpas
            .into_iter()
            .map(|hpa| {
                let config = self.builder_config.clone();
                let settings = self.settings.clone();
                tokio::spawn(async move {
                    let metrics = collect_hpa(&config, &settings, &hpa, ts);
                    (hpa.key(), metrics)
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let mut success_count = 0;
        let mut failure_count = 0;

        for result in results {
            match result {
                Ok((key, metrics)) => {
                    debug!(
                        hpa = %key,
                        data_points = metrics.data_point_count(),
                        "Payload added to staging"
                    );
                    self.metrics_cache.add_metrics(key, metrics, ts).await;
                    success_count += 1;
                }
                Err(e) => {
                    failure_count += 1;
                    warn!(error = %e, "HPA collection task failed");
                }
            }
        }

        // Finish collection - atomic swap of buffers
        let swap_start = std::time::Instant::now();
        self.metrics_cache.finish_collection(&self.hpa_cache).await;
        let swap_duration_us = swap_start.elapsed().as_micros();

        info!(
            success = success_count,
            failure = failure_count,
            total = total_hpas,
            duration_ms = cycle_start.elapsed().as_millis(),
            swap_duration_us = swap_duration_us,
            "Metrics collection cycle completed"
        );

        success_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hpa::model::testutil::new_hpa;
    use crate::utils::metrics_builder::{semconv, ResourceAttributesConfig};

    #[test]
    fn test_collect_hpa_status_and_targets() {
        let hpa = HpaSnapshot::from(&new_hpa("1"));
        let metrics = collect_hpa(
            &MetricsBuilderConfig::default(),
            &Settings::default(),
            &hpa,
            Timestamp(42),
        );

        assert_eq!(metrics.resource_metrics.len(), 2);
        assert_eq!(metrics.resource_metrics[0].data_point_count(), 4);
        assert_eq!(metrics.resource_metrics[1].data_point_count(), 3);
        assert_eq!(
            metrics.resource_metrics[0].resource,
            metrics.resource_metrics[1].resource
        );
    }

    #[test]
    fn test_collect_hpa_without_targets() {
        let mut hpa = HpaSnapshot::from(&new_hpa("1"));
        hpa.metrics.clear();
        let config = MetricsBuilderConfig {
            resource_attributes: ResourceAttributesConfig::default().with_scale_target_ref(true),
            ..MetricsBuilderConfig::default()
        };

        let metrics = collect_hpa(&config, &Settings::default(), &hpa, Timestamp(1));

        assert_eq!(metrics.resource_metrics.len(), 1);
        let attrs = &metrics.resource_metrics[0].resource.attributes;
        assert_eq!(
            attrs.get(semconv::SCALETARGETREF_KIND).map(String::as_str),
            Some("Deployment")
        );
    }

    #[tokio::test]
    async fn test_collect_once() {
        let hpa_cache = Arc::new(HpaCache::new());
        let metrics_cache = Arc::new(MetricsCache::new());
        hpa_cache.set(HpaSnapshot::from(&new_hpa("1"))).await;
        hpa_cache.set(HpaSnapshot::from(&new_hpa("2"))).await;

        let collector = MetricsCollector::new(
            hpa_cache,
            metrics_cache.clone(),
            MetricsBuilderConfig::default(),
            30,
        );
        assert_eq!(collector.collect_once().await, 2);

        let cached = metrics_cache
            .get_metrics("test-namespace/test-hpa-2")
            .await
            .unwrap();
        assert_eq!(cached.metrics.data_point_count(), 7);
    }

    #[tokio::test]
    async fn test_collect_once_empty_cache_clears_payloads() {
        let hpa_cache = Arc::new(HpaCache::new());
        let metrics_cache = Arc::new(MetricsCache::new());
        hpa_cache.set(HpaSnapshot::from(&new_hpa("1"))).await;

        let collector = MetricsCollector::new(
            hpa_cache.clone(),
            metrics_cache.clone(),
            MetricsBuilderConfig::default(),
            30,
        );
        collector.collect_once().await;
        hpa_cache.retain(&std::collections::HashSet::new()).await;
        assert_eq!(collector.collect_once().await, 0);
        assert!(metrics_cache.get_all().await.is_empty());
    }
}
