use super::hpa_cache::HpaCache;
use crate::utils::metrics_builder::{Metrics, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Cached payload for a single HPA
#[derive(Clone, Debug)]
pub struct CachedMetrics {
    /// Status gauges and flattened targets of the HPA
    pub metrics: Metrics,
    /// Collection tick that produced the payload
    pub collected_at: Timestamp,
}

/// Double-buffered cache for payloads of all HPAs
///
/// This implementation uses two separate buffers to eliminate lock contention:
/// - `current_cache`: Readers always read from this (HTTP requests)
/// - `staging_cache`: Writer (metrics collector) builds here
/// - After collection completes, buffers are swapped atomically
#[derive(Clone)]
pub struct MetricsCache {
    /// Current buffer - readers read from here (HTTP requests)
    current_cache: Arc<Mutex<Arc<HashMap<String, CachedMetrics>>>>,
    /// Staging buffer - writer builds here during collection
    staging_cache: Arc<Mutex<HashMap<String, CachedMetrics>>>,
}

impl MetricsCache {
    /// Create a new empty double-buffered metrics cache
    pub fn new() -> Self {
        MetricsCache {
            current_cache: Arc::new(Mutex::new(Arc::new(HashMap::new()))),
            staging_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get cached payload for an HPA (reader - never blocked by collection)
    pub async fn get_metrics(&self, key: &str) -> Option<CachedMetrics> {
        let current = self.current_cache.lock().await;
        current.get(key).cloned()
    }

    /// Every cached payload, sorted by HPA key
    pub async fn get_all(&self) -> Vec<(String, CachedMetrics)> {
        let current = {
            let guard = self.current_cache.lock().await;
            Arc::clone(&guard)
        };
        let mut all: Vec<_> = current
            .iter()
            .map(|(key, cached)| (key.clone(), cached.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Start a new metrics collection cycle
    ///
    /// Call this when starting to collect payloads for all HPAs
    pub async fn start_collection(&self) {
        debug!("Starting metrics collection - clearing staging cache");
        let mut staging = self.staging_cache.lock().await;
        staging.clear();
    }

    /// Add a payload during collection (not yet visible to readers)
    pub async fn add_metrics(&self, key: String, metrics: Metrics, collected_at: Timestamp) {
        let cached = CachedMetrics {
            metrics,
            collected_at,
        };
        let mut staging = self.staging_cache.lock().await;
        staging.insert(key, cached);
    }

    /// Finish collection and swap buffers atomically
    ///
    /// Staged payloads of HPAs no longer in `hpas` are dropped. The lookup
    /// happens while the current buffer is locked.
    pub async fn finish_collection(&self, hpas: &HpaCache) {
        debug!("Finishing metrics collection - preparing to swap buffers");

        let mut staging = self.staging_cache.lock().await;
        let mut new_data = std::mem::take(&mut *staging);

        {
            let mut current = self.current_cache.lock().await;
            let live = hpas.keys().await;
            new_data.retain(|key, _| {
                let keep = live.contains(key);
                if !keep {
                    debug!(hpa = %key, "Dropping staged metrics of evicted HPA");
                }
                keep
            });
            *current = Arc::new(new_data);
            debug!("Metrics buffers swapped - staging cache cleared");
        }
    }

    /// Remove the payload of an HPA (when its manifest is gone)
    ///
    /// This updates the current cache immediately since we're removing stale data
    pub async fn delete_metrics(&self, key: &str) -> bool {
        let mut current = self.current_cache.lock().await;
        let new_data: HashMap<String, CachedMetrics> = current
            .iter()
            .filter(|(id, _)| *id != key)
            .map(|(id, cached)| (id.clone(), cached.clone()))
            .collect();

        let was_present = new_data.len() < current.len();
        *current = Arc::new(new_data);

        if was_present {
            debug!(hpa = %key, "Deleted metrics for HPA");
        }
        was_present
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new()
    }
}
