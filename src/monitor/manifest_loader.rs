//! Manifest loader - keeps the HPA cache in line with a directory of manifests
//!
//! Responsibilities:
//! - Periodically rescan the manifest directory
//! - Parse single HPA objects and `kind: List` documents
//! - Evict HPAs (and their cached metrics) whose manifests disappeared

use crate::config;
use crate::hpa::HpaSnapshot;
use anyhow::{Context, Result};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::hpa_cache::HpaCache;
use super::metrics_cache::MetricsCache;

const DIR_RETRY_DELAY_SECONDS: u64 = 30;
const RESCAN_INTERVAL_SECONDS: u64 = 5;

/// Loads HPA manifests from disk into the HPA cache
pub struct ManifestLoader {
    hpa_cache: Arc<HpaCache>,
    metrics_cache: Arc<MetricsCache>,
    manifest_dir: PathBuf,
}

impl ManifestLoader {
    pub fn new(
        hpa_cache: Arc<HpaCache>,
        metrics_cache: Arc<MetricsCache>,
        manifest_dir: PathBuf,
    ) -> Self {
        ManifestLoader {
            hpa_cache,
            metrics_cache,
            manifest_dir,
        }
    }

    /// Rescan the manifest directory forever
    ///
    /// This is a long-running task that should be spawned as a background task.
    /// A missing or unreadable directory is retried after a delay.
    pub async fn start(&self) -> Result<()> {
        info!(path = ?self.manifest_dir, "Starting manifest loader");

        loop {
            match self.sync_once().await {
                Ok(count) => {
                    debug!(
                        path = ?self.manifest_dir,
                        hpa_count = count,
                        "Manifest directory synced"
                    );
                    sleep(Duration::from_secs(RESCAN_INTERVAL_SECONDS)).await;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = ?self.manifest_dir,
                        retry_delay_sec = DIR_RETRY_DELAY_SECONDS,
                        "cannot read manifest directory, retrying"
                    );
                    sleep(Duration::from_secs(DIR_RETRY_DELAY_SECONDS)).await;
                }
            }
        }
    }

    /// Load every manifest once and evict HPAs that are gone
    ///
    /// Returns the number of HPAs loaded. Malformed files are logged and skipped.
    pub async fn sync_once(&self) -> Result<usize> {
        let mut dir = tokio::fs::read_dir(&self.manifest_dir)
            .await
            .with_context(|| format!("failed to open {}", self.manifest_dir.display()))?;

        let mut seen = HashSet::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !config::is_manifest(&path) {
                continue;
            }

            let snapshots = match load_manifest(&path).await {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    warn!(
                        file = ?path,
                        error = %format!("{:#}", e),
                        "Skipping malformed manifest"
                    );
                    continue;
                }
            };

            for snapshot in snapshots {
                let key = snapshot.key();
                if !seen.insert(key.clone()) {
                    warn!(hpa = %key, file = ?path, "Duplicate HPA manifest, last one wins");
                }
                if self.hpa_cache.set(snapshot).await {
                    info!(hpa = %key, "HPA added");
                }
            }
        }

        for key in self.hpa_cache.retain(&seen).await {
            info!(hpa = %key, "HPA removed, deleting its metrics");
            self.metrics_cache.delete_metrics(&key).await;
        }
        let cached = self.hpa_cache.len().await;
        debug!(cached, "HPA cache updated");

        Ok(seen.len())
    }
}

async fn load_manifest(path: &Path) -> Result<Vec<HpaSnapshot>> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let hpas = parse_manifest(&data)?;
    Ok(hpas.iter().map(HpaSnapshot::from).collect())
}

/// Parse one manifest document
///
/// Accepts a single `HorizontalPodAutoscaler` or a list with an `items` array.
/// Objects without `apiVersion`/`kind` are assumed to be `autoscaling/v2` HPAs.
pub fn parse_manifest(data: &[u8]) -> Result<Vec<HorizontalPodAutoscaler>> {
    let doc: Value = serde_json::from_slice(data).context("manifest is not valid JSON")?;

    let objects = match doc {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => anyhow::bail!("`items` must be an array"),
            None => vec![Value::Object(map)],
        },
        _ => anyhow::bail!("manifest must be a JSON object"),
    };

    objects
        .into_iter()
        .enumerate()
        .map(|(i, mut object)| {
            if let Value::Object(map) = &mut object {
                map.entry("apiVersion")
                    .or_insert_with(|| Value::from(config::HPA_API_VERSION));
                map.entry("kind")
                    .or_insert_with(|| Value::from(config::HPA_KIND));
            }
            serde_json::from_value(object)
                .with_context(|| format!("invalid HPA at index {}", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::metrics_builder::{Metrics, Timestamp};

    fn hpa_json(namespace: &str, name: &str) -> Value {
        serde_json::json!({
            "apiVersion": "autoscaling/v2",
            "kind": "HorizontalPodAutoscaler",
            "metadata": { "name": name, "namespace": namespace, "uid": format!("{}-uid", name) },
            "spec": {
                "scaleTargetRef": { "kind": "Deployment", "name": name, "apiVersion": "apps/v1" },
                "maxReplicas": 4
            },
            "status": { "currentReplicas": 1, "desiredReplicas": 2 }
        })
    }

    fn loader(dir: &Path) -> (ManifestLoader, Arc<HpaCache>, Arc<MetricsCache>) {
        let hpa_cache = Arc::new(HpaCache::new());
        let metrics_cache = Arc::new(MetricsCache::new());
        let loader = ManifestLoader::new(
            hpa_cache.clone(),
            metrics_cache.clone(),
            dir.to_path_buf(),
        );
        (loader, hpa_cache, metrics_cache)
    }

    #[test]
    fn test_parse_single_object() {
        let data = serde_json::to_vec(&hpa_json("default", "web")).unwrap();
        let hpas = parse_manifest(&data).unwrap();
        assert_eq!(hpas.len(), 1);
        assert_eq!(hpas[0].metadata.name.as_deref(), Some("web"));
    }

    #[test]
    fn test_parse_list_without_type_metadata() {
        let mut item = hpa_json("default", "api");
        let map = item.as_object_mut().unwrap();
        map.remove("apiVersion");
        map.remove("kind");
        let list = serde_json::json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [hpa_json("default", "web"), item]
        });

        let hpas = parse_manifest(&serde_json::to_vec(&list).unwrap()).unwrap();
        let names: Vec<_> = hpas
            .iter()
            .map(|h| h.metadata.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["web", "api"]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_manifest(b"not json").is_err());
        assert!(parse_manifest(b"[1, 2]").is_err());
        assert!(parse_manifest(br#"{"items": 3}"#).is_err());

        let mut wrong = hpa_json("default", "web");
        wrong["spec"]["maxReplicas"] = Value::from("many");
        assert!(parse_manifest(&serde_json::to_vec(&wrong).unwrap()).is_err());
    }

    #[tokio::test]
    async fn test_sync_loads_and_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("web.json");
        std::fs::write(
            &web,
            serde_json::to_vec(&hpa_json("default", "web")).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("api.json"),
            serde_json::to_vec(&hpa_json("prod", "api")).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let (loader, hpa_cache, metrics_cache) = loader(dir.path());
        assert_eq!(loader.sync_once().await.unwrap(), 2);
        assert_eq!(hpa_cache.len().await, 2);

        metrics_cache.start_collection().await;
        metrics_cache
            .add_metrics("default/web".to_string(), Metrics::default(), Timestamp(1))
            .await;
        metrics_cache.finish_collection(&hpa_cache).await;
        assert!(metrics_cache.get_metrics("default/web").await.is_some());

        std::fs::remove_file(&web).unwrap();
        assert_eq!(loader.sync_once().await.unwrap(), 1);

        let keys: Vec<_> = hpa_cache
            .get_hpas_with_identity()
            .await
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["prod/api"]);
        assert!(metrics_cache.get_metrics("default/web").await.is_none());
    }

    #[tokio::test]
    async fn test_sync_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (loader, _, _) = loader(&dir.path().join("absent"));
        assert!(loader.sync_once().await.is_err());
    }
}
