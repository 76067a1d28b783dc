use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::hpa::HpaSnapshot;

/// Identity of a cached HPA, as listed on `/hpas`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HpaIdentity {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub scale_target_kind: String,
    pub scale_target_name: String,
    pub metric_specs: usize,
}

impl From<&HpaSnapshot> for HpaIdentity {
    fn from(hpa: &HpaSnapshot) -> Self {
        HpaIdentity {
            uid: hpa.uid.clone(),
            name: hpa.name.clone(),
            namespace: hpa.namespace.clone(),
            scale_target_kind: hpa.scale_target_ref.kind.clone(),
            scale_target_name: hpa.scale_target_ref.name.clone(),
            metric_specs: hpa.metrics.len(),
        }
    }
}

/// Latest known snapshot of every HPA, keyed by `namespace/name`
#[derive(Clone)]
pub struct HpaCache {
    hpas: Arc<RwLock<HashMap<String, HpaSnapshot>>>,
}

impl HpaCache {
    /// Create a new HPA cache
    pub fn new() -> Self {
        HpaCache {
            hpas: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the snapshot stored under its key
    /// Returns true if the HPA was not cached before
    pub async fn set(&self, snapshot: HpaSnapshot) -> bool {
        let mut map = self.hpas.write().await;
        map.insert(snapshot.key(), snapshot).is_none()
    }

    /// Drop every HPA whose key is not in `keep`, returning the dropped keys
    pub async fn retain(&self, keep: &HashSet<String>) -> Vec<String> {
        let mut map = self.hpas.write().await;
        let removed: Vec<String> = map
            .keys()
            .filter(|k| !keep.contains(*k))
            .cloned()
            .collect();
        for key in &removed {
            map.remove(key);
        }
        removed
    }

    /// Keys of every cached HPA
    pub async fn keys(&self) -> HashSet<String> {
        let map = self.hpas.read().await;
        map.keys().cloned().collect()
    }

    /// Clone of every cached snapshot
    pub async fn snapshots(&self) -> Vec<HpaSnapshot> {
        let map = self.hpas.read().await;
        map.values().cloned().collect()
    }

    /// Get all HPAs with their identity, sorted by key
    pub async fn get_hpas_with_identity(&self) -> Vec<(String, HpaIdentity)> {
        let map = self.hpas.read().await;
        let mut hpas: Vec<_> = map
            .iter()
            .map(|(key, hpa)| (key.clone(), HpaIdentity::from(hpa)))
            .collect();
        hpas.sort_by(|a, b| a.0.cmp(&b.0));
        hpas
    }

    pub async fn len(&self) -> usize {
        self.hpas.read().await.len()
    }
}

impl Default for HpaCache {
    fn default() -> Self {
        Self::new()
    }
}
