//! Network and interface persistence
//!
//! `NetworkStore` is the seam to the database layer. `MemoryStore` keeps
//! everything in memory behind one mutex, so create-if-absent is atomic,
//! and can mirror its state to a JSON snapshot file between CLI runs.

use crate::error::ProvisionError;
use chrono::Utc;
use netmodel::{AttachmentId, Network, NewNetwork, VirtualInterface};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Persistence operations used by the provisioner
#[async_trait::async_trait]
pub trait NetworkStore: Send + Sync {
    /// Insert a network unless one with the same v4 or v6 block exists
    ///
    /// Returns `Ok(None)` on a block conflict.
    async fn create_network_safe(&self, network: NewNetwork) -> Result<Option<Network>, ProvisionError>;

    async fn list_networks(&self) -> Result<Vec<Network>, ProvisionError>;

    async fn get_network(&self, network_id: u64) -> Result<Network, ProvisionError>;

    /// Record a new interface of `instance_id` on `network_id`
    async fn create_vif(
        &self,
        instance_id: &str,
        network_id: u64,
        mac_address: &str,
    ) -> Result<VirtualInterface, ProvisionError>;

    async fn vifs_for_instance(&self, instance_id: &str) -> Result<Vec<VirtualInterface>, ProvisionError>;

    /// Delete every interface of an instance; returns how many were removed
    async fn delete_vifs_for_instance(&self, instance_id: &str) -> Result<usize, ProvisionError>;

    /// Networks owned by `tenant_id` plus every shared network, ordered by id
    async fn networks_visible_to(&self, tenant_id: &str) -> Result<Vec<Network>, ProvisionError> {
        Ok(self
            .list_networks()
            .await?
            .into_iter()
            .filter(|n| n.tenant_id.is_none() || n.is_owned_by(tenant_id))
            .collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    networks: BTreeMap<u64, Network>,
    vifs: BTreeMap<u64, VirtualInterface>,
    last_network_id: u64,
    last_vif_id: u64,
}

/// In-memory store with an optional JSON snapshot
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store mirrored to `path`, loading it when the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProvisionError> {
        let path = path.as_ref();
        let state = if path.exists() {
            let raw = std::fs::read(path)
                .map_err(|e| ProvisionError::Store(format!("cannot read {}: {}", path.display(), e)))?;
            serde_json::from_slice(&raw)
                .map_err(|e| ProvisionError::Store(format!("corrupt state file {}: {}", path.display(), e)))?
        } else {
            StoreState::default()
        };
        debug!("Opened store snapshot {}", path.display());

        Ok(Self {
            state: Mutex::new(state),
            snapshot: Some(path.to_path_buf()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, ProvisionError> {
        self.state
            .lock()
            .map_err(|_| ProvisionError::Store("store lock poisoned".to_string()))
    }

    fn persist(&self, state: &StoreState) -> Result<(), ProvisionError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(state)
            .map_err(|e| ProvisionError::Store(format!("cannot encode state: {}", e)))?;
        std::fs::write(path, raw)
            .map_err(|e| ProvisionError::Store(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Apply `change` to a copy of the state and keep it only once the
    /// snapshot holding it has been written
    fn commit<T>(
        &self,
        state: &mut StoreState,
        change: impl FnOnce(&mut StoreState) -> T,
    ) -> Result<T, ProvisionError> {
        let mut next = state.clone();
        let out = change(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(out)
    }
}

#[async_trait::async_trait]
impl NetworkStore for MemoryStore {
    async fn create_network_safe(&self, network: NewNetwork) -> Result<Option<Network>, ProvisionError> {
        let mut state = self.lock()?;
        let conflict = state.networks.values().any(|existing| {
            existing.cidr == network.cidr
                || (existing.cidr_v6.is_some() && existing.cidr_v6 == network.cidr_v6)
        });
        if conflict {
            return Ok(None);
        }

        let created = self.commit(&mut state, |next| {
            next.last_network_id += 1;
            let created = network.into_network(next.last_network_id, Utc::now());
            next.networks.insert(created.id, created.clone());
            created
        })?;
        Ok(Some(created))
    }

    async fn list_networks(&self) -> Result<Vec<Network>, ProvisionError> {
        Ok(self.lock()?.networks.values().cloned().collect())
    }

    async fn get_network(&self, network_id: u64) -> Result<Network, ProvisionError> {
        self.lock()?
            .networks
            .get(&network_id)
            .cloned()
            .ok_or_else(|| ProvisionError::NotFound(format!("network {}", network_id)))
    }

    async fn create_vif(
        &self,
        instance_id: &str,
        network_id: u64,
        mac_address: &str,
    ) -> Result<VirtualInterface, ProvisionError> {
        let mut state = self.lock()?;
        if !state.networks.contains_key(&network_id) {
            return Err(ProvisionError::NotFound(format!("network {}", network_id)));
        }

        self.commit(&mut state, |next| {
            next.last_vif_id += 1;
            let vif = VirtualInterface {
                id: next.last_vif_id,
                instance_id: instance_id.to_string(),
                network_id,
                mac_address: mac_address.to_string(),
                attachment: AttachmentId::new(instance_id, network_id),
                created_at: Utc::now(),
            };
            next.vifs.insert(vif.id, vif.clone());
            vif
        })
    }

    async fn vifs_for_instance(&self, instance_id: &str) -> Result<Vec<VirtualInterface>, ProvisionError> {
        Ok(self
            .lock()?
            .vifs
            .values()
            .filter(|v| v.instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn delete_vifs_for_instance(&self, instance_id: &str) -> Result<usize, ProvisionError> {
        let mut state = self.lock()?;
        if !state.vifs.values().any(|v| v.instance_id == instance_id) {
            return Ok(0);
        }
        self.commit(&mut state, |next| {
            let before = next.vifs.len();
            next.vifs.retain(|_, v| v.instance_id != instance_id);
            before - next.vifs.len()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_network(label: &str, cidr: &str) -> NewNetwork {
        NewNetwork::from_block(label, cidr.parse().unwrap())
    }

    #[tokio::test]
    async fn test_create_network_safe_rejects_duplicate_block() {
        let store = MemoryStore::new();
        let first = store.create_network_safe(new_network("a", "10.0.0.0/24")).await.unwrap();
        assert_eq!(first.map(|n| n.id), Some(1));

        let dup = store.create_network_safe(new_network("b", "10.0.0.0/24")).await.unwrap();
        assert!(dup.is_none());
        assert_eq!(store.list_networks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_network_safe_rejects_duplicate_v6_block() {
        let store = MemoryStore::new();
        let mut a = new_network("a", "10.0.0.0/24");
        a.cidr_v6 = Some("fd00::/64".parse().unwrap());
        let mut b = new_network("b", "10.0.1.0/24");
        b.cidr_v6 = Some("fd00::/64".parse().unwrap());

        assert!(store.create_network_safe(a).await.unwrap().is_some());
        assert!(store.create_network_safe(b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_networks_visible_to_tenant() {
        let store = MemoryStore::new();
        let mut own = new_network("own", "10.0.0.0/24");
        own.tenant_id = Some("t1".to_string());
        let mut other = new_network("other", "10.0.1.0/24");
        other.tenant_id = Some("t2".to_string());
        let shared = new_network("shared", "10.0.2.0/24");
        for n in [own, other, shared] {
            store.create_network_safe(n).await.unwrap();
        }

        let labels: Vec<String> = store
            .networks_visible_to("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.label)
            .collect();
        assert_eq!(labels, vec!["own", "shared"]);
    }

    #[tokio::test]
    async fn test_vif_lifecycle() {
        let store = MemoryStore::new();
        let net = store
            .create_network_safe(new_network("a", "10.0.0.0/24"))
            .await
            .unwrap()
            .unwrap();

        let vif = store.create_vif("inst-1", net.id, "02:00:00:00:00:01").await.unwrap();
        assert_eq!(vif.attachment, AttachmentId::new("inst-1", net.id));
        store.create_vif("inst-2", net.id, "02:00:00:00:00:02").await.unwrap();

        assert_eq!(store.vifs_for_instance("inst-1").await.unwrap().len(), 1);
        assert_eq!(store.delete_vifs_for_instance("inst-1").await.unwrap(), 1);
        assert_eq!(store.delete_vifs_for_instance("inst-1").await.unwrap(), 0);
        assert_eq!(store.vifs_for_instance("inst-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_vif_on_unknown_network() {
        let store = MemoryStore::new();
        let result = store.create_vif("inst-1", 99, "02:00:00:00:00:01").await;
        assert!(matches!(result, Err(ProvisionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("netprov-store-{}.json", uuid::Uuid::new_v4()));
        {
            let store = MemoryStore::open(&path).unwrap();
            let net = store
                .create_network_safe(new_network("a", "10.0.0.0/24"))
                .await
                .unwrap()
                .unwrap();
            store.create_vif("inst-1", net.id, "02:00:00:00:00:01").await.unwrap();
        }

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.list_networks().await.unwrap().len(), 1);
        assert_eq!(reopened.vifs_for_instance("inst-1").await.unwrap().len(), 1);
        let next = reopened
            .create_network_safe(new_network("b", "10.0.1.0/24"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.id, 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_state_unchanged() {
        let dir = std::env::temp_dir().join(format!("netprov-store-{}", uuid::Uuid::new_v4()));
        let store = MemoryStore::open(dir.join("state.json")).unwrap();

        let result = store.create_network_safe(new_network("a", "10.0.0.0/24")).await;
        assert!(matches!(result, Err(ProvisionError::Store(_))));
        assert!(store.list_networks().await.unwrap().is_empty());

        std::fs::create_dir_all(&dir).unwrap();
        let created = store
            .create_network_safe(new_network("a", "10.0.0.0/24"))
            .await
            .unwrap()
            .expect("block is still free after the failed write");
        assert_eq!(created.id, 1);

        std::fs::remove_file(dir.join("state.json")).unwrap();
        std::fs::remove_dir(&dir).unwrap();
        let result = store.create_vif("inst-1", created.id, "02:00:00:00:00:01").await;
        assert!(matches!(result, Err(ProvisionError::Store(_))));
        assert!(store.vifs_for_instance("inst-1").await.unwrap().is_empty());
    }
}
