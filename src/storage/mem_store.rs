//! In-memory asset store
//!
//! Assets live in a lock-free map keyed by path, with a second map from
//! canonical identifier back to path for metadata writes.

use crate::core::error::{Result, StorageError};
use crate::storage::{AssetHandle, AssetStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Debug)]
struct MemAsset {
    uuid: String,
    content: String,
    meta: Option<String>,
    imports: u32,
}

/// Asset store backed by process memory
#[derive(Debug, Default)]
pub struct MemStore {
    assets: DashMap<String, MemAsset>,
    paths_by_uuid: DashMap<String, String>,
    writes: AtomicU64,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored assets
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Number of successful content writes, creation included
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// How many times the asset at `path` was reimported
    pub fn import_count(&self, path: &str) -> Option<u32> {
        self.assets.get(path).map(|a| a.imports)
    }
}

#[async_trait]
impl AssetStore for MemStore {
    async fn create(&self, path: &str, content: &str) -> Result<AssetHandle> {
        if self.assets.contains_key(path) {
            return Err(StorageError::CreateFailed {
                path: path.to_string(),
                message: "asset already exists".to_string(),
            }
            .into());
        }

        let uuid = uuid::Uuid::new_v4().to_string();
        self.assets.insert(
            path.to_string(),
            MemAsset {
                uuid: uuid.clone(),
                content: content.to_string(),
                meta: None,
                imports: 0,
            },
        );
        self.paths_by_uuid.insert(uuid.clone(), path.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);

        Ok(AssetHandle { uuid, path: path.to_string() })
    }

    async fn update_content(&self, path: &str, content: &str) -> Result<()> {
        let mut asset = self.assets.get_mut(path).ok_or_else(|| StorageError::WriteFailed {
            path: path.to_string(),
            message: "asset does not exist".to_string(),
        })?;
        asset.content = content.to_string();
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn save_metadata(&self, uuid: &str, meta: &str) -> Result<()> {
        let path = self
            .paths_by_uuid
            .get(uuid)
            .map(|p| p.value().clone())
            .ok_or_else(|| StorageError::MetadataFailed {
                uuid: uuid.to_string(),
                message: "unknown asset".to_string(),
            })?;

        let mut asset = self.assets.get_mut(&path).ok_or_else(|| StorageError::MetadataFailed {
            uuid: uuid.to_string(),
            message: "asset was removed".to_string(),
        })?;
        asset.meta = Some(meta.to_string());
        Ok(())
    }

    async fn reimport(&self, path: &str) -> Result<()> {
        let mut asset = self.assets.get_mut(path).ok_or_else(|| StorageError::ReimportFailed {
            path: path.to_string(),
            message: "asset does not exist".to_string(),
        })?;
        asset.imports += 1;
        Ok(())
    }

    async fn resolve_by_path(&self, path: &str) -> Result<Option<AssetHandle>> {
        Ok(self.assets.get(path).map(|a| AssetHandle {
            uuid: a.uuid.clone(),
            path: path.to_string(),
        }))
    }

    async fn read_content(&self, path: &str) -> Result<String> {
        self.assets
            .get(path)
            .map(|a| a.content.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()).into())
    }

    async fn read_metadata(&self, path: &str) -> Result<Option<String>> {
        self.assets
            .get(path)
            .map(|a| a.meta.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()).into())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        match self.assets.remove(path) {
            Some((_, asset)) => {
                self.paths_by_uuid.remove(&asset.uuid);
                Ok(())
            }
            None => Err(StorageError::NotFound(path.to_string()).into()),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_identifier() {
        let store = MemStore::new();
        let handle = store.create("db://assets/Door.prefab", "{}").await.unwrap();

        assert_eq!(handle.uuid.len(), 36);
        assert_eq!(store.asset_count(), 1);
        assert_eq!(
            store.resolve_by_path("db://assets/Door.prefab").await.unwrap(),
            Some(handle)
        );
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let store = MemStore::new();
        store.create("a.prefab", "{}").await.unwrap();
        let err = store.create("a.prefab", "{}").await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_meta_reimport_delete() {
        let store = MemStore::new();
        let handle = store.create("a.prefab", "placeholder").await.unwrap();

        store.update_content("a.prefab", "[]").await.unwrap();
        store.save_metadata(&handle.uuid, "{\"uuid\":1}").await.unwrap();
        store.reimport("a.prefab").await.unwrap();

        assert_eq!(store.read_content("a.prefab").await.unwrap(), "[]");
        assert_eq!(
            store.read_metadata("a.prefab").await.unwrap().as_deref(),
            Some("{\"uuid\":1}")
        );
        assert_eq!(store.import_count("a.prefab"), Some(1));
        assert_eq!(store.write_count(), 2);

        store.delete("a.prefab").await.unwrap();
        assert_eq!(store.asset_count(), 0);
        assert!(store.save_metadata(&handle.uuid, "{}").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_asset_errors() {
        let store = MemStore::new();
        assert!(store.update_content("nope", "x").await.is_err());
        assert!(store.reimport("nope").await.is_err());
        assert!(store.read_content("nope").await.is_err());
        assert_eq!(store.resolve_by_path("nope").await.unwrap(), None);
    }
}
