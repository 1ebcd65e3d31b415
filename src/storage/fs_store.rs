//! Filesystem asset store
//!
//! Each asset is a file below the store root with its metadata record next to
//! it as `<file>.meta`. The canonical identifier is read back from the
//! metadata record, so a store reopened on an existing directory resolves
//! previously written assets.

use crate::core::error::{Result, StorageError};
use crate::storage::{relative_asset_path, AssetHandle, AssetStore};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Asset store writing below a data directory
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    paths_by_uuid: DashMap<String, String>,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(StorageError::DiskIo)?;
        Ok(Self {
            root,
            paths_by_uuid: DashMap::new(),
        })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(relative_asset_path(path)?))
    }

    async fn read_uuid(&self, file: &Path) -> Option<String> {
        let text = tokio::fs::read_to_string(meta_path(file)).await.ok()?;
        let meta: Value = serde_json::from_str(&text).ok()?;
        meta.get("uuid").and_then(Value::as_str).map(str::to_string)
    }
}

fn meta_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(".meta");
    PathBuf::from(name)
}

fn not_found_or_io(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(path.to_string())
    } else {
        StorageError::DiskIo(err)
    }
}

#[async_trait]
impl AssetStore for FsStore {
    async fn create(&self, path: &str, content: &str) -> Result<AssetHandle> {
        let file = self.file_path(path)?;
        let failed = |message: String| StorageError::CreateFailed {
            path: path.to_string(),
            message,
        };

        if tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(failed("asset already exists".to_string()).into());
        }
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(e.to_string()))?;
        }

        let uuid = uuid::Uuid::new_v4().to_string();
        tokio::fs::write(&file, content)
            .await
            .map_err(|e| failed(e.to_string()))?;
        // provisional record so the identifier survives until metadata is saved
        tokio::fs::write(meta_path(&file), json!({ "uuid": uuid }).to_string())
            .await
            .map_err(|e| failed(e.to_string()))?;

        self.paths_by_uuid.insert(uuid.clone(), path.to_string());
        debug!(path, uuid = %uuid, file = %file.display(), "created asset");

        Ok(AssetHandle { uuid, path: path.to_string() })
    }

    async fn update_content(&self, path: &str, content: &str) -> Result<()> {
        let file = self.file_path(path)?;
        let failed = |message: String| StorageError::WriteFailed {
            path: path.to_string(),
            message,
        };

        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(failed("asset does not exist".to_string()).into());
        }
        tokio::fs::write(&file, content)
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    async fn save_metadata(&self, uuid: &str, meta: &str) -> Result<()> {
        let failed = |message: String| StorageError::MetadataFailed {
            uuid: uuid.to_string(),
            message,
        };

        let path = self
            .paths_by_uuid
            .get(uuid)
            .map(|p| p.value().clone())
            .ok_or_else(|| failed("unknown asset".to_string()))?;
        let file = self.file_path(&path)?;

        tokio::fs::write(meta_path(&file), meta)
            .await
            .map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    async fn reimport(&self, path: &str) -> Result<()> {
        let file = self.file_path(path)?;
        let failed = |message: String| StorageError::ReimportFailed {
            path: path.to_string(),
            message,
        };

        let text = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| failed(e.to_string()))?;
        serde_json::from_str::<Value>(&text).map_err(|e| failed(e.to_string()))?;

        debug!(path, "reimported asset");
        Ok(())
    }

    async fn resolve_by_path(&self, path: &str) -> Result<Option<AssetHandle>> {
        let file = self.file_path(path)?;
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Ok(None);
        }

        match self.read_uuid(&file).await {
            Some(uuid) => {
                self.paths_by_uuid.insert(uuid.clone(), path.to_string());
                Ok(Some(AssetHandle { uuid, path: path.to_string() }))
            }
            None => {
                debug!(path, "asset has no readable metadata");
                Ok(None)
            }
        }
    }

    async fn read_content(&self, path: &str) -> Result<String> {
        let file = self.file_path(path)?;
        tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| not_found_or_io(path, e).into())
    }

    async fn read_metadata(&self, path: &str) -> Result<Option<String>> {
        let file = self.file_path(path)?;
        if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()).into());
        }

        match tokio::fs::read_to_string(meta_path(&file)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::DiskIo(e).into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file = self.file_path(path)?;
        tokio::fs::remove_file(&file)
            .await
            .map_err(|e| not_found_or_io(path, e))?;

        match tokio::fs::remove_file(meta_path(&file)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::DiskIo(e).into()),
        }

        self.paths_by_uuid.retain(|_, p| p != path);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "disk"
    }
}
