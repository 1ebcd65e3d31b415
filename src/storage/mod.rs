//! Asset store layer
//!
//! The prefab service persists documents through the [`AssetStore`] trait.
//! A store assigns the canonical identifier on `create`; the service then
//! overwrites the placeholder content, writes the metadata record and asks
//! for a reimport.

pub mod factory;
pub mod fs_store;
pub mod mem_store;

pub use factory::{create_storage, SharedStore};
pub use fs_store::FsStore;
pub use mem_store::MemStore;

use crate::core::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// URL scheme prefix of editor asset paths
pub const ASSET_URL_PREFIX: &str = "db://assets/";

/// A persisted asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetHandle {
    /// Canonical identifier assigned by the store
    pub uuid: String,
    /// Asset path as given at creation
    pub path: String,
}

/// Output collaborator that owns persisted assets
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Create a new asset with `content` and return its canonical identifier.
    /// Fails if an asset already exists at `path`.
    async fn create(&self, path: &str, content: &str) -> Result<AssetHandle>;

    /// Replace the content of an existing asset
    async fn update_content(&self, path: &str, content: &str) -> Result<()>;

    /// Write the metadata record of the asset with identifier `uuid`
    async fn save_metadata(&self, uuid: &str, meta: &str) -> Result<()>;

    /// Ask the store to re-read the asset at `path`
    async fn reimport(&self, path: &str) -> Result<()>;

    /// Look up an asset by path
    async fn resolve_by_path(&self, path: &str) -> Result<Option<AssetHandle>>;

    /// Read an asset's content
    async fn read_content(&self, path: &str) -> Result<String>;

    /// Read an asset's metadata record, if one was written
    async fn read_metadata(&self, path: &str) -> Result<Option<String>>;

    /// Remove an asset and its metadata
    async fn delete(&self, path: &str) -> Result<()>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Path of an asset relative to the asset root.
///
/// Accepts `db://assets/...` URLs and plain relative paths. Absolute paths
/// and parent-directory components are rejected.
pub fn relative_asset_path(path: &str) -> Result<PathBuf> {
    let trimmed = path.strip_prefix(ASSET_URL_PREFIX).unwrap_or(path);
    if trimmed.is_empty() {
        return Err(Error::invalid_input("asset path is empty"));
    }

    let relative = Path::new(trimmed);
    let mut out = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::invalid_input(format!(
                    "asset path must stay inside the asset root: {}",
                    path
                )))
            }
        }
    }

    if out.as_os_str().is_empty() {
        return Err(Error::invalid_input("asset path is empty"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_asset_path() {
        assert_eq!(
            relative_asset_path("db://assets/ui/Door.prefab").unwrap(),
            PathBuf::from("ui/Door.prefab")
        );
        assert_eq!(
            relative_asset_path("./ui/Door.prefab").unwrap(),
            PathBuf::from("ui/Door.prefab")
        );
        assert!(relative_asset_path("db://assets/").is_err());
        assert!(relative_asset_path("../outside.prefab").is_err());
        assert!(relative_asset_path("/etc/passwd").is_err());
    }
}
