//! Storage factory for creating asset stores based on configuration

use crate::core::config::{StorageConfig, StorageType};
use crate::core::error::Result;
use crate::storage::{AssetStore, FsStore, MemStore};
use std::sync::Arc;
use tracing::info;

/// Asset store shared between the service and the HTTP layer
pub type SharedStore = Arc<dyn AssetStore>;

/// Create an asset store based on configuration
pub fn create_storage(config: &StorageConfig) -> Result<SharedStore> {
    let store: SharedStore = match config.storage_type {
        StorageType::Memory => Arc::new(MemStore::new()),
        StorageType::Disk => Arc::new(FsStore::open(&config.data_dir)?),
    };

    info!(
        backend = store.backend(),
        data_dir = %config.data_dir.display(),
        "asset store ready"
    );
    Ok(store)
}
