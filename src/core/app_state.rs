//! Application State Management
//!
//! The state shared by every HTTP handler: configuration plus the prefab
//! service wired to one inspector and one asset store.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::inspector::SharedInspector;
use crate::prefab::PrefabService;
use crate::storage::{create_storage, SharedStore};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Prefab operations
    pub service: Arc<PrefabService>,
}

impl AppState {
    /// Wire the service from already constructed collaborators
    pub fn new(config: Config, inspector: SharedInspector, store: SharedStore) -> Self {
        let service = PrefabService::new(inspector, store, &config);
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
        }
    }

    /// Build the asset store named by the configuration and wire the service
    pub fn from_config(config: Config, inspector: SharedInspector) -> Result<Self> {
        let store = create_storage(&config.storage)?;
        Ok(Self::new(config, inspector, store))
    }

    /// Backend name of the asset store
    pub fn storage_backend(&self) -> &'static str {
        self.service.store().backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::MemoryInspector;

    #[test]
    fn test_from_default_config() {
        let state = AppState::from_config(Config::default(), Arc::new(MemoryInspector::new())).unwrap();
        assert_eq!(state.storage_backend(), "memory");
        assert!(state.config.prefab.include_children);
    }
}
