//! Prefab operations
//!
//! Ties the scene inspector, the prefab engine and the asset store together.
//! Every public operation returns a [`ToolResult`] rather than an error so
//! callers branch on `success` instead of handling failures.

use crate::core::config::{Config, InspectorConfig, PrefabConfig};
use crate::core::error::{Error, Result};
use crate::inspector::{SharedInspector, SnapshotBuilder, SnapshotOptions};
use crate::prefab::document::{AssembledPrefab, DocumentAssembler, PrefabMeta};
use crate::prefab::flatten::{flatten, FlattenOptions, PrefabInfoStyle};
use crate::prefab::resolver::ResolutionWarning;
use crate::prefab::validate::{validate_document, validate_text, ValidationReport};
use crate::storage::{AssetHandle, SharedStore};
use crate::system::metrics::{Metrics, Timer};
use crate::time_operation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

/// File extension of prefab assets
pub const PREFAB_EXTENSION: &str = ".prefab";

// Written by `create` so the store can assign an identifier before the
// real document, which embeds that identifier, exists
const PLACEHOLDER_CONTENT: &str = "[]";

/// Status-carrying result of a public operation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolResult<T> {
    /// True when the operation completed
    pub success: bool,
    /// Operation output on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure message otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ToolResult<T> {
    /// Successful result
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// Failed result
    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }

    /// Convert back into a `Result`, with the message as an internal error
    pub fn into_result(self) -> Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(Error::internal(self.error.unwrap_or_else(|| "operation failed".to_string()))),
        }
    }
}

impl<T> From<Result<T>> for ToolResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Input of [`PrefabService::create_prefab`]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrefabRequest {
    /// Live identifier of the node to turn into a prefab
    pub node_uuid: String,
    /// Target asset path; `.prefab` is appended when missing
    pub path: String,
    /// Prefab name; defaults to the node's name
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides `prefab.include_children`
    #[serde(default)]
    pub include_children: Option<bool>,
    /// Overrides `prefab.include_components`
    #[serde(default)]
    pub include_components: Option<bool>,
    /// Overrides `prefab.prefab_info_style`
    #[serde(default)]
    pub prefab_info_style: Option<PrefabInfoStyle>,
}

impl CreatePrefabRequest {
    /// Request with configured defaults for everything but node and path
    pub fn new(node_uuid: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            node_uuid: node_uuid.into(),
            path: path.into(),
            name: None,
            include_children: None,
            include_components: None,
            prefab_info_style: None,
        }
    }
}

/// Output of [`PrefabService::create_prefab`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabCreated {
    /// Canonical identifier assigned by the asset store
    pub uuid: String,
    /// Asset path written
    pub path: String,
    /// Prefab name
    pub name: String,
    /// Entries in the document, header included
    pub entry_count: usize,
    /// Node entries
    pub node_count: usize,
    /// Component entries
    pub component_count: usize,
    /// References written as `null`
    pub warnings: Vec<ResolutionWarning>,
}

/// Output of [`PrefabService::prefab_info`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefabSummary {
    /// Canonical identifier
    pub uuid: String,
    /// Asset path
    pub path: String,
    /// Name recorded in the document header
    pub name: Option<String>,
    /// Parsed metadata record, when one exists and parses
    pub meta: Option<PrefabMeta>,
    /// Entries in the document
    pub entry_count: usize,
    /// Node entries
    pub node_count: usize,
    /// Component entries
    pub component_count: usize,
    /// Whether the document passed structural validation
    pub is_valid: bool,
}

/// Normalize a prefab asset path, appending `.prefab` when missing
pub fn normalize_prefab_path(path: &str) -> Result<String> {
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::invalid_input("prefab path is empty"));
    }
    if path.ends_with(PREFAB_EXTENSION) {
        Ok(path.to_string())
    } else {
        Ok(format!("{}{}", path, PREFAB_EXTENSION))
    }
}

/// Prefab operations over one inspector and one asset store
pub struct PrefabService {
    inspector: SharedInspector,
    store: SharedStore,
    inspector_config: InspectorConfig,
    prefab_config: PrefabConfig,
}

impl PrefabService {
    /// Create a service using the inspector and prefab sections of `config`
    pub fn new(inspector: SharedInspector, store: SharedStore, config: &Config) -> Self {
        Self {
            inspector,
            store,
            inspector_config: config.inspector.clone(),
            prefab_config: config.prefab.clone(),
        }
    }

    /// The asset store documents are written to
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Serialize a live node into a new prefab asset.
    ///
    /// Nothing is left behind on failure: a placeholder asset created before
    /// the failure is deleted again.
    pub async fn create_prefab(&self, request: CreatePrefabRequest) -> ToolResult<PrefabCreated> {
        let metrics = Metrics::global();
        let result = self.try_create(&request).await;

        match &result {
            Ok(created) => {
                metrics.prefab.prefabs_created.inc();
                metrics.prefab.entries_emitted.inc_by(created.entry_count as u64);
                metrics
                    .prefab
                    .unresolved_references
                    .inc_by(created.warnings.len() as u64);
                info!(
                    uuid = %created.uuid,
                    path = %created.path,
                    entries = created.entry_count,
                    nodes = created.node_count,
                    components = created.component_count,
                    unresolved = created.warnings.len(),
                    "prefab created"
                );
            }
            Err(e) => {
                metrics.prefab.prefabs_failed.inc();
                error!(node = %request.node_uuid, path = %request.path, error = %e, "prefab creation failed");
            }
        }

        result.into()
    }

    async fn try_create(&self, request: &CreatePrefabRequest) -> Result<PrefabCreated> {
        let path = normalize_prefab_path(&request.path)?;
        if request.node_uuid.is_empty() {
            return Err(Error::invalid_input("node uuid is empty"));
        }
        if self.store.resolve_by_path(&path).await?.is_some() {
            return Err(Error::invalid_input(format!("an asset already exists at {}", path)));
        }

        let options = FlattenOptions {
            include_children: request
                .include_children
                .unwrap_or(self.prefab_config.include_children),
            include_components: request
                .include_components
                .unwrap_or(self.prefab_config.include_components),
            prefab_info_style: request
                .prefab_info_style
                .unwrap_or(self.prefab_config.prefab_info_style),
        };

        let snapshot_options = SnapshotOptions {
            include_children: options.include_children,
            include_components: options.include_components,
            ..SnapshotOptions::from_config(&self.inspector_config)
        };
        let metrics = Metrics::global();
        let snapshot_timer = Timer::start(&metrics.performance.snapshot_duration);
        let root = SnapshotBuilder::new(self.inspector.as_ref(), snapshot_options)
            .snapshot(&request.node_uuid)
            .await?;
        snapshot_timer.finish();

        let name = match &request.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => root.name.clone(),
        };

        let flattened = time_operation!(metrics.performance.serialization_duration, flatten(&root, &options))?;

        let handle = self.store.create(&path, PLACEHOLDER_CONTENT).await?;
        let assembler = DocumentAssembler::new(
            self.prefab_config.meta_version.clone(),
            self.prefab_config.importer.clone(),
        );
        let prefab = assembler.assemble(&name, &handle.uuid, flattened.entries);

        if let Err(e) = self.persist(&handle, &prefab).await {
            self.rollback(&handle).await;
            return Err(e);
        }

        let stats = prefab.stats();
        Ok(PrefabCreated {
            uuid: handle.uuid,
            path,
            name,
            entry_count: stats.entries,
            node_count: stats.nodes,
            component_count: stats.components,
            warnings: flattened.warnings,
        })
    }

    async fn persist(&self, handle: &AssetHandle, prefab: &AssembledPrefab) -> Result<()> {
        let body = prefab.body_json()?;
        let meta = prefab.meta_json()?;

        self.store.update_content(&handle.path, &body).await?;
        self.store.save_metadata(&handle.uuid, &meta).await?;
        self.store.reimport(&handle.path).await?;
        Ok(())
    }

    async fn rollback(&self, handle: &AssetHandle) {
        match self.store.delete(&handle.path).await {
            Ok(()) => warn!(path = %handle.path, uuid = %handle.uuid, "removed partially written prefab"),
            Err(e) => error!(path = %handle.path, error = %e, "could not remove partially written prefab"),
        }
    }

    /// Validate the prefab stored at `path`
    pub async fn validate_prefab(&self, path: &str) -> ToolResult<ValidationReport> {
        let result = async {
            let path = normalize_prefab_path(path)?;
            let text = self.store.read_content(&path).await?;
            Ok::<_, Error>(validate_text(&text))
        }
        .await;

        if result.is_ok() {
            Metrics::global().prefab.validations.inc();
        }
        result.into()
    }

    /// Validate a document supplied by the caller
    pub fn validate_document(&self, document: &Value) -> ToolResult<ValidationReport> {
        Metrics::global().prefab.validations.inc();
        ToolResult::ok(validate_document(document))
    }

    /// Describe the prefab stored at `path`
    pub async fn prefab_info(&self, path: &str) -> ToolResult<PrefabSummary> {
        self.try_info(path).await.into()
    }

    async fn try_info(&self, path: &str) -> Result<PrefabSummary> {
        let path = normalize_prefab_path(path)?;
        let handle = self
            .store
            .resolve_by_path(&path)
            .await?
            .ok_or_else(|| Error::not_found(path.clone()))?;

        let report = validate_text(&self.store.read_content(&path).await?);
        let meta = self
            .store
            .read_metadata(&path)
            .await?
            .and_then(|text| serde_json::from_str::<PrefabMeta>(&text).ok());

        Ok(PrefabSummary {
            uuid: handle.uuid,
            path,
            name: report.prefab_name.clone(),
            meta,
            entry_count: report.entry_count,
            node_count: report.node_count,
            component_count: report.component_count,
            is_valid: report.is_valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageError;
    use crate::inspector::MemoryInspector;
    use crate::storage::{AssetStore, MemStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    fn inspector() -> SharedInspector {
        Arc::new(
            MemoryInspector::from_value(json!({
                "nodes": [
                    { "uuid": "door", "name": "Door", "children": [{ "uuid": "knob", "name": "Knob" }],
                      "components": [{ "type": "cc.UITransform", "uuid": "door-ui" }] },
                    { "uuid": "knob", "name": "Knob", "position": { "x": 1, "y": 2, "z": 3 },
                      "components": [{ "type": "cc.Button", "uuid": "knob-btn", "properties": {
                          "target": { "type": "cc.Node", "value": { "uuid": "door" } },
                          "normalSprite": { "type": "cc.SpriteFrame", "value": { "uuid": "" } }
                      } }] }
                ]
            }))
            .unwrap(),
        )
    }

    fn service_with(store: SharedStore) -> PrefabService {
        PrefabService::new(inspector(), store, &Config::default())
    }

    #[tokio::test]
    async fn test_create_prefab_writes_document_and_meta() {
        let store: Arc<MemStore> = Arc::new(MemStore::new());
        let service = service_with(store.clone());

        let result = service.create_prefab(CreatePrefabRequest::new("door", "db://assets/Door")).await;
        assert!(result.success, "{:?}", result.error);
        let created = result.data.unwrap();

        assert_eq!(created.path, "db://assets/Door.prefab");
        assert_eq!(created.name, "Door");
        assert_eq!(created.node_count, 2);
        assert_eq!(created.component_count, 2);
        assert!(created.warnings.is_empty());

        let body: Value =
            serde_json::from_str(&store.read_content(&created.path).await.unwrap()).unwrap();
        assert_eq!(body[0]["_uuid"], created.uuid.as_str());
        assert_eq!(body.as_array().unwrap().len(), created.entry_count);

        let button = body
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["__type__"] == "cc.Button")
            .unwrap();
        assert_eq!(button["_target"], json!({ "__id__": 1 }));
        assert_eq!(button["_normalSprite"], Value::Null);

        let meta = store.read_metadata(&created.path).await.unwrap().unwrap();
        let meta: PrefabMeta = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta.uuid, created.uuid);
        assert_eq!(store.import_count(&created.path), Some(1));
    }

    #[tokio::test]
    async fn test_create_child_only_reports_external_reference() {
        let service = service_with(Arc::new(MemStore::new()));
        let created = service
            .create_prefab(CreatePrefabRequest::new("knob", "Knob.prefab"))
            .await
            .into_result()
            .unwrap();

        assert_eq!(created.node_count, 1);
        assert_eq!(created.warnings.len(), 1);
        assert_eq!(created.warnings[0].target, "door");
    }

    #[tokio::test]
    async fn test_create_rejects_existing_path_and_bad_input() {
        let store = Arc::new(MemStore::new());
        store.create("Door.prefab", "[]").await.unwrap();
        let service = service_with(store);

        let result = service.create_prefab(CreatePrefabRequest::new("door", "Door")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("already exists"));

        let result = service.create_prefab(CreatePrefabRequest::new("door", "  ")).await;
        assert!(!result.success);

        let result = service.create_prefab(CreatePrefabRequest::new("missing", "Other")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Node unavailable"));
    }

    struct RejectingReimport(MemStore);

    #[async_trait]
    impl AssetStore for RejectingReimport {
        async fn create(&self, path: &str, content: &str) -> Result<AssetHandle> {
            self.0.create(path, content).await
        }
        async fn update_content(&self, path: &str, content: &str) -> Result<()> {
            self.0.update_content(path, content).await
        }
        async fn save_metadata(&self, uuid: &str, meta: &str) -> Result<()> {
            self.0.save_metadata(uuid, meta).await
        }
        async fn reimport(&self, path: &str) -> Result<()> {
            Err(StorageError::ReimportFailed {
                path: path.to_string(),
                message: "importer crashed".to_string(),
            }
            .into())
        }
        async fn resolve_by_path(&self, path: &str) -> Result<Option<AssetHandle>> {
            self.0.resolve_by_path(path).await
        }
        async fn read_content(&self, path: &str) -> Result<String> {
            self.0.read_content(path).await
        }
        async fn read_metadata(&self, path: &str) -> Result<Option<String>> {
            self.0.read_metadata(path).await
        }
        async fn delete(&self, path: &str) -> Result<()> {
            self.0.delete(path).await
        }
        fn backend(&self) -> &'static str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back() {
        let store = Arc::new(RejectingReimport(MemStore::new()));
        let service = service_with(store.clone());

        let result = service.create_prefab(CreatePrefabRequest::new("door", "Door")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("importer crashed"));
        assert_eq!(store.0.asset_count(), 0);
    }

    #[tokio::test]
    async fn test_validate_and_info() {
        let service = service_with(Arc::new(MemStore::new()));
        let created = service
            .create_prefab(CreatePrefabRequest::new("door", "Door"))
            .await
            .into_result()
            .unwrap();

        let report = service.validate_prefab("Door").await.into_result().unwrap();
        assert!(report.is_valid, "{:?}", report.issues);
        assert_eq!(report.entry_count, created.entry_count);

        let info = service.prefab_info("Door.prefab").await.into_result().unwrap();
        assert_eq!(info.uuid, created.uuid);
        assert_eq!(info.name.as_deref(), Some("Door"));
        assert_eq!(info.meta.map(|m| m.importer), Some("prefab".to_string()));
        assert!(info.is_valid);

        let missing = service.prefab_info("Nope").await;
        assert!(!missing.success);
    }

    #[test]
    fn test_validate_document_never_fails() {
        let service = service_with(Arc::new(MemStore::new()));
        let result = service.validate_document(&json!("not an array"));
        assert!(result.success);
        assert!(!result.data.unwrap().is_valid);
    }

    #[test]
    fn test_normalize_prefab_path() {
        assert_eq!(normalize_prefab_path("ui/Door").unwrap(), "ui/Door.prefab");
        assert_eq!(normalize_prefab_path("Door.prefab").unwrap(), "Door.prefab");
        assert!(normalize_prefab_path(" ").is_err());
    }
}
