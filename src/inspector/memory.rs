//! In-memory scene inspector
//!
//! Serves node dumps loaded from a JSON scene file:
//!
//! ```json
//! { "nodes": [ { "uuid": "...", "name": "...", "children": [...], "components": [...] } ] }
//! ```
//!
//! A bare array of node dumps is accepted too.

use crate::core::error::{Error, InspectorError, Result, SerializationError};
use crate::core::types::{LiveComponent, NodeDump};
use crate::inspector::SceneInspector;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum SceneFile {
    Wrapped { nodes: Vec<NodeDump> },
    Bare(Vec<NodeDump>),
}

/// Inspector over a fixed set of node dumps
#[derive(Debug, Default)]
pub struct MemoryInspector {
    nodes: RwLock<HashMap<String, NodeDump>>,
    shallow: bool,
}

impl MemoryInspector {
    /// Create an empty inspector
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scene from a parsed JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let scene: SceneFile = serde_json::from_value(value).map_err(SerializationError::Json)?;
        let nodes = match scene {
            SceneFile::Wrapped { nodes } | SceneFile::Bare(nodes) => nodes,
        };

        let inspector = Self::new();
        for node in nodes {
            inspector.insert(node);
        }
        Ok(inspector)
    }

    /// Load a scene from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read scene {}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&text)?;
        Self::from_value(value)
    }

    /// Answer node queries without components, forcing callers onto
    /// the supplementary component query
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.shallow = shallow;
        self
    }

    /// Add or replace a node
    pub fn insert(&self, dump: NodeDump) {
        self.nodes.write().insert(dump.uuid.clone(), dump);
    }

    /// Number of known nodes
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// True when no nodes are loaded
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn get(&self, uuid: &str) -> Result<NodeDump> {
        self.nodes
            .read()
            .get(uuid)
            .cloned()
            .ok_or_else(|| InspectorError::NodeUnavailable { id: uuid.to_string() }.into())
    }
}

#[async_trait]
impl SceneInspector for MemoryInspector {
    async fn query_node(&self, uuid: &str) -> Result<NodeDump> {
        let mut dump = self.get(uuid)?;
        if self.shallow {
            dump.components = None;
        }
        Ok(dump)
    }

    async fn query_components(&self, uuid: &str) -> Result<Vec<LiveComponent>> {
        Ok(self.get(uuid)?.components.unwrap_or_default())
    }
}
