//! Scene inspector
//!
//! Read-only access to the editor's live scene graph. The prefab engine only
//! ever sees an owned [`LiveNode`](crate::core::types::LiveNode) snapshot;
//! [`SnapshotBuilder`] produces one from any [`SceneInspector`].

pub mod memory;
pub mod snapshot;

pub use memory::MemoryInspector;
pub use snapshot::{SnapshotBuilder, SnapshotOptions};

use crate::core::error::Result;
use crate::core::types::{LiveComponent, NodeDump};
use async_trait::async_trait;
use std::sync::Arc;

/// Input collaborator answering questions about live nodes
#[async_trait]
pub trait SceneInspector: Send + Sync {
    /// Query one node. `components` may be `None` for a shallow answer.
    async fn query_node(&self, uuid: &str) -> Result<NodeDump>;

    /// Query the components of one node
    async fn query_components(&self, uuid: &str) -> Result<Vec<LiveComponent>>;
}

/// Inspector shared between requests
pub type SharedInspector = Arc<dyn SceneInspector>;
