//! Two-phase scene snapshot
//!
//! All live data is fetched first, level by level with a bounded number of
//! queries in flight, and only then assembled into an owned tree. Fetch order
//! therefore never influences the document index order, which is decided later
//! by the synchronous flattener.

use crate::core::config::InspectorConfig;
use crate::core::error::{InspectorError, Result};
use crate::core::types::{LiveComponent, LiveNode, NodeDump, NodeRef};
use crate::inspector::SceneInspector;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

/// Snapshot limits and inclusion flags
#[derive(Clone, Debug)]
pub struct SnapshotOptions {
    /// Deadline for a supplementary component query
    pub component_fetch_timeout: Duration,
    /// Deepest level fetched below the root
    pub max_depth: usize,
    /// Queries in flight at once
    pub fetch_concurrency: usize,
    /// Fetch descendants
    pub include_children: bool,
    /// Fetch components
    pub include_components: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self::from_config(&InspectorConfig::default())
    }
}

impl SnapshotOptions {
    /// Options from the inspector configuration, including everything
    pub fn from_config(config: &InspectorConfig) -> Self {
        Self {
            component_fetch_timeout: config.component_fetch_timeout,
            max_depth: config.max_depth,
            fetch_concurrency: config.fetch_concurrency.max(1),
            include_children: true,
            include_components: true,
        }
    }
}

enum Fetched {
    Node {
        dump: NodeDump,
        components: Vec<LiveComponent>,
    },
    Missing(NodeRef),
}

// Every child listed by a parent gets its own slot, so unidentified siblings
// and inspectors that rewrite identifiers never collapse two entries into one
type Slot = usize;

#[derive(Default)]
struct Walk {
    fetched: HashMap<Slot, Fetched>,
    children_of: HashMap<Slot, Vec<Slot>>,
    visited: HashSet<String>,
    next_slot: Slot,
}

impl Walk {
    fn allocate(&mut self) -> Slot {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }
}

/// Builds an owned [`LiveNode`] tree from a [`SceneInspector`]
pub struct SnapshotBuilder<'a> {
    inspector: &'a dyn SceneInspector,
    options: SnapshotOptions,
}

impl<'a> SnapshotBuilder<'a> {
    /// Create a builder over `inspector`
    pub fn new(inspector: &'a dyn SceneInspector, options: SnapshotOptions) -> Self {
        Self { inspector, options }
    }

    /// Snapshot the subtree rooted at `root_uuid`.
    ///
    /// Fails only when the root itself cannot be read; unreadable descendants
    /// are replaced with minimal placeholder nodes.
    pub async fn snapshot(&self, root_uuid: &str) -> Result<LiveNode> {
        let root_dump = self.inspector.query_node(root_uuid).await?;
        let root_components = self.components_for(&root_dump).await;

        let mut walk = Walk::default();
        let root_slot = walk.allocate();
        walk.visited.insert(root_uuid.to_string());
        walk.visited.insert(root_dump.uuid.clone());

        let mut level = self.next_level(&mut walk, root_slot, &root_dump, 0);
        walk.fetched.insert(
            root_slot,
            Fetched::Node { dump: root_dump, components: root_components },
        );

        let mut depth = 1;
        while !level.is_empty() {
            debug!(depth, nodes = level.len(), "fetching scene level");

            let results: Vec<(Slot, Fetched)> = stream::iter(level)
                .map(|(slot, reference)| self.fetch(slot, reference))
                .buffered(self.options.fetch_concurrency.max(1))
                .collect()
                .await;

            let mut next = Vec::new();
            for (slot, result) in results {
                if let Fetched::Node { dump, .. } = &result {
                    next.extend(self.next_level(&mut walk, slot, dump, depth));
                }
                walk.fetched.insert(slot, result);
            }

            level = next;
            depth += 1;
        }

        Ok(build_tree(root_slot, &mut walk))
    }

    // Children of `dump` that should be fetched; records the accepted slots
    fn next_level(
        &self,
        walk: &mut Walk,
        parent: Slot,
        dump: &NodeDump,
        depth: usize,
    ) -> Vec<(Slot, NodeRef)> {
        if !self.options.include_children || dump.children.is_empty() {
            return Vec::new();
        }
        if depth >= self.options.max_depth {
            warn!(node = %dump.uuid, depth, "maximum depth reached, children skipped");
            return Vec::new();
        }

        let mut accepted = Vec::with_capacity(dump.children.len());
        for child in &dump.children {
            // unidentified children cannot close a cycle
            if !child.uuid.is_empty() && !walk.visited.insert(child.uuid.clone()) {
                warn!(node = %dump.uuid, child = %child.uuid, "node already visited, skipping");
                continue;
            }
            accepted.push((walk.allocate(), child.clone()));
        }

        walk.children_of.insert(parent, accepted.iter().map(|(slot, _)| *slot).collect());
        accepted
    }

    async fn fetch(&self, slot: Slot, reference: NodeRef) -> (Slot, Fetched) {
        if reference.uuid.is_empty() {
            debug!(name = %reference.name, "child without identifier, using placeholder");
            return (slot, Fetched::Missing(reference));
        }

        match self.inspector.query_node(&reference.uuid).await {
            Ok(dump) => {
                let components = self.components_for(&dump).await;
                (slot, Fetched::Node { dump, components })
            }
            Err(e) => {
                warn!(node = %reference.uuid, error = %e, "node unavailable, using placeholder");
                (slot, Fetched::Missing(reference))
            }
        }
    }

    async fn components_for(&self, dump: &NodeDump) -> Vec<LiveComponent> {
        if !self.options.include_components {
            return Vec::new();
        }
        if let Some(components) = &dump.components {
            return components.clone();
        }

        let timeout = self.options.component_fetch_timeout;
        let query = self.inspector.query_components(&dump.uuid);
        match tokio::time::timeout(timeout, query).await {
            Ok(Ok(components)) => components,
            Ok(Err(e)) => {
                warn!(node = %dump.uuid, error = %e, "component query failed, node keeps no components");
                Vec::new()
            }
            Err(_) => {
                let err = InspectorError::Timeout { millis: timeout.as_millis() as u64 };
                warn!(node = %dump.uuid, error = %err, "component query abandoned");
                Vec::new()
            }
        }
    }
}

fn build_tree(slot: Slot, walk: &mut Walk) -> LiveNode {
    let mut node = match walk.fetched.remove(&slot) {
        Some(Fetched::Node { dump, components }) => LiveNode::from_dump(&dump, components),
        Some(Fetched::Missing(reference)) => LiveNode::placeholder(&reference),
        None => LiveNode::placeholder(&NodeRef::default()),
    };

    if let Some(children) = walk.children_of.remove(&slot) {
        node.children = children.into_iter().map(|child| build_tree(child, walk)).collect();
    }
    node
}
