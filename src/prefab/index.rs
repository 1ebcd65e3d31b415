//! Reference index
//!
//! Maps live identifiers to the document positions allocated for them.
//! Nodes and components are kept apart since the live system does not
//! guarantee their key spaces are disjoint.

use std::collections::HashMap;

/// Live identifier to document index tables for one flatten call
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    nodes: HashMap<String, usize>,
    components: HashMap<String, usize>,
}

impl ReferenceIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the index assigned to a node
    pub fn record_node(&mut self, uuid: &str, index: usize) {
        self.nodes.insert(uuid.to_string(), index);
    }

    /// Record the index assigned to a component
    pub fn record_component(&mut self, uuid: &str, index: usize) {
        self.components.insert(uuid.to_string(), index);
    }

    /// Index of a node inside the document
    pub fn node(&self, uuid: &str) -> Option<usize> {
        self.nodes.get(uuid).copied()
    }

    /// Index of a component inside the document
    pub fn component(&self, uuid: &str) -> Option<usize> {
        self.components.get(uuid).copied()
    }

    /// Number of recorded nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of recorded components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_and_component_spaces_are_separate() {
        let mut index = ReferenceIndex::new();
        index.record_node("shared", 1);
        index.record_component("shared", 4);

        assert_eq!(index.node("shared"), Some(1));
        assert_eq!(index.component("shared"), Some(4));
        assert_eq!(index.node("missing"), None);
        assert_eq!((index.node_count(), index.component_count()), (1, 1));
    }
}
