//! Node/component flattener
//!
//! Walks a live node snapshot in pre-order and produces the document entries
//! from index 1 onward. Indices are handed out in this order for every node:
//!
//! 1. the node itself,
//! 2. one index per child, all before any child is visited,
//! 3. each child's subtree, recursively,
//! 4. per component, the component followed by its CompPrefabInfo,
//! 5. the node's PrefabInfo.
//!
//! The walk runs twice over the same snapshot. The layout pass allocates
//! every index and records every live identifier; the emission pass then
//! builds the entries, so a property may point at any node or component of
//! the subtree no matter where it sits in traversal order.

use crate::core::error::{Error, Result};
use crate::core::types::{ComponentType, LiveComponent, LiveNode};
use crate::prefab::codec::{compress_uuid, generate_file_id};
use crate::prefab::document::{
    ComponentPrefabInfo, DocumentEntry, IdRef, NodePrefabInfo, SerializedComponent,
    SerializedNode, COMP_PREFAB_INFO_TYPE, HEADER_INDEX, NODE_TYPE, PREFAB_INFO_TYPE, ROOT_INDEX,
};
use crate::prefab::index::ReferenceIndex;
use crate::prefab::resolver::{quat_value, vec3_value, PropertyResolver, ResolutionWarning};
use crate::prefab::schema::{generic_field_name, schema_for, ComponentSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Shape of `targetOverrides` / `nestedPrefabInstanceRoots` on the root PrefabInfo
///
/// Both shapes occur in documents the engine accepts; callers pick one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefabInfoStyle {
    /// Write `null`
    #[default]
    Null,
    /// Write `[]`
    Empty,
}

impl PrefabInfoStyle {
    fn override_list(self) -> Value {
        match self {
            PrefabInfoStyle::Null => Value::Null,
            PrefabInfoStyle::Empty => Value::Array(Vec::new()),
        }
    }
}

/// What a flatten call includes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Serialize descendants of the root
    pub include_children: bool,
    /// Serialize components
    pub include_components: bool,
    /// Root PrefabInfo override list shape
    pub prefab_info_style: PrefabInfoStyle,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            include_children: true,
            include_components: true,
            prefab_info_style: PrefabInfoStyle::Null,
        }
    }
}

/// Result of one flatten call
#[derive(Clone, Debug)]
pub struct FlattenOutput {
    /// Entries for document indices 1.., ready for the assembler
    pub entries: Vec<DocumentEntry>,
    /// References that pointed outside the subtree and were written as `null`
    pub warnings: Vec<ResolutionWarning>,
}

/// Flatten `root` into document entries
pub fn flatten(root: &LiveNode, options: &FlattenOptions) -> Result<FlattenOutput> {
    FlattenContext::new(*options).run(root)
}

struct NodeLayout {
    index: usize,
    children: Vec<NodeLayout>,
    components: Vec<ComponentLayout>,
    prefab_info: usize,
}

struct ComponentLayout {
    index: usize,
    prefab_info: usize,
}

/// State of a single flatten call. Never shared between calls.
pub struct FlattenContext {
    options: FlattenOptions,
    next_index: usize,
    index: ReferenceIndex,
    slots: Vec<Option<DocumentEntry>>,
    warnings: Vec<ResolutionWarning>,
    file_ids: HashSet<String>,
}

impl FlattenContext {
    /// Create a context whose first allocated index is the root's
    pub fn new(options: FlattenOptions) -> Self {
        Self {
            options,
            next_index: ROOT_INDEX,
            index: ReferenceIndex::new(),
            slots: Vec::new(),
            warnings: Vec::new(),
            file_ids: HashSet::new(),
        }
    }

    /// Flatten `root`, consuming the context
    pub fn run(mut self, root: &LiveNode) -> Result<FlattenOutput> {
        let root_index = self.allocate();
        let layout = self.layout(root, root_index);
        self.emit(root, &layout, None);

        debug!(
            root = %root.name,
            entries = self.slots.len(),
            nodes = self.index.node_count(),
            components = self.index.component_count(),
            unresolved = self.warnings.len(),
            "flattened node tree"
        );

        let entries = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(offset, slot)| {
                slot.ok_or_else(|| {
                    Error::internal(format!("document index {} was never filled", offset + ROOT_INDEX))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FlattenOutput { entries, warnings: self.warnings })
    }

    fn allocate(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.slots.push(None);
        index
    }

    // Live uuid when it is still free in this document, otherwise a fresh id.
    // Node and component uuids come from separate key spaces and may collide.
    fn file_id(&mut self, uuid: Option<&String>) -> String {
        if let Some(uuid) = uuid {
            if self.file_ids.insert(uuid.clone()) {
                return uuid.clone();
            }
        }
        loop {
            let id = generate_file_id();
            if self.file_ids.insert(id.clone()) {
                return id;
            }
        }
    }

    fn fill(&mut self, index: usize, entry: DocumentEntry) {
        self.slots[index - ROOT_INDEX] = Some(entry);
    }

    fn layout(&mut self, node: &LiveNode, index: usize) -> NodeLayout {
        if let Some(uuid) = &node.uuid {
            self.index.record_node(uuid, index);
        }

        let mut children = Vec::new();
        if self.options.include_children {
            let child_indices: Vec<usize> = node.children.iter().map(|_| self.allocate()).collect();
            for (child, child_index) in node.children.iter().zip(child_indices) {
                children.push(self.layout(child, child_index));
            }
        }

        let mut components = Vec::new();
        if self.options.include_components {
            for component in &node.components {
                let index = self.allocate();
                let prefab_info = self.allocate();
                if let Some(uuid) = &component.uuid {
                    self.index.record_component(uuid, index);
                }
                components.push(ComponentLayout { index, prefab_info });
            }
        }

        let prefab_info = self.allocate();

        NodeLayout { index, children, components, prefab_info }
    }

    fn emit(&mut self, node: &LiveNode, layout: &NodeLayout, parent: Option<usize>) {
        let entry = SerializedNode {
            type_name: NODE_TYPE.to_string(),
            name: node.name.clone(),
            obj_flags: 0,
            editor_extras: json!({}),
            parent: parent.map(IdRef::new),
            children: layout.children.iter().map(|c| IdRef::new(c.index)).collect(),
            active: node.active,
            components: layout.components.iter().map(|c| IdRef::new(c.index)).collect(),
            prefab: IdRef::new(layout.prefab_info),
            lpos: vec3_value(&node.position),
            lrot: quat_value(&node.rotation),
            lscale: vec3_value(&node.scale),
            mobility: 0,
            layer: node.layer,
            euler: vec3_value(&node.euler),
            id: String::new(),
        };
        self.fill(layout.index, DocumentEntry::Node(entry));

        for (child, child_layout) in node.children.iter().zip(&layout.children) {
            self.emit(child, child_layout, Some(layout.index));
        }

        for (component, component_layout) in node.components.iter().zip(&layout.components) {
            let entry = self.component_entry(node, layout.index, component, component_layout);
            self.fill(component_layout.index, DocumentEntry::Component(entry));

            let info = ComponentPrefabInfo {
                type_name: COMP_PREFAB_INFO_TYPE.to_string(),
                file_id: self.file_id(component.uuid.as_ref()),
            };
            self.fill(component_layout.prefab_info, DocumentEntry::ComponentPrefabInfo(info));
        }

        let is_root = parent.is_none();
        let overrides = is_root.then(|| self.options.prefab_info_style.override_list());
        let file_id = self.file_id(node.uuid.as_ref());
        let info = NodePrefabInfo {
            type_name: PREFAB_INFO_TYPE.to_string(),
            root: IdRef::new(ROOT_INDEX),
            asset: IdRef::new(HEADER_INDEX),
            file_id,
            instance: None,
            target_overrides: overrides.clone(),
            nested_prefab_instance_roots: overrides,
        };
        self.fill(layout.prefab_info, DocumentEntry::NodePrefabInfo(info));
    }

    fn component_entry(
        &mut self,
        node: &LiveNode,
        node_index: usize,
        component: &LiveComponent,
        layout: &ComponentLayout,
    ) -> SerializedComponent {
        let owner = format!("{}/{}", node.name, component.component_type.display_name());
        let mut resolver = PropertyResolver::new(&self.index, &mut self.warnings);

        let (type_name, properties) = match &component.component_type {
            ComponentType::BuiltIn(name) => {
                let properties = match schema_for(name) {
                    Some(schema) => schema_properties(&mut resolver, &owner, schema, component),
                    None => generic_properties(&mut resolver, &owner, component),
                };
                (name.clone(), properties)
            }
            ComponentType::Script { asset_uuid, .. } => (
                compress_uuid(asset_uuid),
                generic_properties(&mut resolver, &owner, component),
            ),
        };

        SerializedComponent {
            type_name,
            name: String::new(),
            obj_flags: 0,
            editor_extras: json!({}),
            node: IdRef::new(node_index),
            enabled: component.enabled,
            prefab: IdRef::new(layout.prefab_info),
            properties,
            id: String::new(),
        }
    }
}

fn schema_properties(
    resolver: &mut PropertyResolver<'_>,
    owner: &str,
    schema: &ComponentSchema,
    component: &LiveComponent,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(schema.fields.len());

    for spec in schema.fields {
        let live = spec
            .sources()
            .into_iter()
            .find_map(|name| component.properties.get(name));

        let value = match live {
            Some(value) => resolver.resolve(&format!("{}.{}", owner, spec.field), value),
            None => spec.default.to_value(),
        };
        out.insert(spec.field.to_string(), value);
    }

    out
}

fn generic_properties(
    resolver: &mut PropertyResolver<'_>,
    owner: &str,
    component: &LiveComponent,
) -> Map<String, Value> {
    let mut out = Map::with_capacity(component.properties.len());

    for (name, value) in &component.properties {
        let Some(field) = generic_field_name(name) else {
            continue;
        };
        let resolved = resolver.resolve(&format!("{}.{}", owner, name), value);
        out.insert(field, resolved);
    }

    out
}
