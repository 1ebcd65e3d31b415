//! Document entries and assembly
//!
//! A prefab document is a JSON array of entries. Entry 0 is the `cc.Prefab`
//! header, entry 1 the root node; every cross-entry pointer is an index into
//! the same array. Field names are consumed verbatim by the engine.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Engine type of the header entry
pub const PREFAB_TYPE: &str = "cc.Prefab";
/// Engine type of node entries
pub const NODE_TYPE: &str = "cc.Node";
/// Engine type of node PrefabInfo entries
pub const PREFAB_INFO_TYPE: &str = "cc.PrefabInfo";
/// Engine type of component PrefabInfo entries
pub const COMP_PREFAB_INFO_TYPE: &str = "cc.CompPrefabInfo";

/// Index of the header entry
pub const HEADER_INDEX: usize = 0;
/// Index of the root node entry
pub const ROOT_INDEX: usize = 1;

/// Internal reference `{ "__id__": n }`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    /// Target document index
    #[serde(rename = "__id__")]
    pub id: usize,
}

impl IdRef {
    /// Reference the entry at `id`
    pub const fn new(id: usize) -> Self {
        Self { id }
    }
}

/// The `cc.Prefab` header entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrefabHeader {
    #[serde(rename = "__type__")]
    pub type_name: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Value,
    #[serde(rename = "_native")]
    pub native: String,
    /// Canonical identifier assigned by the asset store
    #[serde(rename = "_uuid")]
    pub uuid: String,
    pub data: IdRef,
    #[serde(rename = "optimizationPolicy")]
    pub optimization_policy: u32,
    pub persistent: bool,
}

/// A serialized `cc.Node`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SerializedNode {
    #[serde(rename = "__type__")]
    pub type_name: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Value,
    #[serde(rename = "_parent")]
    pub parent: Option<IdRef>,
    #[serde(rename = "_children")]
    pub children: Vec<IdRef>,
    #[serde(rename = "_active")]
    pub active: bool,
    #[serde(rename = "_components")]
    pub components: Vec<IdRef>,
    #[serde(rename = "_prefab")]
    pub prefab: IdRef,
    #[serde(rename = "_lpos")]
    pub lpos: Value,
    #[serde(rename = "_lrot")]
    pub lrot: Value,
    #[serde(rename = "_lscale")]
    pub lscale: Value,
    #[serde(rename = "_mobility")]
    pub mobility: u32,
    #[serde(rename = "_layer")]
    pub layer: u32,
    #[serde(rename = "_euler")]
    pub euler: Value,
    #[serde(rename = "_id")]
    pub id: String,
}

/// A serialized component
///
/// `type_name` is the engine type for built-ins and the compressed script
/// UUID for script components.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SerializedComponent {
    #[serde(rename = "__type__")]
    pub type_name: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags")]
    pub obj_flags: u32,
    #[serde(rename = "__editorExtras__")]
    pub editor_extras: Value,
    pub node: IdRef,
    #[serde(rename = "_enabled")]
    pub enabled: bool,
    #[serde(rename = "__prefab")]
    pub prefab: IdRef,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
    #[serde(rename = "_id")]
    pub id: String,
}

/// `cc.PrefabInfo` attached to every node
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodePrefabInfo {
    #[serde(rename = "__type__")]
    pub type_name: String,
    pub root: IdRef,
    pub asset: IdRef,
    #[serde(rename = "fileId")]
    pub file_id: String,
    pub instance: Option<Value>,
    /// Present on the root PrefabInfo only; `null` or `[]` by call-site choice
    #[serde(rename = "targetOverrides", skip_serializing_if = "Option::is_none")]
    pub target_overrides: Option<Value>,
    /// Present on the root PrefabInfo only; `null` or `[]` by call-site choice
    #[serde(
        rename = "nestedPrefabInstanceRoots",
        skip_serializing_if = "Option::is_none"
    )]
    pub nested_prefab_instance_roots: Option<Value>,
}

/// `cc.CompPrefabInfo` attached to every component
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComponentPrefabInfo {
    #[serde(rename = "__type__")]
    pub type_name: String,
    #[serde(rename = "fileId")]
    pub file_id: String,
}

/// One slot of the flat document
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentEntry {
    /// Header, always at index 0
    Header(PrefabHeader),
    /// Node
    Node(SerializedNode),
    /// Component
    Component(SerializedComponent),
    /// PrefabInfo paired with a node
    NodePrefabInfo(NodePrefabInfo),
    /// PrefabInfo paired with a component
    ComponentPrefabInfo(ComponentPrefabInfo),
}

impl DocumentEntry {
    /// Engine type name of the entry
    pub fn type_name(&self) -> &str {
        match self {
            DocumentEntry::Header(h) => &h.type_name,
            DocumentEntry::Node(n) => &n.type_name,
            DocumentEntry::Component(c) => &c.type_name,
            DocumentEntry::NodePrefabInfo(p) => &p.type_name,
            DocumentEntry::ComponentPrefabInfo(p) => &p.type_name,
        }
    }

    /// The node, if this entry is one
    pub fn as_node(&self) -> Option<&SerializedNode> {
        match self {
            DocumentEntry::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The component, if this entry is one
    pub fn as_component(&self) -> Option<&SerializedComponent> {
        match self {
            DocumentEntry::Component(component) => Some(component),
            _ => None,
        }
    }
}

/// Metadata record stored next to the document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrefabMeta {
    pub ver: String,
    pub importer: String,
    pub imported: bool,
    pub uuid: String,
    pub files: Vec<String>,
    #[serde(rename = "subMetas")]
    pub sub_metas: Map<String, Value>,
    #[serde(rename = "userData")]
    pub user_data: Map<String, Value>,
}

/// Entry counts of an assembled document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    /// Total entries including the header
    pub entries: usize,
    /// Node entries
    pub nodes: usize,
    /// Component entries
    pub components: usize,
}

/// A finished document and its metadata record
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledPrefab {
    /// Entries, header first
    pub body: Vec<DocumentEntry>,
    /// Metadata record
    pub meta: PrefabMeta,
}

impl AssembledPrefab {
    /// Document text, pretty printed
    pub fn body_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.body)
    }

    /// Metadata text, pretty printed
    pub fn meta_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.meta)
    }

    /// Entry counts
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            entries: self.body.len(),
            nodes: self.body.iter().filter(|e| e.as_node().is_some()).count(),
            components: self.body.iter().filter(|e| e.as_component().is_some()).count(),
        }
    }
}

/// Wraps flattened entries with the header and builds the metadata record
#[derive(Clone, Debug)]
pub struct DocumentAssembler {
    meta_version: String,
    importer: String,
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new("1.1.50", "prefab")
    }
}

impl DocumentAssembler {
    /// Create an assembler writing the given metadata version and importer tag
    pub fn new(meta_version: impl Into<String>, importer: impl Into<String>) -> Self {
        Self {
            meta_version: meta_version.into(),
            importer: importer.into(),
        }
    }

    /// Build the document for `entries`, which must start at index 1.
    pub fn assemble(&self, name: &str, uuid: &str, entries: Vec<DocumentEntry>) -> AssembledPrefab {
        let header = DocumentEntry::Header(PrefabHeader {
            type_name: PREFAB_TYPE.to_string(),
            name: name.to_string(),
            obj_flags: 0,
            editor_extras: json!({}),
            native: String::new(),
            uuid: uuid.to_string(),
            data: IdRef::new(ROOT_INDEX),
            optimization_policy: 0,
            persistent: false,
        });

        let mut body = Vec::with_capacity(entries.len() + 1);
        body.push(header);
        body.extend(entries);

        let mut user_data = Map::new();
        user_data.insert("syncNodeName".to_string(), Value::String(name.to_string()));

        let meta = PrefabMeta {
            ver: self.meta_version.clone(),
            importer: self.importer.clone(),
            imported: true,
            uuid: uuid.to_string(),
            files: vec![".json".to_string()],
            sub_metas: Map::new(),
            user_data,
        };

        AssembledPrefab { body, meta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_shape() {
        let doc = DocumentAssembler::default().assemble("Door", "uuid-1", Vec::new());
        let json = serde_json::to_value(&doc.body).unwrap();
        assert_eq!(
            json[0],
            json!({
                "__type__": "cc.Prefab",
                "_name": "Door",
                "_objFlags": 0,
                "__editorExtras__": {},
                "_native": "",
                "_uuid": "uuid-1",
                "data": { "__id__": 1 },
                "optimizationPolicy": 0,
                "persistent": false
            })
        );
    }

    #[test]
    fn test_meta_record() {
        let doc = DocumentAssembler::new("1.1.50", "prefab").assemble("Door", "uuid-1", Vec::new());
        let meta = serde_json::to_value(&doc.meta).unwrap();
        assert_eq!(
            meta,
            json!({
                "ver": "1.1.50",
                "importer": "prefab",
                "imported": true,
                "uuid": "uuid-1",
                "files": [".json"],
                "subMetas": {},
                "userData": { "syncNodeName": "Door" }
            })
        );
    }

    #[test]
    fn test_component_field_order() {
        let mut properties = Map::new();
        properties.insert("_string".into(), json!("hi"));
        let entry = DocumentEntry::Component(SerializedComponent {
            type_name: "cc.Label".into(),
            name: String::new(),
            obj_flags: 0,
            editor_extras: json!({}),
            node: IdRef::new(1),
            enabled: true,
            prefab: IdRef::new(3),
            properties,
            id: String::new(),
        });

        let text = serde_json::to_string(&entry).unwrap();
        let prefab_at = text.find("__prefab").unwrap();
        let string_at = text.find("_string").unwrap();
        let id_at = text.find("\"_id\"").unwrap();
        assert!(prefab_at < string_at && string_at < id_at);
    }

    #[test]
    fn test_child_prefab_info_omits_override_lists() {
        let info = NodePrefabInfo {
            type_name: PREFAB_INFO_TYPE.into(),
            root: IdRef::new(1),
            asset: IdRef::new(0),
            file_id: "abc".into(),
            instance: None,
            target_overrides: None,
            nested_prefab_instance_roots: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["instance"], Value::Null);
        assert!(json.get("targetOverrides").is_none());
    }
}
