//! Live scene graph types
//!
//! These types mirror what the scene inspector reports about the editor's
//! live graph. They are read-only inputs to the prefab engine: a snapshot is
//! taken once per serialization call and never written back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default node layer used by the engine for freshly created nodes
pub const DEFAULT_LAYER: u32 = 1 << 30;

/// Component type names the engine ships with
pub const BUILTIN_COMPONENTS: &[&str] = &[
    "cc.Component",
    "cc.UITransform",
    "cc.UIOpacity",
    "cc.Sprite",
    "cc.Label",
    "cc.RichText",
    "cc.Button",
    "cc.Toggle",
    "cc.Slider",
    "cc.ProgressBar",
    "cc.EditBox",
    "cc.ScrollView",
    "cc.Layout",
    "cc.Widget",
    "cc.Mask",
    "cc.Graphics",
    "cc.Canvas",
    "cc.Camera",
    "cc.Animation",
    "cc.AudioSource",
    "cc.MeshRenderer",
];

/// Three component vector
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Create a vector from its components
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The unit scale `(1, 1, 1)`
    pub const fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// Rotation quaternion
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quat {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
    /// W component
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// The identity rotation
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Euler angles in degrees, matching the engine's `Quat.toEuler`
    pub fn to_euler(&self) -> Vec3 {
        let Quat { x, y, z, w } = *self;
        let test = x * y + z * w;

        if test > 0.499999 {
            Vec3::new(0.0, (2.0 * x.atan2(w)).to_degrees(), 90.0)
        } else if test < -0.499999 {
            Vec3::new(0.0, -(2.0 * x.atan2(w)).to_degrees(), -90.0)
        } else {
            let (sqx, sqy, sqz) = (x * x, y * y, z * z);
            let bank = (2.0 * x * w - 2.0 * y * z).atan2(1.0 - 2.0 * sqx - 2.0 * sqz);
            let heading = (2.0 * y * w - 2.0 * x * z).atan2(1.0 - 2.0 * sqy - 2.0 * sqz);
            let attitude = (2.0 * test).asin();
            Vec3::new(bank.to_degrees(), heading.to_degrees(), attitude.to_degrees())
        }
    }
}

/// Kind of asset a reference property points at
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Another prefab asset
    Prefab,
    /// Texture
    Texture,
    /// Sprite frame
    SpriteFrame,
    /// Material
    Material,
    /// Audio clip
    AudioClip,
    /// Font asset; keeps the concrete engine type (`cc.TTFFont`, `cc.BitmapFont`, ...)
    Font(String),
    /// Animation clip
    AnimationClip,
    /// Any other asset type, by engine type name
    Other(String),
}

impl AssetKind {
    /// Engine type name written as `__expectedType__`
    pub fn type_name(&self) -> &str {
        match self {
            AssetKind::Prefab => "cc.Prefab",
            AssetKind::Texture => "cc.Texture2D",
            AssetKind::SpriteFrame => "cc.SpriteFrame",
            AssetKind::Material => "cc.Material",
            AssetKind::AudioClip => "cc.AudioClip",
            AssetKind::Font(name) => name,
            AssetKind::AnimationClip => "cc.AnimationClip",
            AssetKind::Other(name) => name,
        }
    }
}

/// Declared type of a property value
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Boolean scalar
    Boolean,
    /// Numeric scalar (integer or float)
    Number,
    /// String scalar
    String,
    /// Engine enum, serialized as its integer value
    Enum,
    /// `cc.Vec2`
    Vec2,
    /// `cc.Vec3`
    Vec3,
    /// `cc.Vec4`
    Vec4,
    /// `cc.Quat`
    Quat,
    /// `cc.Color`
    Color,
    /// `cc.Size`
    Size,
    /// `cc.Rect`
    Rect,
    /// Reference to a node
    Node,
    /// Reference to a component, by component type name
    Component(String),
    /// Reference to an asset
    Asset(AssetKind),
    /// Other engine value type (`cc.*`), passed through with its type tag
    Struct(String),
    /// Anything the engine does not describe
    Opaque(String),
}

impl TypeTag {
    /// Map an inspector type name (plus its `extends` chain) onto a tag
    pub fn classify(type_name: &str, extends: &[String]) -> TypeTag {
        let extends_any = |base: &str| extends.iter().any(|e| e == base);

        match type_name {
            "Boolean" => TypeTag::Boolean,
            "Number" | "Float" | "Integer" => TypeTag::Number,
            "String" => TypeTag::String,
            "Enum" | "BitMask" => TypeTag::Enum,
            "cc.Vec2" => TypeTag::Vec2,
            "cc.Vec3" => TypeTag::Vec3,
            "cc.Vec4" => TypeTag::Vec4,
            "cc.Quat" => TypeTag::Quat,
            "cc.Color" => TypeTag::Color,
            "cc.Size" => TypeTag::Size,
            "cc.Rect" => TypeTag::Rect,
            "cc.Node" => TypeTag::Node,
            "cc.Prefab" => TypeTag::Asset(AssetKind::Prefab),
            "cc.Texture2D" => TypeTag::Asset(AssetKind::Texture),
            "cc.SpriteFrame" => TypeTag::Asset(AssetKind::SpriteFrame),
            "cc.Material" => TypeTag::Asset(AssetKind::Material),
            "cc.AudioClip" => TypeTag::Asset(AssetKind::AudioClip),
            "cc.Font" | "cc.TTFFont" | "cc.BitmapFont" | "cc.LabelAtlas" => {
                TypeTag::Asset(AssetKind::Font(type_name.to_string()))
            }
            "cc.AnimationClip" => TypeTag::Asset(AssetKind::AnimationClip),
            "cc.Asset" => TypeTag::Asset(AssetKind::Other(type_name.to_string())),
            name if BUILTIN_COMPONENTS.contains(&name) || extends_any("cc.Component") => {
                TypeTag::Component(name.to_string())
            }
            name if extends_any("cc.Asset") => TypeTag::Asset(AssetKind::Other(name.to_string())),
            name if name.starts_with("cc.") => TypeTag::Struct(name.to_string()),
            name => TypeTag::Opaque(name.to_string()),
        }
    }

    /// True for tags whose values point at other live entities
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeTag::Node | TypeTag::Component(_) | TypeTag::Asset(_))
    }
}

/// Payload of a property as reported by the live graph
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyData {
    /// Absent or explicitly null
    Null,
    /// Scalar, vector-like or reference-like JSON payload
    Raw(Value),
    /// Array of element values
    Array(Vec<PropertyValue>),
}

/// A typed property as reported by the live graph
///
/// For arrays `tag` is the declared element type.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "PropertyWire")]
pub struct PropertyValue {
    /// Declared type
    pub tag: TypeTag,
    /// Reported value
    pub data: PropertyData,
}

/// Inspector wire shape: `{ "type", "value", "isArray"?, "extends"? }`
#[derive(Deserialize)]
struct PropertyWire {
    #[serde(rename = "type", default)]
    type_name: String,
    #[serde(default)]
    value: Value,
    #[serde(rename = "isArray", default)]
    is_array: bool,
    #[serde(default)]
    extends: Vec<String>,
}

impl From<PropertyWire> for PropertyValue {
    fn from(wire: PropertyWire) -> Self {
        let tag = TypeTag::classify(&wire.type_name, &wire.extends);

        let data = match wire.value {
            Value::Null => PropertyData::Null,
            Value::Array(items) if wire.is_array => PropertyData::Array(
                items
                    .into_iter()
                    .map(|item| element_from_wire(&tag, item))
                    .collect(),
            ),
            other => PropertyData::Raw(other),
        };

        PropertyValue { tag, data }
    }
}

// Array elements are either full property dumps or bare values of the element type
fn element_from_wire(tag: &TypeTag, item: Value) -> PropertyValue {
    let is_dump = item
        .as_object()
        .map(|obj| obj.contains_key("type") && obj.contains_key("value"))
        .unwrap_or(false);

    if is_dump {
        if let Ok(wire) = serde_json::from_value::<PropertyWire>(item.clone()) {
            return wire.into();
        }
    }

    match item {
        Value::Null => PropertyValue::null(tag.clone()),
        other => PropertyValue::raw(tag.clone(), other),
    }
}

impl PropertyValue {
    /// A null value of the given type
    pub fn null(tag: TypeTag) -> Self {
        Self { tag, data: PropertyData::Null }
    }

    /// A raw JSON value of the given type
    pub fn raw(tag: TypeTag, value: Value) -> Self {
        Self { tag, data: PropertyData::Raw(value) }
    }

    /// An array with the given element type
    pub fn array(tag: TypeTag, items: Vec<PropertyValue>) -> Self {
        Self { tag, data: PropertyData::Array(items) }
    }

    /// A reference to a live node
    pub fn node_ref(uuid: &str) -> Self {
        Self::raw(TypeTag::Node, serde_json::json!({ "uuid": uuid }))
    }

    /// A reference to a live component
    pub fn component_ref(component_type: &str, uuid: &str) -> Self {
        Self::raw(
            TypeTag::Component(component_type.to_string()),
            serde_json::json!({ "uuid": uuid }),
        )
    }

    /// A reference to an asset
    pub fn asset_ref(kind: AssetKind, uuid: &str) -> Self {
        Self::raw(TypeTag::Asset(kind), serde_json::json!({ "uuid": uuid }))
    }

    /// Identifier carried by a reference-like payload, if any
    ///
    /// Accepts `{ "uuid": ".." }`, `{ "__uuid__": ".." }` and a bare string.
    pub fn reference_id(&self) -> Option<&str> {
        match &self.data {
            PropertyData::Raw(Value::String(s)) => Some(s.as_str()),
            PropertyData::Raw(Value::Object(obj)) => obj
                .get("uuid")
                .or_else(|| obj.get("__uuid__"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

/// A component's type: either built into the engine or a user script
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentType {
    /// Engine component, e.g. `cc.Sprite`
    BuiltIn(String),
    /// Script component, identified by its script asset
    Script {
        /// Class name shown in the editor
        class_name: String,
        /// UUID of the script asset
        asset_uuid: String,
    },
}

impl ComponentType {
    /// Name used in logs and reference type tags
    pub fn display_name(&self) -> &str {
        match self {
            ComponentType::BuiltIn(name) => name,
            ComponentType::Script { class_name, .. } => class_name,
        }
    }
}

/// A component attached to a live node
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "ComponentWire")]
pub struct LiveComponent {
    /// Live identifier, if the editor exposes one
    pub uuid: Option<String>,
    /// Component type
    pub component_type: ComponentType,
    /// Enabled flag
    pub enabled: bool,
    /// Property name to value
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Deserialize)]
struct ComponentWire {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    script: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    properties: BTreeMap<String, PropertyValue>,
}

impl From<ComponentWire> for LiveComponent {
    fn from(wire: ComponentWire) -> Self {
        let component_type = match wire.script {
            Some(asset_uuid) if !asset_uuid.is_empty() => ComponentType::Script {
                class_name: wire.type_name,
                asset_uuid,
            },
            _ => ComponentType::BuiltIn(wire.type_name),
        };

        LiveComponent {
            uuid: wire.uuid.filter(|u| !u.is_empty()),
            component_type,
            enabled: wire.enabled,
            properties: wire.properties,
        }
    }
}

impl LiveComponent {
    /// Create an enabled built-in component without properties
    pub fn builtin(type_name: &str) -> Self {
        Self {
            uuid: None,
            component_type: ComponentType::BuiltIn(type_name.to_string()),
            enabled: true,
            properties: BTreeMap::new(),
        }
    }

    /// Set the live identifier
    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    /// Add or replace a property
    pub fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }
}

/// Reference to a child node as listed by its parent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Live identifier of the child
    pub uuid: String,
    /// Display name, used when the child itself cannot be read
    #[serde(default)]
    pub name: String,
}

/// One node as reported by a single inspector query
///
/// `components` is `None` when the query was shallow and components must be
/// fetched with a supplementary query.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NodeDump {
    /// Live identifier
    pub uuid: String,
    /// Node name
    #[serde(default)]
    pub name: String,
    /// Active flag
    #[serde(default = "default_true")]
    pub active: bool,
    /// Local position
    #[serde(default)]
    pub position: Vec3,
    /// Local rotation
    #[serde(default)]
    pub rotation: Quat,
    /// Local euler angles, derived from `rotation` when absent
    #[serde(default)]
    pub euler: Option<Vec3>,
    /// Local scale
    #[serde(default = "Vec3::one")]
    pub scale: Vec3,
    /// Layer bitmask
    #[serde(default = "default_layer")]
    pub layer: u32,
    /// Children, in order
    #[serde(default)]
    pub children: Vec<NodeRef>,
    /// Components, in order
    #[serde(default)]
    pub components: Option<Vec<LiveComponent>>,
}

/// A node of the live graph snapshot handed to the flattener
#[derive(Clone, Debug, PartialEq)]
pub struct LiveNode {
    /// Live identifier; `None` when the node could not be identified
    pub uuid: Option<String>,
    /// Node name
    pub name: String,
    /// Active flag
    pub active: bool,
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local euler angles
    pub euler: Vec3,
    /// Local scale
    pub scale: Vec3,
    /// Layer bitmask
    pub layer: u32,
    /// Children, in order
    pub children: Vec<LiveNode>,
    /// Components, in order
    pub components: Vec<LiveComponent>,
}

impl LiveNode {
    /// Create an active, identity-transform node with no children or components
    pub fn new(name: &str) -> Self {
        Self {
            uuid: None,
            name: name.to_string(),
            active: true,
            position: Vec3::default(),
            rotation: Quat::IDENTITY,
            euler: Vec3::default(),
            scale: Vec3::one(),
            layer: DEFAULT_LAYER,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Build a node from an inspector dump, without children
    pub fn from_dump(dump: &NodeDump, components: Vec<LiveComponent>) -> Self {
        Self {
            uuid: Some(dump.uuid.clone()).filter(|u| !u.is_empty()),
            name: dump.name.clone(),
            active: dump.active,
            position: dump.position,
            rotation: dump.rotation,
            euler: dump.euler.unwrap_or_else(|| dump.rotation.to_euler()),
            scale: dump.scale,
            layer: dump.layer,
            children: Vec::new(),
            components,
        }
    }

    /// Minimal stand-in for a node whose data could not be fetched
    pub fn placeholder(reference: &NodeRef) -> Self {
        let mut node = Self::new(&reference.name);
        node.uuid = Some(reference.uuid.clone()).filter(|u| !u.is_empty());
        node
    }

    /// Set the live identifier
    pub fn with_uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    /// Set the local position
    pub fn with_position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    /// Append a child
    pub fn with_child(mut self, child: LiveNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append a component
    pub fn with_component(mut self, component: LiveComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(LiveNode::subtree_len).sum::<usize>()
    }
}

fn default_true() -> bool {
    true
}

fn default_layer() -> u32 {
    DEFAULT_LAYER
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_known_types() {
        assert_eq!(TypeTag::classify("cc.Vec3", &[]), TypeTag::Vec3);
        assert_eq!(TypeTag::classify("cc.Node", &[]), TypeTag::Node);
        assert_eq!(
            TypeTag::classify("cc.Sprite", &[]),
            TypeTag::Component("cc.Sprite".into())
        );
        assert_eq!(
            TypeTag::classify("cc.TTFFont", &[]),
            TypeTag::Asset(AssetKind::Font("cc.TTFFont".into()))
        );
        assert_eq!(
            TypeTag::classify("PlayerController", &["cc.Component".into()]),
            TypeTag::Component("PlayerController".into())
        );
        assert_eq!(
            TypeTag::classify("cc.JsonAsset", &["cc.Asset".into()]),
            TypeTag::Asset(AssetKind::Other("cc.JsonAsset".into()))
        );
        assert_eq!(
            TypeTag::classify("cc.Gradient", &[]),
            TypeTag::Struct("cc.Gradient".into())
        );
        assert_eq!(TypeTag::classify("Mystery", &[]), TypeTag::Opaque("Mystery".into()));
    }

    #[test]
    fn test_property_wire_array() {
        let value: PropertyValue = serde_json::from_value(json!({
            "type": "cc.Node",
            "isArray": true,
            "value": [
                { "type": "cc.Node", "value": { "uuid": "a" } },
                { "uuid": "b" },
                null
            ]
        }))
        .unwrap();

        assert_eq!(value.tag, TypeTag::Node);
        let PropertyData::Array(items) = &value.data else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].reference_id(), Some("a"));
        assert_eq!(items[1].reference_id(), Some("b"));
        assert_eq!(items[2].data, PropertyData::Null);
    }

    #[test]
    fn test_component_wire_script() {
        let component: LiveComponent = serde_json::from_value(json!({
            "type": "PlayerController",
            "script": "0123456789abcdef0123456789abcdef",
            "properties": {
                "speed": { "type": "Number", "value": 3.5 }
            }
        }))
        .unwrap();

        assert!(component.enabled);
        assert_eq!(component.uuid, None);
        assert_eq!(
            component.component_type,
            ComponentType::Script {
                class_name: "PlayerController".into(),
                asset_uuid: "0123456789abcdef0123456789abcdef".into(),
            }
        );
        assert_eq!(component.properties["speed"].tag, TypeTag::Number);
    }

    #[test]
    fn test_node_dump_defaults() {
        let dump: NodeDump = serde_json::from_value(json!({ "uuid": "n1", "name": "Root" })).unwrap();
        assert!(dump.active);
        assert_eq!(dump.scale, Vec3::one());
        assert_eq!(dump.rotation, Quat::IDENTITY);
        assert_eq!(dump.layer, DEFAULT_LAYER);
        assert!(dump.components.is_none());

        let node = LiveNode::from_dump(&dump, Vec::new());
        assert_eq!(node.euler, Vec3::default());
    }

    #[test]
    fn test_quat_to_euler_about_y() {
        let half = std::f64::consts::FRAC_PI_4;
        let q = Quat { x: 0.0, y: half.sin(), z: 0.0, w: half.cos() };
        let euler = q.to_euler();
        assert!(euler.x.abs() < 1e-9);
        assert!((euler.y - 90.0).abs() < 1e-9);
        assert!(euler.z.abs() < 1e-9);
    }
}
