//! Property resolver
//!
//! Turns one live property value into its serialized document form. Node and
//! component references become `{ "__id__": n }` when the target lies inside
//! the serialized subtree and `null` otherwise; asset references become
//! `{ "__uuid__", "__expectedType__" }`; structured values become explicit
//! typed objects.

use crate::core::types::{AssetKind, PropertyData, PropertyValue, Quat, TypeTag, Vec3};
use crate::prefab::codec::compress_uuid;
use crate::prefab::index::ReferenceIndex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Which reference table a failed lookup went to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Node reference
    Node,
    /// Component reference
    Component,
}

/// A reference that pointed outside the serialized subtree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolutionWarning {
    /// Where the reference was found, e.g. `Canvas/cc.Button.target`
    pub property: String,
    /// Live identifier that could not be resolved
    pub target: String,
    /// Reference table consulted
    pub kind: ReferenceKind,
}

/// Resolves properties against the reference index of one flatten call
pub struct PropertyResolver<'a> {
    index: &'a ReferenceIndex,
    warnings: &'a mut Vec<ResolutionWarning>,
}

impl<'a> PropertyResolver<'a> {
    /// Create a resolver that appends warnings to `warnings`
    pub fn new(index: &'a ReferenceIndex, warnings: &'a mut Vec<ResolutionWarning>) -> Self {
        Self { index, warnings }
    }

    /// Resolve one property value. `site` names the property for warnings.
    pub fn resolve(&mut self, site: &str, value: &PropertyValue) -> Value {
        let raw = match &value.data {
            PropertyData::Null => return Value::Null,
            PropertyData::Array(items) => return self.resolve_array(site, &value.tag, items),
            PropertyData::Raw(raw) => raw,
        };

        if is_placeholder(&value.tag, raw) {
            return Value::Null;
        }

        match &value.tag {
            TypeTag::Node => self.internal_ref(site, value, ReferenceKind::Node),
            TypeTag::Component(_) => self.internal_ref(site, value, ReferenceKind::Component),
            TypeTag::Asset(kind) => asset_ref(kind, value),
            TypeTag::Vec2 => typed(raw, "cc.Vec2", &[("x", 0.0), ("y", 0.0)]),
            TypeTag::Vec3 => typed(raw, "cc.Vec3", &[("x", 0.0), ("y", 0.0), ("z", 0.0)]),
            TypeTag::Vec4 => typed(
                raw,
                "cc.Vec4",
                &[("x", 0.0), ("y", 0.0), ("z", 0.0), ("w", 0.0)],
            ),
            TypeTag::Quat => typed(
                raw,
                "cc.Quat",
                &[("x", 0.0), ("y", 0.0), ("z", 0.0), ("w", 1.0)],
            ),
            TypeTag::Size => typed(raw, "cc.Size", &[("width", 0.0), ("height", 0.0)]),
            TypeTag::Rect => typed(
                raw,
                "cc.Rect",
                &[("x", 0.0), ("y", 0.0), ("width", 0.0), ("height", 0.0)],
            ),
            TypeTag::Color => color(raw),
            TypeTag::Struct(name) => match raw {
                Value::Object(fields) => {
                    let mut out = Map::with_capacity(fields.len() + 1);
                    out.insert("__type__".to_string(), Value::String(name.clone()));
                    for (key, field) in fields {
                        if key != "__type__" {
                            out.insert(key.clone(), field.clone());
                        }
                    }
                    Value::Object(out)
                }
                other => other.clone(),
            },
            TypeTag::Boolean
            | TypeTag::Number
            | TypeTag::String
            | TypeTag::Enum
            | TypeTag::Opaque(_) => raw.clone(),
        }
    }

    fn resolve_array(&mut self, site: &str, tag: &TypeTag, items: &[PropertyValue]) -> Value {
        // unresolvable entries vanish from reference arrays instead of leaving holes
        let drop_nulls = tag.is_reference();

        let resolved = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.resolve(&format!("{}[{}]", site, i), item))
            .filter(|v| !(drop_nulls && v.is_null()))
            .collect();

        Value::Array(resolved)
    }

    fn internal_ref(&mut self, site: &str, value: &PropertyValue, kind: ReferenceKind) -> Value {
        let Some(target) = value.reference_id() else {
            return Value::Null;
        };

        let found = match kind {
            ReferenceKind::Node => self.index.node(target),
            ReferenceKind::Component => self.index.component(target),
        };

        match found {
            Some(index) => id_ref(index),
            None => {
                warn!(property = site, target_id = target, ?kind, "reference points outside the prefab, writing null");
                self.warnings.push(ResolutionWarning {
                    property: site.to_string(),
                    target: target.to_string(),
                    kind,
                });
                Value::Null
            }
        }
    }
}

/// `{ "__id__": index }`
pub fn id_ref(index: usize) -> Value {
    json!({ "__id__": index })
}

/// Typed `cc.Vec3` object
pub fn vec3_value(v: &Vec3) -> Value {
    json!({
        "__type__": "cc.Vec3",
        "x": number(v.x),
        "y": number(v.y),
        "z": number(v.z),
    })
}

/// Typed `cc.Quat` object
pub fn quat_value(q: &Quat) -> Value {
    json!({
        "__type__": "cc.Quat",
        "x": number(q.x),
        "y": number(q.y),
        "z": number(q.z),
        "w": number(q.w),
    })
}

/// JSON number that prints whole values without a fraction
pub fn number(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

fn asset_ref(kind: &AssetKind, value: &PropertyValue) -> Value {
    let Some(uuid) = value.reference_id() else {
        return Value::Null;
    };

    let id = match kind {
        AssetKind::Prefab => uuid.to_string(),
        _ => compress_uuid(uuid),
    };

    json!({ "__uuid__": id, "__expectedType__": kind.type_name() })
}

// Unset reference slots arrive as objects with an empty identifier
fn is_placeholder(tag: &TypeTag, raw: &Value) -> bool {
    match raw {
        Value::Object(obj) => match obj.get("uuid").or_else(|| obj.get("__uuid__")) {
            Some(Value::String(id)) => id.is_empty(),
            Some(Value::Null) => tag.is_reference(),
            Some(_) => false,
            None => tag.is_reference(),
        },
        Value::String(id) => tag.is_reference() && id.is_empty(),
        _ => false,
    }
}

fn component(raw: &Value, key: &str, position: usize) -> Option<f64> {
    let field = match raw {
        Value::Object(obj) => obj.get(key),
        Value::Array(items) => items.get(position),
        _ => None,
    }?;

    match field {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn typed(raw: &Value, type_name: &str, fields: &[(&str, f64)]) -> Value {
    let mut out = Map::with_capacity(fields.len() + 1);
    out.insert("__type__".to_string(), Value::String(type_name.to_string()));
    for (position, (key, default)) in fields.iter().enumerate() {
        let v = component(raw, key, position).unwrap_or(*default);
        out.insert(key.to_string(), number(v));
    }
    Value::Object(out)
}

fn color(raw: &Value) -> Value {
    let channel = |key: &str, position: usize, default: f64| -> u8 {
        let v = component(raw, key, position).unwrap_or(default);
        if v.is_nan() {
            return default as u8;
        }
        v.round().clamp(0.0, 255.0) as u8
    };

    json!({
        "__type__": "cc.Color",
        "r": channel("r", 0, 0.0),
        "g": channel("g", 1, 0.0),
        "b": channel("b", 2, 0.0),
        "a": channel("a", 3, 255.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_with(index: &ReferenceIndex, value: &PropertyValue) -> (Value, Vec<ResolutionWarning>) {
        let mut warnings = Vec::new();
        let out = PropertyResolver::new(index, &mut warnings).resolve("Owner.prop", value);
        (out, warnings)
    }

    #[test]
    fn test_null_and_placeholder() {
        let index = ReferenceIndex::new();
        let (out, _) = resolve_with(&index, &PropertyValue::null(TypeTag::Node));
        assert_eq!(out, Value::Null);

        let unset = PropertyValue::asset_ref(AssetKind::SpriteFrame, "");
        let (out, warnings) = resolve_with(&index, &unset);
        assert_eq!(out, Value::Null);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_internal_node_reference() {
        let mut index = ReferenceIndex::new();
        index.record_node("child", 2);

        let (out, warnings) = resolve_with(&index, &PropertyValue::node_ref("child"));
        assert_eq!(out, json!({ "__id__": 2 }));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_external_node_reference_is_nulled() {
        let index = ReferenceIndex::new();
        let (out, warnings) = resolve_with(&index, &PropertyValue::node_ref("elsewhere"));
        assert_eq!(out, Value::Null);
        assert_eq!(
            warnings,
            vec![ResolutionWarning {
                property: "Owner.prop".into(),
                target: "elsewhere".into(),
                kind: ReferenceKind::Node,
            }]
        );
    }

    #[test]
    fn test_component_reference_uses_component_table() {
        let mut index = ReferenceIndex::new();
        index.record_node("same", 1);
        index.record_component("same", 5);

        let value = PropertyValue::component_ref("cc.Label", "same");
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__id__": 5 }));
    }

    #[test]
    fn test_asset_references() {
        let index = ReferenceIndex::new();
        let uuid = "01234567-89ab-cdef-0123-456789abcdef";

        let (out, _) = resolve_with(&index, &PropertyValue::asset_ref(AssetKind::SpriteFrame, uuid));
        assert_eq!(
            out,
            json!({ "__uuid__": compress_uuid(uuid), "__expectedType__": "cc.SpriteFrame" })
        );

        let (out, _) = resolve_with(&index, &PropertyValue::asset_ref(AssetKind::Prefab, uuid));
        assert_eq!(out, json!({ "__uuid__": uuid, "__expectedType__": "cc.Prefab" }));
    }

    #[test]
    fn test_color_clamps_and_defaults_alpha() {
        let index = ReferenceIndex::new();
        let value = PropertyValue::raw(TypeTag::Color, json!({ "r": 300, "g": -5, "b": 10 }));
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__type__": "cc.Color", "r": 255, "g": 0, "b": 10, "a": 255 }));

        let value = PropertyValue::raw(TypeTag::Color, json!({ "a": 128 }));
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__type__": "cc.Color", "r": 0, "g": 0, "b": 0, "a": 128 }));
    }

    #[test]
    fn test_color_channels_are_whole_bytes() {
        let index = ReferenceIndex::new();
        let value = PropertyValue::raw(TypeTag::Color, json!({ "r": 10.6, "g": 254.5, "b": 0.2, "a": 255.9 }));
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__type__": "cc.Color", "r": 11, "g": 255, "b": 0, "a": 255 }));
    }

    #[test]
    fn test_quat_defaults_w_and_coerces_strings() {
        let index = ReferenceIndex::new();
        let value = PropertyValue::raw(TypeTag::Quat, json!({ "x": "0.5", "y": 0 }));
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__type__": "cc.Quat", "x": 0.5, "y": 0, "z": 0, "w": 1 }));
    }

    #[test]
    fn test_size_and_vec2() {
        let index = ReferenceIndex::new();
        let (out, _) = resolve_with(
            &index,
            &PropertyValue::raw(TypeTag::Size, json!({ "width": 100, "height": 40.5 })),
        );
        assert_eq!(out, json!({ "__type__": "cc.Size", "width": 100, "height": 40.5 }));

        let (out, _) = resolve_with(&index, &PropertyValue::raw(TypeTag::Vec2, json!([3, 4])));
        assert_eq!(out, json!({ "__type__": "cc.Vec2", "x": 3, "y": 4 }));
    }

    #[test]
    fn test_reference_arrays_drop_unresolved() {
        let mut index = ReferenceIndex::new();
        index.record_node("a", 3);

        let value = PropertyValue::array(
            TypeTag::Node,
            vec![
                PropertyValue::node_ref("a"),
                PropertyValue::node_ref("outside"),
                PropertyValue::null(TypeTag::Node),
            ],
        );
        let (out, warnings) = resolve_with(&index, &value);
        assert_eq!(out, json!([{ "__id__": 3 }]));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].property, "Owner.prop[1]");
    }

    #[test]
    fn test_asset_arrays_drop_unset_slots() {
        let index = ReferenceIndex::new();
        let uuid = "01234567-89ab-cdef-0123-456789abcdef";
        let kind = AssetKind::SpriteFrame;

        let value = PropertyValue::array(
            TypeTag::Asset(kind.clone()),
            vec![
                PropertyValue::raw(TypeTag::Asset(kind.clone()), json!({ "uuid": "" })),
                PropertyValue::asset_ref(kind.clone(), uuid),
                PropertyValue::null(TypeTag::Asset(kind)),
            ],
        );
        let (out, warnings) = resolve_with(&index, &value);
        assert_eq!(
            out,
            json!([{ "__uuid__": compress_uuid(uuid), "__expectedType__": "cc.SpriteFrame" }])
        );
        assert!(warnings.is_empty());

        let primitives = PropertyValue::array(
            TypeTag::String,
            vec![
                PropertyValue::null(TypeTag::String),
                PropertyValue::raw(TypeTag::String, json!("")),
            ],
        );
        let (out, _) = resolve_with(&index, &primitives);
        assert_eq!(out, json!([null, ""]));
    }

    #[test]
    fn test_primitive_arrays_keep_nulls() {
        let index = ReferenceIndex::new();
        let value = PropertyValue::array(
            TypeTag::Number,
            vec![
                PropertyValue::raw(TypeTag::Number, json!(1)),
                PropertyValue::null(TypeTag::Number),
            ],
        );
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!([1, null]));
    }

    #[test]
    fn test_struct_passthrough_gets_type_tag() {
        let index = ReferenceIndex::new();
        let value = PropertyValue::raw(
            TypeTag::Struct("cc.Gradient".into()),
            json!({ "mode": 0, "colorKeys": [] }),
        );
        let (out, _) = resolve_with(&index, &value);
        assert_eq!(out, json!({ "__type__": "cc.Gradient", "mode": 0, "colorKeys": [] }));

        let opaque = PropertyValue::raw(TypeTag::Opaque("Blob".into()), json!({ "k": "v" }));
        let (out, _) = resolve_with(&index, &opaque);
        assert_eq!(out, json!({ "k": "v" }));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(1.0), json!(1));
        assert_eq!(number(-2.0), json!(-2));
        assert_eq!(number(0.25), json!(0.25));
        assert_eq!(number(f64::NAN), json!(0));
    }
}
