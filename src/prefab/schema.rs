//! Built-in component schemas
//!
//! Serialized field layouts for the engine components the prefab engine knows
//! about. Each field is read from the live property of the same name without
//! its leading underscore (`_contentSize` <- `contentSize`), falling back to
//! the underscored name and finally to the engine default.

use crate::prefab::resolver::number;
use serde_json::{json, Value};

/// Default written when the live component does not report a field
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldDefault {
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    Str(&'static str),
    /// `cc.Vec2`
    Vec2(f64, f64),
    /// `cc.Size`
    Size(f64, f64),
    /// `cc.Color`
    Color(u8, u8, u8, u8),
    /// `[]`
    EmptyArray,
}

impl FieldDefault {
    /// JSON form of the default
    pub fn to_value(&self) -> Value {
        match *self {
            FieldDefault::Null => Value::Null,
            FieldDefault::Bool(b) => Value::Bool(b),
            FieldDefault::Number(n) => number(n),
            FieldDefault::Str(s) => Value::String(s.to_string()),
            FieldDefault::Vec2(x, y) => json!({ "__type__": "cc.Vec2", "x": number(x), "y": number(y) }),
            FieldDefault::Size(w, h) => {
                json!({ "__type__": "cc.Size", "width": number(w), "height": number(h) })
            }
            FieldDefault::Color(r, g, b, a) => {
                json!({ "__type__": "cc.Color", "r": r, "g": g, "b": b, "a": a })
            }
            FieldDefault::EmptyArray => Value::Array(Vec::new()),
        }
    }
}

/// One serialized field of a built-in component
#[derive(Debug)]
pub struct FieldSpec {
    /// Serialized field name
    pub field: &'static str,
    /// Value used when the live component does not report the field
    pub default: FieldDefault,
}

impl FieldSpec {
    /// Live property names this field is read from, in lookup order
    pub fn sources(&self) -> [&'static str; 2] {
        [self.field.trim_start_matches('_'), self.field]
    }
}

/// Serialized layout of a built-in component
#[derive(Debug)]
pub struct ComponentSchema {
    /// Engine type name
    pub type_name: &'static str,
    /// Fields in serialization order
    pub fields: &'static [FieldSpec],
}

const fn f(field: &'static str, default: FieldDefault) -> FieldSpec {
    FieldSpec { field, default }
}

use FieldDefault::*;

const WHITE: FieldDefault = Color(255, 255, 255, 255);

static UI_TRANSFORM: ComponentSchema = ComponentSchema {
    type_name: "cc.UITransform",
    fields: &[
        f("_contentSize", Size(100.0, 100.0)),
        f("_anchorPoint", Vec2(0.5, 0.5)),
    ],
};

static SPRITE: ComponentSchema = ComponentSchema {
    type_name: "cc.Sprite",
    fields: &[
        f("_customMaterial", Null),
        f("_srcBlendFactor", Number(2.0)),
        f("_dstBlendFactor", Number(4.0)),
        f("_color", WHITE),
        f("_spriteFrame", Null),
        f("_type", Number(0.0)),
        f("_fillType", Number(0.0)),
        f("_sizeMode", Number(1.0)),
        f("_fillCenter", Vec2(0.0, 0.0)),
        f("_fillStart", Number(0.0)),
        f("_fillRange", Number(0.0)),
        f("_isTrimmedMode", Bool(true)),
        f("_useGrayscale", Bool(false)),
        f("_atlas", Null),
    ],
};

static LABEL: ComponentSchema = ComponentSchema {
    type_name: "cc.Label",
    fields: &[
        f("_customMaterial", Null),
        f("_srcBlendFactor", Number(2.0)),
        f("_dstBlendFactor", Number(4.0)),
        f("_color", WHITE),
        f("_string", Str("label")),
        f("_horizontalAlign", Number(1.0)),
        f("_verticalAlign", Number(1.0)),
        f("_actualFontSize", Number(20.0)),
        f("_fontSize", Number(20.0)),
        f("_fontFamily", Str("Arial")),
        f("_lineHeight", Number(25.0)),
        f("_overflow", Number(0.0)),
        f("_enableWrapText", Bool(true)),
        f("_font", Null),
        f("_isSystemFontUsed", Bool(true)),
        f("_spacingX", Number(0.0)),
        f("_isItalic", Bool(false)),
        f("_isBold", Bool(false)),
        f("_isUnderline", Bool(false)),
        f("_underlineHeight", Number(2.0)),
        f("_cacheMode", Number(0.0)),
    ],
};

static BUTTON: ComponentSchema = ComponentSchema {
    type_name: "cc.Button",
    fields: &[
        f("clickEvents", EmptyArray),
        f("_interactable", Bool(true)),
        f("_transition", Number(0.0)),
        f("_normalColor", Color(214, 214, 214, 255)),
        f("_hoverColor", Color(211, 211, 211, 255)),
        f("_pressedColor", WHITE),
        f("_disabledColor", Color(124, 124, 124, 255)),
        f("_normalSprite", Null),
        f("_hoverSprite", Null),
        f("_pressedSprite", Null),
        f("_disabledSprite", Null),
        f("_duration", Number(0.1)),
        f("_zoomScale", Number(1.2)),
        f("_target", Null),
    ],
};

static WIDGET: ComponentSchema = ComponentSchema {
    type_name: "cc.Widget",
    fields: &[
        f("_alignFlags", Number(0.0)),
        f("_target", Null),
        f("_left", Number(0.0)),
        f("_right", Number(0.0)),
        f("_top", Number(0.0)),
        f("_bottom", Number(0.0)),
        f("_horizontalCenter", Number(0.0)),
        f("_verticalCenter", Number(0.0)),
        f("_isAbsLeft", Bool(true)),
        f("_isAbsRight", Bool(true)),
        f("_isAbsTop", Bool(true)),
        f("_isAbsBottom", Bool(true)),
        f("_isAbsHorizontalCenter", Bool(true)),
        f("_isAbsVerticalCenter", Bool(true)),
        f("_originalWidth", Number(0.0)),
        f("_originalHeight", Number(0.0)),
        f("_alignMode", Number(2.0)),
        f("_lockFlags", Number(0.0)),
    ],
};

static SCHEMAS: &[&ComponentSchema] = &[&UI_TRANSFORM, &SPRITE, &LABEL, &BUTTON, &WIDGET];

/// Schema for a built-in component type, if one is known
pub fn schema_for(type_name: &str) -> Option<&'static ComponentSchema> {
    SCHEMAS.iter().copied().find(|s| s.type_name == type_name)
}

/// Property names never copied by the generic path
pub const RESERVED_PROPERTIES: &[&str] = &[
    "node",
    "enabled",
    "_enabled",
    "uuid",
    "_id",
    "name",
    "_name",
    "type",
    "__type__",
    "cid",
    "__scriptAsset",
    "__prefab",
    "_objFlags",
    "__editorExtras__",
];

/// Serialized name for a property copied by the generic path
pub fn generic_field_name(property: &str) -> Option<String> {
    if RESERVED_PROPERTIES.contains(&property) {
        return None;
    }
    if property.starts_with('_') {
        Some(property.to_string())
    } else {
        Some(format!("_{}", property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        assert_eq!(schema_for("cc.Sprite").map(|s| s.fields.len()), Some(14));
        assert!(schema_for("cc.ParticleSystem").is_none());
    }

    #[test]
    fn test_sources_strip_underscore() {
        let spec = &UI_TRANSFORM.fields[0];
        assert_eq!(spec.sources(), ["contentSize", "_contentSize"]);
        assert_eq!(
            spec.default.to_value(),
            json!({ "__type__": "cc.Size", "width": 100, "height": 100 })
        );
    }

    #[test]
    fn test_generic_field_names() {
        assert_eq!(generic_field_name("speed").as_deref(), Some("_speed"));
        assert_eq!(generic_field_name("_health").as_deref(), Some("_health"));
        assert_eq!(generic_field_name("node"), None);
        assert_eq!(generic_field_name("__scriptAsset"), None);
    }
}
