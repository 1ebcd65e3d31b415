//! Property tests over generated node trees
//!
//! Trees are generated as shapes first and numbered afterwards, so every node
//! and component gets a unique live identifier and every generated reference
//! is known to be either inside or outside the tree.

use std::collections::HashSet;

use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::Value;

use crate::core::types::{LiveComponent, LiveNode, PropertyValue};
use crate::prefab::codec::{compress_uuid, COMPACT_LEN};
use crate::prefab::document::DocumentAssembler;
use crate::prefab::flatten::{flatten, FlattenOptions};
use crate::prefab::validate::validate_document;

#[derive(Clone, Debug)]
struct Shape {
    components: usize,
    refs: Vec<u8>,
    children: Vec<Shape>,
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = (0usize..3, vec(any::<u8>(), 0..3)).prop_map(|(components, refs)| Shape {
        components,
        refs,
        children: Vec::new(),
    });

    leaf.prop_recursive(4, 40, 4, |inner| {
        (0usize..3, vec(any::<u8>(), 0..3), vec(inner, 0..4)).prop_map(
            |(components, refs, children)| Shape { components, refs, children },
        )
    })
}

// Node uuids are n0..nK in pre-order; references pick from n0..n63, so some
// point outside the tree
fn build(shape: &Shape, next: &mut usize) -> LiveNode {
    let id = *next;
    *next += 1;

    let mut node = LiveNode::new(&format!("Node{}", id)).with_uuid(&format!("n{}", id));
    for c in 0..shape.components {
        node = node.with_component(LiveComponent::builtin("cc.UITransform").with_uuid(&format!("n{}c{}", id, c)));
    }
    if !shape.refs.is_empty() {
        let mut holder = LiveComponent::builtin("RefHolder").with_uuid(&format!("n{}refs", id));
        for (i, r) in shape.refs.iter().enumerate() {
            let target = format!("n{}", r % 64);
            holder = holder.with_property(&format!("target{}", i), PropertyValue::node_ref(&target));
        }
        node = node.with_component(holder);
    }
    for child in &shape.children {
        node.children.push(build(child, next));
    }
    node
}

fn refs_outside(shape: &Shape, total_nodes: usize) -> usize {
    let own = shape.refs.iter().filter(|r| (**r as usize % 64) >= total_nodes).count();
    own + shape.children.iter().map(|c| refs_outside(c, total_nodes)).sum::<usize>()
}

fn document_for(root: &LiveNode) -> Vec<Value> {
    let output = flatten(root, &FlattenOptions::default()).unwrap();
    let prefab = DocumentAssembler::default().assemble("Generated", "prefab-uuid", output.entries);
    serde_json::from_str(&prefab.body_json().unwrap()).unwrap()
}

fn id_of(value: &Value) -> Option<usize> {
    value.get("__id__").and_then(Value::as_u64).map(|n| n as usize)
}

fn collect_ids(value: &Value, out: &mut Vec<usize>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = id_of(value) {
                out.push(id);
            }
            map.values().for_each(|v| collect_ids(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_ids(v, out)),
        _ => {}
    }
}

proptest! {
    #[test]
    fn compress_is_deterministic_and_fixed_length(bytes in any::<[u8; 16]>()) {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        let hyphenated = format!("{}-{}-{}-{}-{}", &hex[..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..]);

        let compact = compress_uuid(&hex);
        prop_assert_eq!(compact.len(), COMPACT_LEN);
        prop_assert!(compact.starts_with(&hex[..5]));
        prop_assert_eq!(&compact, &compress_uuid(&hex));
        prop_assert_eq!(&compact, &compress_uuid(&hyphenated));
        prop_assert_eq!(&compact, &compress_uuid(&hex.to_uppercase()));
    }

    #[test]
    fn every_internal_reference_is_in_range(shape in shape_strategy()) {
        let root = build(&shape, &mut 0);
        let doc = document_for(&root);

        let mut ids = Vec::new();
        doc.iter().for_each(|e| collect_ids(e, &mut ids));
        for id in ids {
            prop_assert!(id < doc.len());
            prop_assert!(!doc[id].is_null());
        }

        let report = validate_document(&Value::Array(doc.clone()));
        prop_assert!(report.is_valid, "{:?}", report.issues);
    }

    #[test]
    fn parent_and_children_agree(shape in shape_strategy()) {
        let root = build(&shape, &mut 0);
        let doc = document_for(&root);

        prop_assert!(doc[1]["_parent"].is_null());
        for (i, entry) in doc.iter().enumerate() {
            if entry["__type__"] != "cc.Node" {
                continue;
            }
            for child in entry["_children"].as_array().unwrap() {
                let c = id_of(child).unwrap();
                prop_assert_eq!(id_of(&doc[c]["_parent"]), Some(i));
            }
            if i != 1 {
                prop_assert!(id_of(&entry["_parent"]).is_some());
            }
        }
    }

    #[test]
    fn every_node_and_component_has_its_own_prefab_info(shape in shape_strategy()) {
        let root = build(&shape, &mut 0);
        let doc = document_for(&root);

        let mut seen = HashSet::new();
        let (mut nodes, mut components) = (0, 0);
        for entry in &doc {
            if entry["__type__"] == "cc.Node" {
                nodes += 1;
                let info = id_of(&entry["_prefab"]).unwrap();
                prop_assert_eq!(&doc[info]["__type__"], "cc.PrefabInfo");
                prop_assert!(seen.insert(info));
            } else if entry.get("__prefab").is_some() {
                components += 1;
                let info = id_of(&entry["__prefab"]).unwrap();
                prop_assert_eq!(&doc[info]["__type__"], "cc.CompPrefabInfo");
                prop_assert!(seen.insert(info));
            }
        }

        prop_assert_eq!(nodes, root.subtree_len());
        prop_assert_eq!(doc.len(), 1 + 2 * nodes + 2 * components);
    }

    #[test]
    fn layout_is_deterministic(shape in shape_strategy()) {
        let root = build(&shape, &mut 0);
        prop_assert_eq!(document_for(&root), document_for(&root));
    }

    #[test]
    fn outside_references_become_warnings(shape in shape_strategy()) {
        let root = build(&shape, &mut 0);
        let total = root.subtree_len();
        let output = flatten(&root, &FlattenOptions::default()).unwrap();
        prop_assert_eq!(output.warnings.len(), refs_outside(&shape, total));
    }
}
