//! Structural validation of prefab documents
//!
//! Validation never fails hard: every problem becomes a human readable issue
//! in the report so the caller decides how to react.

use crate::prefab::document::{NODE_TYPE, PREFAB_TYPE};
use serde::Serialize;
use serde_json::Value;

/// Outcome of validating one document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True when no issues were found
    pub is_valid: bool,
    /// Problems found, in discovery order
    pub issues: Vec<String>,
    /// Number of entries
    pub entry_count: usize,
    /// Number of node entries
    pub node_count: usize,
    /// Number of component entries
    pub component_count: usize,
    /// Name recorded in the header, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefab_name: Option<String>,
}

impl ValidationReport {
    fn issue(&mut self, message: impl Into<String>) {
        self.issues.push(message.into());
    }

    fn finish(mut self) -> Self {
        self.is_valid = self.issues.is_empty();
        self
    }
}

/// Validate document text
pub fn validate_text(text: &str) -> ValidationReport {
    match serde_json::from_str::<Value>(text) {
        Ok(doc) => validate_document(&doc),
        Err(e) => {
            let mut report = ValidationReport::default();
            report.issue(format!("document is not valid JSON: {}", e));
            report.finish()
        }
    }
}

/// Validate a parsed document
pub fn validate_document(doc: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(entries) = doc.as_array() else {
        report.issue("document must be a JSON array");
        return report.finish();
    };
    if entries.is_empty() {
        report.issue("document is empty");
        return report.finish();
    }

    report.entry_count = entries.len();

    match type_of(&entries[0]) {
        Some(PREFAB_TYPE) => {
            report.prefab_name = entries[0]
                .get("_name")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Some(other) => report.issue(format!("first entry must be {}, found {}", PREFAB_TYPE, other)),
        None => report.issue(format!("first entry must be {}", PREFAB_TYPE)),
    }

    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            report.issue(format!("entry {} is not an object", i));
            continue;
        }
        if type_of(entry) == Some(NODE_TYPE) {
            report.node_count += 1;
        } else if entry.get("node").is_some() && entry.get("__prefab").is_some() {
            report.component_count += 1;
        }

        let mut refs = Vec::new();
        collect_ids(entry, &mut refs);
        for id in refs {
            match id {
                Some(n) if n < entries.len() => {
                    if entries[n].is_null() {
                        report.issue(format!("entry {} references null entry {}", i, n));
                    }
                }
                Some(n) => report.issue(format!(
                    "entry {} references index {} outside the document ({} entries)",
                    i,
                    n,
                    entries.len()
                )),
                None => report.issue(format!("entry {} has a malformed __id__", i)),
            }
        }
    }

    if report.node_count == 0 {
        report.issue("document contains no nodes");
    }

    check_parent_links(entries, &mut report);

    report.finish()
}

fn type_of(entry: &Value) -> Option<&str> {
    entry.get("__type__").and_then(Value::as_str)
}

// `None` marks an `__id__` that is not a non-negative integer
fn collect_ids(value: &Value, out: &mut Vec<Option<usize>>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("__id__") {
                out.push(id.as_u64().map(|n| n as usize));
                return;
            }
            for field in map.values() {
                collect_ids(field, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_ids(item, out);
            }
        }
        _ => {}
    }
}

fn id_of(value: &Value) -> Option<usize> {
    value.get("__id__").and_then(Value::as_u64).map(|n| n as usize)
}

fn check_parent_links(entries: &[Value], report: &mut ValidationReport) {
    for (i, entry) in entries.iter().enumerate() {
        if type_of(entry) != Some(NODE_TYPE) {
            continue;
        }
        let Some(children) = entry.get("_children").and_then(Value::as_array) else {
            continue;
        };
        for child in children.iter().filter_map(id_of) {
            let Some(child_entry) = entries.get(child) else {
                continue;
            };
            if child_entry.get("_parent").and_then(id_of) != Some(i) {
                report.issue(format!("entry {} lists {} as a child but its _parent disagrees", i, child));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!([
            { "__type__": "cc.Prefab", "_name": "Door", "data": { "__id__": 1 } },
            { "__type__": "cc.Node", "_parent": null, "_children": [], "_prefab": { "__id__": 2 } },
            { "__type__": "cc.PrefabInfo", "root": { "__id__": 1 }, "asset": { "__id__": 0 } }
        ])
    }

    #[test]
    fn test_valid_document() {
        let report = validate_document(&minimal());
        assert!(report.is_valid, "{:?}", report.issues);
        assert_eq!(report.entry_count, 3);
        assert_eq!(report.node_count, 1);
        assert_eq!(report.prefab_name.as_deref(), Some("Door"));
    }

    #[test]
    fn test_not_an_array() {
        let report = validate_document(&json!({ "__type__": "cc.Prefab" }));
        assert!(!report.is_valid);
        assert_eq!(report.issues, vec!["document must be a JSON array".to_string()]);
    }

    #[test]
    fn test_empty_and_headerless() {
        assert!(!validate_document(&json!([])).is_valid);

        let report = validate_document(&json!([{ "__type__": "cc.Node" }]));
        assert!(report.issues.iter().any(|i| i.contains("first entry must be cc.Prefab")));
    }

    #[test]
    fn test_no_nodes() {
        let report = validate_document(&json!([{ "__type__": "cc.Prefab" }]));
        assert_eq!(report.issues, vec!["document contains no nodes".to_string()]);
    }

    #[test]
    fn test_out_of_range_reference() {
        let mut doc = minimal();
        doc[1]["_prefab"] = json!({ "__id__": 9 });
        let report = validate_document(&doc);
        assert!(!report.is_valid);
        assert!(report.issues[0].contains("index 9 outside the document"));
    }

    #[test]
    fn test_parent_mismatch() {
        let doc = json!([
            { "__type__": "cc.Prefab", "data": { "__id__": 1 } },
            { "__type__": "cc.Node", "_parent": null, "_children": [{ "__id__": 2 }] },
            { "__type__": "cc.Node", "_parent": null, "_children": [] }
        ]);
        let report = validate_document(&doc);
        assert_eq!(report.node_count, 2);
        assert!(report.issues.iter().any(|i| i.contains("_parent disagrees")));
    }

    #[test]
    fn test_invalid_json_text() {
        let report = validate_text("[{");
        assert!(!report.is_valid);
        assert!(report.issues[0].starts_with("document is not valid JSON"));
    }
}
