//! # Graph Loader
//!
//! Turns the editor's JSON description into a [`BlockGraph`].
//!
//! Loading runs in two passes. The first builds every block with its final
//! id and variant; the second checks each reference against the finished
//! table, since a block may point at one that appears later in the input.
//! Both passes walk blocks in ascending id order and stop at the first error.

use crate::error::LoadError;
use crate::graph::defaults::{default_kind, DEFAULT_PIN, DEFAULT_PIN_LEVEL, DEFAULT_SLEEP_LENGTH};
use crate::graph::{Block, BlockGraph, BlockId, BlockKind, Branch, PinLevel};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level shape of the editor's output.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    blocks: Option<Value>,
}

/// One entry of the `blocks` object. Unlisted keys such as `loc` are ignored.
#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    /// `None` when the key is absent, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    next: Option<Option<Value>>,
    #[serde(default)]
    attributes: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Value>::deserialize(deserializer).map(Some)
}

/// Load a graph from JSON text.
pub fn load_str(json: &str) -> Result<BlockGraph, LoadError> {
    let value: Value = serde_json::from_str(json)?;
    load_value(value)
}

/// Load a graph from a file on disk.
pub fn load_file(path: impl AsRef<Path>) -> Result<BlockGraph, LoadError> {
    let path = path.as_ref();
    tracing::info!("[LOADER] Reading {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&text)
}

/// Load a graph from an already-parsed JSON document.
pub fn load_value(value: Value) -> Result<BlockGraph, LoadError> {
    if !value.is_object() {
        return Err(LoadError::MalformedInput(
            "top-level document must be an object".to_string(),
        ));
    }
    let document: Document = serde_json::from_value(value)?;
    let blocks = match document.blocks {
        Some(Value::Object(blocks)) => blocks,
        Some(_) => {
            return Err(LoadError::MalformedInput(
                "\"blocks\" must be an object keyed by block id".to_string(),
            ))
        }
        None => return Err(LoadError::MalformedInput("no \"blocks\" object".to_string())),
    };

    let descriptors = collect_descriptors(blocks)?;
    tracing::info!("[LOADER] Found {} block descriptors", descriptors.len());

    // Pass 1: construct every block
    let mut graph = BlockGraph::new();
    for (id, descriptor) in descriptors {
        let block = build_block(id, descriptor)?;
        tracing::debug!("[LOADER] Built block {} ({})", id, block.kind.tag());
        graph.insert(block);
    }

    // Pass 2: every reference must land on a block that exists
    for block in graph.blocks() {
        for (field, target) in block.references() {
            if !graph.contains(target) {
                return Err(LoadError::DanglingReference {
                    block: block.id,
                    field,
                    target,
                });
            }
        }
    }

    tracing::info!("[LOADER] Loaded {} blocks", graph.len());
    Ok(graph)
}

fn collect_descriptors(
    blocks: Map<String, Value>,
) -> Result<BTreeMap<BlockId, Descriptor>, LoadError> {
    let mut descriptors = BTreeMap::new();
    for (key, raw) in blocks {
        let id = key
            .trim()
            .parse::<u32>()
            .map(BlockId)
            .map_err(|_| LoadError::InvalidBlockId(key.clone()))?;
        if !raw.is_object() {
            return Err(LoadError::MalformedInput(format!(
                "block {} must be an object",
                id
            )));
        }
        let descriptor: Descriptor = serde_json::from_value(raw)?;
        if descriptors.insert(id, descriptor).is_some() {
            return Err(LoadError::DuplicateBlockId(id));
        }
    }
    Ok(descriptors)
}

fn build_block(id: BlockId, descriptor: Descriptor) -> Result<Block, LoadError> {
    let tag = match descriptor.kind {
        Some(Value::String(tag)) => tag,
        Some(other) => {
            return Err(LoadError::UnknownBlockType {
                id,
                tag: Some(other.to_string()),
            })
        }
        None => return Err(LoadError::UnknownBlockType { id, tag: None }),
    };
    let kind = default_kind(&tag).ok_or_else(|| LoadError::UnknownBlockType {
        id,
        tag: Some(tag.clone()),
    })?;

    let next = match descriptor.next {
        None => return Err(LoadError::MissingField { id, field: "next" }),
        Some(None) => None,
        Some(Some(raw)) => Some(parse_id(id, "next", &raw)?),
    };

    let mut block = Block::new(id.0, kind);
    block.next = next;

    match descriptor.attributes {
        Some(Value::Object(attributes)) => apply_attributes(&mut block, attributes)?,
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(invalid(
                id,
                "attributes",
                format!("must be an object, found {}", other),
            ))
        }
    }

    Ok(block)
}

/// Copy recognized attributes onto the block's typed fields; everything
/// else lands in `extra`.
fn apply_attributes(block: &mut Block, attributes: Map<String, Value>) -> Result<(), LoadError> {
    let id = block.id;

    if let BlockKind::Conditional { if_true, if_false, .. } = &mut block.kind {
        // An attribute section without `children` still counts as sent: both
        // arms stay `Missing` for the validator to report.
        if let Some(children) = attributes.get("children") {
            let children = children.as_object().ok_or_else(|| invalid(
                id,
                "children",
                "must be an object with 'true' and 'false' keys",
            ))?;
            *if_true = parse_branch(id, "children.true", children.get("true"))?;
            *if_false = parse_branch(id, "children.false", children.get("false"))?;
        }
    }

    for (name, value) in attributes {
        let applied = match (&mut block.kind, name.as_str()) {
            (BlockKind::Conditional { .. }, "children") => true,
            (BlockKind::Loop { condition, .. }, "condition")
            | (BlockKind::Conditional { condition, .. }, "condition") => {
                *condition = parse_text(id, &name, &value)?;
                true
            }
            (BlockKind::Loop { child, .. }, "child") => {
                *child = parse_optional_id(id, "child", &value)?;
                true
            }
            (BlockKind::Read { variable, .. }, "variable" | "var") => {
                *variable = parse_string(id, &name, &value)?;
                true
            }
            (BlockKind::Read { pin, .. }, "pin") | (BlockKind::Write { pin, .. }, "pin") => {
                *pin = parse_pin(id, &value)?;
                true
            }
            (BlockKind::Write { value: level, .. }, "value") => {
                *level = parse_level(id, &value)?;
                true
            }
            (BlockKind::Sleep { length }, "length") => {
                *length = match value {
                    Value::Null => DEFAULT_SLEEP_LENGTH,
                    ref raw => parse_unsigned(id, "length", raw)?,
                };
                true
            }
            (BlockKind::Code { code }, "code") => {
                *code = parse_string(id, &name, &value)?;
                true
            }
            (BlockKind::Variable { name: var_name }, "name") => {
                *var_name = parse_string(id, &name, &value)?;
                true
            }
            _ => false,
        };

        if !applied {
            tracing::warn!(
                "[LOADER] Block {} ({}): keeping unrecognized attribute '{}'",
                id,
                block.kind.tag(),
                name
            );
            block.extra.insert(name, value);
        }
    }

    Ok(())
}

fn invalid(id: BlockId, attribute: &str, reason: impl Into<String>) -> LoadError {
    LoadError::InvalidAttribute {
        id,
        attribute: attribute.to_string(),
        reason: reason.into(),
    }
}

fn parse_unsigned(id: BlockId, attribute: &str, value: &Value) -> Result<u64, LoadError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(id, attribute, format!("{} is not a non-negative integer", n))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| invalid(id, attribute, format!("{:?} is not a non-negative integer", s))),
        other => Err(invalid(
            id,
            attribute,
            format!("expected a non-negative integer, found {}", other),
        )),
    }
}

fn parse_id(id: BlockId, attribute: &str, value: &Value) -> Result<BlockId, LoadError> {
    let raw = parse_unsigned(id, attribute, value)?;
    u32::try_from(raw)
        .map(BlockId)
        .map_err(|_| invalid(id, attribute, format!("{} is out of range for a block id", raw)))
}

fn parse_optional_id(
    id: BlockId,
    attribute: &str,
    value: &Value,
) -> Result<Option<BlockId>, LoadError> {
    match value {
        Value::Null => Ok(None),
        raw => parse_id(id, attribute, raw).map(Some),
    }
}

fn parse_branch(id: BlockId, attribute: &str, value: Option<&Value>) -> Result<Branch, LoadError> {
    match value {
        None => Ok(Branch::Missing),
        Some(raw) => Ok(match parse_optional_id(id, attribute, raw)? {
            Some(target) => Branch::To(target),
            None => Branch::Empty,
        }),
    }
}

fn parse_pin(id: BlockId, value: &Value) -> Result<u32, LoadError> {
    if value.is_null() {
        return Ok(DEFAULT_PIN);
    }
    let raw = parse_unsigned(id, "pin", value)?;
    u32::try_from(raw).map_err(|_| invalid(id, "pin", format!("{} is out of range", raw)))
}

fn parse_level(id: BlockId, value: &Value) -> Result<PinLevel, LoadError> {
    let level = match value {
        Value::Null => Some(DEFAULT_PIN_LEVEL),
        Value::Bool(true) => Some(PinLevel::High),
        Value::Bool(false) => Some(PinLevel::Low),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(PinLevel::Low),
            Some(1) => Some(PinLevel::High),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "low" | "0" => Some(PinLevel::Low),
            "high" | "1" => Some(PinLevel::High),
            _ => None,
        },
        _ => None,
    };
    level.ok_or_else(|| invalid(id, "value", format!("{} is not a pin level (0/1, low/high)", value)))
}

fn parse_string(id: BlockId, attribute: &str, value: &Value) -> Result<String, LoadError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        other => Err(invalid(id, attribute, format!("expected text, found {}", other))),
    }
}

/// Conditions are opaque text; scalar literals are accepted as written.
fn parse_text(id: BlockId, attribute: &str, value: &Value) -> Result<String, LoadError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => parse_string(id, attribute, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReferenceField;
    use serde_json::json;

    fn load(value: Value) -> Result<BlockGraph, LoadError> {
        load_value(value)
    }

    #[test]
    fn loads_forward_references() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "start", "next": 2 },
            "2": { "type": "sleep", "next": 1, "attributes": { "length": 250 } },
            "1": { "type": "code", "next": null, "attributes": { "code": "x++" } }
        }}))
        .unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.get(BlockId(0)).unwrap().next, Some(BlockId(2)));
        assert_eq!(graph.get(BlockId(2)).unwrap().kind, BlockKind::Sleep { length: 250 });
        assert_eq!(graph.get(BlockId(1)).unwrap().next, None);
    }

    #[test]
    fn missing_blocks_section_is_malformed() {
        let err = load(json!({ "program": {} })).unwrap_err();
        assert!(matches!(err, LoadError::MalformedInput(_)));

        let err = load(json!([1, 2])).unwrap_err();
        assert!(matches!(err, LoadError::MalformedInput(_)));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = load(json!({ "blocks": {
            "0": { "type": "start", "next": null },
            "4": { "type": "frobnicate", "next": null }
        }}))
        .unwrap_err();

        match err {
            LoadError::UnknownBlockType { id, tag } => {
                assert_eq!(id, BlockId(4));
                assert_eq!(tag.as_deref(), Some("frobnicate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_type_is_unknown() {
        let err = load(json!({ "blocks": { "3": { "next": null } } })).unwrap_err();
        assert!(matches!(err, LoadError::UnknownBlockType { id: BlockId(3), tag: None }));
    }

    #[test]
    fn next_must_be_present() {
        let err = load(json!({ "blocks": { "0": { "type": "start" } } })).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingField { id: BlockId(0), field: "next" }
        ));
    }

    #[test]
    fn dangling_next_is_reported() {
        let err = load(json!({ "blocks": {
            "0": { "type": "start", "next": 5 }
        }}))
        .unwrap_err();

        match err {
            LoadError::DanglingReference { block, field, target } => {
                assert_eq!(block, BlockId(0));
                assert_eq!(field, ReferenceField::Next);
                assert_eq!(target, BlockId(5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dangling_branch_is_reported() {
        let err = load(json!({ "blocks": {
            "0": { "type": "start", "next": 1 },
            "1": { "type": "conditional", "next": null,
                   "attributes": { "condition": "a", "children": { "true": null, "false": 9 } } }
        }}))
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::DanglingReference {
                block: BlockId(1),
                field: ReferenceField::IfFalse,
                target: BlockId(9),
            }
        ));
    }

    #[test]
    fn defaults_fill_unset_attributes() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "pin_write", "next": null },
            "1": { "type": "pin_read", "next": null, "attributes": { "var": "button" } },
            "2": { "type": "write", "next": null, "attributes": { "pin": null, "value": null } }
        }}))
        .unwrap();

        assert_eq!(
            graph.get(BlockId(0)).unwrap().kind,
            BlockKind::Write { pin: 0, value: PinLevel::Low }
        );
        assert_eq!(
            graph.get(BlockId(1)).unwrap().kind,
            BlockKind::Read { variable: "button".into(), pin: 0 }
        );
        assert_eq!(
            graph.get(BlockId(2)).unwrap().kind,
            BlockKind::Write { pin: 0, value: PinLevel::Low }
        );
    }

    #[test]
    fn conditional_branches_distinguish_null_from_missing() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "conditional", "next": null,
                   "attributes": { "condition": "x", "children": { "true": null } } },
            "1": { "type": "conditional", "next": null }
        }}))
        .unwrap();

        match &graph.get(BlockId(0)).unwrap().kind {
            BlockKind::Conditional { if_true, if_false, .. } => {
                assert_eq!(*if_true, Branch::Empty);
                assert_eq!(*if_false, Branch::Missing);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        match &graph.get(BlockId(1)).unwrap().kind {
            BlockKind::Conditional { if_true, if_false, .. } => {
                assert!(if_true.is_missing() && if_false.is_missing());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_attributes_are_preserved() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "variable", "next": null, "loc": { "x": 3, "y": 4 },
                   "attributes": { "name": "count", "value": 7, "child": 2 } }
        }}))
        .unwrap();

        let block = graph.get(BlockId(0)).unwrap();
        assert_eq!(block.kind, BlockKind::Variable { name: "count".into() });
        assert_eq!(block.extra.get("value"), Some(&json!(7)));
        // `child` only means something on a loop
        assert_eq!(block.extra.get("child"), Some(&json!(2)));
        assert!(block.references().is_empty());
    }

    #[test]
    fn numeric_strings_are_accepted_for_ids_and_numbers() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "start", "next": "1" },
            "1": { "type": "write", "next": null, "attributes": { "pin": "13", "value": "HIGH" } }
        }}))
        .unwrap();
        assert_eq!(graph.get(BlockId(0)).unwrap().next, Some(BlockId(1)));
        assert_eq!(
            graph.get(BlockId(1)).unwrap().kind,
            BlockKind::Write { pin: 13, value: PinLevel::High }
        );
    }

    #[test]
    fn negative_pin_is_invalid() {
        let err = load(json!({ "blocks": {
            "0": { "type": "write", "next": null, "attributes": { "pin": -1 } }
        }}))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidAttribute { id: BlockId(0), ref attribute, .. } if attribute == "pin"));
    }

    #[test]
    fn negative_length_is_invalid() {
        let err = load(json!({ "blocks": {
            "0": { "type": "sleep", "next": null, "attributes": { "length": -5 } }
        }}))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidAttribute { id: BlockId(0), ref attribute, .. } if attribute == "length"));
    }

    #[test]
    fn attributes_must_be_an_object() {
        let err = load(json!({ "blocks": {
            "0": { "type": "start", "next": 1 },
            "1": { "type": "write", "next": null, "attributes": 5 }
        }}))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidAttribute { id: BlockId(1), ref attribute, .. } if attribute == "attributes"));
        assert!(err.to_string().contains("block 1"));

        let graph = load(json!({ "blocks": {
            "0": { "type": "sleep", "next": null, "attributes": null }
        }}))
        .unwrap();
        assert_eq!(graph.get(BlockId(0)).unwrap().kind, BlockKind::Sleep { length: 0 });
    }

    #[test]
    fn pin_level_must_be_binary() {
        let err = load(json!({ "blocks": {
            "0": { "type": "write", "next": null, "attributes": { "value": 2 } }
        }}))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidAttribute { ref attribute, .. } if attribute == "value"));
    }

    #[test]
    fn bad_keys() {
        let err = load(json!({ "blocks": { "first": { "type": "start", "next": null } } }))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidBlockId(ref key) if key == "first"));

        let err = load(json!({ "blocks": {
            "1": { "type": "start", "next": null },
            "01": { "type": "sleep", "next": null }
        }}))
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateBlockId(BlockId(1))));
    }

    #[test]
    fn scalar_conditions_become_text() {
        let graph = load(json!({ "blocks": {
            "0": { "type": "loop", "next": null, "attributes": { "condition": 1, "child": null } },
            "1": { "type": "loop", "next": null, "attributes": { "condition": true } }
        }}))
        .unwrap();
        assert_eq!(
            graph.get(BlockId(0)).unwrap().kind,
            BlockKind::Loop { condition: "1".into(), child: None }
        );
        assert_eq!(
            graph.get(BlockId(1)).unwrap().kind,
            BlockKind::Loop { condition: "true".into(), child: None }
        );
    }

    #[test]
    fn reads_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{ "blocks": { "0": { "type": "start", "next": null } } }"#,
        )
        .unwrap();

        let graph = load_file(file.path()).unwrap();
        assert_eq!(graph.entry(), Some(BlockId(0)));

        let err = load_file(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
