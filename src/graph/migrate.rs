//! Normalization of node `data` payloads.
//!
//! Canvas documents written by older editors keep transform parameters in
//! several places: at the top of `data`, under `data.config`, or under
//! `data.config.parameters`, sometimes with older key names. Every payload passes
//! through [`node_kind`] exactly once, at the document boundary, and comes out in
//! the canonical shape of [`TransformOp`]. [`node_data`] writes that canonical
//! shape back, so a document that has been loaded and saved once is current.

use super::node::{NodeKind, NodeType, SchemaNodeData, ValueMapData};
use crate::error::NodeShapeError;
use crate::rules::{CoalesceParams, StaticParams, TransformOp};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Locations a parameter may live at, newest layout last. The first present one wins.
const ROOTS: [&[&str]; 3] = [&[], &["config"], &["config", "parameters"]];

/// Keys whose values older editors stored as strings.
const NUMERIC_KEYS: [&str; 3] = ["index", "start", "end"];

/// A canonical key together with the historical names it was stored under.
struct Key {
    name: &'static str,
    aliases: &'static [&'static str],
    /// Empty collections at this key are leftovers of an older layout.
    skip_empty: bool,
}

const fn key(name: &'static str, aliases: &'static [&'static str]) -> Key {
    Key {
        name,
        aliases,
        skip_empty: false,
    }
}

const fn collection(name: &'static str, aliases: &'static [&'static str]) -> Key {
    Key {
        name,
        aliases,
        skip_empty: true,
    }
}

const LABEL: Key = key("label", &["name", "title"]);

const SCHEMA_KEYS: &[Key] = &[
    collection("fields", &[]),
    collection("sampleData", &["outputData", "sample_data"]),
    key("expandedFields", &["expanded"]),
];
const VALUE_MAP_KEYS: &[Key] = &[
    collection("table", &["mappings", "mapping", "lookup"]),
    key("sourceField", &["source_field", "field"]),
];
const STATIC_KEYS: &[Key] = &[key("values", &["staticValues", "value"])];
const CONDITIONAL_KEYS: &[Key] = &[
    key("operator", &["condition_operator"]),
    key("compareValue", &["value", "conditionValue", "compare_value"]),
    key("thenValue", &["then", "then_value", "trueValue"]),
    key("elseValue", &["else", "else_value", "falseValue"]),
];
const STRING_OPERATION_KEYS: &[Key] = &[
    key("stringOperation", &["operation", "string_operation"]),
    key("start", &["substringStart", "substring_start"]),
    key("end", &["substringEnd", "substring_end"]),
];
const SPLIT_KEYS: &[Key] = &[
    key("delimiter", &["separator", "splitDelimiter"]),
    key("index", &["splitIndex", "part"]),
];
const CONCAT_KEYS: &[Key] = &[
    key("sourceFields", &["source_fields", "fields"]),
    key("separator", &["delimiter"]),
];
const DATE_KEYS: &[Key] = &[
    key("inputFormat", &["input_format", "fromFormat"]),
    key("outputFormat", &["output_format", "format", "toFormat"]),
];
const COALESCE_KEYS: &[Key] = &[
    collection("rules", &["fields", "sources"]),
    key("defaultValue", &["default_value", "default"]),
    key("outputType", &["output_type"]),
];

/// Builds the canonical variant for a node from its raw `data`.
pub fn node_kind(node_id: &str, type_name: &str, data: &Value) -> Result<NodeKind, NodeShapeError> {
    let Some(node_type) = NodeType::from_type_name(type_name) else {
        return Ok(NodeKind::Other {
            type_name: type_name.to_string(),
            data: data.clone(),
        });
    };

    if !(data.is_object() || data.is_null()) {
        return Err(NodeShapeError::NotAnObject {
            node_id: node_id.to_string(),
        });
    }

    let label = lookup(data, &LABEL)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| node_type.as_str().to_string());

    let parse = Parser {
        node_id,
        type_name,
        data,
    };

    let kind = match node_type {
        NodeType::Source => NodeKind::Source(parse.schema(label)?),
        NodeType::Target => NodeKind::Target(parse.schema(label)?),
        NodeType::ValueMap => NodeKind::ValueMap(parse.value_map(label)?),
        NodeType::Direct => transform(label, TransformOp::Direct),
        NodeType::Static => transform(label, TransformOp::Static(parse.static_values()?)),
        NodeType::Conditional => transform(label, TransformOp::Conditional(parse.params(CONDITIONAL_KEYS)?)),
        NodeType::StringOperation => {
            transform(label, TransformOp::StringOperation(parse.params(STRING_OPERATION_KEYS)?))
        }
        NodeType::Split => transform(label, TransformOp::Split(parse.params(SPLIT_KEYS)?)),
        NodeType::Concat => transform(label, TransformOp::Concat(parse.params(CONCAT_KEYS)?)),
        NodeType::DateConversion => transform(label, TransformOp::DateConversion(parse.params(DATE_KEYS)?)),
        NodeType::Coalesce => transform(label, TransformOp::Coalesce(parse.coalesce()?)),
    };
    Ok(kind)
}

fn transform(label: String, op: TransformOp) -> NodeKind {
    NodeKind::Transform { label, op }
}

/// Writes the canonical `data` payload for a node.
pub fn node_data(kind: &NodeKind) -> Value {
    match kind {
        NodeKind::Source(d) | NodeKind::Target(d) => serde_json::to_value(d).unwrap_or_default(),
        NodeKind::ValueMap(d) => serde_json::to_value(d).unwrap_or_default(),
        NodeKind::Transform { label, op } => {
            let mut data = match op.parameters() {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            data.insert("label".to_string(), Value::String(label.clone()));
            Value::Object(data)
        }
        NodeKind::Other { data, .. } => data.clone(),
    }
}

/// Wraps canonical parameters the way the UI configuration stores them.
pub fn config_payload(label: &str, parameters: Value) -> Value {
    serde_json::json!({
        "label": label,
        "config": { "parameters": parameters },
    })
}

struct Parser<'a> {
    node_id: &'a str,
    type_name: &'a str,
    data: &'a Value,
}

impl Parser<'_> {
    fn invalid(&self, message: impl Into<String>) -> NodeShapeError {
        NodeShapeError::InvalidData {
            node_id: self.node_id.to_string(),
            type_name: self.type_name.to_string(),
            message: message.into(),
        }
    }

    fn params<T: DeserializeOwned>(&self, keys: &[Key]) -> Result<T, NodeShapeError> {
        serde_json::from_value(canonicalize(self.data, keys)).map_err(|e| self.invalid(e.to_string()))
    }

    fn schema(&self, label: String) -> Result<SchemaNodeData, NodeShapeError> {
        let mut canonical = canonicalize(self.data, SCHEMA_KEYS);
        // `schema.fields` is the UI-configuration layout of the field list.
        if canonical.get("fields").is_none() {
            if let Some(fields) = self.data.pointer("/schema/fields").filter(|v| !is_empty(v)) {
                insert(&mut canonical, "fields", fields.clone());
            }
        }
        let mut data: SchemaNodeData =
            serde_json::from_value(canonical).map_err(|e| self.invalid(e.to_string()))?;
        data.label = label;
        Ok(data)
    }

    fn value_map(&self, label: String) -> Result<ValueMapData, NodeShapeError> {
        let mut canonical = canonicalize(self.data, VALUE_MAP_KEYS);
        if let Some(table) = canonical.get("table") {
            let table = table_entries(table).ok_or_else(|| self.invalid("lookup table must be an object or a list of pairs"))?;
            insert(&mut canonical, "table", serde_json::to_value(table).unwrap_or_default());
        }
        let mut data: ValueMapData =
            serde_json::from_value(canonical).map_err(|e| self.invalid(e.to_string()))?;
        data.label = label;
        Ok(data)
    }

    fn static_values(&self) -> Result<StaticParams, NodeShapeError> {
        let mut canonical = canonicalize(self.data, STATIC_KEYS);
        let values = match canonical.get("values") {
            // `{ handle: value }` layout.
            Some(Value::Object(map)) => Value::Array(
                map.iter()
                    .map(|(id, value)| serde_json::json!({ "id": id, "value": value }))
                    .collect(),
            ),
            Some(Value::Array(list)) => Value::Array(list.clone()),
            // A lone `value`.
            Some(single) => serde_json::json!([{ "id": "value", "value": single }]),
            None => Value::Array(Vec::new()),
        };
        insert(&mut canonical, "values", values);
        serde_json::from_value(canonical).map_err(|e| self.invalid(e.to_string()))
    }

    fn coalesce(&self) -> Result<CoalesceParams, NodeShapeError> {
        let mut canonical = canonicalize(self.data, COALESCE_KEYS);
        if let Some(Value::Array(rules)) = canonical.get("rules") {
            // Older editors stored bare field names.
            let rules: Vec<Value> = rules
                .iter()
                .map(|rule| match rule {
                    Value::String(field) => serde_json::json!({ "sourceField": field }),
                    other => other.clone(),
                })
                .collect();
            insert(&mut canonical, "rules", Value::Array(rules));
        }
        serde_json::from_value(canonical).map_err(|e| self.invalid(e.to_string()))
    }
}

/// Collects every canonical key from its first present location.
fn canonicalize(data: &Value, keys: &[Key]) -> Value {
    let mut out = Map::new();
    for key in keys {
        if let Some(value) = lookup(data, key) {
            out.insert(key.name.to_string(), coerce(key.name, value.clone()));
        }
    }
    Value::Object(out)
}

fn lookup<'a>(data: &'a Value, key: &Key) -> Option<&'a Value> {
    ROOTS.iter().find_map(|root| {
        let base = root.iter().try_fold(data, |value, segment| value.get(segment))?;
        std::iter::once(key.name)
            .chain(key.aliases.iter().copied())
            .filter_map(|name| base.get(name))
            .find(|value| !is_absent(value, key.skip_empty))
    })
}

/// `null` is always absent; empty collections only where a key allows stale copies.
fn is_absent(value: &Value, skip_empty: bool) -> bool {
    value.is_null() || (skip_empty && is_empty(value))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn coerce(name: &str, value: Value) -> Value {
    match value {
        Value::String(s) if NUMERIC_KEYS.contains(&name) => s
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or(Value::String(s)),
        other => other,
    }
}

fn insert(target: &mut Value, name: &str, value: Value) {
    if let Value::Object(map) = target {
        map.insert(name.to_string(), value);
    }
}

/// Reads a lookup table from either `{from: to}` or `[{from, to}]` layout.
fn table_entries(table: &Value) -> Option<BTreeMap<String, String>> {
    match table {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), scalar_text(v))).collect()),
        Value::Array(pairs) => pairs
            .iter()
            .map(|pair| {
                let from = pair.get("from").or_else(|| pair.get("source"))?;
                let to = pair.get("to").or_else(|| pair.get("target"))?;
                Some((scalar_text(from), scalar_text(to)))
            })
            .collect(),
        _ => None,
    }
}

/// Renders a JSON scalar as table text; strings lose their quotes.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
