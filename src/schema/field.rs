use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive and structural types a schema field can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

impl FieldType {
    /// Object and array fields carry a `children` list.
    pub fn is_container(self) -> bool {
        matches!(self, FieldType::Object | FieldType::Array)
    }

    /// Infers the field type of a sample value.
    pub fn infer(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(_) => FieldType::Number,
            serde_json::Value::Bool(_) => FieldType::Boolean,
            serde_json::Value::Array(_) => FieldType::Array,
            serde_json::Value::Object(_) => FieldType::Object,
            serde_json::Value::String(_) | serde_json::Value::Null => FieldType::String,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Object => "object",
            FieldType::Array => "array",
        };
        f.write_str(name)
    }
}

/// A node in a source or target field tree.
///
/// The `id` doubles as the connection handle on the owning canvas node, so it
/// must be unique within that node across the whole tree. Nested fields use
/// dot-separated paths as ids (`customer.address.city`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<SchemaField>>,
    #[serde(default, alias = "group_by", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl SchemaField {
    /// Creates a primitive field whose id equals its name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            field_type,
            children: field_type.is_container().then(Vec::new),
            group_by: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<SchemaField>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn children(&self) -> &[SchemaField] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Checks the shape invariants of this field and all of its descendants.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match (self.field_type.is_container(), &self.children) {
            (true, None) => {
                return Err(SchemaError::MissingChildren {
                    field_id: self.id.clone(),
                    field_type: self.field_type.to_string(),
                });
            }
            (false, Some(_)) => {
                return Err(SchemaError::UnexpectedChildren {
                    field_id: self.id.clone(),
                    field_type: self.field_type.to_string(),
                });
            }
            _ => {}
        }

        if let Some(group_by) = &self.group_by {
            if self.field_type != FieldType::Array {
                return Err(SchemaError::GroupByOnNonArray {
                    field_id: self.id.clone(),
                });
            }
            if !self.children().iter().any(|c| &c.name == group_by) {
                return Err(SchemaError::UnknownGroupBy {
                    field_id: self.id.clone(),
                    group_by: group_by.clone(),
                });
            }
        }

        self.children().iter().try_for_each(SchemaField::validate)
    }
}

/// Validates every tree in a field list.
pub fn validate_fields(fields: &[SchemaField]) -> Result<(), SchemaError> {
    fields.iter().try_for_each(SchemaField::validate)
}

/// Depth-first, pre-order traversal over a field forest.
pub fn walk_fields(fields: &[SchemaField]) -> impl Iterator<Item = &SchemaField> {
    let mut stack: Vec<&SchemaField> = fields.iter().rev().collect();
    std::iter::from_fn(move || {
        let field = stack.pop()?;
        stack.extend(field.children().iter().rev());
        Some(field)
    })
}

/// Finds a field by handle id anywhere in the forest.
///
/// Falls back to the index-stripped form of the handle so that a connection made
/// against `items[2].name` still finds the schema field `items.name`.
pub fn find_field<'a>(fields: &'a [SchemaField], handle: &str) -> Option<&'a SchemaField> {
    walk_fields(fields)
        .find(|f| f.id == handle)
        .or_else(|| {
            let stripped = strip_array_indices(handle);
            (stripped != handle)
                .then(|| walk_fields(fields).find(|f| f.id == stripped))
                .flatten()
        })
}

/// Removes bracketed array indices from a dot path: `items[2].name` -> `items.name`.
pub fn strip_array_indices(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut depth = 0usize;
    for c in path.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
