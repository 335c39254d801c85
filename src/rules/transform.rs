use crate::schema::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical parameters of every transform node kind.
///
/// These are the only shapes downstream code sees. Historical layouts of the
/// same parameters are folded into them by [`crate::graph::migrate`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOp {
    /// Pass-through node with a single input and output.
    Direct,
    Static(StaticParams),
    Conditional(ConditionalParams),
    StringOperation(StringOperationParams),
    Split(SplitParams),
    Concat(ConcatParams),
    DateConversion(DateConversionParams),
    Coalesce(CoalesceParams),
}

impl TransformOp {
    /// Serializes the parameters into the stable `config.parameters` object.
    pub fn parameters(&self) -> Value {
        let value = match self {
            TransformOp::Direct => Ok(Value::Object(Default::default())),
            TransformOp::Static(p) => serde_json::to_value(p),
            TransformOp::Conditional(p) => serde_json::to_value(p),
            TransformOp::StringOperation(p) => serde_json::to_value(p),
            TransformOp::Split(p) => serde_json::to_value(p),
            TransformOp::Concat(p) => serde_json::to_value(p),
            TransformOp::DateConversion(p) => serde_json::to_value(p),
            TransformOp::Coalesce(p) => serde_json::to_value(p),
        };
        // Parameter structs contain only string keys, so encoding cannot fail.
        value.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticParams {
    pub values: Vec<StaticEntry>,
}

/// One constant output of a static-value node. The `id` is its output handle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticEntry {
    pub id: String,
    pub value: Value,
}

impl StaticParams {
    /// Finds the entry behind an output handle; a single-entry node answers any handle.
    pub fn entry(&self, handle: Option<&str>) -> Option<&StaticEntry> {
        match handle {
            Some(handle) => self
                .values
                .iter()
                .find(|e| e.id == handle)
                .or_else(|| (self.values.len() == 1).then(|| &self.values[0])),
            None => self.values.first(),
        }
    }
}

/// Comparison applied by a conditional node to its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    #[default]
    #[serde(alias = "==", alias = "eq", alias = "equal")]
    Equals,
    #[serde(alias = "!=", alias = "neq")]
    NotEquals,
    #[serde(alias = ">", alias = "gt")]
    GreaterThan,
    #[serde(alias = "<", alias = "lt")]
    LessThan,
    #[serde(alias = ">=", alias = "gte")]
    GreaterOrEqual,
    #[serde(alias = "<=", alias = "lte")]
    LessOrEqual,
    Contains,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    /// Parses the symbolic forms used in free-text conditions.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "==" | "=" => ConditionOperator::Equals,
            "!=" | "<>" => ConditionOperator::NotEquals,
            ">" => ConditionOperator::GreaterThan,
            "<" => ConditionOperator::LessThan,
            ">=" => ConditionOperator::GreaterOrEqual,
            "<=" => ConditionOperator::LessOrEqual,
            "contains" => ConditionOperator::Contains,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionalParams {
    pub operator: ConditionOperator,
    pub compare_value: Value,
    pub then_value: Value,
    pub else_value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringOperation {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Trim,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StringOperationParams {
    pub string_operation: StringOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplitParams {
    pub delimiter: String,
    pub index: usize,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcatParams {
    pub source_fields: Vec<String>,
    pub separator: String,
}

impl Default for ConcatParams {
    fn default() -> Self {
        Self {
            source_fields: Vec::new(),
            separator: " ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateConversionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    pub output_format: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoalesceParams {
    pub rules: Vec<CoalesceRule>,
    pub default_value: Value,
    pub output_type: FieldType,
}

/// One candidate input of a coalesce node, tried in list order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoalesceRule {
    #[serde(alias = "field")]
    pub source_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}
