use super::transform::{ConditionOperator, StringOperation, StringOperationParams, SplitParams};
use crate::error::InvalidMapping;
use crate::schema::ArrayConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One resolved rule for a single target field.
///
/// The rule-specific attributes are flattened next to `from`/`to`, tagged by
/// `type`, which yields the wire shape
/// `{from, to, type, value?, if?, then?, else?, map?, transform?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMapping {
    pub from: Option<String>,
    pub to: String,
    #[serde(flatten)]
    pub rule: MappingRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MappingRule {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "static")]
    Static { value: Value },
    #[serde(rename = "ifThen")]
    IfThen {
        #[serde(rename = "if")]
        condition: Condition,
        then: Value,
        #[serde(rename = "else")]
        otherwise: Value,
    },
    #[serde(rename = "map")]
    Map {
        map: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<FieldTransform>,
    },
    #[serde(rename = "skip")]
    Skip,
}

impl MappingRule {
    pub fn type_name(&self) -> &'static str {
        match self {
            MappingRule::Direct => "direct",
            MappingRule::Static { .. } => "static",
            MappingRule::IfThen { .. } => "ifThen",
            MappingRule::Map { .. } => "map",
            MappingRule::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub operator: ConditionOperator,
    pub value: Value,
}

/// A value transform applied to the source field before a table lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldTransform {
    Substring {
        start: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<u64>,
    },
    Split {
        delimiter: String,
        index: usize,
    },
    Uppercase,
    Lowercase,
    Trim,
}

impl FieldTransform {
    /// Captures a string-operation node; the pass-through operation captures nothing.
    pub fn from_string_operation(params: &StringOperationParams) -> Option<Self> {
        match params.string_operation {
            StringOperation::None => None,
            StringOperation::Uppercase => Some(FieldTransform::Uppercase),
            StringOperation::Lowercase => Some(FieldTransform::Lowercase),
            StringOperation::Trim => Some(FieldTransform::Trim),
            StringOperation::Substring => Some(FieldTransform::Substring {
                start: params.start.unwrap_or(0),
                end: params.end,
            }),
        }
    }

    pub fn from_split(params: &SplitParams) -> Self {
        FieldTransform::Split {
            delimiter: params.delimiter.clone(),
            index: params.index,
        }
    }
}

impl ExecutionMapping {
    pub fn direct(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            rule: MappingRule::Direct,
        }
    }

    /// A constant value. This is the only rule without a `from` field.
    pub fn fixed(to: impl Into<String>, value: Value) -> Self {
        Self {
            from: None,
            to: to.into(),
            rule: MappingRule::Static { value },
        }
    }

    pub fn if_then(
        from: impl Into<String>,
        to: impl Into<String>,
        condition: Condition,
        then: Value,
        otherwise: Value,
    ) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            rule: MappingRule::IfThen {
                condition,
                then,
                otherwise,
            },
        }
    }

    pub fn lookup(
        from: impl Into<String>,
        to: impl Into<String>,
        map: BTreeMap<String, String>,
        transform: Option<FieldTransform>,
    ) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            rule: MappingRule::Map { map, transform },
        }
    }

    pub fn skip(from: Option<String>, to: impl Into<String>) -> Self {
        Self {
            from,
            to: to.into(),
            rule: MappingRule::Skip,
        }
    }

    /// Re-checks the `from` invariant on a deserialized rule.
    pub fn validate(&self) -> Result<(), InvalidMapping> {
        let invalid = |reason| {
            Err(InvalidMapping {
                to: self.to.clone(),
                reason,
            })
        };
        match (&self.rule, &self.from) {
            (MappingRule::Static { .. }, Some(_)) => invalid("static rules must not name a source field"),
            (MappingRule::Skip, _) | (MappingRule::Static { .. }, None) => Ok(()),
            (_, None) => invalid("only static rules may omit the source field"),
            _ => Ok(()),
        }
    }
}

/// The flat, engine-consumable list of field rules plus array group-by configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMappingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub mappings: Vec<ExecutionMapping>,
    #[serde(default)]
    pub arrays: Vec<ArrayConfig>,
}

impl ExecutionMappingConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validates every rule, returning the first violation.
    pub fn validate(&self) -> Result<(), InvalidMapping> {
        self.mappings.iter().try_for_each(ExecutionMapping::validate)
    }

    /// Rules for one target field, in export order.
    pub fn rules_for<'a>(&'a self, target: &'a str) -> impl Iterator<Item = &'a ExecutionMapping> {
        self.mappings.iter().filter(move |m| m.to == target)
    }
}
