use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One branch of a suggested conditional: `{condition, value}`.
///
/// The condition is free text such as `Status == 'A'`; a branch whose condition
/// is `else`, `default` or `otherwise` supplies the fallback value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionCase {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub value: Value,
}

/// A field mapping proposed by the suggestion oracle, one per target field.
///
/// On the wire this is a flat snake_case record tagged by `mapping_type`.
/// Entries with an unknown type, or missing the fields their type needs,
/// deserialize to [`MappingSuggestion::Unrecognized`] instead of failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSuggestion", into = "RawSuggestion")]
pub enum MappingSuggestion {
    Direct {
        target_field: String,
        source_field: String,
    },
    Static {
        target_field: String,
        value: Value,
    },
    Conditional {
        target_field: String,
        source_field: Option<String>,
        conditions: Vec<ConditionCase>,
    },
    Table {
        target_field: String,
        source_field: String,
        table: BTreeMap<String, String>,
    },
    DateConversion {
        target_field: String,
        source_field: String,
        format: String,
    },
    Concat {
        target_field: String,
        source_fields: Vec<String>,
        separator: String,
    },
    Split {
        target_field: String,
        source_field: String,
        delimiter: String,
        index: usize,
    },
    Skip {
        target_field: Option<String>,
        reason: Option<String>,
    },
    Unrecognized {
        mapping_type: String,
        target_field: Option<String>,
        reason: String,
    },
}

impl MappingSuggestion {
    pub fn mapping_type(&self) -> &str {
        match self {
            MappingSuggestion::Direct { .. } => "direct",
            MappingSuggestion::Static { .. } => "static",
            MappingSuggestion::Conditional { .. } => "conditional",
            MappingSuggestion::Table { .. } => "table",
            MappingSuggestion::DateConversion { .. } => "date_conversion",
            MappingSuggestion::Concat { .. } => "concat",
            MappingSuggestion::Split { .. } => "split",
            MappingSuggestion::Skip { .. } => "skip",
            MappingSuggestion::Unrecognized { mapping_type, .. } => mapping_type.as_str(),
        }
    }

    pub fn target_field(&self) -> Option<&str> {
        match self {
            MappingSuggestion::Direct { target_field, .. }
            | MappingSuggestion::Static { target_field, .. }
            | MappingSuggestion::Conditional { target_field, .. }
            | MappingSuggestion::Table { target_field, .. }
            | MappingSuggestion::DateConversion { target_field, .. }
            | MappingSuggestion::Concat { target_field, .. }
            | MappingSuggestion::Split { target_field, .. } => Some(target_field.as_str()),
            MappingSuggestion::Skip { target_field, .. } | MappingSuggestion::Unrecognized { target_field, .. } => {
                target_field.as_deref()
            }
        }
    }

    /// Source fields read by this suggestion, in the order they are wired.
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            MappingSuggestion::Direct { source_field, .. }
            | MappingSuggestion::Table { source_field, .. }
            | MappingSuggestion::DateConversion { source_field, .. }
            | MappingSuggestion::Split { source_field, .. } => vec![source_field.as_str()],
            MappingSuggestion::Conditional { source_field, .. } => source_field.as_deref().into_iter().collect(),
            MappingSuggestion::Concat { source_fields, .. } => source_fields.iter().map(String::as_str).collect(),
            MappingSuggestion::Static { .. } | MappingSuggestion::Skip { .. } | MappingSuggestion::Unrecognized { .. } => {
                Vec::new()
            }
        }
    }
}

/// The flat wire record of a suggestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSuggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,
    pub mapping_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionCase>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(alias = "static_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<RawSuggestion> for MappingSuggestion {
    fn from(raw: RawSuggestion) -> Self {
        let unrecognized = |raw: RawSuggestion, reason: &str| MappingSuggestion::Unrecognized {
            mapping_type: raw.mapping_type,
            target_field: raw.target_field,
            reason: reason.to_string(),
        };

        let Some(target_field) = raw.target_field.clone() else {
            if raw.mapping_type == "skip" {
                return MappingSuggestion::Skip {
                    target_field: None,
                    reason: raw.reason,
                };
            }
            return unrecognized(raw, "missing target_field");
        };

        match (raw.mapping_type.as_str(), raw.source_field.clone()) {
            ("direct", Some(source_field)) => MappingSuggestion::Direct {
                target_field,
                source_field,
            },
            ("static", _) => MappingSuggestion::Static {
                target_field,
                value: raw.value.unwrap_or(Value::Null),
            },
            ("conditional", source_field) => match raw.conditions {
                Some(conditions) if !conditions.is_empty() => MappingSuggestion::Conditional {
                    target_field,
                    source_field,
                    conditions,
                },
                _ => unrecognized(raw, "missing conditions"),
            },
            ("table", Some(source_field)) => match raw.table {
                Some(table) => MappingSuggestion::Table {
                    target_field,
                    source_field,
                    table,
                },
                None => unrecognized(raw, "missing table"),
            },
            ("date_conversion", Some(source_field)) => MappingSuggestion::DateConversion {
                target_field,
                source_field,
                format: raw.format.unwrap_or_default(),
            },
            ("concat", _) => match raw.source_fields {
                Some(source_fields) if !source_fields.is_empty() => MappingSuggestion::Concat {
                    target_field,
                    source_fields,
                    separator: raw.separator.unwrap_or_else(|| " ".to_string()),
                },
                _ => unrecognized(raw, "missing source_fields"),
            },
            ("split", Some(source_field)) => MappingSuggestion::Split {
                target_field,
                source_field,
                delimiter: raw.delimiter.unwrap_or_else(|| ",".to_string()),
                index: raw.index.unwrap_or(0),
            },
            ("skip", _) => MappingSuggestion::Skip {
                target_field: Some(target_field),
                reason: raw.reason,
            },
            ("direct" | "table" | "date_conversion" | "split", None) => unrecognized(raw, "missing source_field"),
            _ => unrecognized(raw, "unknown mapping_type"),
        }
    }
}

impl From<MappingSuggestion> for RawSuggestion {
    fn from(suggestion: MappingSuggestion) -> Self {
        let mapping_type = suggestion.mapping_type().to_string();
        let mut raw = RawSuggestion {
            mapping_type,
            ..Default::default()
        };
        match suggestion {
            MappingSuggestion::Direct {
                target_field,
                source_field,
            } => {
                raw.target_field = Some(target_field);
                raw.source_field = Some(source_field);
            }
            MappingSuggestion::Static { target_field, value } => {
                raw.target_field = Some(target_field);
                raw.value = Some(value);
            }
            MappingSuggestion::Conditional {
                target_field,
                source_field,
                conditions,
            } => {
                raw.target_field = Some(target_field);
                raw.source_field = source_field;
                raw.conditions = Some(conditions);
            }
            MappingSuggestion::Table {
                target_field,
                source_field,
                table,
            } => {
                raw.target_field = Some(target_field);
                raw.source_field = Some(source_field);
                raw.table = Some(table);
            }
            MappingSuggestion::DateConversion {
                target_field,
                source_field,
                format,
            } => {
                raw.target_field = Some(target_field);
                raw.source_field = Some(source_field);
                raw.format = Some(format);
            }
            MappingSuggestion::Concat {
                target_field,
                source_fields,
                separator,
            } => {
                raw.target_field = Some(target_field);
                raw.source_fields = Some(source_fields);
                raw.separator = Some(separator);
            }
            MappingSuggestion::Split {
                target_field,
                source_field,
                delimiter,
                index,
            } => {
                raw.target_field = Some(target_field);
                raw.source_field = Some(source_field);
                raw.delimiter = Some(delimiter);
                raw.index = Some(index);
            }
            MappingSuggestion::Skip { target_field, reason } => {
                raw.target_field = target_field;
                raw.reason = reason;
            }
            MappingSuggestion::Unrecognized {
                target_field, reason, ..
            } => {
                raw.target_field = target_field;
                raw.reason = Some(reason);
            }
        }
        raw
    }
}
