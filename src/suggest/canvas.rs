use super::suggestion::{ConditionCase, MappingSuggestion};
use crate::graph::{Edge, Graph, LayoutOptions, Node, Position, SchemaNodeData, ValueMapData};
use crate::rules::{
    ConcatParams, ConditionOperator, ConditionalParams, DateConversionParams, SplitParams, StaticEntry,
    StaticParams, TransformOp,
};
use crate::schema::{FieldType, SchemaField};
use ahash::AHashSet;
use serde_json::Value;
use tracing::{debug, warn};

/// Output handle of a suggested static-value node.
const STATIC_HANDLE: &str = "value";

/// A suggestion that produced nothing on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSuggestion {
    pub target_field: Option<String>,
    pub mapping_type: String,
    pub reason: String,
}

/// The graph built from a suggestion list plus the entries left out of it.
#[derive(Debug, Clone)]
pub struct CanvasConversion {
    pub graph: Graph,
    pub skipped: Vec<SkippedSuggestion>,
}

/// A trait for suggestion formats that can be turned into a canvas graph.
///
/// Implement it on your own suggestion structs to bootstrap a canvas from them.
pub trait IntoCanvas {
    /// Consumes the suggestions and lays them out as a canvas graph.
    fn into_canvas(self) -> CanvasConversion;
}

/// Suggestions together with the sample data and layout used to draw them.
#[derive(Debug, Clone, Default)]
pub struct SuggestionSet {
    suggestions: Vec<MappingSuggestion>,
    source_samples: Vec<Value>,
    layout: LayoutOptions,
}

impl SuggestionSet {
    pub fn new(suggestions: Vec<MappingSuggestion>) -> Self {
        Self {
            suggestions,
            ..Default::default()
        }
    }

    /// Sample source records used to infer source field types.
    pub fn with_samples(mut self, samples: Vec<Value>) -> Self {
        self.source_samples = samples;
        self
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    pub fn suggestions(&self) -> &[MappingSuggestion] {
        &self.suggestions
    }
}

impl IntoCanvas for SuggestionSet {
    fn into_canvas(self) -> CanvasConversion {
        let mut builder = CanvasBuilder::new(&self.source_samples);
        for suggestion in &self.suggestions {
            builder.add(suggestion);
        }
        builder.finish(&self.layout)
    }
}

/// Converts suggestions into a canvas graph without sample data.
pub fn convert_mappings_to_canvas(suggestions: &[MappingSuggestion], layout: &LayoutOptions) -> CanvasConversion {
    let mut builder = CanvasBuilder::new(&[]);
    for suggestion in suggestions {
        builder.add(suggestion);
    }
    builder.finish(layout)
}

struct CanvasBuilder<'a> {
    samples: &'a [Value],
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_ids: AHashSet<String>,
    edge_ids: AHashSet<String>,
    skipped: Vec<SkippedSuggestion>,
}

impl<'a> CanvasBuilder<'a> {
    fn new(samples: &'a [Value]) -> Self {
        Self {
            samples,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_ids: AHashSet::new(),
            edge_ids: AHashSet::new(),
            skipped: Vec::new(),
        }
    }

    fn add(&mut self, suggestion: &MappingSuggestion) {
        let target_field = match suggestion {
            MappingSuggestion::Skip { target_field, reason } => {
                debug!(target_field = ?target_field, "Suggestion skipped by the oracle");
                self.skip(suggestion, target_field.clone(), reason.clone().unwrap_or_else(|| "skip".to_string()));
                return;
            }
            MappingSuggestion::Unrecognized {
                mapping_type,
                target_field,
                reason,
            } => {
                warn!(mapping_type = %mapping_type, target_field = ?target_field, "Ignoring suggestion: {}", reason);
                self.skip(suggestion, target_field.clone(), reason.clone());
                return;
            }
            other => other.target_field().unwrap_or_default(),
        };

        let target = self.target_node(target_field);
        let (kind, op) = match suggestion {
            MappingSuggestion::Direct { source_field, .. } => {
                let source = self.source_node(source_field);
                self.connect(&source, Some(source_field), &target, Some(target_field));
                return;
            }
            MappingSuggestion::Static { value, .. } => (
                "static",
                TransformOp::Static(StaticParams {
                    values: vec![StaticEntry {
                        id: STATIC_HANDLE.to_string(),
                        value: value.clone(),
                    }],
                }),
            ),
            MappingSuggestion::Conditional { conditions, .. } => ("conditional", TransformOp::Conditional(conditional(conditions))),
            MappingSuggestion::Table {
                source_field, table, ..
            } => {
                let id = format!("table_{target_field}");
                self.push_node(Node::value_map(
                    id.clone(),
                    Position::default(),
                    ValueMapData {
                        label: format!("Lookup {target_field}"),
                        table: table.clone(),
                        source_field: Some(source_field.clone()),
                    },
                ));
                let source = self.source_node(source_field);
                self.connect(&source, Some(source_field), &id, None);
                self.connect(&id, None, &target, Some(target_field));
                return;
            }
            MappingSuggestion::DateConversion { format, .. } => (
                "date",
                TransformOp::DateConversion(DateConversionParams {
                    input_format: None,
                    output_format: format.clone(),
                }),
            ),
            MappingSuggestion::Concat {
                source_fields,
                separator,
                ..
            } => (
                "concat",
                TransformOp::Concat(ConcatParams {
                    source_fields: source_fields.clone(),
                    separator: separator.clone(),
                }),
            ),
            MappingSuggestion::Split { delimiter, index, .. } => (
                "split",
                TransformOp::Split(SplitParams {
                    delimiter: delimiter.clone(),
                    index: *index,
                }),
            ),
            MappingSuggestion::Skip { .. } | MappingSuggestion::Unrecognized { .. } => return,
        };

        let id = format!("{kind}_{target_field}");
        self.push_node(Node::transform(id.clone(), Position::default(), format!("{kind} {target_field}"), op));
        let mut inputs: Vec<String> = suggestion.source_fields().into_iter().map(str::to_string).collect();
        // A conditional without an explicit source reads the field its condition names.
        if let MappingSuggestion::Conditional { conditions, .. } = suggestion
            && inputs.is_empty()
        {
            inputs.extend(conditions.iter().find_map(|c| parse_condition(&c.condition)?.field));
        }
        for field in &inputs {
            let source = self.source_node(field);
            self.connect(&source, Some(field), &id, None);
        }
        let output = matches!(suggestion, MappingSuggestion::Static { .. }).then_some(STATIC_HANDLE);
        self.connect(&id, output, &target, Some(target_field));
    }

    fn skip(&mut self, suggestion: &MappingSuggestion, target_field: Option<String>, reason: String) {
        self.skipped.push(SkippedSuggestion {
            target_field,
            mapping_type: suggestion.mapping_type().to_string(),
            reason,
        });
    }

    fn source_node(&mut self, field: &str) -> String {
        let id = format!("source_{field}");
        if !self.node_ids.contains(&id) {
            let field_type = sample_value(self.samples, field).map(FieldType::infer).unwrap_or_default();
            let data = SchemaNodeData::new(field, vec![SchemaField::new(field, field_type)]);
            self.push_node(Node::source(id.clone(), Position::default(), data));
        }
        id
    }

    fn target_node(&mut self, field: &str) -> String {
        let id = format!("target_{field}");
        if !self.node_ids.contains(&id) {
            let data = SchemaNodeData::new(field, vec![SchemaField::new(field, FieldType::String)]);
            self.push_node(Node::target(id.clone(), Position::default(), data));
        }
        id
    }

    /// The first node with a given id wins.
    fn push_node(&mut self, node: Node) {
        if self.node_ids.insert(node.id.clone()) {
            self.nodes.push(node);
        }
    }

    fn connect(&mut self, source: &str, source_handle: Option<&str>, target: &str, target_handle: Option<&str>) {
        let id = format!("e_{source}_{target}");
        if !self.edge_ids.insert(id.clone()) {
            return;
        }
        let mut edge = Edge::new(id, source, target);
        edge.source_handle = source_handle.map(str::to_string);
        edge.target_handle = target_handle.map(str::to_string);
        self.edges.push(edge);
    }

    fn finish(mut self, layout: &LayoutOptions) -> CanvasConversion {
        layout.arrange(&mut self.nodes);
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            skipped = self.skipped.len(),
            "Converted suggestions to canvas"
        );
        CanvasConversion {
            graph: Graph::new(self.nodes, self.edges),
            skipped: self.skipped,
        }
    }
}

/// First non-null sample value of a (possibly dotted) field.
fn sample_value<'v>(samples: &'v [Value], field: &str) -> Option<&'v Value> {
    samples.iter().find_map(|record| {
        let value = record
            .get(field)
            .or_else(|| field.split('.').try_fold(record, |value, key| value.get(key)))?;
        (!value.is_null()).then_some(value)
    })
}

fn is_fallback(condition: &str) -> bool {
    matches!(condition.trim().to_ascii_lowercase().as_str(), "else" | "default" | "otherwise" | "")
}

/// Folds the suggested branches into a single conditional node.
///
/// The first real branch provides the comparison and the `then` value; the
/// fallback branch, if any, provides the `else` value.
fn conditional(cases: &[ConditionCase]) -> ConditionalParams {
    let mut params = ConditionalParams::default();
    if let Some(case) = cases.iter().find(|c| !is_fallback(&c.condition)) {
        if let Some(parsed) = parse_condition(&case.condition) {
            params.operator = parsed.operator;
            params.compare_value = parsed.value;
        }
        params.then_value = case.value.clone();
    }
    if let Some(case) = cases.iter().find(|c| is_fallback(&c.condition)) {
        params.else_value = case.value.clone();
    }
    params
}

/// A free-text condition split into its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCondition {
    pub field: Option<String>,
    pub operator: ConditionOperator,
    pub value: Value,
}

/// Parses `field <op> value` free text. Quoted values stay strings, bare numbers become numbers.
pub fn parse_condition(text: &str) -> Option<ParsedCondition> {
    const SYMBOLS: [&str; 9] = [">=", "<=", "!=", "<>", "==", ">", "<", "=", " contains "];
    let (position, symbol) = SYMBOLS
        .iter()
        .filter_map(|symbol| text.find(symbol).map(|p| (p, *symbol)))
        .min_by_key(|(p, symbol)| (*p, usize::MAX - symbol.len()))?;
    let operator = ConditionOperator::from_symbol(symbol.trim())?;
    let field = text[..position].trim();
    let raw = text[position + symbol.len()..].trim().trim_matches(|c| c == '\'' || c == '"');
    let value = raw
        .parse::<serde_json::Number>()
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(raw.to_string()));
    Some(ParsedCondition {
        field: (!field.is_empty()).then(|| field.to_string()),
        operator,
        value,
    })
}

