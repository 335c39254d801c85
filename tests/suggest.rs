//! Tests for AI-assisted canvas bootstrapping.
use async_trait::async_trait;
use fieldmap::error::OracleError;
use fieldmap::prelude::*;
use fieldmap::rules::{ConditionOperator, ConditionalParams};
use fieldmap::suggest::{
    ConditionCase, OracleOptions, Redactor, SuggestionClient, SuggestionOracle, parse_condition, parse_suggestions,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::result::Result;
use std::sync::Mutex;

fn suggestions(value: Value) -> Vec<MappingSuggestion> {
    serde_json::from_value(value).expect("suggestion fixture must parse")
}

fn sorted_ids(graph: &Graph) -> Vec<String> {
    let mut ids: Vec<String> = graph.nodes().iter().map(|n| n.id.clone()).collect();
    ids.sort();
    ids
}

fn edge_ids(graph: &Graph) -> Vec<&str> {
    graph.edges().iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn test_concat_suggestion_builds_expected_nodes() {
    let list = suggestions(json!([
        {
            "target_field": "fullname",
            "mapping_type": "concat",
            "source_fields": ["Roepnaam", "Achternaam"],
            "separator": " "
        }
    ]));

    let conversion = convert_mappings_to_canvas(&list, &LayoutOptions::default());
    let graph = &conversion.graph;

    assert_eq!(
        sorted_ids(graph),
        vec!["concat_fullname", "source_Achternaam", "source_Roepnaam", "target_fullname"]
    );
    assert_eq!(
        edge_ids(graph),
        vec![
            "e_source_Roepnaam_concat_fullname",
            "e_source_Achternaam_concat_fullname",
            "e_concat_fullname_target_fullname",
        ]
    );
    assert!(conversion.skipped.is_empty());

    let concat = graph.node("concat_fullname").unwrap();
    match &concat.kind {
        NodeKind::Transform {
            op: TransformOp::Concat(params),
            ..
        } => {
            assert_eq!(params.source_fields, vec!["Roepnaam", "Achternaam"]);
            assert_eq!(params.separator, " ");
        }
        other => panic!("Expected a concat transform, got {:?}", other),
    }

    let first = &graph.edges()[0];
    assert_eq!(first.source_handle(), Some("Roepnaam"));
    assert_eq!(first.target_handle(), None);
    assert_eq!(graph.edges()[2].target_handle(), Some("fullname"));
}

#[test]
fn test_skip_and_unknown_entries_produce_no_nodes() {
    let with_noise = suggestions(json!([
        { "target_field": "email", "mapping_type": "direct", "source_field": "mail" },
        { "target_field": "notes", "mapping_type": "skip", "reason": "no source" },
        { "target_field": "age", "mapping_type": "guess" },
        { "mapping_type": "direct", "source_field": "orphan" },
        { "target_field": "code", "mapping_type": "table", "source_field": "c" }
    ]));
    let clean = suggestions(json!([
        { "target_field": "email", "mapping_type": "direct", "source_field": "mail" }
    ]));

    let noisy = convert_mappings_to_canvas(&with_noise, &LayoutOptions::default());
    let expected = convert_mappings_to_canvas(&clean, &LayoutOptions::default());

    assert_eq!(noisy.graph, expected.graph);
    assert_eq!(sorted_ids(&noisy.graph), vec!["source_mail", "target_email"]);

    let reasons: Vec<(&str, &str)> = noisy
        .skipped
        .iter()
        .map(|s| (s.mapping_type.as_str(), s.reason.as_str()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("skip", "no source"),
            ("guess", "unknown mapping_type"),
            ("direct", "missing target_field"),
            ("table", "missing table"),
        ]
    );
    assert_eq!(noisy.skipped[0].target_field.as_deref(), Some("notes"));
}

#[test]
fn test_conversion_is_order_independent_as_a_set() {
    let list = suggestions(json!([
        { "target_field": "a", "mapping_type": "direct", "source_field": "x" },
        { "target_field": "b", "mapping_type": "static", "value": 3 },
        { "target_field": "c", "mapping_type": "split", "source_field": "x", "delimiter": "-", "index": 1 }
    ]));
    let mut reversed = list.clone();
    reversed.reverse();

    let forward = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;
    let backward = convert_mappings_to_canvas(&reversed, &LayoutOptions::default()).graph;

    assert_eq!(sorted_ids(&forward), sorted_ids(&backward));
    let mut forward_edges = edge_ids(&forward);
    let mut backward_edges = edge_ids(&backward);
    forward_edges.sort();
    backward_edges.sort();
    assert_eq!(forward_edges, backward_edges);
}

#[test]
fn test_shared_fields_are_deduplicated() {
    let list = suggestions(json!([
        { "target_field": "first", "mapping_type": "split", "source_field": "name", "delimiter": " ", "index": 0 },
        { "target_field": "last", "mapping_type": "split", "source_field": "name", "delimiter": " ", "index": 1 },
        { "target_field": "last", "mapping_type": "direct", "source_field": "surname" }
    ]));

    let graph = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;

    assert_eq!(
        sorted_ids(&graph),
        vec!["source_name", "source_surname", "split_first", "split_last", "target_first", "target_last"]
    );
    let source_nodes = graph.nodes().iter().filter(|n| n.id == "source_name").count();
    assert_eq!(source_nodes, 1);
    assert_eq!(graph.incoming("target_last").count(), 2);
}

#[test]
fn test_nodes_are_laid_out_in_columns() {
    let list = suggestions(json!([
        { "target_field": "status", "mapping_type": "static", "value": "new" },
        { "target_field": "email", "mapping_type": "direct", "source_field": "mail" },
        { "target_field": "phone", "mapping_type": "direct", "source_field": "tel" }
    ]));

    let graph = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;

    for node in graph.nodes() {
        let expected_x = match node.kind {
            NodeKind::Source(_) => 100.0,
            NodeKind::Target(_) => 700.0,
            _ => 400.0,
        };
        assert_eq!(node.position.x, expected_x, "Node {} is in the wrong column", node.id);
    }
    assert_eq!(graph.node("source_mail").unwrap().position, Position::new(100.0, 100.0));
    assert_eq!(graph.node("source_tel").unwrap().position, Position::new(100.0, 200.0));
    assert_eq!(graph.node("target_phone").unwrap().position, Position::new(700.0, 300.0));

    let custom = LayoutOptions {
        source_x: 0.0,
        top: 0.0,
        ..Default::default()
    };
    let graph = convert_mappings_to_canvas(&list, &custom).graph;
    assert_eq!(graph.node("source_mail").unwrap().position, Position::new(0.0, 0.0));
}

#[test]
fn test_static_node_feeds_target_through_value_handle() {
    let list = suggestions(json!([
        { "target_field": "country", "mapping_type": "static", "static_value": "NL" }
    ]));

    let graph = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;
    let edge = &graph.edges()[0];
    assert_eq!(edge.id, "e_static_country_target_country");
    assert_eq!(edge.source_handle(), Some("value"));

    // The canvas compiles straight into a fixed rule.
    let (execution, warnings) = Exporter::builder().build().export_execution(&graph);
    assert!(warnings.is_empty());
    assert_eq!(execution.mappings, vec![ExecutionMapping::fixed("country", json!("NL"))]);
}

#[test]
fn test_samples_drive_source_field_types() {
    let list = suggestions(json!([
        { "target_field": "age", "mapping_type": "direct", "source_field": "age" },
        { "target_field": "city", "mapping_type": "direct", "source_field": "address.city" },
        { "target_field": "vip", "mapping_type": "direct", "source_field": "vip" }
    ]));
    let samples = vec![
        json!({ "age": null, "vip": true }),
        json!({ "age": 41, "address": { "city": "Utrecht" } }),
    ];

    let conversion = SuggestionSet::new(list).with_samples(samples).into_canvas();
    let field_type = |id: &str| conversion.graph.node(id).unwrap().kind.schema().unwrap().fields[0].field_type;

    assert_eq!(field_type("source_age"), FieldType::Number);
    assert_eq!(field_type("source_address.city"), FieldType::String);
    assert_eq!(field_type("source_vip"), FieldType::Boolean);
    assert_eq!(field_type("target_age"), FieldType::String);
}

#[test]
fn test_conditional_suggestion_uses_parsed_condition() {
    let list = suggestions(json!([
        {
            "target_field": "active",
            "mapping_type": "conditional",
            "conditions": [
                { "condition": "Status == 'A'", "value": true },
                { "condition": "else", "value": false }
            ]
        }
    ]));

    let graph = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;

    match &graph.node("conditional_active").unwrap().kind {
        NodeKind::Transform {
            op: TransformOp::Conditional(params),
            ..
        } => assert_eq!(
            params,
            &ConditionalParams {
                operator: ConditionOperator::Equals,
                compare_value: json!("A"),
                then_value: json!(true),
                else_value: json!(false),
            }
        ),
        other => panic!("Expected a conditional transform, got {:?}", other),
    }
    // No explicit source field, so the field named in the condition is wired in.
    assert!(graph.contains_node("source_Status"));
    assert_eq!(edge_ids(&graph)[0], "e_source_Status_conditional_active");
}

#[test]
fn test_parse_condition_variants() {
    let parsed = parse_condition("amount >= 100").unwrap();
    assert_eq!(parsed.field.as_deref(), Some("amount"));
    assert_eq!(parsed.operator, ConditionOperator::GreaterOrEqual);
    assert_eq!(parsed.value, json!(100));

    let parsed = parse_condition("code != \"X1\"").unwrap();
    assert_eq!(parsed.operator, ConditionOperator::NotEquals);
    assert_eq!(parsed.value, json!("X1"));

    let parsed = parse_condition("= 2.5").unwrap();
    assert_eq!(parsed.field, None);
    assert_eq!(parsed.operator, ConditionOperator::Equals);
    assert_eq!(parsed.value, json!(2.5));

    let parsed = parse_condition("Name contains 'x'").unwrap();
    assert_eq!(parsed.field.as_deref(), Some("Name"));
    assert_eq!(parsed.operator, ConditionOperator::Contains);
    assert_eq!(parsed.value, json!("x"));

    assert_eq!(parse_condition("looks fine"), None);
}

#[test]
fn test_table_suggestion_builds_lookup() {
    let list = suggestions(json!([
        { "target_field": "country", "mapping_type": "table", "source_field": "cc", "table": { "NL": "Netherlands" } }
    ]));

    let graph = convert_mappings_to_canvas(&list, &LayoutOptions::default()).graph;
    let (execution, _) = Exporter::builder().build().export_execution(&graph);

    assert_eq!(
        execution.mappings,
        vec![ExecutionMapping::lookup(
            "cc",
            "country",
            BTreeMap::from([("NL".to_string(), "Netherlands".to_string())]),
            None
        )]
    );
}

#[test]
fn test_suggestion_wire_defaults() {
    let list = suggestions(json!([
        { "target_field": "name", "mapping_type": "concat", "source_fields": ["a", "b"] },
        { "target_field": "part", "mapping_type": "split", "source_field": "s" }
    ]));
    assert_eq!(
        list,
        vec![
            MappingSuggestion::Concat {
                target_field: "name".to_string(),
                source_fields: vec!["a".to_string(), "b".to_string()],
                separator: " ".to_string(),
            },
            MappingSuggestion::Split {
                target_field: "part".to_string(),
                source_field: "s".to_string(),
                delimiter: ",".to_string(),
                index: 0,
            },
        ]
    );
}

#[test]
fn test_parse_suggestions_from_free_text() {
    let text = "Here are the mappings:\n```json\n[{\"target_field\": \"a\", \"mapping_type\": \"direct\", \"source_field\": \"b\"}]\n```\nLet me know.";
    let parsed = parse_suggestions(text).unwrap();
    assert_eq!(
        parsed,
        vec![MappingSuggestion::Direct {
            target_field: "a".to_string(),
            source_field: "b".to_string(),
        }]
    );

    assert_eq!(parse_suggestions("no mappings today"), Err(OracleError::MissingArray));
    assert_eq!(parse_suggestions("] backwards ["), Err(OracleError::MissingArray));
    assert!(matches!(parse_suggestions("[{\"target_field\": ]"), Err(OracleError::MalformedJson(_))));
}

/// An oracle that records its prompts and answers with a canned response.
struct FakeOracle {
    response: Result<String, OracleError>,
    prompts: Mutex<Vec<String>>,
}

impl FakeOracle {
    fn answering(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(OracleError::Transport(message.to_string())),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SuggestionOracle for FakeOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone()
    }
}

struct DropEmail;

impl Redactor for DropEmail {
    fn redact(&self, record: &Value) -> Value {
        let mut record = record.clone();
        if let Some(map) = record.as_object_mut() {
            map.remove("email");
        }
        record
    }
}

fn records(count: usize) -> Vec<Value> {
    (0..count).map(|i| json!({ "id": i, "email": format!("user{}@example.com", i) })).collect()
}

#[test]
fn test_request_caps_and_redacts_samples() {
    let client = SuggestionClient::builder(FakeOracle::answering("[]"))
        .redactor(DropEmail)
        .build();

    let request = client.request(&records(8), &records(2)).unwrap();

    assert_eq!(request.source_data.len(), OracleOptions::default().sample_limit);
    assert_eq!(request.target_data.len(), 2);
    assert!(request.source_data.iter().all(|r| r.get("email").is_none()));
    assert_eq!(request.source_data[4], json!({ "id": 4 }));

    let wire = serde_json::to_value(&request).unwrap();
    assert!(wire.get("sourceData").is_some());
    assert!(wire.get("targetData").is_some());
}

#[test]
fn test_request_rejects_empty_samples() {
    let client = SuggestionClient::builder(FakeOracle::answering("[]")).build();

    assert_eq!(client.request(&[], &records(1)), Err(OracleError::EmptySamples("source")));
    assert_eq!(client.request(&records(1), &[]), Err(OracleError::EmptySamples("target")));
}

#[test]
fn test_suggest_round_trip_through_oracle() {
    let oracle = FakeOracle::answering(
        r#"Sure! [{"target_field": "customerId", "mapping_type": "direct", "source_field": "id"},
                  {"target_field": "notes", "mapping_type": "skip"}]"#,
    );
    let client = SuggestionClient::builder(oracle).sample_limit(1).build();

    let response = tokio_test::block_on(client.suggest(&records(3), &[json!({ "customerId": 1 })])).unwrap();

    assert_eq!(response.mappings.len(), 2);
    assert_eq!(response.mappings[0].target_field(), Some("customerId"));
    assert_eq!(response.mappings[1].mapping_type(), "skip");

    let conversion = SuggestionSet::new(response.mappings).into_canvas();
    assert_eq!(conversion.graph.nodes().len(), 2);
    assert_eq!(conversion.skipped.len(), 1);
}

#[test]
fn test_prompt_carries_samples_and_mapping_types() {
    let client = SuggestionClient::builder(FakeOracle::answering("[]")).sample_limit(2).build();
    let request = client.request(&records(3), &[json!({ "fullName": "A B" })]).unwrap();

    let prompt = fieldmap::suggest::build_prompt(&request);

    assert!(prompt.contains("user1@example.com"));
    assert!(!prompt.contains("user2@example.com"));
    assert!(prompt.contains("fullName"));
    for mapping_type in ["direct", "static", "conditional", "table", "date_conversion", "concat", "split", "skip"] {
        assert!(prompt.contains(mapping_type), "Prompt does not mention '{}'", mapping_type);
    }
}

#[test]
fn test_oracle_failures_are_fatal_for_the_request() {
    let client = SuggestionClient::builder(FakeOracle::failing("timeout")).build();
    let result = tokio_test::block_on(client.suggest(&records(1), &records(1)));
    assert_eq!(result.unwrap_err(), OracleError::Transport("timeout".to_string()));

    let client = SuggestionClient::builder(FakeOracle::answering("I cannot help with that.")).build();
    let result = tokio_test::block_on(client.suggest(&records(1), &records(1)));
    assert_eq!(result.unwrap_err(), OracleError::MissingArray);
}

#[test]
fn test_suggestion_cases_serialize_flat() {
    let suggestion = MappingSuggestion::Conditional {
        target_field: "active".to_string(),
        source_field: Some("status".to_string()),
        conditions: vec![ConditionCase {
            condition: "status == 'A'".to_string(),
            value: json!(true),
        }],
    };
    let wire = serde_json::to_value(&suggestion).unwrap();
    assert_eq!(
        wire,
        json!({
            "target_field": "active",
            "mapping_type": "conditional",
            "source_field": "status",
            "conditions": [ { "condition": "status == 'A'", "value": true } ]
        })
    );
}
