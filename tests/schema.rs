//! Tests for schema field trees, array configuration and settings.
use fieldmap::error::{SchemaError, SettingsError};
use fieldmap::prelude::*;
use fieldmap::schema::{
    collect_array_configs, find_field, reconstruct_fields, strip_array_indices, validate_fields, walk_fields,
};
use fieldmap::settings::Settings;
use serde_json::json;

fn order_fields() -> Vec<SchemaField> {
    vec![
        SchemaField::new("id", FieldType::Number),
        SchemaField::new("customer", FieldType::Object).with_children(vec![
            SchemaField::new("name", FieldType::String).with_id("customer.name"),
            SchemaField::new("address", FieldType::Object)
                .with_id("customer.address")
                .with_children(vec![SchemaField::new("city", FieldType::String).with_id("customer.address.city")]),
        ]),
        SchemaField::new("lines", FieldType::Array)
            .with_group_by("sku")
            .with_children(vec![
                SchemaField::new("sku", FieldType::String).with_id("lines.sku"),
                SchemaField::new("qty", FieldType::Number).with_id("lines.qty"),
            ]),
    ]
}

#[test]
fn test_field_wire_format() {
    let field: SchemaField = serde_json::from_value(json!({
        "id": "lines", "name": "lines", "type": "array", "group_by": "sku",
        "children": [ { "id": "lines.sku", "name": "sku", "type": "string" } ]
    }))
    .unwrap();
    assert_eq!(field.group_by.as_deref(), Some("sku"));

    let wire = serde_json::to_value(SchemaField::new("name", FieldType::String)).unwrap();
    assert_eq!(wire, json!({ "id": "name", "name": "name", "type": "string" }));

    let wire = serde_json::to_value(&field).unwrap();
    assert_eq!(wire["groupBy"], "sku");
}

#[test]
fn test_container_fields_start_with_children() {
    assert_eq!(SchemaField::new("tags", FieldType::Array).children, Some(vec![]));
    assert_eq!(SchemaField::new("name", FieldType::String).children, None);
    assert!(validate_fields(&order_fields()).is_ok());
}

#[test]
fn test_validate_shape_errors() {
    let mut missing = SchemaField::new("customer", FieldType::Object);
    missing.children = None;
    assert_eq!(
        missing.validate(),
        Err(SchemaError::MissingChildren {
            field_id: "customer".to_string(),
            field_type: "object".to_string(),
        })
    );

    let unexpected = SchemaField::new("name", FieldType::String).with_children(vec![]);
    assert!(matches!(unexpected.validate(), Err(SchemaError::UnexpectedChildren { .. })));

    let grouped = SchemaField::new("name", FieldType::String).with_group_by("x");
    assert_eq!(
        grouped.validate(),
        Err(SchemaError::GroupByOnNonArray {
            field_id: "name".to_string()
        })
    );

    let unknown = SchemaField::new("lines", FieldType::Array)
        .with_group_by("sku")
        .with_children(vec![SchemaField::new("qty", FieldType::Number).with_id("lines.qty")]);
    assert_eq!(
        unknown.validate(),
        Err(SchemaError::UnknownGroupBy {
            field_id: "lines".to_string(),
            group_by: "sku".to_string(),
        })
    );

    // Errors deep in the tree surface too.
    let nested = vec![SchemaField::new("customer", FieldType::Object).with_children(vec![grouped])];
    assert!(matches!(validate_fields(&nested), Err(SchemaError::GroupByOnNonArray { .. })));
}

#[test]
fn test_walk_fields_is_depth_first_pre_order() {
    let fields = order_fields();
    let ids: Vec<&str> = walk_fields(&fields).map(|f| f.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "id",
            "customer",
            "customer.name",
            "customer.address",
            "customer.address.city",
            "lines",
            "lines.sku",
            "lines.qty",
        ]
    );
}

#[test]
fn test_find_field_by_handle() {
    let fields = order_fields();
    assert_eq!(find_field(&fields, "customer.address.city").unwrap().name, "city");
    assert_eq!(find_field(&fields, "lines[3].qty").unwrap().id, "lines.qty");
    assert!(find_field(&fields, "lines.price").is_none());
    assert!(find_field(&fields, "city").is_none());
}

#[test]
fn test_strip_array_indices() {
    assert_eq!(strip_array_indices("items[2].address.city"), "items.address.city");
    assert_eq!(strip_array_indices("a[0][1].b"), "a.b");
    assert_eq!(strip_array_indices("plain"), "plain");
}

#[test]
fn test_reconstruct_fields_restores_group_by() {
    let mut fields = order_fields();
    fields[2].group_by = None;
    let nested = SchemaField::new("batches", FieldType::Array)
        .with_id("lines.batches")
        .with_group_by("stale")
        .with_children(vec![SchemaField::new("code", FieldType::String).with_id("lines.batches.code")]);
    fields[2].children.as_mut().unwrap().push(nested);

    let configs = vec![ArrayConfig::new("lines", Some("sku".to_string()))];
    let rebuilt = reconstruct_fields(&fields, &configs);

    assert_eq!(rebuilt[2].group_by.as_deref(), Some("sku"));
    // An array with no configuration entry loses its stale groupBy.
    let batches = find_field(&rebuilt, "lines.batches").unwrap();
    assert_eq!(batches.group_by, None);
    // Everything else is untouched.
    assert_eq!(rebuilt[0], fields[0]);
    assert_eq!(rebuilt[1], fields[1]);
}

#[test]
fn test_reconstruct_keeps_group_by_on_non_arrays() {
    let mut field = SchemaField::new("note", FieldType::String);
    field.group_by = Some("x".to_string());

    let rebuilt = reconstruct_fields(&[field.clone()], &[]);
    assert_eq!(rebuilt, vec![field]);
}

#[test]
fn test_collect_array_configs() {
    let configs = collect_array_configs(&order_fields());
    assert_eq!(configs, vec![ArrayConfig::new("lines", Some("sku".to_string()))]);

    let wire = serde_json::to_value(&configs[0]).unwrap();
    assert_eq!(wire, json!({ "target": "lines", "groupBy": "sku" }));
}

#[test]
fn test_infer_field_types() {
    assert_eq!(FieldType::infer(&json!(1.5)), FieldType::Number);
    assert_eq!(FieldType::infer(&json!(false)), FieldType::Boolean);
    assert_eq!(FieldType::infer(&json!([1])), FieldType::Array);
    assert_eq!(FieldType::infer(&json!({})), FieldType::Object);
    assert_eq!(FieldType::infer(&json!("2024-01-01")), FieldType::String);
    assert_eq!(FieldType::infer(&json!(null)), FieldType::String);
}

#[test]
fn test_settings_fill_missing_sections() {
    let settings = Settings::from_json(r#"{ "export": { "maxResolveDepth": 8 }, "oracle": { "sampleLimit": 2 } }"#).unwrap();

    assert_eq!(settings.export.max_resolve_depth, 8);
    assert_eq!(settings.export.default_version, "1.0");
    assert_eq!(settings.oracle.sample_limit, 2);
    assert_eq!(settings.layout, LayoutOptions::default());
    assert_eq!(settings.store.bootstrap_version, "1.0");

    assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
}

#[test]
fn test_settings_file_errors() {
    let missing = Settings::from_file("/nonexistent/fieldmap-settings.json");
    assert!(matches!(missing, Err(SettingsError::Read { .. })));

    let path = std::env::temp_dir().join(format!("fieldmap-settings-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();
    let broken = Settings::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(broken, Err(SettingsError::Parse { .. })));
}

#[test]
fn test_settings_drive_the_exporter() {
    let settings = Settings::from_json(r#"{ "export": { "defaultVersion": "0.9" } }"#).unwrap();
    let (execution, _) = Exporter::builder()
        .options(settings.export)
        .build()
        .export_execution(&Graph::default());
    assert_eq!(execution.version.as_deref(), Some("0.9"));
    assert!(execution.mappings.is_empty());
}
