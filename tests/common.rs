//! Common test utilities for building canvases and configurations.
use fieldmap::prelude::*;
use serde_json::json;

/// A canvas exercising every origin the exporter resolves.
///
/// Logic:
/// - `id` -> `customerId` (direct)
/// - constant `CRM` -> `source` (static)
/// - `status == "A"` -> `active` (ifThen)
/// - uppercase(`country`) looked up in a table -> `countryName` (map)
/// - second word of `full` looked up in a table -> `lastName` (map)
/// - `items[0].sku` -> `lines.sku` (direct, indexed handle)
#[allow(dead_code)]
pub fn customer_canvas_json() -> serde_json::Value {
    json!({
        "nodes": [
            {
                "id": "src",
                "type": "source",
                "position": { "x": 0.0, "y": 0.0 },
                "data": {
                    "label": "Customers",
                    "fields": [
                        { "id": "id", "name": "id", "type": "number" },
                        { "id": "status", "name": "status", "type": "string" },
                        { "id": "country", "name": "country", "type": "string" },
                        { "id": "full", "name": "full", "type": "string" },
                        {
                            "id": "items", "name": "items", "type": "array",
                            "children": [ { "id": "items.sku", "name": "sku", "type": "string" } ]
                        }
                    ],
                    "expandedFields": ["items"]
                }
            },
            {
                "id": "tgt",
                "type": "target",
                "position": { "x": 900.0, "y": 0.0 },
                "data": {
                    "label": "Contacts",
                    "fields": [
                        { "id": "customerId", "name": "customerId", "type": "number" },
                        { "id": "source", "name": "source", "type": "string" },
                        { "id": "active", "name": "active", "type": "boolean" },
                        { "id": "countryName", "name": "countryName", "type": "string" },
                        { "id": "lastName", "name": "lastName", "type": "string" },
                        {
                            "id": "lines", "name": "lines", "type": "array", "groupBy": "sku",
                            "children": [ { "id": "lines.sku", "name": "sku", "type": "string" } ]
                        }
                    ]
                }
            },
            {
                "id": "static1",
                "type": "staticValue",
                "position": { "x": 300.0, "y": 0.0 },
                "data": { "label": "Constants", "values": [ { "id": "crm", "value": "CRM" }, { "id": "v", "value": 2 } ] }
            },
            {
                "id": "cond1",
                "type": "ifThen",
                "position": { "x": 300.0, "y": 100.0 },
                "data": {
                    "label": "Active?",
                    "config": { "parameters": { "operator": "equals", "compareValue": "A", "thenValue": true, "elseValue": false } }
                }
            },
            {
                "id": "upper1",
                "type": "transform",
                "position": { "x": 300.0, "y": 200.0 },
                "data": { "label": "Upper", "stringOperation": "uppercase" }
            },
            {
                "id": "split1",
                "type": "splitterTransform",
                "position": { "x": 300.0, "y": 300.0 },
                "data": { "label": "Last name", "delimiter": " ", "index": "1" }
            },
            {
                "id": "table1",
                "type": "conversionMapping",
                "position": { "x": 600.0, "y": 200.0 },
                "data": { "label": "Countries", "table": { "NL": "Netherlands", "BE": "Belgium" } }
            },
            {
                "id": "table2",
                "type": "conversionMapping",
                "position": { "x": 600.0, "y": 300.0 },
                "data": { "label": "Surnames", "table": [ { "from": "jansen", "to": "Jansen" } ] }
            }
        ],
        "edges": [
            { "id": "e1", "source": "src", "sourceHandle": "id", "target": "tgt", "targetHandle": "customerId" },
            { "id": "e2", "source": "static1", "sourceHandle": "crm", "target": "tgt", "targetHandle": "source" },
            { "id": "e3", "source": "src", "sourceHandle": "status", "target": "cond1" },
            { "id": "e4", "source": "cond1", "target": "tgt", "targetHandle": "active" },
            { "id": "e5", "source": "src", "sourceHandle": "country", "target": "upper1" },
            { "id": "e6", "source": "upper1", "target": "table1" },
            { "id": "e7", "source": "table1", "target": "tgt", "targetHandle": "countryName" },
            { "id": "e8", "source": "src", "sourceHandle": "full", "target": "split1" },
            { "id": "e9", "source": "split1", "target": "table2" },
            { "id": "e10", "source": "table2", "target": "tgt", "targetHandle": "lastName" },
            { "id": "e11", "source": "src", "sourceHandle": "items[0].sku", "target": "tgt", "targetHandle": "lines.sku" }
        ]
    })
}

#[allow(dead_code)]
pub fn customer_canvas() -> Graph {
    serde_json::from_value(customer_canvas_json()).expect("fixture canvas must parse")
}

/// A minimal one-edge canvas: `name` -> `fullName`.
#[allow(dead_code)]
pub fn simple_canvas() -> Graph {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "s", "type": "source", "data": { "label": "In", "fields": [ { "id": "name", "name": "name", "type": "string" } ] } },
            { "id": "t", "type": "target", "data": { "label": "Out", "fields": [ { "id": "fullName", "name": "fullName", "type": "string" } ] } }
        ],
        "edges": [
            { "id": "e1", "source": "s", "sourceHandle": "name", "target": "t", "targetHandle": "fullName" }
        ]
    }))
    .expect("fixture canvas must parse")
}

/// UI and execution configurations of [`simple_canvas`] under a given name.
#[allow(dead_code)]
pub fn simple_configs(name: &str) -> (MappingConfiguration, ExecutionMappingConfig) {
    let output = Exporter::builder().name(name).build().export(&simple_canvas());
    (output.ui, output.execution)
}

#[allow(dead_code)]
pub fn edge(id: &str, source: &str, source_handle: Option<&str>, target: &str, target_handle: Option<&str>) -> Edge {
    let mut edge = Edge::new(id, source, target);
    if let Some(handle) = source_handle {
        edge = edge.with_source_handle(handle);
    }
    if let Some(handle) = target_handle {
        edge = edge.with_target_handle(handle);
    }
    edge
}
