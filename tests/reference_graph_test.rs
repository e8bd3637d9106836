//! In-document references, graph closure and node lookup.

mod common;

use serde_json::json;
use validate_json::{ConstraintGraph, Pointer, Schema, SchemaError, events};

use crate::common::{accepts, compile};

#[test]
fn test_root_reference_recurses() {
    let schema = compile(json!({
        "properties": { "foo": { "$ref": "#" } },
        "additionalProperties": false
    }));

    assert!(accepts(&schema, &json!({ "foo": false })));
    assert!(accepts(&schema, &json!({ "foo": { "foo": false } })));
    assert!(!accepts(&schema, &json!({ "bar": false })));
    assert!(!accepts(&schema, &json!({ "foo": { "bar": false } })));
}

#[test]
fn test_definitions_reference() {
    let schema = compile(json!({
        "definitions": { "positive": { "type": "integer", "minimum": 1 } },
        "items": { "$ref": "#/definitions/positive" }
    }));

    assert!(accepts(&schema, &json!([1, 2, 3])));
    assert!(!accepts(&schema, &json!([1, 0])));
    assert!(!accepts(&schema, &json!([1.5])));
}

#[test]
fn test_escaped_pointer_references() {
    let schema = compile(json!({
        "tilda~field": { "type": "integer" },
        "slash/field": { "type": "integer" },
        "percent%field": { "type": "integer" },
        "properties": {
            "tilda": { "$ref": "#/tilda~0field" },
            "slash": { "$ref": "#/slash~1field" },
            "percent": { "$ref": "#/percent%25field" }
        }
    }));

    assert!(accepts(&schema, &json!({ "tilda": 1, "slash": 2, "percent": 3 })));
    assert!(!accepts(&schema, &json!({ "tilda": "a" })));
    assert!(!accepts(&schema, &json!({ "slash": "a" })));
    assert!(!accepts(&schema, &json!({ "percent": "a" })));
}

#[test]
fn test_root_reference_object_hides_its_other_members() {
    let result = Schema::new(json!({
        "definitions": { "a": { "type": "integer" } },
        "$ref": "#/definitions/a"
    }));
    assert!(matches!(result, Err(SchemaError::InvalidReference { .. })));
}

#[test]
fn test_reference_chain() {
    let schema = compile(json!({
        "definitions": {
            "a": { "type": "integer" },
            "b": { "$ref": "#/definitions/a" },
            "c": { "$ref": "#/definitions/b" }
        },
        "items": { "$ref": "#/definitions/c" }
    }));

    assert!(accepts(&schema, &json!([5])));
    assert!(!accepts(&schema, &json!([5, "a"])));
}

#[test]
fn test_reference_into_an_aliased_definition() {
    let schema = compile(json!({
        "definitions": {
            "a": { "$ref": "#/definitions/b" },
            "b": { "properties": { "x": { "type": "string" } }, "anyOf": [{ "type": "object" }] }
        },
        "properties": {
            "y": { "$ref": "#/definitions/a/properties/x" },
            "z": { "$ref": "#/definitions/a/anyOf/0" }
        }
    }));

    assert!(accepts(&schema, &json!({ "y": "text", "z": {} })));
    assert!(!accepts(&schema, &json!({ "y": 1 })));
    assert!(!accepts(&schema, &json!({ "z": [] })));
}

#[test]
fn test_mutually_recursive_definitions() {
    let schema = compile(json!({
        "definitions": {
            "tree": {
                "type": "object",
                "required": ["value"],
                "properties": {
                    "value": { "type": "number" },
                    "children": { "$ref": "#/definitions/forest" }
                }
            },
            "forest": { "type": "array", "items": { "$ref": "#/definitions/tree" } }
        },
        "allOf": [{ "$ref": "#/definitions/tree" }]
    }));

    let tree = json!({
        "value": 1,
        "children": [
            { "value": 2, "children": [] },
            { "value": 3, "children": [{ "value": 4 }] }
        ]
    });
    assert!(accepts(&schema, &tree));

    let broken = json!({
        "value": 1,
        "children": [{ "value": 2, "children": [{ "children": [] }] }]
    });
    assert!(!accepts(&schema, &broken));
}

#[test]
fn test_graph_has_one_node_per_canonical_position() {
    let graph = ConstraintGraph::build(json!({
        "definitions": { "name": { "type": "string" } },
        "properties": {
            "first": { "$ref": "#/definitions/name" },
            "last": { "$ref": "#/definitions/name" }
        }
    }))
    .unwrap();

    let first = graph.lookup(&Pointer::parse("/properties/first").unwrap());
    let last = graph.lookup(&Pointer::parse("/properties/last").unwrap());
    let target = graph.lookup(&Pointer::parse("/definitions/name").unwrap());
    assert!(first.is_some());
    assert_eq!(first, last);
    assert_eq!(first, target);
}

#[test]
fn test_session_for_subschema() {
    let schema = compile(json!({
        "definitions": { "port": { "type": "integer", "minimum": 1, "maximum": 65535 } },
        "properties": { "port": { "$ref": "#/definitions/port" } }
    }));
    let position = Pointer::parse("/properties/port").unwrap();

    let mut session = schema.graph().session(&position).unwrap();
    events::from_str("8080", &mut session).unwrap();
    assert!(session.finalize());

    let mut session = schema.graph().session(&position).unwrap();
    events::from_str("70000", &mut session).unwrap();
    assert!(!session.is_match());
    assert!(!session.finalize());

    let missing = Pointer::parse("/properties/host").unwrap();
    assert!(schema.graph().session(&missing).is_err());
}

#[test]
fn test_invalid_references_fail_the_build() {
    let unresolvable = Schema::new(json!({ "items": { "$ref": "#/definitions/missing" } }));
    assert!(matches!(
        unresolvable,
        Err(SchemaError::InvalidReference { .. })
    ));

    let cycle = Schema::new(json!({
        "definitions": {
            "a": { "$ref": "#/definitions/b" },
            "b": { "$ref": "#/definitions/a" }
        }
    }));
    assert!(matches!(cycle, Err(SchemaError::InvalidReference { .. })));
}

#[test]
fn test_in_place_cycles_are_rejected() {
    let result = Schema::new(json!({
        "definitions": { "loop": { "allOf": [{ "$ref": "#/definitions/loop" }] } }
    }));
    assert!(matches!(result, Err(SchemaError::NonDescendingCycle { .. })));

    // the same recursion through a property descends into the value
    let nested = Schema::new(json!({
        "definitions": {
            "node": { "properties": { "next": { "allOf": [{ "$ref": "#/definitions/node" }] } } }
        },
        "allOf": [{ "$ref": "#/definitions/node" }]
    }));
    assert!(nested.is_ok());
}

#[test]
fn test_remote_reference_is_ignored() {
    let schema = compile(json!({
        "properties": { "a": { "$ref": "http://example.com/schema.json", "type": "string" } }
    }));
    assert!(accepts(&schema, &json!({ "a": "text" })));
    assert!(!accepts(&schema, &json!({ "a": 1 })));
}
