use divan::Bencher;
use serde_json::{Value, json};
use validate_json::{Schema, ValidationEngine};

fn main() {
    divan::main();
}

fn product_schema() -> Value {
    json!({
        "definitions": {
            "price": { "type": "number", "minimum": 0, "exclusiveMinimum": true }
        },
        "type": "object",
        "required": ["id", "name", "price"],
        "properties": {
            "id": { "type": "integer", "minimum": 1 },
            "name": { "type": "string", "minLength": 1, "maxLength": 64 },
            "price": { "$ref": "#/definitions/price" },
            "tags": { "type": "array", "items": { "type": "string" }, "uniqueItems": true },
            "status": { "enum": ["draft", "published", "retired"] },
            "dimensions": {
                "type": "object",
                "properties": {
                    "width": { "type": "number" },
                    "height": { "type": "number" }
                },
                "additionalProperties": false
            }
        },
        "additionalProperties": false
    })
}

const VALID_JSON: &str = r#"{
    "id": 42,
    "name": "Walnut desk",
    "price": 349.5,
    "tags": ["furniture", "office", "wood"],
    "status": "published",
    "dimensions": { "width": 140, "height": 75.5 }
}"#;

const INVALID_JSON: &str = r#"{
    "id": 42,
    "name": "Walnut desk",
    "price": 0,
    "tags": ["furniture", "furniture"],
    "status": "sold"
}"#;

#[divan::bench]
fn compile_schema(bencher: Bencher) {
    let document = product_schema();

    bencher.bench_local(move || Schema::new(document.clone()).expect("Failed to compile schema"));
}

#[divan::bench]
fn validate_valid_text(bencher: Bencher) {
    let schema = Schema::new(product_schema()).unwrap();

    bencher.bench_local(move || schema.validate_str(VALID_JSON).expect("Validation failed"));
}

#[divan::bench]
fn validate_invalid_text(bencher: Bencher) {
    let schema = Schema::new(product_schema()).unwrap();

    bencher.bench_local(move || schema.validate_str(INVALID_JSON).expect("Validation failed"));
}

#[divan::bench]
fn validate_in_memory_value(bencher: Bencher) {
    let schema = Schema::new(product_schema()).unwrap();
    let value: Value = serde_json::from_str(VALID_JSON).unwrap();

    bencher.bench_local(move || schema.validate(&value));
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn unique_items(bencher: Bencher, len: usize) {
    let schema = Schema::new(json!({ "type": "array", "uniqueItems": true })).unwrap();
    let items: Vec<Value> = (0..len).map(|n| json!({ "n": n, "label": format!("item-{n}") })).collect();
    let text = Value::Array(items).to_string();

    bencher.bench_local(move || schema.validate_str(&text).expect("Validation failed"));
}

#[divan::bench]
fn validate_file(bencher: Bencher) {
    let schema = Schema::new(product_schema()).unwrap();

    // the engine validates from a path
    use std::io::Write;
    use tempfile::NamedTempFile;
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", VALID_JSON).unwrap();
    let path = file.path().to_path_buf();

    bencher.bench_local(move || ValidationEngine::validate_single_file(&schema, &path));
}
