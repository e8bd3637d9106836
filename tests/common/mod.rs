//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use validate_json::Schema;

/// Compile `document`, panicking on schema errors.
pub fn compile(document: Value) -> Schema {
    Schema::new(document).expect("schema should compile")
}

/// Validate `instance` through both the value walk and the text parser,
/// asserting that the two producers agree.
pub fn accepts(schema: &Schema, instance: &Value) -> bool {
    let from_value = schema.validate(instance);
    let text = instance.to_string();
    let from_text = schema.validate_str(&text).expect("instance text is well formed");
    let from_reader = schema
        .validate_reader(text.as_bytes())
        .expect("instance text is well formed");
    assert_eq!(from_value, from_text, "value and text disagree on {text}");
    assert_eq!(from_text, from_reader, "text and reader disagree on {text}");
    from_value
}

/// A temporary tree with a schema stored outside the directory of instances.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new(schema: &Value) -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("data")).unwrap();
        fs::write(
            root.path().join("schema.json"),
            serde_json::to_string_pretty(schema).unwrap(),
        )
        .unwrap();
        Self { root }
    }

    pub fn schema_path(&self) -> PathBuf {
        self.root.path().join("schema.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }

    /// Write `content` to `data/<relative>`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.data_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}

/// A schema describing a small product catalogue entry.
pub fn product_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "required": ["id", "name", "price"],
        "properties": {
            "id": { "type": "integer", "minimum": 1 },
            "name": { "type": "string", "minLength": 1 },
            "price": { "type": "number", "minimum": 0, "exclusiveMinimum": true },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "uniqueItems": true
            }
        },
        "additionalProperties": false
    })
}
