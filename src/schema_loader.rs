use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::graph::Schema;

/// Reads schema documents from disk and compiles each path once.
///
/// Compiled schemas are kept by canonical path, so every file validated
/// against the same document shares one constraint graph.
#[derive(Debug, Default)]
pub struct SchemaLoader {
    compiled: RwLock<HashMap<PathBuf, Schema>>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and compile the schema at `path`, reusing an earlier compilation.
    pub fn load(&self, path: &Path) -> Result<Schema> {
        let key = path.canonicalize().map_err(|e| ValidationError::SchemaLoading {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        if let Some(schema) = self.read_compiled()?.get(&key) {
            debug!(path = %key.display(), "schema already compiled");
            return Ok(schema.clone());
        }

        let schema = Self::compile_file(&key)?;
        let mut compiled = self
            .compiled
            .write()
            .map_err(|_| ValidationError::Concurrency {
                details: "schema table lock poisoned".to_string(),
            })?;
        // another thread may have compiled the same path meanwhile
        Ok(compiled.entry(key).or_insert(schema).clone())
    }

    /// Compile a schema document that is already in memory.
    pub fn load_from_str(&self, text: &str, source: &Path) -> Result<Schema> {
        compile_text(text, source)
    }

    /// Number of distinct schema documents compiled so far.
    pub fn compiled_count(&self) -> usize {
        self.read_compiled().map(|compiled| compiled.len()).unwrap_or(0)
    }

    fn compile_file(path: &Path) -> Result<Schema> {
        let text = std::fs::read_to_string(path).map_err(|e| ValidationError::SchemaLoading {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        let schema = compile_text(&text, path)?;
        info!(
            path = %path.display(),
            nodes = schema.graph().len(),
            "compiled schema"
        );
        Ok(schema)
    }

    fn read_compiled(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Schema>>> {
        self.compiled.read().map_err(|_| ValidationError::Concurrency {
            details: "schema table lock poisoned".to_string(),
        })
    }
}

fn compile_text(text: &str, source: &Path) -> Result<Schema> {
    let document: Value = serde_json::from_str(text).map_err(|e| ValidationError::SchemaLoading {
        path: source.to_path_buf(),
        details: format!("not valid JSON: {}", e),
    })?;
    Schema::new(document).map_err(|e| ValidationError::SchemaLoading {
        path: source.to_path_buf(),
        details: e.to_string(),
    })
}
