//! # validate-json Library
//!
//! A streaming JSON Schema (draft-04) validator. A schema document is compiled
//! once into an immutable [`ConstraintGraph`]; each JSON value is then checked
//! by a [`ValidationSession`] that consumes parse events one at a time, so
//! instances never have to be materialized as a tree.
//!
//! ```
//! use serde_json::json;
//! use validate_json::Schema;
//!
//! let schema = Schema::new(json!({ "type": "array", "uniqueItems": true })).unwrap();
//! assert!(schema.validate_str("[1, 2, 3]").unwrap());
//! assert!(!schema.validate_str("[1, 2, 1]").unwrap());
//! ```
//!
//! Around the core the crate provides the pieces of the `validate-json`
//! binary: configuration, file discovery, a parallel validation engine and
//! report rendering.

pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod events;
pub mod file_discovery;
pub mod format;
pub mod graph;
pub mod hash;
pub mod node;
pub mod numeric;
pub mod output;
pub mod pointer;
pub mod reference;
pub mod schema_loader;
pub mod session;
pub mod validator;

pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager};
pub use error::{LookupError, SchemaError, ValidationError};
pub use events::{Consumer, Event};
pub use file_discovery::{DiscoveryStats, FileDiscovery};
pub use format::Format;
pub use graph::{ConstraintGraph, Schema};
pub use node::{ConstraintNode, NodeId, TypeSet};
pub use numeric::Numeric;
pub use output::Output;
pub use pointer::Pointer;
pub use reference::ResolvedDocument;
pub use schema_loader::SchemaLoader;
pub use session::ValidationSession;
pub use validator::{
    FileValidationResult, PerformanceMetrics, ProgressCallback, ValidationConfig, ValidationEngine,
    ValidationPhase, ValidationProgress, ValidationResults, ValidationStatus,
};
