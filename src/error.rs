use std::path::PathBuf;

use thiserror::Error;

use crate::pointer::Pointer;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON syntax error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Schema loading failed: {path} - {details}")]
    SchemaLoading { path: PathBuf, details: String },

    #[error("Instance parsing error: {file} - {details}")]
    InstanceParsing { file: PathBuf, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system traversal error: {path} - {reason}")]
    FileSystemTraversal { path: PathBuf, reason: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// Schema authoring errors raised while compiling a schema document.
///
/// Any of these aborts the whole graph build; a partially compiled graph is
/// never handed out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("invalid JSON Schema at '{position}': a schema must be of type 'object'")]
    NotAnObject { position: Pointer },

    #[error("invalid JSON Schema at '{position}': \"{keyword}\" {reason}")]
    InvalidKeyword {
        position: Pointer,
        keyword: &'static str,
        reason: String,
    },

    #[error("invalid JSON Schema at '{position}': \"{keyword}\" must be a regular expression: {details}")]
    InvalidPattern {
        position: Pointer,
        keyword: &'static str,
        details: String,
    },

    #[error("invalid JSON Reference at '{position}': {reason}")]
    InvalidReference { position: Pointer, reason: String },

    #[error("invalid JSON Schema: sub-schema '{position}' applies itself to the same value without descending")]
    NonDescendingCycle { position: Pointer },
}

impl SchemaError {
    pub(crate) fn keyword(
        position: &Pointer,
        keyword: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::InvalidKeyword {
            position: position.clone(),
            keyword,
            reason: reason.into(),
        }
    }

    pub(crate) fn reference(position: &Pointer, reason: impl Into<String>) -> Self {
        SchemaError::InvalidReference {
            position: position.clone(),
            reason: reason.into(),
        }
    }
}

/// Caller contract violation: a session was requested for a position that
/// has no compiled node. Never caused by instance data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid node position '{position}', no schema registered")]
pub struct LookupError {
    pub position: Pointer,
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Schema compilation result type alias
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
