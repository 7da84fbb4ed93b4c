//! Error types for the form engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for form engine operations
pub type Result<T> = std::result::Result<T, FormError>;

/// Errors that can occur while building or driving a form session.
///
/// Per-field validation failures are not errors: they are recorded as messages
/// in the session's error map. Everything here is a host contract violation
/// or an I/O problem the host has to deal with.
#[derive(Debug, Error)]
pub enum FormError {
    /// Two fields in the same metadata share an id
    #[error("duplicate field id: {id}")]
    DuplicateFieldId { id: String },

    /// A field id was referenced that the metadata does not declare
    #[error("field not found: {id}")]
    FieldNotFound { id: String },

    /// A `pattern` rule did not compile
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// A host-supplied custom predicate failed instead of returning a verdict
    #[error("custom predicate failed on field '{field}': {source}")]
    PredicateFailed {
        field: String,
        #[source]
        source: anyhow::Error,
    },

    /// Metadata file could not be read
    #[error("failed to read form metadata {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Engine configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FormError {
    /// Create a field-not-found error
    pub fn field_not_found(id: impl Into<String>) -> Self {
        Self::FieldNotFound { id: id.into() }
    }
}
