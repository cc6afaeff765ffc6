#![deny(missing_docs)]

//! # Error Handling
//!
//! Provides the unified `AppError` enum used across the crate.
//!
//! Field setters and the codec fail fast with one of these variants; the
//! composition validator never fails and instead returns its findings, which
//! can be lifted into [`AppError::CompositionInvalid`] by the caller.

use crate::validation::Violation;
use derive_more::{Display, From};

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Only the text-format errors convert implicitly; everything else is built
/// explicitly at the failure site so the message names the field involved.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// A field was given a value of the wrong shape.
    #[from(ignore)]
    #[display("Type mismatch for '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Wire name (or dotted path) of the field.
        field: String,
        /// Human description of the accepted shape.
        expected: String,
        /// JSON type name of the rejected value.
        found: String,
    },

    /// A `type` token outside the seven supported kinds.
    #[from(ignore)]
    #[display("Unsupported schema type '{_0}'")]
    UnsupportedKind(String),

    /// A value outside the legal range of its field.
    #[from(ignore)]
    #[display("Range violation for '{field}': {message}")]
    RangeViolation {
        /// Wire name of the field.
        field: String,
        /// What was violated.
        message: String,
    },

    /// The composition validator found violations.
    #[from(ignore)]
    #[display("Composition invalid: {} violation(s)", _0.len())]
    CompositionInvalid(Vec<Violation>),

    /// An internal reference has no document to resolve against.
    #[from(ignore)]
    #[display("No document bound: {_0}")]
    NoDocumentBound(String),

    /// The reference target does not occur in the document.
    #[from(ignore)]
    #[display("Reference target not found: {_0}")]
    ReferenceNotFound(String),

    /// A traversal went deeper than the configured bound.
    #[from(ignore)]
    #[display("Traversal exceeded maximum depth of {depth}")]
    CycleOrDepthExceeded {
        /// The bound that was exceeded.
        depth: usize,
    },

    /// An extension key clashes with another key of the same object.
    #[from(ignore)]
    #[display("Extension key collision: {_0}")]
    ExtensionKeyCollision(String),

    /// A key that is neither a known field nor an `x-` extension (strict mode).
    #[from(ignore)]
    #[display("Unrecognized field '{_0}'")]
    UnrecognizedField(String),

    /// Internal resolution was requested on an external reference.
    #[from(ignore)]
    #[display("External reference '{_0}' cannot be resolved against a document")]
    ExternalReference(String),

    /// Wrapper for JSON text errors.
    #[display("JSON Error: {_0}")]
    Json(serde_json::Error),

    /// Wrapper for YAML text errors.
    #[display("YAML Error: {_0}")]
    Yaml(serde_yaml::Error),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Builds a [`AppError::TypeMismatch`] naming the JSON type of `found`.
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: &serde_json::Value,
    ) -> Self {
        AppError::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            found: json_type_name(found).to_string(),
        }
    }

    /// Builds a [`AppError::RangeViolation`].
    pub fn range(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::RangeViolation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Returns the JSON type name of a value, as used in error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
