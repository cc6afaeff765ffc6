#![deny(missing_docs)]

//! # OAS DOM
//!
//! Object model for OpenAPI-style schema documents: composable schema
//! nodes, references resolved by searching the owning document, and a codec
//! that round-trips the generic document form without losing vendor
//! extensions.

/// Shared error types.
pub mod error;

/// Vendor extension side-channel.
pub mod extensions;

/// Wire / snake_case key normalization.
pub mod alias;

/// Schema nodes and their satellite objects.
pub mod schema;

/// Cross-field composition checks.
pub mod validation;

/// Internal and external references.
pub mod reference;

/// Depth-first path search.
pub mod resolver;

/// Document root and definitions.
pub mod document;

/// Decode / encode between generic values and the typed graph.
pub mod codec;

/// JSON and YAML text strategies.
pub mod format;

pub use alias::{KeyAlias, KeyStyle};
pub use codec::{CodecOptions, GraphCodec, Shape, UnresolvedPolicy};
pub use document::{Document, DocumentEntry, DocumentId, DocumentLayout};
pub use error::{AppError, AppResult};
pub use extensions::ExtensionBag;
pub use format::{Json, TextFormat, Yaml};
pub use reference::{ExternalKind, Reference, ReferenceState, ReferenceTarget};
pub use resolver::{PathResolver, SearchTarget};
pub use schema::{
    AdditionalProperties, Discriminator, ExclusiveBound, ExternalDocs, SchemaKind, SchemaNode,
    SchemaOrRef, Xml,
};
pub use validation::{CompositionValidator, ValidationResult, Violation, ViolationKind};
