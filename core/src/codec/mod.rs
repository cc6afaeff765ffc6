#![deny(missing_docs)]

//! # Graph Codec
//!
//! Converts between the generic value form of a document and the typed graph.
//!
//! - **decode**: a mapping becomes a [`SchemaNode`] or, when it holds only the
//!   reference marker, a [`Reference`]. Recognized fields are read under
//!   either key convention; everything else lands in the extension bag.
//! - **encode**: the inverse. First-class fields first, extensions last.
//! - **documents**: [`GraphCodec::decode_document`] builds a [`Document`] and
//!   binds every internal reference to it.
//!
//! Text is handled at the edges through a [`TextFormat`].

mod decode;
mod encode;
pub mod options;

pub use options::{CodecOptions, UnresolvedPolicy, DEFAULT_MAX_DEPTH};

use crate::document::{Document, DocumentLayout};
use crate::error::{AppError, AppResult};
use crate::extensions::ExtensionBag;
use crate::format::TextFormat;
use crate::reference::Reference;
use crate::schema::{SchemaNode, SchemaOrRef};
use decode::Decoder;
use encode::{Encoder, Pointers};
use serde_json::Value;
use tracing::debug;

/// What the caller expects a decoded value to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A schema object; a reference is a mismatch.
    Schema,
    /// A reference object; anything else is a mismatch.
    Reference,
    /// Either.
    SchemaOrReference,
}

/// Decoder/encoder for the schema graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphCodec {
    options: CodecOptions,
}

impl GraphCodec {
    /// Codec with the given options.
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// The active options.
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Decodes a mapping into a schema or a reference.
    pub fn decode(&self, value: &Value, shape: Shape) -> AppResult<SchemaOrRef> {
        debug!(?shape, strict = self.options.strict, "decoding value");
        let decoder = Decoder::new(&self.options);
        let decoded = decoder.any(value, "", 0)?;
        match (shape, &decoded) {
            (Shape::Schema, SchemaOrRef::Reference(r)) => Err(AppError::TypeMismatch {
                field: self.options.reference_key.clone(),
                expected: "a schema object".into(),
                found: format!("reference '{}'", r.logical_text().unwrap_or_default()),
            }),
            (Shape::Reference, SchemaOrRef::Schema(_)) => Err(AppError::TypeMismatch {
                field: self.options.reference_key.clone(),
                expected: "a reference object".into(),
                found: "schema object".into(),
            }),
            _ => Ok(decoded),
        }
    }

    /// Decodes a schema object.
    pub fn decode_schema(&self, value: &Value) -> AppResult<SchemaNode> {
        match self.decode(value, Shape::Schema)? {
            SchemaOrRef::Schema(node) => Ok(*node),
            _ => Err(AppError::type_mismatch("schema", "a schema object", value)),
        }
    }

    /// Decodes a reference object.
    pub fn decode_reference(&self, value: &Value) -> AppResult<Reference> {
        match self.decode(value, Shape::Reference)? {
            SchemaOrRef::Reference(reference) => Ok(reference),
            _ => Err(AppError::type_mismatch(
                self.options.reference_key.clone(),
                "a reference object",
                value,
            )),
        }
    }

    /// Applies the fields present in `value` to `node`. On failure `node`
    /// is left untouched.
    pub fn update(&self, node: &mut SchemaNode, value: &Value) -> AppResult<()> {
        let Value::Object(map) = value else {
            return Err(AppError::type_mismatch("schema", "a mapping", value));
        };
        let decoder = Decoder::new(&self.options);
        let mut map = map.clone();
        let mut staged = node.clone();
        decoder.apply(&mut staged, &mut map, "", 0)?;
        let mut extensions = ExtensionBag::new();
        decoder.leftovers(&mut extensions, map)?;
        staged.extensions.extend_from(extensions);
        *node = staged;
        debug!("updated schema node in place");
        Ok(())
    }

    /// Encodes without a document. References are written as the text they
    /// were decoded from.
    pub fn encode(&self, member: &SchemaOrRef) -> AppResult<Value> {
        debug!("encoding detached member");
        Encoder::new(&self.options, Pointers::Detached).member(member, 0)
    }

    /// Encodes a schema node without a document.
    pub fn encode_schema(&self, node: &SchemaNode) -> AppResult<Value> {
        Encoder::new(&self.options, Pointers::Detached).schema(node, 0)
    }

    /// Encodes with internal references resolved against `document`.
    pub fn encode_in(&self, member: &SchemaOrRef, document: &Document) -> AppResult<Value> {
        Encoder::new(&self.options, Pointers::Within(document)).member(member, 0)
    }

    pub(crate) fn search_form_of(&self, member: &SchemaOrRef) -> AppResult<Value> {
        Encoder::new(&self.options, Pointers::Search).member(member, 0)
    }

    /// Builds a document from its generic form. Mappings along the layout's
    /// definitions path become sections, entries of the last one become
    /// definitions, everything else is kept opaque.
    pub fn decode_document(&self, value: &Value, layout: &DocumentLayout) -> AppResult<Document> {
        let Value::Object(map) = value else {
            return Err(AppError::type_mismatch("document", "a mapping at the root", value));
        };
        let entries = Decoder::new(&self.options).entries(map, layout.definitions_path())?;
        let document = Document::from_entries(layout.clone(), self.clone(), entries);
        debug!(
            document = %document.id(),
            definitions = document.definitions().count(),
            "decoded document"
        );
        Ok(document)
    }

    /// Parses `text` and decodes it.
    pub fn decode_str(
        &self,
        text: &str,
        format: &dyn TextFormat,
        shape: Shape,
    ) -> AppResult<SchemaOrRef> {
        self.decode(&format.parse(text)?, shape)
    }

    /// Encodes `member` and renders it.
    pub fn encode_str(&self, member: &SchemaOrRef, format: &dyn TextFormat) -> AppResult<String> {
        format.render(&self.encode(member)?)
    }

    /// Parses `text` and builds a document from it.
    pub fn decode_document_str(
        &self,
        text: &str,
        format: &dyn TextFormat,
        layout: &DocumentLayout,
    ) -> AppResult<Document> {
        self.decode_document(&format.parse(text)?, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_shape_mismatch() {
        let codec = GraphCodec::default();
        let err = codec
            .decode(&json!({"$ref": "#/Pet"}), Shape::Schema)
            .unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { .. }));
        let err = codec.decode(&json!({"title": "x"}), Shape::Reference).unwrap_err();
        assert!(format!("{err}").contains("reference object"));
    }

    #[test]
    fn test_reference_with_siblings_is_a_schema() {
        let codec = GraphCodec::default();
        let node = codec
            .decode_schema(&json!({"$ref": "#/Pet", "description": "d"}))
            .unwrap();
        assert_eq!(node.description.as_deref(), Some("d"));
        assert_eq!(node.extensions.get("$ref"), Some(&json!("#/Pet")));
    }

    #[test]
    fn test_custom_reference_key() {
        let codec = GraphCodec::new(CodecOptions::default().with_reference_key("ref"));
        let reference = codec.decode_reference(&json!({"ref": "Pet"})).unwrap();
        assert_eq!(reference.target_key(), Some("Pet"));
        assert_eq!(
            codec.encode(&reference.into()).unwrap(),
            json!({"ref": "Pet"})
        );
    }

    #[test]
    fn test_update_applies_present_fields_only() {
        let codec = GraphCodec::default();
        let mut node = codec
            .decode_schema(&json!({"title": "A", "type": "string", "x-a": 1}))
            .unwrap();
        codec
            .update(&mut node, &json!({"description": "B", "x-b": 2}))
            .unwrap();
        assert_eq!(node.title.as_deref(), Some("A"));
        assert_eq!(node.description.as_deref(), Some("B"));
        assert_eq!(node.kind, Some(SchemaKind::String));
        assert_eq!(node.extensions.len(), 2);
    }

    #[test]
    fn test_update_is_atomic() {
        let codec = GraphCodec::default();
        let mut node = codec.decode_schema(&json!({"title": "A"})).unwrap();
        let before = node.clone();
        let err = codec
            .update(&mut node, &json!({"title": "B", "multipleOf": 0}))
            .unwrap_err();
        assert!(matches!(err, AppError::RangeViolation { .. }));
        assert_eq!(node, before);
    }

    #[test]
    fn test_strict_rejects_unprefixed_leftovers() {
        let codec = GraphCodec::new(CodecOptions::default().with_strict(true));
        let err = codec
            .decode(&json!({"title": "A", "legacy": true}), Shape::Schema)
            .unwrap_err();
        assert!(matches!(err, AppError::UnrecognizedField(ref k) if k == "legacy"));
        assert!(codec
            .decode(&json!({"title": "A", "x-legacy": true}), Shape::Schema)
            .is_ok());
    }

    #[test]
    fn test_snake_case_input() {
        let codec = GraphCodec::default();
        let node = codec
            .decode_schema(&json!({
                "type": "object",
                "additional_properties": false,
                "max_properties": 3
            }))
            .unwrap();
        assert_eq!(node.max_properties, Some(3));
        assert_eq!(
            codec.encode_schema(&node).unwrap(),
            json!({"type": "object", "maxProperties": 3, "additionalProperties": false})
        );
    }
}
