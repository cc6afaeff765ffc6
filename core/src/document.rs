#![deny(missing_docs)]

//! # Document
//!
//! Root owner of a typed graph. Top-level definitions live in the section the
//! [`DocumentLayout`] names; every other part of the source document is kept
//! as opaque values so it round-trips untouched.
//!
//! The document is the only authority references resolve against. It carries
//! a process-unique id (what references bind to) and a revision counter that
//! every mutation bumps, which invalidates cached reference paths.

use crate::codec::GraphCodec;
use crate::error::{AppError, AppResult};
use crate::reference::Reference;
use crate::resolver::{PathResolver, SearchTarget};
use crate::schema::SchemaOrRef;
use derive_more::Display;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where definitions live inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLayout {
    definitions: Vec<String>,
}

impl DocumentLayout {
    /// Every root key is a definition.
    pub fn flat() -> Self {
        Self::default()
    }

    /// OpenAPI 3: `components/schemas`.
    pub fn openapi() -> Self {
        Self::with_section(["components", "schemas"])
    }

    /// Swagger 2: `definitions`.
    pub fn swagger() -> Self {
        Self::with_section(["definitions"])
    }

    /// Definitions under an arbitrary key path.
    pub fn with_section<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            definitions: path.into_iter().map(Into::into).collect(),
        }
    }

    /// Key path of the definitions section (empty for [`flat`](Self::flat)).
    pub fn definitions_path(&self) -> &[String] {
        &self.definitions
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEntry {
    /// A typed top-level definition.
    Definition(SchemaOrRef),
    /// A mapping on the way to the definitions section.
    Section(IndexMap<String, DocumentEntry>),
    /// Anything this model does not type (info, paths, servers, …).
    Opaque(Value),
}

/// Owner of a typed graph and the context references resolve against.
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    revision: u64,
    layout: DocumentLayout,
    codec: GraphCodec,
    root: IndexMap<String, DocumentEntry>,
    search_count: Cell<usize>,
}

impl Document {
    /// Empty document using the default codec.
    pub fn new(layout: DocumentLayout) -> Self {
        Self::with_codec(layout, GraphCodec::default())
    }

    /// Empty document encoding through `codec`.
    pub fn with_codec(layout: DocumentLayout, codec: GraphCodec) -> Self {
        Self::from_entries(layout, codec, IndexMap::new())
    }

    /// Document over already-built entries. References are bound to it.
    pub fn from_entries(
        layout: DocumentLayout,
        codec: GraphCodec,
        root: IndexMap<String, DocumentEntry>,
    ) -> Self {
        let mut document = Self {
            id: DocumentId::next(),
            revision: 0,
            layout,
            codec,
            root,
            search_count: Cell::new(0),
        };
        document.bind_references();
        document
    }

    /// Identity references bind to.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The layout this document was built with.
    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    /// The codec used by [`to_value`](Self::to_value).
    pub fn codec(&self) -> &GraphCodec {
        &self.codec
    }

    /// Number of tree searches run so far.
    pub fn search_count(&self) -> usize {
        self.search_count.get()
    }

    /// Root entries.
    pub fn entries(&self) -> &IndexMap<String, DocumentEntry> {
        &self.root
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn definitions_map(&self) -> Option<&IndexMap<String, DocumentEntry>> {
        let mut current = &self.root;
        for key in self.layout.definitions_path() {
            match current.get(key) {
                Some(DocumentEntry::Section(next)) => current = next,
                _ => return None,
            }
        }
        Some(current)
    }

    fn definitions_map_mut(&mut self) -> Option<&mut IndexMap<String, DocumentEntry>> {
        let mut current = &mut self.root;
        for key in &self.layout.definitions {
            match current.get_mut(key) {
                Some(DocumentEntry::Section(next)) => current = next,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Adds (or replaces) a definition, creating the definitions section if
    /// needed. References inside it are bound to this document.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        definition: impl Into<SchemaOrRef>,
    ) -> Option<SchemaOrRef> {
        let mut definition = definition.into();
        bind_member(&mut definition, self.id);

        let previous = insert_at(
            &mut self.root,
            &self.layout.definitions,
            name.into(),
            DocumentEntry::Definition(definition),
        );
        self.revision += 1;
        match previous {
            Some(DocumentEntry::Definition(old)) => Some(old),
            _ => None,
        }
    }

    /// Looks up a definition by name.
    pub fn definition(&self, name: &str) -> Option<&SchemaOrRef> {
        match self.definitions_map()?.get(name)? {
            DocumentEntry::Definition(member) => Some(member),
            _ => None,
        }
    }

    /// Mutable access to a definition. Counts as a mutation.
    pub fn definition_mut(&mut self, name: &str) -> Option<&mut SchemaOrRef> {
        self.touch();
        match self.definitions_map_mut()?.get_mut(name)? {
            DocumentEntry::Definition(member) => Some(member),
            _ => None,
        }
    }

    /// Removes a definition, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<SchemaOrRef> {
        let removed = match self.definitions_map_mut()?.shift_remove(name)? {
            DocumentEntry::Definition(member) => Some(member),
            _ => None,
        };
        self.touch();
        removed
    }

    /// Definitions in document order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &SchemaOrRef)> {
        self.definitions_map()
            .into_iter()
            .flat_map(|map| map.iter())
            .filter_map(|(name, entry)| match entry {
                DocumentEntry::Definition(member) => Some((name.as_str(), member)),
                _ => None,
            })
    }

    /// Stores an untyped root value, e.g. `info` or `paths`.
    pub fn insert_opaque(&mut self, key: impl Into<String>, value: Value) -> Option<DocumentEntry> {
        let previous = self.root.insert(key.into(), DocumentEntry::Opaque(value));
        self.touch();
        previous
    }

    /// Binds every internal reference in the tree to this document.
    pub fn bind_references(&mut self) {
        let id = self.id;
        let mut stack: Vec<&mut DocumentEntry> = self.root.values_mut().collect();
        while let Some(entry) = stack.pop() {
            match entry {
                DocumentEntry::Definition(member) => bind_member(member, id),
                DocumentEntry::Section(children) => stack.extend(children.values_mut()),
                DocumentEntry::Opaque(_) => {}
            }
        }
        self.touch();
    }

    /// Key path of `target` in the search form of this document.
    pub fn locate(&self, target: SearchTarget<'_>) -> AppResult<Vec<String>> {
        self.search_count.set(self.search_count.get() + 1);
        let form = self.search_form()?;
        let options = self.codec.options();
        PathResolver::new(options.max_depth)
            .skipping(options.reference_key.clone())
            .find(&form, target)
    }

    /// Generic form used for searching: references render as their logical
    /// text so building it never triggers resolution.
    pub fn search_form(&self) -> AppResult<Value> {
        self.render(|member| self.codec.search_form_of(member))
    }

    /// Encodes the whole document. Internal references render as resolved
    /// pointers, subject to the codec's unresolved policy.
    pub fn to_value(&self) -> AppResult<Value> {
        debug!(document = %self.id, revision = self.revision, "encoding document");
        self.render(|member| self.codec.encode_in(member, self))
    }

    fn render<F>(&self, encode: F) -> AppResult<Value>
    where
        F: Fn(&SchemaOrRef) -> AppResult<Value>,
    {
        fn section<F>(entries: &IndexMap<String, DocumentEntry>, encode: &F) -> AppResult<Value>
        where
            F: Fn(&SchemaOrRef) -> AppResult<Value>,
        {
            let mut out = Map::new();
            for (key, entry) in entries {
                let value = match entry {
                    DocumentEntry::Definition(member) => encode(member)?,
                    DocumentEntry::Section(children) => section(children, encode)?,
                    DocumentEntry::Opaque(value) => value.clone(),
                };
                out.insert(key.clone(), value);
            }
            Ok(Value::Object(out))
        }
        section(&self.root, &encode)
    }

    /// Resolves `reference` against this document; shorthand for
    /// [`Reference::resolve`].
    pub fn resolve(&self, reference: &Reference) -> AppResult<Vec<String>> {
        reference.resolve(self)
    }

    /// Looks up the value at a key path in the search form of the document.
    pub fn value_at(&self, path: &[String]) -> AppResult<Value> {
        let mut current = self.search_form()?;
        for key in path {
            current = match current {
                Value::Object(mut map) => map
                    .shift_remove(key)
                    .ok_or_else(|| AppError::ReferenceNotFound(path.join("/")))?,
                _ => return Err(AppError::ReferenceNotFound(path.join("/"))),
            };
        }
        Ok(current)
    }
}

/// Inserts `entry` under `path`, replacing anything on the way that is not
/// a section.
fn insert_at(
    map: &mut IndexMap<String, DocumentEntry>,
    path: &[String],
    name: String,
    entry: DocumentEntry,
) -> Option<DocumentEntry> {
    let Some((head, rest)) = path.split_first() else {
        return map.insert(name, entry);
    };
    let slot = map
        .entry(head.clone())
        .or_insert_with(|| DocumentEntry::Section(IndexMap::new()));
    match slot {
        DocumentEntry::Section(children) => insert_at(children, rest, name, entry),
        other => {
            let mut children = IndexMap::new();
            let previous = insert_at(&mut children, rest, name, entry);
            *other = DocumentEntry::Section(children);
            previous
        }
    }
}

fn bind_member(member: &mut SchemaOrRef, id: DocumentId) {
    match member {
        SchemaOrRef::Schema(node) => {
            for reference in node.references_mut() {
                reference.bind_to_id(id);
            }
        }
        SchemaOrRef::Reference(reference) => reference.bind_to_id(id),
        SchemaOrRef::Unresolved(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceState;
    use crate::schema::{SchemaKind, SchemaNode};
    use serde_json::json;

    #[test]
    fn test_ids_are_unique() {
        let a = Document::new(DocumentLayout::flat());
        let b = Document::new(DocumentLayout::flat());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_insert_creates_sections() {
        let mut doc = Document::new(DocumentLayout::openapi());
        doc.insert("Pet", SchemaNode::of_kind(SchemaKind::Object));
        assert_eq!(
            doc.search_form().unwrap(),
            json!({"components": {"schemas": {"Pet": {"type": "object"}}}})
        );
        assert!(doc.definition("Pet").is_some());
        assert_eq!(doc.definitions().count(), 1);
    }

    #[test]
    fn test_mutations_bump_revision() {
        let mut doc = Document::new(DocumentLayout::flat());
        let start = doc.revision();
        doc.insert("A", SchemaNode::new());
        assert!(doc.revision() > start);
        let after_insert = doc.revision();
        doc.definition_mut("A");
        assert!(doc.revision() > after_insert);
    }

    #[test]
    fn test_insert_binds_references() {
        let mut doc = Document::new(DocumentLayout::flat());
        doc.insert("Dog", SchemaNode::new().with_title("Dog"));
        doc.insert(
            "Pet",
            SchemaNode::of_kind(SchemaKind::Array).with_items(Reference::internal("Dog")),
        );
        let items = doc
            .definition("Pet")
            .and_then(|m| m.as_schema())
            .and_then(|n| n.items.as_ref())
            .and_then(|i| i.as_reference())
            .unwrap();
        assert_eq!(items.binding(), Some(doc.id()));
        assert_eq!(items.state(), ReferenceState::InternalUnresolved);
        assert_eq!(items.resolve(&doc).unwrap(), vec!["Dog"]);
    }

    #[test]
    fn test_opaque_entries_round_trip() {
        let mut doc = Document::new(DocumentLayout::openapi());
        doc.insert_opaque("info", json!({"title": "Pets", "version": "1"}));
        doc.insert("Pet", SchemaNode::new());
        assert_eq!(
            doc.to_value().unwrap(),
            json!({
                "info": {"title": "Pets", "version": "1"},
                "components": {"schemas": {"Pet": {}}}
            })
        );
    }

    #[test]
    fn test_value_at() {
        let mut doc = Document::new(DocumentLayout::swagger());
        doc.insert("Pet", SchemaNode::new().with_title("P"));
        let path = vec!["definitions".to_string(), "Pet".to_string()];
        assert_eq!(doc.value_at(&path).unwrap(), json!({"title": "P"}));
        assert!(doc.value_at(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_remove_definition() {
        let mut doc = Document::new(DocumentLayout::flat());
        doc.insert("A", SchemaNode::new());
        doc.insert("B", SchemaNode::new());
        assert!(doc.remove("A").is_some());
        let names: Vec<_> = doc.definitions().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B"]);
    }

    #[test]
    fn test_bare_mapping_targets_do_not_shadow_definitions() {
        let source = json!({
            "Pet": {
                "oneOf": [{"$ref": "Dog"}],
                "discriminator": {"propertyName": "t", "mapping": {"dog": "Dog"}}
            },
            "Dog": {"type": "object"}
        });
        let doc = GraphCodec::default()
            .decode_document(&source, &DocumentLayout::flat())
            .unwrap();

        let pet = doc.definition("Pet").and_then(|m| m.as_schema()).unwrap();
        let mapped = pet
            .discriminator
            .as_ref()
            .and_then(|d| d.target_for("dog"))
            .unwrap();
        assert_eq!(mapped.resolve(&doc).unwrap(), vec!["Dog"]);
        let member = pet.one_of[0].as_reference().unwrap();
        assert_eq!(member.resolve(&doc).unwrap(), vec!["Dog"]);

        let value = doc.to_value().unwrap();
        assert_eq!(value["Pet"]["oneOf"][0], json!({"$ref": "#/Dog/"}));
        assert_eq!(value["Pet"]["discriminator"]["mapping"]["dog"], json!("#/Dog/"));
    }
}
