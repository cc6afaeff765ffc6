#![deny(missing_docs)]

//! # References
//!
//! A typed pointer to another node, either inside the owning [`Document`] or
//! at an external location.
//!
//! Internal references do not store a path. The path is found by searching
//! the document the reference is bound to and is cached per document
//! revision, so a mutation of the document invalidates it.
//!
//! - **Classification**: `#…` pointers and bare names are internal; absolute
//!   URIs and filesystem-shaped strings are external.
//! - **Pointer text**: internal paths render as `#/seg/…/seg/` with RFC 6901
//!   escaping.

use crate::document::{Document, DocumentId};
use crate::error::{AppError, AppResult};
use crate::resolver::SearchTarget;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::OnceLock;
use tracing::{debug, trace};
use url::Url;

/// Default key that marks a mapping as a reference.
pub const REFERENCE_KEY: &str = "$ref";

/// How an external location was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalKind {
    /// Absolute URI with a scheme.
    Uri,
    /// Absolute or relative file path, optionally with a fragment.
    FilePath,
}

/// A location outside the current document. Never dereferenced here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLocation {
    raw: String,
    kind: ExternalKind,
}

impl ExternalLocation {
    /// The text exactly as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// URI or file path.
    pub fn kind(&self) -> ExternalKind {
        self.kind
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceTarget {
    /// A key somewhere in the document.
    Key {
        /// The key searched for.
        name: String,
        /// Pointer text the key was decoded from, if any.
        pointer: Option<String>,
    },
    /// A node, compared structurally against document values.
    Node(Value),
    /// An external location.
    External(ExternalLocation),
}

/// Lifecycle of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceState {
    /// Internal, not bound to any document.
    Unbound,
    /// External; resolution is out of scope.
    ExternalBound,
    /// Bound to a document, no path cached.
    InternalUnresolved,
    /// Bound to a document with a cached path.
    InternalResolved,
}

#[derive(Debug, Clone)]
struct CachedPath {
    document: DocumentId,
    revision: u64,
    path: Vec<String>,
}

/// A non-owning pointer to another node.
#[derive(Debug, Clone)]
pub struct Reference {
    target: ReferenceTarget,
    binding: Option<DocumentId>,
    cache: RefCell<Option<CachedPath>>,
}

/// Two references are equal when they point at the same target, whatever
/// document they are bound to.
impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Reference {
    fn with_target(target: ReferenceTarget) -> Self {
        Self {
            target,
            binding: None,
            cache: RefCell::new(None),
        }
    }

    /// Internal reference to a key.
    pub fn internal(name: impl Into<String>) -> Self {
        Self::with_target(ReferenceTarget::Key {
            name: name.into(),
            pointer: None,
        })
    }

    /// Internal reference matched structurally against document values.
    pub fn to_node(node: Value) -> Self {
        Self::with_target(ReferenceTarget::Node(node))
    }

    /// External reference. The kind is inferred; anything that does not
    /// parse as an absolute URI is treated as a file path.
    pub fn external(location: impl Into<String>) -> Self {
        let raw = location.into();
        let kind = if !is_drive_path(&raw) && Url::parse(&raw).is_ok() {
            ExternalKind::Uri
        } else {
            ExternalKind::FilePath
        };
        Self::with_target(ReferenceTarget::External(ExternalLocation { raw, kind }))
    }

    /// Classifies `$ref` text and builds the matching reference.
    ///
    /// Internal pointers keep their text; the target key is the last
    /// non-empty segment, unescaped and percent-decoded.
    pub fn parse(text: &str) -> Self {
        if let Some(kind) = classify_external(text) {
            return Self::with_target(ReferenceTarget::External(ExternalLocation {
                raw: text.to_string(),
                kind,
            }));
        }
        Self::with_target(ReferenceTarget::Key {
            name: pointer_target_key(text),
            pointer: Some(text.to_string()),
        })
    }

    /// The target.
    pub fn target(&self) -> &ReferenceTarget {
        &self.target
    }

    /// Target key for key references.
    pub fn target_key(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::Key { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Replaces the target. Any cached path is dropped.
    pub fn set_target(&mut self, target: ReferenceTarget) {
        self.target = target;
        self.cache.replace(None);
    }

    /// `true` for external locations.
    pub fn is_external(&self) -> bool {
        matches!(self.target, ReferenceTarget::External(_))
    }

    /// The document this reference is bound to.
    pub fn binding(&self) -> Option<DocumentId> {
        self.binding
    }

    /// Lifecycle state from the reference alone. A path cached against an
    /// older revision of the bound document still reads as resolved here; use
    /// [`state_in`](Self::state_in) to account for later document changes.
    pub fn state(&self) -> ReferenceState {
        if self.is_external() {
            return ReferenceState::ExternalBound;
        }
        match self.binding {
            None => ReferenceState::Unbound,
            Some(id) => match self.cache.borrow().as_ref() {
                Some(cached) if cached.document == id => ReferenceState::InternalResolved,
                _ => ReferenceState::InternalUnresolved,
            },
        }
    }

    /// Lifecycle state relative to `document`. A cached path only counts
    /// when it was computed against this document at its current revision.
    pub fn state_in(&self, document: &Document) -> ReferenceState {
        match self.state() {
            ReferenceState::InternalResolved if !self.cache_is_current(document) => {
                ReferenceState::InternalUnresolved
            }
            state => state,
        }
    }

    /// `true` for external references and for internal ones that are bound
    /// to `document` and whose target can be found in it.
    pub fn is_valid(&self, document: &Document) -> bool {
        self.is_external() || self.resolve(document).is_ok()
    }

    fn cache_is_current(&self, document: &Document) -> bool {
        self.cache.borrow().as_ref().is_some_and(|cached| {
            cached.document == document.id() && cached.revision == document.revision()
        })
    }

    /// Binds an internal reference to `document`. External references are
    /// left unchanged.
    pub fn bind(&mut self, document: &Document) {
        self.bind_to_id(document.id());
    }

    /// Binds to a document by id. Used by a document binding its own tree.
    pub fn bind_to_id(&mut self, document: DocumentId) {
        if self.is_external() {
            return;
        }
        trace!(
            reference = self.logical_text().unwrap_or("<node>"),
            %document,
            "binding reference"
        );
        self.binding = Some(document);
        self.cache.replace(None);
    }

    /// Removes the document binding.
    pub fn unbind(&mut self) {
        self.binding = None;
        self.cache.replace(None);
    }

    /// Text written for this reference when no resolved path is available:
    /// the pointer it was decoded from, the target key, or the external
    /// location. Node targets have none.
    pub fn logical_text(&self) -> Option<&str> {
        match &self.target {
            ReferenceTarget::Key { name, pointer } => Some(pointer.as_deref().unwrap_or(name)),
            ReferenceTarget::External(location) => Some(location.as_str()),
            ReferenceTarget::Node(_) => None,
        }
    }

    /// Computes the key path of the target inside `document`.
    ///
    /// Repeated calls against an unchanged document return the cached path
    /// without searching again.
    pub fn resolve(&self, document: &Document) -> AppResult<Vec<String>> {
        let needle = match &self.target {
            ReferenceTarget::External(location) => {
                return Err(AppError::ExternalReference(location.as_str().to_string()));
            }
            ReferenceTarget::Key { name, .. } => SearchTarget::Key(name),
            ReferenceTarget::Node(node) => SearchTarget::Node(node),
        };

        match self.binding {
            Some(id) if id == document.id() => {}
            Some(id) => {
                return Err(AppError::NoDocumentBound(format!(
                    "reference is bound to document {} but was resolved against document {}",
                    id,
                    document.id()
                )));
            }
            None => {
                return Err(AppError::NoDocumentBound(format!(
                    "reference '{}' has not been bound to a document",
                    self.logical_text().unwrap_or("<node>")
                )));
            }
        }

        if self.cache_is_current(document) {
            if let Some(cached) = self.cache.borrow().as_ref() {
                return Ok(cached.path.clone());
            }
        }

        let path = document.locate(needle)?;
        debug!(path = ?path, document = %document.id(), "resolved reference");
        self.cache.replace(Some(CachedPath {
            document: document.id(),
            revision: document.revision(),
            path: path.clone(),
        }));
        Ok(path)
    }

    /// Pointer text for `$ref`: `#/seg/…/seg/` for internal targets, the
    /// literal location for external ones.
    pub fn json_pointer(&self, document: &Document) -> AppResult<String> {
        if let ReferenceTarget::External(location) = &self.target {
            return Ok(location.as_str().to_string());
        }
        let path = self.resolve(document)?;
        Ok(render_pointer(&path))
    }
}

/// Renders a key path as `#/seg/…/seg/`.
pub fn render_pointer(path: &[String]) -> String {
    let mut out = String::from("#/");
    for segment in path {
        out.push_str(&escape_pointer_segment(segment));
        out.push('/');
    }
    out
}

/// Escapes a JSON Pointer segment (`~` → `~0`, `/` → `~1`).
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Decodes a JSON Pointer segment (handles `~1`, `~0` and percent-encoding).
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded).decode_utf8_lossy().into_owned()
}

/// Target key of internal pointer text: its last non-empty segment.
fn pointer_target_key(text: &str) -> String {
    let body = text.strip_prefix('#').unwrap_or(text);
    body.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(decode_pointer_segment)
        .unwrap_or_default()
}

fn filesystem_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"(?i)^(?:\.{1,2}[\\/]|~[\\/])|[\\/]|\.(?:json|ya?ml)(?:#.*)?$")
            .expect("Invalid regex")
    })
}

fn is_drive_path(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Returns the external kind of `$ref` text, or `None` when it is internal.
pub fn classify_external(text: &str) -> Option<ExternalKind> {
    if text.starts_with('#') {
        return None;
    }
    if is_drive_path(text) {
        return Some(ExternalKind::FilePath);
    }
    if Url::parse(text).is_ok() {
        return Some(ExternalKind::Uri);
    }
    if filesystem_shape().is_match(text) {
        return Some(ExternalKind::FilePath);
    }
    None
}
