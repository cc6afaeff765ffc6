#![deny(missing_docs)]

//! # Path Resolver
//!
//! Depth-first search over the generic form of a document. Returns the chain
//! of keys leading to the first entry whose key, or whose value, equals the
//! target.
//!
//! Only mappings are descended; arrays and scalars are leaves. Sibling order
//! is the order of the underlying map, so the first match in document order
//! wins.

use crate::error::{AppError, AppResult};
use serde_json::{Map, Value};

/// What the resolver looks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchTarget<'a> {
    /// A key; also matches a string value equal to it.
    Key(&'a str),
    /// A value, compared structurally.
    Node(&'a Value),
}

impl SearchTarget<'_> {
    fn matches(&self, key: &str, value: &Value) -> bool {
        match self {
            SearchTarget::Key(name) => key == *name || value.as_str() == Some(*name),
            SearchTarget::Node(node) => value == *node,
        }
    }

    fn describe(&self) -> String {
        match self {
            SearchTarget::Key(name) => format!("key '{}'", name),
            SearchTarget::Node(node) => format!("node {}", node),
        }
    }
}

/// Bounded depth-first search.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    max_depth: usize,
    skipped_key: Option<String>,
}

impl PathResolver {
    /// Resolver that gives up below `max_depth` nested mappings.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            skipped_key: None,
        }
    }

    /// Entries under `key` are neither matched nor descended. Documents use
    /// this to keep reference markers out of the search.
    pub fn skipping(mut self, key: impl Into<String>) -> Self {
        self.skipped_key = Some(key.into());
        self
    }

    /// Finds the key path of `target` inside `root`.
    pub fn find(&self, root: &Value, target: SearchTarget<'_>) -> AppResult<Vec<String>> {
        let Value::Object(map) = root else {
            return Err(AppError::type_mismatch(
                "document",
                "a mapping at the root",
                root,
            ));
        };

        let mut path = Vec::new();
        if self.walk(map, target, &mut path, 0)? {
            Ok(path)
        } else {
            Err(AppError::ReferenceNotFound(target.describe()))
        }
    }

    fn walk(
        &self,
        map: &Map<String, Value>,
        target: SearchTarget<'_>,
        path: &mut Vec<String>,
        depth: usize,
    ) -> AppResult<bool> {
        if depth > self.max_depth {
            return Err(AppError::CycleOrDepthExceeded {
                depth: self.max_depth,
            });
        }

        for (key, value) in map {
            if self.skipped_key.as_deref() == Some(key.as_str()) {
                continue;
            }
            if target.matches(key, value) {
                path.push(key.clone());
                return Ok(true);
            }
            if let Value::Object(child) = value {
                path.push(key.clone());
                if self.walk(child, target, path, depth + 1)? {
                    return Ok(true);
                }
                path.pop();
            }
        }

        Ok(false)
    }
}
