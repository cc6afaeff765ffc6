#![deny(missing_docs)]

//! # Specification Extensions
//!
//! Vendor keys (`x-…`) attached to any object of the model. Keys are stored
//! without their prefix and re-prefixed when merged back into an encoded
//! object. Leftover keys that did not carry the prefix in the source are kept
//! without one and written in the output key style.

use crate::alias::{restyle, KeyStyle};
use crate::error::{AppError, AppResult};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Prefix that marks a key as a specification extension.
pub const EXTENSION_PREFIX: &str = "x-";

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    value: Value,
    /// `true` when the wire key carries [`EXTENSION_PREFIX`].
    prefixed: bool,
}

/// Ordered side-channel of vendor-defined keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionBag {
    entries: IndexMap<String, Entry>,
}

impl ExtensionBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a vendor extension. `name` may be given with or without the
    /// `x-` prefix; it is stored without it. Returns the previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: Value) -> Option<Value> {
        let name = strip_prefix(name.as_ref());
        self.entries
            .insert(
                name.to_string(),
                Entry {
                    value,
                    prefixed: true,
                },
            )
            .map(|e| e.value)
    }

    /// Inserts a key that is written back exactly as given, without a prefix.
    pub fn insert_verbatim(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries
            .insert(
                key.into(),
                Entry {
                    value,
                    prefixed: false,
                },
            )
            .map(|e| e.value)
    }

    /// Looks up an extension by name (prefix optional).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(strip_prefix(name)).map(|e| &e.value)
    }

    /// Removes an extension by name (prefix optional), keeping the order of
    /// the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries
            .shift_remove(strip_prefix(name))
            .map(|e| e.value)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(stored name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), &e.value))
    }

    /// Returns the key this entry is written under.
    pub fn wire_key(&self, name: &str) -> Option<String> {
        let name = strip_prefix(name);
        self.entries.get(name).map(|e| wire_key_for(name, e))
    }

    /// Moves every leftover key of a decoded object into the bag.
    ///
    /// Two keys that map to the same stored name (for example `x-flag` and
    /// `flag`) are ambiguous and rejected.
    pub fn absorb(&mut self, leftovers: Map<String, Value>) -> AppResult<()> {
        for (key, value) in leftovers {
            let prefixed = key.starts_with(EXTENSION_PREFIX);
            let name = strip_prefix(&key).to_string();
            if self.entries.contains_key(&name) {
                return Err(AppError::ExtensionKeyCollision(format!(
                    "'{}' maps to extension '{}' which is already present",
                    key, name
                )));
            }
            self.entries.insert(name, Entry { value, prefixed });
        }
        Ok(())
    }

    /// Merges the bag into an encoded object. Entries go after the
    /// first-class fields already in `out`; an entry whose key is already
    /// present is a caller error. Unprefixed entries are spelled in `style`,
    /// vendor extensions are written as stored.
    pub fn merge_into(&self, out: &mut Map<String, Value>, style: KeyStyle) -> AppResult<()> {
        for (name, entry) in &self.entries {
            let key = if entry.prefixed {
                wire_key_for(name, entry)
            } else {
                restyle(name, style).into_owned()
            };
            if out.contains_key(&key) {
                return Err(AppError::ExtensionKeyCollision(format!(
                    "extension '{}' collides with an existing field",
                    key
                )));
            }
            out.insert(key, entry.value.clone());
        }
        Ok(())
    }

    /// Overlays `other` onto this bag; entries of `other` win.
    pub fn extend_from(&mut self, other: ExtensionBag) {
        for (name, entry) in other.entries {
            self.entries.insert(name, entry);
        }
    }
}

fn strip_prefix(key: &str) -> &str {
    key.strip_prefix(EXTENSION_PREFIX).unwrap_or(key)
}

fn wire_key_for(name: &str, entry: &Entry) -> String {
    if entry.prefixed {
        format!("{}{}", EXTENSION_PREFIX, name)
    } else {
        name.to_string()
    }
}
