#![deny(missing_docs)]

//! # Discriminator
//!
//! Names the property whose value selects one member of a composition list.

use crate::extensions::ExtensionBag;
use crate::reference::Reference;
use indexmap::IndexMap;

/// Polymorphism hint attached to a schema with a composition list.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    /// Name of the property in the payload that holds the selector.
    pub property_name: String,
    /// Selector value to member schema.
    pub mapping: IndexMap<String, Reference>,
    /// Vendor extensions.
    pub extensions: ExtensionBag,
}

impl Discriminator {
    /// Creates a discriminator with an empty mapping.
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            mapping: IndexMap::new(),
            extensions: ExtensionBag::new(),
        }
    }

    /// Adds a selector value.
    pub fn with_mapping(mut self, value: impl Into<String>, target: Reference) -> Self {
        self.mapping.insert(value.into(), target);
        self
    }

    /// The schema selected by `value`, if mapped.
    pub fn target_for(&self, value: &str) -> Option<&Reference> {
        self.mapping.get(value)
    }
}
