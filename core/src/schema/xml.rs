#![deny(missing_docs)]

//! # XML Object
//!
//! Hints for rendering a schema as XML. Only carried through; nothing in
//! this crate produces XML.

use crate::extensions::ExtensionBag;

/// XML representation of a property or type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Xml {
    /// Element or attribute name.
    pub name: Option<String>,
    /// Namespace URI.
    pub namespace: Option<String>,
    /// Namespace prefix.
    pub prefix: Option<String>,
    /// Render as an attribute instead of an element.
    pub attribute: Option<bool>,
    /// Wrap array items in an outer element.
    pub wrapped: Option<bool>,
    /// Vendor extensions.
    pub extensions: ExtensionBag,
}

impl Xml {
    /// `attribute`, reading `false` when absent.
    pub fn is_attribute(&self) -> bool {
        self.attribute.unwrap_or(false)
    }

    /// `wrapped`, reading `false` when absent.
    pub fn is_wrapped(&self) -> bool {
        self.wrapped.unwrap_or(false)
    }
}
