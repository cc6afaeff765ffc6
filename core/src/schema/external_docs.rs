#![deny(missing_docs)]

//! # External Documentation

use crate::extensions::ExtensionBag;

/// A link to documentation outside the API description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDocs {
    /// Target URL. Kept as text; URL grammar is not checked here.
    pub url: String,
    /// Short description (CommonMark).
    pub description: Option<String>,
    /// Vendor extensions.
    pub extensions: ExtensionBag,
}

impl ExternalDocs {
    /// Creates a link without a description.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}
