#![deny(missing_docs)]

//! # Codec Options
//!
//! Knobs for decoding and encoding. Loadable from a YAML (or JSON) snippet so
//! a caller can keep them next to its other configuration:
//!
//! ```yaml
//! strict: true
//! keyStyle: snake
//! maxDepth: 64
//! unresolved: verbatim
//! ```

use crate::alias::KeyStyle;
use crate::error::AppResult;
use crate::reference::REFERENCE_KEY;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default bound for every recursive walk.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What `encode` writes for an internal reference that cannot be resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnresolvedPolicy {
    /// Propagate the resolution error.
    #[default]
    Fail,
    /// Write the pointer text the reference was decoded from, or its key,
    /// and log a warning.
    Verbatim,
    /// Write this value as the `$ref` value and log a warning.
    Placeholder(Value),
}

/// Codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodecOptions {
    /// Reject raw members and unprefixed leftover keys.
    pub strict: bool,
    /// Key that marks a mapping as a reference.
    pub reference_key: String,
    /// Key convention of encoded output.
    pub key_style: KeyStyle,
    /// Encoding of unresolvable internal references.
    pub unresolved: UnresolvedPolicy,
    /// Bound on nesting for decode, encode and resolution.
    pub max_depth: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            strict: false,
            reference_key: REFERENCE_KEY.to_string(),
            key_style: KeyStyle::Wire,
            unresolved: UnresolvedPolicy::Fail,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CodecOptions {
    /// Parses options from YAML; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Sets strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the reference marker key.
    pub fn with_reference_key(mut self, key: impl Into<String>) -> Self {
        self.reference_key = key.into();
        self
    }

    /// Sets the output key convention.
    pub fn with_key_style(mut self, style: KeyStyle) -> Self {
        self.key_style = style;
        self
    }

    /// Sets the unresolved-reference policy.
    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }

    /// Sets the depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
