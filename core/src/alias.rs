#![deny(missing_docs)]

//! # Key Aliases
//!
//! Documents arrive in one of two key-naming conventions: the wire
//! convention used by the specification (`allOf`, `requestBody`) and the
//! snake_case convention used by programmatic callers (`all_of`,
//! `request_body`). Every recognized field is looked up under both.

use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Which convention encoded output uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStyle {
    /// `allOf`, `externalDocs`, …
    #[default]
    Wire,
    /// `all_of`, `external_documentation`, …
    Snake,
}

/// A field name in both conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAlias {
    wire: Cow<'static, str>,
    snake: Cow<'static, str>,
}

macro_rules! aliases {
    ($($name:ident => $wire:literal, $snake:literal;)*) => {
        $(
            #[doc = concat!("`", $wire, "` / `", $snake, "`")]
            pub const $name: KeyAlias = KeyAlias::fixed($wire, $snake);
        )*
    };
}

impl KeyAlias {
    aliases! {
        TITLE => "title", "title";
        DESCRIPTION => "description", "description";
        TYPE => "type", "type";
        DEFAULT => "default", "default";
        EXAMPLE => "example", "example";
        FORMAT => "format", "format";
        ENUM => "enum", "enum";
        NULLABLE => "nullable", "nullable";
        DEPRECATED => "deprecated", "deprecated";
        READ_ONLY => "readOnly", "read_only";
        WRITE_ONLY => "writeOnly", "write_only";
        EXTERNAL_DOCS => "externalDocs", "external_documentation";
        XML => "xml", "XML";
        DISCRIMINATOR => "discriminator", "discriminator";
        ALL_OF => "allOf", "all_of";
        ANY_OF => "anyOf", "any_of";
        ONE_OF => "oneOf", "one_of";
        NOT => "not", "not";
        MULTIPLE_OF => "multipleOf", "multiple_of";
        MAXIMUM => "maximum", "maximum";
        EXCLUSIVE_MAXIMUM => "exclusiveMaximum", "exclusive_maximum";
        MINIMUM => "minimum", "minimum";
        EXCLUSIVE_MINIMUM => "exclusiveMinimum", "exclusive_minimum";
        MAX_LENGTH => "maxLength", "max_length";
        MIN_LENGTH => "minLength", "min_length";
        PATTERN => "pattern", "pattern";
        MAX_ITEMS => "maxItems", "max_items";
        MIN_ITEMS => "minItems", "min_items";
        UNIQUE_ITEMS => "uniqueItems", "unique_items";
        ITEMS => "items", "items";
        MAX_PROPERTIES => "maxProperties", "max_properties";
        MIN_PROPERTIES => "minProperties", "min_properties";
        REQUIRED => "required", "required";
        PROPERTIES => "properties", "properties";
        ADDITIONAL_PROPERTIES => "additionalProperties", "additional_properties";
        PROPERTY_NAME => "propertyName", "property_name";
        MAPPING => "mapping", "mapping";
        URL => "url", "url";
        NAME => "name", "name";
        NAMESPACE => "namespace", "namespace";
        PREFIX => "prefix", "prefix";
        ATTRIBUTE => "attribute", "attribute";
        WRAPPED => "wrapped", "wrapped";
    }

    /// An alias pair known at compile time.
    pub const fn fixed(wire: &'static str, snake: &'static str) -> Self {
        Self {
            wire: Cow::Borrowed(wire),
            snake: Cow::Borrowed(snake),
        }
    }

    /// Derives the pair from a snake_case name, e.g. `request_body` →
    /// `requestBody`.
    pub fn from_snake(snake: &str) -> Self {
        Self {
            wire: Cow::Owned(snake.to_lower_camel_case()),
            snake: Cow::Owned(snake.to_string()),
        }
    }

    /// Derives the pair from a wire name, e.g. `requestBody` →
    /// `request_body`.
    pub fn from_wire(wire: &str) -> Self {
        Self {
            wire: Cow::Owned(wire.to_string()),
            snake: Cow::Owned(wire.to_snake_case()),
        }
    }

    /// The wire spelling.
    pub fn wire(&self) -> &str {
        &self.wire
    }

    /// The snake_case spelling.
    pub fn snake(&self) -> &str {
        &self.snake
    }

    /// The spelling used for output in `style`.
    pub fn key(&self, style: KeyStyle) -> &str {
        match style {
            KeyStyle::Wire => self.wire(),
            KeyStyle::Snake => self.snake(),
        }
    }

    /// Returns `true` if `key` is either spelling.
    pub fn matches(&self, key: &str) -> bool {
        key == self.wire() || key == self.snake()
    }

    /// Removes the field from `map`, trying the wire spelling first.
    ///
    /// If both spellings are present only the first is taken; the other
    /// stays in the map and ends up with the leftovers.
    pub fn take(&self, map: &mut Map<String, Value>) -> Option<Value> {
        map.shift_remove(self.wire())
            .or_else(|| map.shift_remove(self.snake()))
    }
}

/// Normalizes any key to the wire convention. Keys already in wire form are
/// returned unchanged.
pub fn to_wire(key: &str) -> Cow<'_, str> {
    if let Some(alias) = KeyAlias::lookup(key) {
        return Cow::Owned(alias.wire().to_string());
    }
    if !key.contains('_') {
        return Cow::Borrowed(key);
    }
    Cow::Owned(KeyAlias::from_snake(key).wire().to_string())
}

/// Normalizes any key to the snake_case convention.
pub fn to_snake(key: &str) -> Cow<'_, str> {
    if let Some(alias) = KeyAlias::lookup(key) {
        return Cow::Owned(alias.snake().to_string());
    }
    if !key.chars().any(|c| c.is_ascii_uppercase()) {
        return Cow::Borrowed(key);
    }
    Cow::Owned(KeyAlias::from_wire(key).snake().to_string())
}

/// Spells `key` in `style`.
pub fn restyle(key: &str, style: KeyStyle) -> Cow<'_, str> {
    match style {
        KeyStyle::Wire => to_wire(key),
        KeyStyle::Snake => to_snake(key),
    }
}

impl KeyAlias {
    /// Aliases whose two spellings are not a plain case conversion of each
    /// other, or which the schema object recognizes.
    pub fn known() -> &'static [KeyAlias] {
        const KNOWN: &[KeyAlias] = &[
            KeyAlias::READ_ONLY,
            KeyAlias::WRITE_ONLY,
            KeyAlias::EXTERNAL_DOCS,
            KeyAlias::ALL_OF,
            KeyAlias::ANY_OF,
            KeyAlias::ONE_OF,
            KeyAlias::MULTIPLE_OF,
            KeyAlias::EXCLUSIVE_MAXIMUM,
            KeyAlias::EXCLUSIVE_MINIMUM,
            KeyAlias::MAX_LENGTH,
            KeyAlias::MIN_LENGTH,
            KeyAlias::MAX_ITEMS,
            KeyAlias::MIN_ITEMS,
            KeyAlias::UNIQUE_ITEMS,
            KeyAlias::MAX_PROPERTIES,
            KeyAlias::MIN_PROPERTIES,
            KeyAlias::ADDITIONAL_PROPERTIES,
            KeyAlias::PROPERTY_NAME,
        ];
        KNOWN
    }

    fn lookup(key: &str) -> Option<&'static KeyAlias> {
        Self::known().iter().find(|alias| alias.matches(key))
    }
}
