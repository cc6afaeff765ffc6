#![deny(missing_docs)]

//! Typed graph → generic value.
//!
//! Fields are written in the order they are decoded, facet groups only when
//! `kind` is unset or matches the group, and extensions last.

use crate::alias::KeyAlias;
use crate::codec::options::{CodecOptions, UnresolvedPolicy};
use crate::document::Document;
use crate::error::{AppError, AppResult};
use crate::extensions::ExtensionBag;
use crate::reference::Reference;
use crate::schema::{
    AdditionalProperties, Discriminator, ExternalDocs, SchemaKind, SchemaNode, SchemaOrRef, Xml,
};
use serde_json::{Map, Value};
use tracing::warn;

/// How references are written.
#[derive(Clone, Copy)]
pub(crate) enum Pointers<'a> {
    /// Logical text; node targets as `null`. Never fails.
    Search,
    /// Logical text; node targets follow the unresolved policy.
    Detached,
    /// Resolved against a document, falling back to the unresolved policy.
    Within(&'a Document),
}

pub(crate) struct Encoder<'a> {
    opts: &'a CodecOptions,
    pointers: Pointers<'a>,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(opts: &'a CodecOptions, pointers: Pointers<'a>) -> Self {
        Self { opts, pointers }
    }

    pub(crate) fn member(&self, member: &SchemaOrRef, depth: usize) -> AppResult<Value> {
        match member {
            SchemaOrRef::Schema(node) => self.schema(node, depth),
            SchemaOrRef::Reference(reference) => {
                let mut out = Map::new();
                out.insert(self.opts.reference_key.clone(), self.pointer(reference)?);
                Ok(Value::Object(out))
            }
            SchemaOrRef::Unresolved(value) => Ok(value.clone()),
        }
    }

    /// The `$ref` value written for `reference`.
    fn pointer(&self, reference: &Reference) -> AppResult<Value> {
        let logical = reference.logical_text().map(|t| Value::String(t.to_string()));
        match self.pointers {
            Pointers::Search => Ok(logical.unwrap_or(Value::Null)),
            Pointers::Detached => match logical {
                Some(text) => Ok(text),
                None => self.fallback(
                    reference,
                    AppError::NoDocumentBound("node reference encoded without a document".into()),
                ),
            },
            Pointers::Within(document) => match reference.json_pointer(document) {
                Ok(pointer) => Ok(Value::String(pointer)),
                Err(err) => self.fallback(reference, err),
            },
        }
    }

    fn fallback(&self, reference: &Reference, err: AppError) -> AppResult<Value> {
        let substitute = match &self.opts.unresolved {
            UnresolvedPolicy::Fail => return Err(err),
            UnresolvedPolicy::Verbatim => match reference.logical_text() {
                Some(text) => Value::String(text.to_string()),
                None => return Err(err),
            },
            UnresolvedPolicy::Placeholder(value) => value.clone(),
        };
        warn!(
            reference = reference.logical_text().unwrap_or("<node>"),
            error = %err,
            substitute = %substitute,
            "writing unresolved reference"
        );
        Ok(substitute)
    }

    fn put(&self, out: &mut Map<String, Value>, alias: &KeyAlias, value: Value) {
        out.insert(alias.key(self.opts.key_style).to_string(), value);
    }

    fn put_opt<T: Into<Value> + Clone>(
        &self,
        out: &mut Map<String, Value>,
        alias: &KeyAlias,
        value: &Option<T>,
    ) {
        if let Some(v) = value {
            self.put(out, alias, v.clone().into());
        }
    }

    pub(crate) fn schema(&self, node: &SchemaNode, depth: usize) -> AppResult<Value> {
        if depth > self.opts.max_depth {
            return Err(AppError::CycleOrDepthExceeded {
                depth: self.opts.max_depth,
            });
        }
        let mut out = Map::new();
        let kind = node.kind;
        let group = |g: fn(SchemaKind) -> bool| kind.map_or(true, g);

        // METADATA
        self.put_opt(&mut out, &KeyAlias::TITLE, &node.title);
        self.put_opt(&mut out, &KeyAlias::DESCRIPTION, &node.description);
        if let Some(kind) = kind {
            self.put(&mut out, &KeyAlias::TYPE, Value::String(kind.as_str().into()));
        }
        self.put_opt(&mut out, &KeyAlias::DEFAULT, &node.default);
        self.put_opt(&mut out, &KeyAlias::EXAMPLE, &node.example);
        self.put_opt(&mut out, &KeyAlias::FORMAT, &node.format);
        if node.has_enum() {
            self.put(&mut out, &KeyAlias::ENUM, Value::Array(node.enum_values().to_vec()));
        }
        self.put_opt(&mut out, &KeyAlias::NULLABLE, &node.nullable);
        self.put_opt(&mut out, &KeyAlias::DEPRECATED, &node.deprecated);
        self.put_opt(&mut out, &KeyAlias::READ_ONLY, &node.read_only);
        self.put_opt(&mut out, &KeyAlias::WRITE_ONLY, &node.write_only);
        if let Some(docs) = &node.external_docs {
            self.put(&mut out, &KeyAlias::EXTERNAL_DOCS, self.external_docs(docs)?);
        }
        if let Some(xml) = &node.xml {
            self.put(&mut out, &KeyAlias::XML, self.xml(xml)?);
        }

        // COMPOSITION
        if let Some(discriminator) = &node.discriminator {
            self.put(&mut out, &KeyAlias::DISCRIMINATOR, self.discriminator(discriminator)?);
        }
        for (alias, list) in [
            (&KeyAlias::ALL_OF, &node.all_of),
            (&KeyAlias::ANY_OF, &node.any_of),
            (&KeyAlias::ONE_OF, &node.one_of),
        ] {
            if !list.is_empty() {
                let items = list
                    .iter()
                    .map(|m| self.member(m, depth + 1))
                    .collect::<AppResult<Vec<_>>>()?;
                self.put(&mut out, alias, Value::Array(items));
            }
        }
        if let Some(not) = &node.not {
            self.put(&mut out, &KeyAlias::NOT, self.member(not, depth + 1)?);
        }

        if group(SchemaKind::is_numeric) {
            if let Some(v) = node.declared_multiple_of() {
                self.put(&mut out, &KeyAlias::MULTIPLE_OF, v.into());
            }
            if let Some(v) = node.maximum() {
                self.put(&mut out, &KeyAlias::MAXIMUM, Value::Number(v.clone()));
            }
            let exclusive_maximum = node.declared_exclusive_maximum();
            self.put_opt(&mut out, &KeyAlias::EXCLUSIVE_MAXIMUM, &exclusive_maximum);
            if let Some(v) = node.minimum() {
                self.put(&mut out, &KeyAlias::MINIMUM, Value::Number(v.clone()));
            }
            let exclusive_minimum = node.declared_exclusive_minimum();
            self.put_opt(&mut out, &KeyAlias::EXCLUSIVE_MINIMUM, &exclusive_minimum);
        }

        if group(|k| k == SchemaKind::String) {
            self.put_opt(&mut out, &KeyAlias::MAX_LENGTH, &node.max_length);
            self.put_opt(&mut out, &KeyAlias::MIN_LENGTH, &node.min_length);
            self.put_opt(&mut out, &KeyAlias::PATTERN, &node.pattern);
        }

        if group(|k| k == SchemaKind::Array) {
            self.put_opt(&mut out, &KeyAlias::MAX_ITEMS, &node.max_items);
            self.put_opt(&mut out, &KeyAlias::MIN_ITEMS, &node.min_items);
            self.put_opt(&mut out, &KeyAlias::UNIQUE_ITEMS, &node.unique_items);
            if let Some(items) = &node.items {
                self.put(&mut out, &KeyAlias::ITEMS, self.member(items, depth + 1)?);
            }
        }

        if group(|k| k == SchemaKind::Object) {
            self.put_opt(&mut out, &KeyAlias::MAX_PROPERTIES, &node.max_properties);
            self.put_opt(&mut out, &KeyAlias::MIN_PROPERTIES, &node.min_properties);
            if let Some(required) = &node.required {
                let names = required.iter().cloned().map(Value::String).collect();
                self.put(&mut out, &KeyAlias::REQUIRED, Value::Array(names));
            }
            if let Some(properties) = &node.properties {
                let mut map = Map::new();
                for (name, member) in properties {
                    map.insert(name.clone(), self.member(member, depth + 1)?);
                }
                self.put(&mut out, &KeyAlias::PROPERTIES, Value::Object(map));
            }
            match &node.additional_properties {
                Some(AdditionalProperties::Allowed(flag)) => {
                    self.put(&mut out, &KeyAlias::ADDITIONAL_PROPERTIES, Value::Bool(*flag))
                }
                Some(AdditionalProperties::Schema(member)) => {
                    let value = self.member(member, depth + 1)?;
                    self.put(&mut out, &KeyAlias::ADDITIONAL_PROPERTIES, value)
                }
                None => {}
            }
        }

        self.finish(out, &node.extensions)
    }

    fn discriminator(&self, discriminator: &Discriminator) -> AppResult<Value> {
        let mut out = Map::new();
        self.put(
            &mut out,
            &KeyAlias::PROPERTY_NAME,
            Value::String(discriminator.property_name.clone()),
        );
        if !discriminator.mapping.is_empty() {
            let mut mapping = Map::new();
            for (selector, reference) in &discriminator.mapping {
                let target = self.pointer(reference)?;
                let target = match self.pointers {
                    // Reference-shaped so the path search passes over it.
                    Pointers::Search => {
                        let mut wrapped = Map::new();
                        wrapped.insert(self.opts.reference_key.clone(), target);
                        Value::Object(wrapped)
                    }
                    _ => target,
                };
                mapping.insert(selector.clone(), target);
            }
            self.put(&mut out, &KeyAlias::MAPPING, Value::Object(mapping));
        }
        self.finish(out, &discriminator.extensions)
    }

    fn external_docs(&self, docs: &ExternalDocs) -> AppResult<Value> {
        let mut out = Map::new();
        self.put(&mut out, &KeyAlias::URL, Value::String(docs.url.clone()));
        self.put_opt(&mut out, &KeyAlias::DESCRIPTION, &docs.description);
        self.finish(out, &docs.extensions)
    }

    fn xml(&self, xml: &Xml) -> AppResult<Value> {
        let mut out = Map::new();
        self.put_opt(&mut out, &KeyAlias::NAME, &xml.name);
        self.put_opt(&mut out, &KeyAlias::NAMESPACE, &xml.namespace);
        self.put_opt(&mut out, &KeyAlias::PREFIX, &xml.prefix);
        self.put_opt(&mut out, &KeyAlias::ATTRIBUTE, &xml.attribute);
        self.put_opt(&mut out, &KeyAlias::WRAPPED, &xml.wrapped);
        self.finish(out, &xml.extensions)
    }

    fn finish(&self, mut out: Map<String, Value>, extensions: &ExtensionBag) -> AppResult<Value> {
        extensions.merge_into(&mut out, self.opts.key_style)?;
        Ok(Value::Object(out))
    }
}
