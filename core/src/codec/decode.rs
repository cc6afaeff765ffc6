#![deny(missing_docs)]

//! Generic value → typed graph.
//!
//! Each recognized field is popped from a working copy of the mapping (wire
//! spelling first, then the snake alias). What is left at the end becomes the
//! extension bag of the node.

use crate::alias::KeyAlias;
use crate::codec::options::CodecOptions;
use crate::document::DocumentEntry;
use crate::error::{AppError, AppResult};
use crate::extensions::{ExtensionBag, EXTENSION_PREFIX};
use crate::reference::Reference;
use crate::schema::{
    AdditionalProperties, Discriminator, ExclusiveBound, ExternalDocs, SchemaNode, SchemaOrRef,
    Xml,
};
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Number, Value};

pub(crate) struct Decoder<'a> {
    opts: &'a CodecOptions,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(opts: &'a CodecOptions) -> Self {
        Self { opts }
    }

    /// `true` for a single-key mapping holding the reference marker.
    pub(crate) fn is_reference(&self, map: &Map<String, Value>) -> bool {
        map.len() == 1 && map.contains_key(&self.opts.reference_key)
    }

    /// Decodes a mapping into a schema or a reference.
    pub(crate) fn any(&self, value: &Value, field: &str, depth: usize) -> AppResult<SchemaOrRef> {
        self.guard(depth)?;
        let Value::Object(map) = value else {
            return Err(AppError::type_mismatch(field, "a mapping", value));
        };
        if self.is_reference(map) {
            return Ok(SchemaOrRef::Reference(self.reference(map, field)?));
        }
        Ok(SchemaOrRef::Schema(Box::new(
            self.schema(map.clone(), field, depth)?,
        )))
    }

    /// Decodes a member slot. Non-mappings are kept raw unless strict.
    pub(crate) fn member(
        &self,
        value: &Value,
        field: &str,
        depth: usize,
    ) -> AppResult<SchemaOrRef> {
        match value {
            Value::Object(_) => self.any(value, field, depth),
            _ if self.opts.strict => Err(AppError::type_mismatch(
                field,
                "a schema or a reference",
                value,
            )),
            _ => Ok(SchemaOrRef::Unresolved(value.clone())),
        }
    }

    pub(crate) fn reference(&self, map: &Map<String, Value>, field: &str) -> AppResult<Reference> {
        let key = &self.opts.reference_key;
        match map.get(key) {
            Some(Value::String(text)) => Ok(Reference::parse(text)),
            Some(other) => Err(AppError::type_mismatch(
                format!("{}.{}", field, key),
                "a string",
                other,
            )),
            None => Err(AppError::type_mismatch(
                field,
                "a reference",
                &Value::Object(map.clone()),
            )),
        }
    }

    pub(crate) fn schema(
        &self,
        mut map: Map<String, Value>,
        field: &str,
        depth: usize,
    ) -> AppResult<SchemaNode> {
        let mut node = SchemaNode::new();
        self.apply(&mut node, &mut map, field, depth)?;
        self.leftovers(&mut node.extensions, map)?;
        Ok(node)
    }

    /// Pops every recognized field of `map` into `node`.
    pub(crate) fn apply(
        &self,
        node: &mut SchemaNode,
        map: &mut Map<String, Value>,
        field: &str,
        depth: usize,
    ) -> AppResult<()> {
        let at = |name: &str| join(field, name);

        // METADATA
        if let Some(v) = string(map, &KeyAlias::TITLE, field)? {
            node.title = Some(v);
        }
        if let Some(v) = string(map, &KeyAlias::DESCRIPTION, field)? {
            node.description = Some(v);
        }
        if let Some(v) = KeyAlias::TYPE.take(map) {
            match v {
                Value::String(token) => node.set_kind_token(&token)?,
                other => return Err(AppError::type_mismatch(at("type"), "a type name", &other)),
            }
        }
        if let Some(v) = KeyAlias::DEFAULT.take(map) {
            node.default = Some(v);
        }
        if let Some(v) = KeyAlias::EXAMPLE.take(map) {
            node.example = Some(v);
        }
        if let Some(v) = string(map, &KeyAlias::FORMAT, field)? {
            node.format = Some(v);
        }
        if let Some(v) = KeyAlias::ENUM.take(map) {
            match v {
                Value::Array(values) => node.set_enum_values(values),
                other => return Err(AppError::type_mismatch(at("enum"), "an array", &other)),
            }
        }
        if let Some(v) = boolean(map, &KeyAlias::NULLABLE, field)? {
            node.nullable = Some(v);
        }
        if let Some(v) = boolean(map, &KeyAlias::DEPRECATED, field)? {
            node.deprecated = Some(v);
        }
        if let Some(v) = boolean(map, &KeyAlias::READ_ONLY, field)? {
            node.read_only = Some(v);
        }
        if let Some(v) = boolean(map, &KeyAlias::WRITE_ONLY, field)? {
            node.write_only = Some(v);
        }
        if let Some(v) = KeyAlias::EXTERNAL_DOCS.take(map) {
            node.external_docs = Some(self.external_docs(v, &at("externalDocs"))?);
        }
        if let Some(v) = KeyAlias::XML.take(map) {
            node.xml = Some(self.xml(v, &at("xml"))?);
        }

        // COMPOSITION
        if let Some(v) = KeyAlias::DISCRIMINATOR.take(map) {
            node.discriminator = Some(self.discriminator(v, &at("discriminator"))?);
        }
        if let Some(v) = KeyAlias::ALL_OF.take(map) {
            node.all_of = self.members(&v, &at("allOf"), depth)?;
        }
        if let Some(v) = KeyAlias::ANY_OF.take(map) {
            node.any_of = self.members(&v, &at("anyOf"), depth)?;
        }
        if let Some(v) = KeyAlias::ONE_OF.take(map) {
            node.one_of = self.members(&v, &at("oneOf"), depth)?;
        }
        if let Some(v) = KeyAlias::NOT.take(map) {
            node.not = Some(self.member(&v, &at("not"), depth + 1)?);
        }

        // NUMERIC FACET
        if let Some(v) = unsigned(map, &KeyAlias::MULTIPLE_OF, field)? {
            node.set_multiple_of(v)?;
        }
        if let Some(v) = number(map, &KeyAlias::MAXIMUM, field)? {
            node.set_maximum(Some(v));
        }
        if let Some(v) = exclusive(map, &KeyAlias::EXCLUSIVE_MAXIMUM, field)? {
            node.set_exclusive_maximum(v)?;
        }
        if let Some(v) = number(map, &KeyAlias::MINIMUM, field)? {
            node.set_minimum(Some(v));
        }
        if let Some(v) = exclusive(map, &KeyAlias::EXCLUSIVE_MINIMUM, field)? {
            node.set_exclusive_minimum(v)?;
        }

        // STRING FACET
        if let Some(v) = unsigned(map, &KeyAlias::MAX_LENGTH, field)? {
            node.max_length = Some(v);
        }
        if let Some(v) = unsigned(map, &KeyAlias::MIN_LENGTH, field)? {
            node.min_length = Some(v);
        }
        if let Some(v) = string(map, &KeyAlias::PATTERN, field)? {
            node.pattern = Some(v);
        }

        // ARRAY FACET
        if let Some(v) = unsigned(map, &KeyAlias::MAX_ITEMS, field)? {
            node.max_items = Some(v);
        }
        if let Some(v) = unsigned(map, &KeyAlias::MIN_ITEMS, field)? {
            node.min_items = Some(v);
        }
        if let Some(v) = boolean(map, &KeyAlias::UNIQUE_ITEMS, field)? {
            node.unique_items = Some(v);
        }
        if let Some(v) = KeyAlias::ITEMS.take(map) {
            node.items = Some(self.member(&v, &at("items"), depth + 1)?);
        }

        // OBJECT FACET
        if let Some(v) = unsigned(map, &KeyAlias::MAX_PROPERTIES, field)? {
            node.max_properties = Some(v);
        }
        if let Some(v) = unsigned(map, &KeyAlias::MIN_PROPERTIES, field)? {
            node.min_properties = Some(v);
        }
        if let Some(v) = KeyAlias::REQUIRED.take(map) {
            node.required = Some(required(v, &at("required"))?);
        }
        if let Some(v) = KeyAlias::PROPERTIES.take(map) {
            node.properties = Some(self.properties(&v, &at("properties"), depth)?);
        }
        if let Some(v) = KeyAlias::ADDITIONAL_PROPERTIES.take(map) {
            let field = at("additionalProperties");
            node.additional_properties = Some(match v {
                Value::Bool(flag) => AdditionalProperties::Allowed(flag),
                Value::Object(_) => AdditionalProperties::Schema(self.any(&v, &field, depth + 1)?),
                other => {
                    return Err(AppError::type_mismatch(
                        field,
                        "a boolean or a schema",
                        &other,
                    ))
                }
            });
        }

        Ok(())
    }

    /// Moves leftover keys into `bag`, rejecting unprefixed ones when strict.
    pub(crate) fn leftovers(
        &self,
        bag: &mut ExtensionBag,
        map: Map<String, Value>,
    ) -> AppResult<()> {
        if self.opts.strict {
            if let Some(key) = map.keys().find(|k| !k.starts_with(EXTENSION_PREFIX)) {
                return Err(AppError::UnrecognizedField(key.clone()));
            }
        }
        bag.absorb(map)
    }

    fn members(&self, value: &Value, field: &str, depth: usize) -> AppResult<Vec<SchemaOrRef>> {
        let Value::Array(items) = value else {
            return Err(AppError::type_mismatch(field, "an array", value));
        };
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| self.member(item, &format!("{}[{}]", field, idx), depth + 1))
            .collect()
    }

    fn properties(
        &self,
        value: &Value,
        field: &str,
        depth: usize,
    ) -> AppResult<IndexMap<String, SchemaOrRef>> {
        let Value::Object(map) = value else {
            return Err(AppError::type_mismatch(field, "a mapping", value));
        };
        let mut out = IndexMap::with_capacity(map.len());
        for (name, item) in map {
            out.insert(name.clone(), self.member(item, &join(field, name), depth + 1)?);
        }
        Ok(out)
    }

    fn discriminator(&self, value: Value, field: &str) -> AppResult<Discriminator> {
        let Value::Object(mut map) = value else {
            return Err(AppError::type_mismatch(field, "a mapping", &value));
        };
        let Some(property_name) = string(&mut map, &KeyAlias::PROPERTY_NAME, field)? else {
            return Err(AppError::type_mismatch(
                join(field, "propertyName"),
                "a string",
                &Value::Null,
            ));
        };
        let mut discriminator = Discriminator::new(property_name);

        if let Some(v) = KeyAlias::MAPPING.take(&mut map) {
            let mapping_field = join(field, "mapping");
            let Value::Object(entries) = v else {
                return Err(AppError::type_mismatch(mapping_field, "a mapping", &v));
            };
            for (selector, target) in entries {
                let reference = match &target {
                    Value::String(text) => Reference::parse(text),
                    Value::Object(inner) if self.is_reference(inner) => {
                        self.reference(inner, &mapping_field)?
                    }
                    other => {
                        return Err(AppError::type_mismatch(
                            join(&mapping_field, &selector),
                            "a reference string",
                            other,
                        ))
                    }
                };
                discriminator.mapping.insert(selector, reference);
            }
        }

        self.leftovers(&mut discriminator.extensions, map)?;
        Ok(discriminator)
    }

    fn external_docs(&self, value: Value, field: &str) -> AppResult<ExternalDocs> {
        let Value::Object(mut map) = value else {
            return Err(AppError::type_mismatch(field, "a mapping", &value));
        };
        let Some(url) = string(&mut map, &KeyAlias::URL, field)? else {
            return Err(AppError::type_mismatch(join(field, "url"), "a string", &Value::Null));
        };
        let mut docs = ExternalDocs::new(url);
        docs.description = string(&mut map, &KeyAlias::DESCRIPTION, field)?;
        self.leftovers(&mut docs.extensions, map)?;
        Ok(docs)
    }

    fn xml(&self, value: Value, field: &str) -> AppResult<Xml> {
        let Value::Object(mut map) = value else {
            return Err(AppError::type_mismatch(field, "a mapping", &value));
        };
        let mut xml = Xml {
            name: string(&mut map, &KeyAlias::NAME, field)?,
            namespace: string(&mut map, &KeyAlias::NAMESPACE, field)?,
            prefix: string(&mut map, &KeyAlias::PREFIX, field)?,
            attribute: boolean(&mut map, &KeyAlias::ATTRIBUTE, field)?,
            wrapped: boolean(&mut map, &KeyAlias::WRAPPED, field)?,
            ..Xml::default()
        };
        self.leftovers(&mut xml.extensions, map)?;
        Ok(xml)
    }

    /// Builds document entries, typing the mappings on `path` as sections
    /// and the entries of the last one as definitions.
    pub(crate) fn entries(
        &self,
        map: &Map<String, Value>,
        path: &[String],
    ) -> AppResult<IndexMap<String, DocumentEntry>> {
        let mut out = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            let entry = match (path.split_first(), value) {
                (None, _) => DocumentEntry::Definition(self.member(value, key, 0)?),
                (Some((head, rest)), Value::Object(child)) if head == key => {
                    DocumentEntry::Section(self.entries(child, rest)?)
                }
                _ => DocumentEntry::Opaque(value.clone()),
            };
            out.insert(key.clone(), entry);
        }
        Ok(out)
    }

    fn guard(&self, depth: usize) -> AppResult<()> {
        if depth > self.opts.max_depth {
            return Err(AppError::CycleOrDepthExceeded {
                depth: self.opts.max_depth,
            });
        }
        Ok(())
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn mismatch(field: &str, alias: &KeyAlias, expected: &str, found: &Value) -> AppError {
    AppError::type_mismatch(join(field, alias.wire()), expected, found)
}

fn string(
    map: &mut Map<String, Value>,
    alias: &KeyAlias,
    field: &str,
) -> AppResult<Option<String>> {
    match alias.take(map) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(mismatch(field, alias, "a string", &other)),
    }
}

fn boolean(
    map: &mut Map<String, Value>,
    alias: &KeyAlias,
    field: &str,
) -> AppResult<Option<bool>> {
    match alias.take(map) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(other) => Err(mismatch(field, alias, "a boolean", &other)),
    }
}

fn number(
    map: &mut Map<String, Value>,
    alias: &KeyAlias,
    field: &str,
) -> AppResult<Option<Number>> {
    match alias.take(map) {
        None => Ok(None),
        Some(Value::Number(n)) => Ok(Some(n)),
        Some(other) => Err(mismatch(field, alias, "a number", &other)),
    }
}

/// Non-negative integers; integral floats such as `5.0` are accepted.
fn unsigned(
    map: &mut Map<String, Value>,
    alias: &KeyAlias,
    field: &str,
) -> AppResult<Option<u64>> {
    let Some(value) = alias.take(map) else {
        return Ok(None);
    };
    let name = join(field, alias.wire());
    let Value::Number(n) = &value else {
        return Err(AppError::type_mismatch(name, "a non-negative integer", &value));
    };
    if let Some(v) = n.as_u64() {
        return Ok(Some(v));
    }
    match n.as_f64() {
        Some(f) if f < 0.0 => Err(AppError::range(
            name,
            format!("must not be negative, got {}", n),
        )),
        Some(f) if f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(Some(f as u64)),
        _ => Err(AppError::type_mismatch(name, "a non-negative integer", &value)),
    }
}

fn exclusive(
    map: &mut Map<String, Value>,
    alias: &KeyAlias,
    field: &str,
) -> AppResult<Option<ExclusiveBound>> {
    match alias.take(map) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(ExclusiveBound::Flag(flag))),
        Some(Value::Number(limit)) => Ok(Some(ExclusiveBound::Limit(limit))),
        Some(other) => Err(mismatch(field, alias, "a boolean or a number", &other)),
    }
}

fn required(value: Value, field: &str) -> AppResult<IndexSet<String>> {
    let Value::Array(items) = value else {
        return Err(AppError::type_mismatch(field, "an array of strings", &value));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            other => Err(AppError::type_mismatch(field, "an array of strings", &other)),
        })
        .collect()
}
