#![deny(missing_docs)]

//! # Schema Objects
//!
//! The recursive constraint node of the model and its satellite objects.
//!
//! - **SchemaNode**: title/type metadata plus numeric, string, array and
//!   object facets, composition lists and a discriminator.
//! - **SchemaOrRef**: an owned node, a non-owning [`Reference`], or a raw
//!   member value that was not decoded.
//! - **discriminator / external_docs / xml**: small objects hanging off a
//!   schema.
//!
//! Setters validate only the field they touch. Requirements that depend on
//! `kind` (such as `items` for arrays) are left to
//! [`CompositionValidator`](crate::validation::CompositionValidator).

pub mod discriminator;
pub mod external_docs;
pub mod xml;

pub use discriminator::Discriminator;
pub use external_docs::ExternalDocs;
pub use xml::Xml;

use crate::error::{AppError, AppResult};
use crate::extensions::ExtensionBag;
use crate::reference::Reference;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// The primitive type a schema constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `object`
    Object,
    /// `array`
    Array,
    /// `number`
    Number,
    /// `string`
    String,
    /// `integer`
    Integer,
}

impl SchemaKind {
    /// All supported kinds, in OpenAPI order.
    pub const ALL: [SchemaKind; 7] = [
        SchemaKind::Null,
        SchemaKind::Boolean,
        SchemaKind::Object,
        SchemaKind::Array,
        SchemaKind::Number,
        SchemaKind::String,
        SchemaKind::Integer,
    ];

    /// The wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Object => "object",
            SchemaKind::Array => "array",
            SchemaKind::Number => "number",
            SchemaKind::String => "string",
            SchemaKind::Integer => "integer",
        }
    }

    /// `number` or `integer`.
    pub fn is_numeric(self) -> bool {
        matches!(self, SchemaKind::Number | SchemaKind::Integer)
    }
}

impl FromStr for SchemaKind {
    type Err = AppError;

    /// Tokens are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        SchemaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| AppError::UnsupportedKind(s.to_string()))
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member slot of a schema: `items`, `not`, composition entries, property
/// values and schema-valued `additionalProperties`.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaOrRef {
    /// An owned, nested schema.
    Schema(Box<SchemaNode>),
    /// A pointer elsewhere; never owns its target.
    Reference(Reference),
    /// A raw value kept as-is (for example a boolean schema). Round-trips
    /// verbatim and is always reported by the validator.
    Unresolved(Value),
}

impl SchemaOrRef {
    /// Returns the schema if this slot holds one.
    pub fn as_schema(&self) -> Option<&SchemaNode> {
        match self {
            SchemaOrRef::Schema(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable access to the schema if this slot holds one.
    pub fn as_schema_mut(&mut self) -> Option<&mut SchemaNode> {
        match self {
            SchemaOrRef::Schema(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the reference if this slot holds one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            SchemaOrRef::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// `true` for a schema or a reference, `false` for a raw value.
    pub fn is_typed(&self) -> bool {
        !matches!(self, SchemaOrRef::Unresolved(_))
    }
}

impl From<SchemaNode> for SchemaOrRef {
    fn from(node: SchemaNode) -> Self {
        SchemaOrRef::Schema(Box::new(node))
    }
}

impl From<Reference> for SchemaOrRef {
    fn from(reference: Reference) -> Self {
        SchemaOrRef::Reference(reference)
    }
}

/// `additionalProperties`: a flag or a schema for the extra values.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// `true` allows any extra property, `false` forbids them.
    Allowed(bool),
    /// Extra properties must validate against this member.
    Schema(SchemaOrRef),
}

impl From<bool> for AdditionalProperties {
    fn from(flag: bool) -> Self {
        AdditionalProperties::Allowed(flag)
    }
}

impl From<SchemaOrRef> for AdditionalProperties {
    fn from(member: SchemaOrRef) -> Self {
        AdditionalProperties::Schema(member)
    }
}

impl From<SchemaNode> for AdditionalProperties {
    fn from(node: SchemaNode) -> Self {
        AdditionalProperties::Schema(node.into())
    }
}

impl From<Reference> for AdditionalProperties {
    fn from(reference: Reference) -> Self {
        AdditionalProperties::Schema(reference.into())
    }
}

/// Input accepted by the exclusive-bound setters.
///
/// The stored and serialized form is always a boolean; a numeric limit is
/// checked against the inclusive bound and then coerced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusiveBound {
    /// Boolean form; always accepted.
    Flag(bool),
    /// Numeric form; rejected when it is not below the inclusive bound.
    Limit(Number),
}

impl From<bool> for ExclusiveBound {
    fn from(flag: bool) -> Self {
        ExclusiveBound::Flag(flag)
    }
}

impl From<Number> for ExclusiveBound {
    fn from(limit: Number) -> Self {
        ExclusiveBound::Limit(limit)
    }
}

/// A typed constraint node.
///
/// Optional fields distinguish "absent" from "set to the default" so that a
/// decoded document encodes back to the same keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    /// Short title.
    pub title: Option<String>,
    /// Long description (CommonMark).
    pub description: Option<String>,
    /// The constrained primitive type.
    pub kind: Option<SchemaKind>,
    /// Default value.
    pub default: Option<Value>,
    /// Example value.
    pub example: Option<Value>,
    /// Format hint (`int64`, `date-time`, …); not interpreted.
    pub format: Option<String>,
    enum_values: Option<Vec<Value>>,
    /// Whether `null` is accepted in addition to `kind`.
    pub nullable: Option<bool>,
    /// Whether the schema is deprecated.
    pub deprecated: Option<bool>,
    /// Property is only sent in responses.
    pub read_only: Option<bool>,
    /// Property is only sent in requests.
    pub write_only: Option<bool>,
    /// Additional external documentation.
    pub external_docs: Option<ExternalDocs>,
    /// XML representation hints.
    pub xml: Option<Xml>,

    /// Polymorphism hint over the composition lists.
    pub discriminator: Option<Discriminator>,
    /// Must validate against every member.
    pub all_of: Vec<SchemaOrRef>,
    /// Must validate against at least one member.
    pub any_of: Vec<SchemaOrRef>,
    /// Must validate against exactly one member.
    pub one_of: Vec<SchemaOrRef>,
    /// Must not validate against this member.
    pub not: Option<SchemaOrRef>,

    multiple_of: Option<u64>,
    maximum: Option<Number>,
    exclusive_maximum: Option<bool>,
    minimum: Option<Number>,
    exclusive_minimum: Option<bool>,

    /// Maximum string length.
    pub max_length: Option<u64>,
    /// Minimum string length.
    pub min_length: Option<u64>,
    /// ECMA-262 pattern; not compiled here.
    pub pattern: Option<String>,

    /// Maximum array length.
    pub max_items: Option<u64>,
    /// Minimum array length.
    pub min_items: Option<u64>,
    /// Whether array items must be unique.
    pub unique_items: Option<bool>,
    /// Schema of array items; required when `kind` is `array`.
    pub items: Option<SchemaOrRef>,

    /// Maximum number of properties.
    pub max_properties: Option<u64>,
    /// Minimum number of properties.
    pub min_properties: Option<u64>,
    /// Names of required properties.
    pub required: Option<IndexSet<String>>,
    /// Property schemas, in document order.
    pub properties: Option<IndexMap<String, SchemaOrRef>>,
    /// Policy for properties not listed in `properties`; `true` when absent.
    pub additional_properties: Option<AdditionalProperties>,

    /// Vendor extensions.
    pub extensions: ExtensionBag,
}

impl SchemaNode {
    /// Creates an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a node of the given kind.
    pub fn of_kind(kind: SchemaKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets `items`.
    pub fn with_items(mut self, items: impl Into<SchemaOrRef>) -> Self {
        self.items = Some(items.into());
        self
    }

    /// Adds a property.
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        schema: impl Into<SchemaOrRef>,
    ) -> Self {
        self.insert_property(name, schema);
        self
    }

    /// Sets `kind` from a wire token; fails with `UnsupportedKind` for
    /// anything outside the seven supported tokens.
    pub fn set_kind_token(&mut self, token: &str) -> AppResult<()> {
        self.kind = Some(token.parse()?);
        Ok(())
    }

    /// Enumerated values, in insertion order.
    pub fn enum_values(&self) -> &[Value] {
        self.enum_values.as_deref().unwrap_or(&[])
    }

    /// `true` if an `enum` was declared, even an empty one.
    pub fn has_enum(&self) -> bool {
        self.enum_values.is_some()
    }

    /// Replaces the enumerated values; duplicates collapse to their first
    /// occurrence.
    pub fn set_enum_values(&mut self, values: impl IntoIterator<Item = Value>) {
        let mut unique: Vec<Value> = Vec::new();
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        self.enum_values = Some(unique);
    }

    /// Adds one enumerated value. Returns `false` if it was already present.
    pub fn push_enum_value(&mut self, value: Value) -> bool {
        let values = self.enum_values.get_or_insert_with(Vec::new);
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    /// Removes the `enum` declaration.
    pub fn clear_enum(&mut self) {
        self.enum_values = None;
    }

    /// `nullable`, reading `false` when absent.
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }

    /// `deprecated`, reading `false` when absent.
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.unwrap_or(false)
    }

    /// `readOnly`, reading `false` when absent.
    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }

    /// `writeOnly`, reading `false` when absent.
    pub fn is_write_only(&self) -> bool {
        self.write_only.unwrap_or(false)
    }

    /// `uniqueItems`, reading `false` when absent.
    pub fn has_unique_items(&self) -> bool {
        self.unique_items.unwrap_or(false)
    }

    // NUMERIC FACET

    /// `multipleOf`, reading `1` when absent.
    pub fn multiple_of(&self) -> u64 {
        self.multiple_of.unwrap_or(1)
    }

    /// `multipleOf` exactly as declared.
    pub fn declared_multiple_of(&self) -> Option<u64> {
        self.multiple_of
    }

    /// Sets `multipleOf`; must be at least 1.
    pub fn set_multiple_of(&mut self, value: u64) -> AppResult<()> {
        if value < 1 {
            return Err(AppError::range("multipleOf", "must be at least 1"));
        }
        self.multiple_of = Some(value);
        Ok(())
    }

    /// Removes `multipleOf`.
    pub fn clear_multiple_of(&mut self) {
        self.multiple_of = None;
    }

    /// Inclusive maximum.
    pub fn maximum(&self) -> Option<&Number> {
        self.maximum.as_ref()
    }

    /// Sets the inclusive maximum.
    pub fn set_maximum(&mut self, value: Option<Number>) {
        self.maximum = value;
    }

    /// Inclusive minimum.
    pub fn minimum(&self) -> Option<&Number> {
        self.minimum.as_ref()
    }

    /// Sets the inclusive minimum.
    pub fn set_minimum(&mut self, value: Option<Number>) {
        self.minimum = value;
    }

    /// `exclusiveMaximum`, reading `false` when absent.
    pub fn exclusive_maximum(&self) -> bool {
        self.exclusive_maximum.unwrap_or(false)
    }

    /// `exclusiveMaximum` exactly as declared.
    pub fn declared_exclusive_maximum(&self) -> Option<bool> {
        self.exclusive_maximum
    }

    /// Sets `exclusiveMaximum`. A numeric limit must be below `maximum`
    /// when one is set.
    pub fn set_exclusive_maximum(&mut self, bound: impl Into<ExclusiveBound>) -> AppResult<()> {
        let flag = coerce_exclusive(
            "exclusiveMaximum",
            bound.into(),
            self.maximum.as_ref(),
            "maximum",
        )?;
        self.exclusive_maximum = Some(flag);
        Ok(())
    }

    /// `exclusiveMinimum`, reading `false` when absent.
    pub fn exclusive_minimum(&self) -> bool {
        self.exclusive_minimum.unwrap_or(false)
    }

    /// `exclusiveMinimum` exactly as declared.
    pub fn declared_exclusive_minimum(&self) -> Option<bool> {
        self.exclusive_minimum
    }

    /// Sets `exclusiveMinimum`. A numeric limit must be below `minimum`
    /// when one is set.
    pub fn set_exclusive_minimum(&mut self, bound: impl Into<ExclusiveBound>) -> AppResult<()> {
        let flag = coerce_exclusive(
            "exclusiveMinimum",
            bound.into(),
            self.minimum.as_ref(),
            "minimum",
        )?;
        self.exclusive_minimum = Some(flag);
        Ok(())
    }

    /// Removes both exclusive bounds.
    pub fn clear_exclusive_bounds(&mut self) {
        self.exclusive_maximum = None;
        self.exclusive_minimum = None;
    }

    // OBJECT FACET

    /// Adds (or replaces) a property schema.
    pub fn insert_property(
        &mut self,
        name: impl Into<String>,
        schema: impl Into<SchemaOrRef>,
    ) -> Option<SchemaOrRef> {
        self.properties
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), schema.into())
    }

    /// Looks up a property schema.
    pub fn property(&self, name: &str) -> Option<&SchemaOrRef> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    /// Marks a property as required. Returns `false` if it already was.
    pub fn require(&mut self, name: impl Into<String>) -> bool {
        self.required.get_or_insert_with(IndexSet::new).insert(name.into())
    }

    /// Whether `name` is listed in `required`.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.as_ref().is_some_and(|r| r.contains(name))
    }

    /// Whether properties beyond `properties` are accepted at all.
    pub fn allows_additional_properties(&self) -> bool {
        !matches!(
            self.additional_properties,
            Some(AdditionalProperties::Allowed(false))
        )
    }

    // TRAVERSAL

    /// Direct members owned by this node, labelled with their location
    /// (`allOf[0]`, `properties.id`, `items`, …). Does not descend.
    pub fn children(&self) -> Vec<(String, &SchemaOrRef)> {
        let mut out = Vec::new();
        for (label, list) in [
            ("allOf", &self.all_of),
            ("anyOf", &self.any_of),
            ("oneOf", &self.one_of),
        ] {
            for (idx, member) in list.iter().enumerate() {
                out.push((format!("{}[{}]", label, idx), member));
            }
        }
        if let Some(member) = &self.not {
            out.push(("not".to_string(), member));
        }
        if let Some(member) = &self.items {
            out.push(("items".to_string(), member));
        }
        if let Some(props) = &self.properties {
            for (name, member) in props {
                out.push((format!("properties.{}", name), member));
            }
        }
        if let Some(AdditionalProperties::Schema(member)) = &self.additional_properties {
            out.push(("additionalProperties".to_string(), member));
        }
        out
    }

    /// Every reference in the owned subtree, including discriminator
    /// mappings. Walks iteratively; references are not followed.
    pub fn references_mut(&mut self) -> Vec<&mut Reference> {
        let mut found = Vec::new();
        let mut stack: Vec<&mut SchemaNode> = vec![self];

        while let Some(node) = stack.pop() {
            let SchemaNode {
                discriminator,
                all_of,
                any_of,
                one_of,
                not,
                items,
                properties,
                additional_properties,
                ..
            } = node;

            if let Some(d) = discriminator.as_mut() {
                found.extend(d.mapping.values_mut());
            }

            let additional = match additional_properties.as_mut() {
                Some(AdditionalProperties::Schema(member)) => Some(member),
                _ => None,
            };

            let members = all_of
                .iter_mut()
                .chain(any_of.iter_mut())
                .chain(one_of.iter_mut())
                .chain(not.iter_mut())
                .chain(items.iter_mut())
                .chain(properties.iter_mut().flat_map(|p| p.values_mut()))
                .chain(additional);

            for member in members {
                match member {
                    SchemaOrRef::Schema(child) => stack.push(child),
                    SchemaOrRef::Reference(reference) => found.push(reference),
                    SchemaOrRef::Unresolved(_) => {}
                }
            }
        }

        found
    }
}

fn coerce_exclusive(
    field: &str,
    bound: ExclusiveBound,
    inclusive: Option<&Number>,
    inclusive_name: &str,
) -> AppResult<bool> {
    match bound {
        ExclusiveBound::Flag(flag) => Ok(flag),
        ExclusiveBound::Limit(limit) => {
            if let Some(inclusive) = inclusive {
                if number_ge(&limit, inclusive) {
                    return Err(AppError::range(
                        field,
                        format!(
                            "exclusive bound ({}) cannot be greater than or equal to {} ({})",
                            limit, inclusive_name, inclusive
                        ),
                    ));
                }
            }
            Ok(limit.as_f64().is_some_and(|v| v != 0.0))
        }
    }
}

fn number_ge(a: &Number, b: &Number) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a >= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_tokens_case_insensitive() {
        assert_eq!("Array".parse::<SchemaKind>().unwrap(), SchemaKind::Array);
        let err = "invalid-type".parse::<SchemaKind>().unwrap_err();
        assert!(matches!(err, AppError::UnsupportedKind(ref t) if t == "invalid-type"));
    }

    #[test]
    fn test_set_kind_token_leaves_node_untouched_on_error() {
        let mut node = SchemaNode::of_kind(SchemaKind::String);
        assert!(node.set_kind_token("tuple").is_err());
        assert_eq!(node.kind, Some(SchemaKind::String));
    }

    #[test]
    fn test_multiple_of_defaults_and_range() {
        let mut node = SchemaNode::new();
        assert_eq!(node.multiple_of(), 1);
        assert!(node.declared_multiple_of().is_none());
        let err = node.set_multiple_of(0).unwrap_err();
        assert!(matches!(err, AppError::RangeViolation { .. }));
        node.set_multiple_of(5).unwrap();
        assert_eq!(node.multiple_of(), 5);
    }

    #[test]
    fn test_numeric_exclusive_maximum_checked_against_maximum() {
        let mut node = SchemaNode::of_kind(SchemaKind::Integer);
        node.set_maximum(Some(10.into()));

        let err = node.set_exclusive_maximum(Number::from(15)).unwrap_err();
        assert!(format!("{err}").contains("exclusiveMaximum"));
        assert!(node.declared_exclusive_maximum().is_none());

        node.set_exclusive_maximum(Number::from(9)).unwrap();
        assert!(node.exclusive_maximum());
    }

    #[test]
    fn test_boolean_exclusive_bound_always_accepted() {
        let mut node = SchemaNode::new();
        node.set_minimum(Some(3.into()));
        node.set_maximum(Some(3.into()));
        node.set_exclusive_maximum(true).unwrap();
        node.set_exclusive_minimum(false).unwrap();
        assert!(node.exclusive_maximum());
        assert_eq!(node.declared_exclusive_minimum(), Some(false));
    }

    #[test]
    fn test_numeric_exclusive_without_inclusive_coerces() {
        let mut node = SchemaNode::new();
        node.set_exclusive_minimum(Number::from(0)).unwrap();
        assert!(!node.exclusive_minimum());
        node.set_exclusive_minimum(Number::from(2)).unwrap();
        assert!(node.exclusive_minimum());
    }

    #[test]
    fn test_enum_values_are_an_ordered_set() {
        let mut node = SchemaNode::new();
        node.set_enum_values(vec![json!("b"), json!("a"), json!("b")]);
        assert_eq!(node.enum_values(), &[json!("b"), json!("a")]);
        assert!(!node.push_enum_value(json!("a")));
        assert!(node.push_enum_value(json!(1)));
        assert_eq!(node.enum_values().len(), 3);
    }

    #[test]
    fn test_additional_properties_default_allows() {
        let mut node = SchemaNode::of_kind(SchemaKind::Object);
        assert!(node.allows_additional_properties());
        node.additional_properties = Some(false.into());
        assert!(!node.allows_additional_properties());
        node.additional_properties = Some(SchemaNode::of_kind(SchemaKind::String).into());
        assert!(node.allows_additional_properties());
    }

    #[test]
    fn test_children_labels() {
        let node = SchemaNode::of_kind(SchemaKind::Object)
            .with_property("id", SchemaNode::of_kind(SchemaKind::Integer))
            .with_items(Reference::internal("Item"));
        let labels: Vec<String> = node.children().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["items", "properties.id"]);
    }

    #[test]
    fn test_references_mut_walks_nested_members() {
        let inner = SchemaNode::of_kind(SchemaKind::Array).with_items(Reference::internal("Leaf"));
        let mut node = SchemaNode::new();
        node.all_of.push(inner.into());
        node.one_of.push(Reference::internal("Other").into());
        node.insert_property("tree", Reference::internal("Tree"));

        let mut names: Vec<String> = node
            .references_mut()
            .into_iter()
            .filter_map(|r| r.target_key().map(str::to_string))
            .collect();
        names.sort();
        assert_eq!(names, vec!["Leaf", "Other", "Tree"]);
    }
}
