#![deny(missing_docs)]

//! # Composition Validation
//!
//! Cross-field checks on a schema that cannot be expressed by the field types
//! alone.
//!
//! Additional validations include:
//! - Composition members (`allOf`, `anyOf`, `oneOf`, `not`) must be schemas or
//!   references.
//! - Array schemas must define `items`.
//! - Property values and schema-valued `additionalProperties` must be schemas
//!   or references.
//! - A discriminator needs a non-empty composition list to select from.
//!
//! Checks never fail: findings are collected and returned.

use crate::codec::DEFAULT_MAX_DEPTH;
use crate::error::AppError;
use crate::schema::{AdditionalProperties, SchemaKind, SchemaNode, SchemaOrRef};
use derive_more::Display;
use std::fmt;

/// What kind of rule a [`Violation`] broke.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ViolationKind {
    /// A member slot holds a raw value instead of a schema or reference.
    #[display("must be a schema or a reference")]
    NonSchemaMember,
    /// `type: array` without `items`.
    #[display("array schemas must define 'items'")]
    MissingItems,
    /// A discriminator with every composition list empty.
    #[display("a discriminator requires a non-empty allOf, anyOf or oneOf")]
    DiscriminatorWithoutComposition,
    /// The tree walk stopped at the depth bound.
    #[display("nesting exceeds the maximum depth of {_0}")]
    DepthExceeded(usize),
}

/// A single finding, located by its path from the checked node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted location such as `properties.tags.items` (empty for the root).
    pub location: String,
    /// The broken rule.
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.location, self.kind)
        }
    }
}

impl Violation {
    fn new(location: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    /// `true` when nothing was found.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The findings, in discovery order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Human summary, one finding per line.
    pub fn message(&self) -> String {
        if self.violations.is_empty() {
            return "Object is valid.".to_string();
        }
        self.violations
            .iter()
            .map(|v| format!("{}", v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `Ok(())` when valid, otherwise [`AppError::CompositionInvalid`].
    pub fn into_result(self) -> Result<(), AppError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::CompositionInvalid(self.violations))
        }
    }
}

/// Runs the composition rules over schema nodes.
#[derive(Debug, Clone, Copy)]
pub struct CompositionValidator {
    max_depth: usize,
}

impl Default for CompositionValidator {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CompositionValidator {
    /// Validator with the default depth bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the depth bound used by [`check_tree`](Self::check_tree).
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Checks one node. Nested schemas are not visited.
    pub fn check(&self, node: &SchemaNode) -> ValidationResult {
        let mut violations = Vec::new();
        check_node(node, "", &mut violations);
        ValidationResult { violations }
    }

    /// Checks a node and every schema it owns. References are not followed.
    pub fn check_tree(&self, node: &SchemaNode) -> ValidationResult {
        let mut violations = Vec::new();
        let mut stack: Vec<(&SchemaNode, String, usize)> = vec![(node, String::new(), 0)];

        while let Some((current, location, depth)) = stack.pop() {
            if depth > self.max_depth {
                violations.push(Violation::new(
                    location,
                    ViolationKind::DepthExceeded(self.max_depth),
                ));
                continue;
            }
            check_node(current, &location, &mut violations);

            // Reverse so the walk reports in document order.
            for (label, member) in current.children().into_iter().rev() {
                if let SchemaOrRef::Schema(child) = member {
                    stack.push((child, join(&location, &label), depth + 1));
                }
            }
        }

        ValidationResult { violations }
    }
}

fn check_node(node: &SchemaNode, location: &str, out: &mut Vec<Violation>) {
    let mut member = |label: String, slot: &SchemaOrRef| {
        if !slot.is_typed() {
            out.push(Violation::new(
                join(location, &label),
                ViolationKind::NonSchemaMember,
            ));
        }
    };

    for (label, list) in [
        ("allOf", &node.all_of),
        ("anyOf", &node.any_of),
        ("oneOf", &node.one_of),
    ] {
        for (idx, slot) in list.iter().enumerate() {
            member(format!("{}[{}]", label, idx), slot);
        }
    }
    if let Some(slot) = &node.not {
        member("not".to_string(), slot);
    }
    if let Some(slot) = &node.items {
        member("items".to_string(), slot);
    }
    if let Some(props) = &node.properties {
        for (name, slot) in props {
            member(format!("properties.{}", name), slot);
        }
    }
    if let Some(AdditionalProperties::Schema(slot)) = &node.additional_properties {
        member("additionalProperties".to_string(), slot);
    }

    if node.kind == Some(SchemaKind::Array) && node.items.is_none() {
        out.push(Violation::new(location, ViolationKind::MissingItems));
    }

    if node.discriminator.is_some()
        && node.all_of.is_empty()
        && node.any_of.is_empty()
        && node.one_of.is_empty()
    {
        out.push(Violation::new(
            join(location, "discriminator"),
            ViolationKind::DiscriminatorWithoutComposition,
        ));
    }
}

fn join(parent: &str, label: &str) -> String {
    if parent.is_empty() {
        label.to_string()
    } else {
        format!("{}.{}", parent, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Reference;
    use crate::schema::Discriminator;
    use serde_json::json;

    #[test]
    fn test_empty_node_is_valid() {
        let result = CompositionValidator::new().check(&SchemaNode::new());
        assert!(result.is_valid());
        assert_eq!(result.message(), "Object is valid.");
    }

    #[test]
    fn test_array_without_items() {
        let node = SchemaNode::of_kind(SchemaKind::Array);
        let result = CompositionValidator::new().check(&node);
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].kind, ViolationKind::MissingItems);
        assert!(result.message().contains("items"));
    }

    #[test]
    fn test_raw_composition_member_is_flagged() {
        let mut node = SchemaNode::new();
        node.all_of.push(SchemaNode::new().into());
        node.all_of.push(SchemaOrRef::Unresolved(json!(true)));
        let result = CompositionValidator::new().check(&node);
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].location, "allOf[1]");
    }

    #[test]
    fn test_discriminator_requires_composition() {
        let mut node = SchemaNode::new();
        node.discriminator = Some(Discriminator::new("kind"));
        let result = CompositionValidator::new().check(&node);
        assert_eq!(
            result.violations()[0].kind,
            ViolationKind::DiscriminatorWithoutComposition
        );

        node.one_of.push(Reference::internal("Cat").into());
        assert!(CompositionValidator::new().check(&node).is_valid());
    }

    #[test]
    fn test_check_does_not_descend_but_check_tree_does() {
        let node = SchemaNode::of_kind(SchemaKind::Object)
            .with_property("tags", SchemaNode::of_kind(SchemaKind::Array));
        let validator = CompositionValidator::new();
        assert!(validator.check(&node).is_valid());

        let result = validator.check_tree(&node);
        assert_eq!(result.violations().len(), 1);
        assert_eq!(result.violations()[0].location, "properties.tags");
    }

    #[test]
    fn test_check_tree_depth_bound() {
        let mut node = SchemaNode::of_kind(SchemaKind::Array).with_items(SchemaNode::new());
        for _ in 0..5 {
            node = SchemaNode::of_kind(SchemaKind::Array).with_items(node);
        }
        let result = CompositionValidator::new().with_max_depth(3).check_tree(&node);
        assert!(result
            .violations()
            .iter()
            .any(|v| v.kind == ViolationKind::DepthExceeded(3)));
    }

    #[test]
    fn test_into_result() {
        let err = CompositionValidator::new()
            .check(&SchemaNode::of_kind(SchemaKind::Array))
            .into_result()
            .unwrap_err();
        assert!(matches!(err, AppError::CompositionInvalid(ref v) if v.len() == 1));
    }
}
