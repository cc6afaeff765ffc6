use oas_dom::{
    AppError, CodecOptions, CompositionValidator, Document, DocumentLayout, GraphCodec,
    Reference, ReferenceState, SchemaKind, SchemaNode, SchemaOrRef, Shape, UnresolvedPolicy,
    ViolationKind,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[test]
fn discriminated_union_decodes_with_references() {
    let codec = GraphCodec::default();
    let value = json!({
        "title": "Pet",
        "oneOf": [{"$ref": "#/Dog"}, {"$ref": "#/Cat"}],
        "discriminator": {"propertyName": "petType"}
    });
    let node = codec.decode_schema(&value).unwrap();

    assert_eq!(node.title.as_deref(), Some("Pet"));
    assert_eq!(node.one_of.len(), 2);
    assert!(node
        .one_of
        .iter()
        .all(|m| matches!(m, SchemaOrRef::Reference(_))));
    assert_eq!(
        node.discriminator.as_ref().map(|d| d.property_name.as_str()),
        Some("petType")
    );
    assert!(CompositionValidator::new().check(&node).is_valid());
}

#[test]
fn bound_reference_resolves_against_flat_document() {
    let codec = GraphCodec::default();
    let document = codec
        .decode_document(&json!({"Dog": {"title": "Dog"}}), &DocumentLayout::flat())
        .unwrap();

    let mut reference = Reference::internal("Dog");
    assert_eq!(reference.state(), ReferenceState::Unbound);
    reference.bind(&document);
    assert_eq!(reference.state(), ReferenceState::InternalUnresolved);

    assert_eq!(reference.resolve(&document).unwrap(), vec!["Dog"]);
    assert_eq!(reference.state(), ReferenceState::InternalResolved);
    assert_eq!(reference.json_pointer(&document).unwrap(), "#/Dog/");
}

#[test]
fn array_without_items_is_reported() {
    let node = GraphCodec::default()
        .decode_schema(&json!({"type": "array"}))
        .unwrap();
    let result = CompositionValidator::new().check(&node);
    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].kind, ViolationKind::MissingItems);
}

#[test]
fn numeric_exclusive_bound_above_maximum_is_rejected() {
    let err = GraphCodec::default()
        .decode(&json!({"maximum": 10, "exclusiveMaximum": 15}), Shape::Schema)
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::RangeViolation { ref field, .. } if field == "exclusiveMaximum"
    ));

    let node = GraphCodec::default()
        .decode_schema(&json!({"maximum": 10, "exclusiveMaximum": true}))
        .unwrap();
    assert!(node.exclusive_maximum());
}

#[test]
fn vendor_extension_round_trips_last() {
    let codec = GraphCodec::default();
    let node = codec
        .decode_schema(&json!({"x-vendor-flag": true, "title": "X"}))
        .unwrap();
    assert_eq!(node.extensions.get("vendor-flag"), Some(&json!(true)));

    let encoded = codec.encode_schema(&node).unwrap();
    assert_eq!(encoded, json!({"title": "X", "x-vendor-flag": true}));
    let keys: Vec<_> = encoded.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["title", "x-vendor-flag"]);
}

#[test]
fn resolution_is_cached_until_the_document_changes() {
    let codec = GraphCodec::default();
    let mut document = codec
        .decode_document(
            &json!({
                "components": {"schemas": {
                    "Pet": {"type": "object"},
                    "Pets": {"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}
                }}
            }),
            &DocumentLayout::openapi(),
        )
        .unwrap();

    let mut reference = Reference::internal("Pet");
    reference.bind(&document);

    let first = reference.resolve(&document).unwrap();
    let searches = document.search_count();
    let second = reference.resolve(&document).unwrap();
    assert_eq!(first, second);
    assert_eq!(document.search_count(), searches);
    assert_eq!(first, vec!["components", "schemas", "Pet"]);

    document.insert("Other", SchemaNode::of_kind(SchemaKind::String));
    reference.resolve(&document).unwrap();
    assert_eq!(document.search_count(), searches + 1);
}

#[test]
fn resolution_failures() {
    let codec = GraphCodec::default();
    let document = codec
        .decode_document(&json!({"Dog": {}}), &DocumentLayout::flat())
        .unwrap();
    let other = Document::new(DocumentLayout::flat());

    let unbound = Reference::internal("Dog");
    assert!(matches!(
        unbound.resolve(&document).unwrap_err(),
        AppError::NoDocumentBound(_)
    ));

    let mut foreign = Reference::internal("Dog");
    foreign.bind(&other);
    assert!(matches!(
        foreign.resolve(&document).unwrap_err(),
        AppError::NoDocumentBound(_)
    ));

    let mut missing = Reference::internal("Cat");
    missing.bind(&document);
    assert!(matches!(
        missing.resolve(&document).unwrap_err(),
        AppError::ReferenceNotFound(_)
    ));

    let external = Reference::parse("https://example.com/pets.yaml#/Dog");
    assert!(matches!(
        external.resolve(&document).unwrap_err(),
        AppError::ExternalReference(_)
    ));
    assert_eq!(
        external.json_pointer(&document).unwrap(),
        "https://example.com/pets.yaml#/Dog"
    );
}

#[test]
fn composition_monotonicity() {
    let mut node = SchemaNode::new();
    node.any_of.push(Reference::internal("A").into());
    let validator = CompositionValidator::new();
    assert!(validator.check(&node).is_valid());

    node.any_of.push(SchemaOrRef::Unresolved(json!(42)));
    let err = validator.check(&node).into_result().unwrap_err();
    assert!(matches!(err, AppError::CompositionInvalid(ref v) if v.len() == 1));

    node.any_of.pop();
    assert!(validator.check(&node).is_valid());
}

#[test]
fn discriminator_precondition() {
    let codec = GraphCodec::default();
    let mut node = codec
        .decode_schema(&json!({"discriminator": {"propertyName": "kind"}}))
        .unwrap();
    let validator = CompositionValidator::new();
    assert_eq!(
        validator.check(&node).violations()[0].kind,
        ViolationKind::DiscriminatorWithoutComposition
    );

    node.all_of.push(SchemaNode::new().into());
    assert!(validator.check(&node).is_valid());
}

#[test]
fn encode_in_document_writes_resolved_pointers() {
    let codec = GraphCodec::default();
    let document = codec
        .decode_document(
            &json!({
                "definitions": {
                    "Tree": {
                        "type": "object",
                        "properties": {"children": {"type": "array", "items": {"$ref": "Tree"}}}
                    }
                }
            }),
            &DocumentLayout::swagger(),
        )
        .unwrap();

    let value = document.to_value().unwrap();
    assert_eq!(
        value["definitions"]["Tree"]["properties"]["children"]["items"],
        json!({"$ref": "#/definitions/Tree/"})
    );
}

#[test]
fn unresolved_policy_on_encode() {
    let value = json!({"Pet": {"items": {"$ref": "#/Missing"}}});

    let failing = GraphCodec::default()
        .decode_document(&value, &DocumentLayout::flat())
        .unwrap();
    assert!(matches!(
        failing.to_value().unwrap_err(),
        AppError::ReferenceNotFound(_)
    ));

    let verbatim = GraphCodec::new(
        CodecOptions::default().with_unresolved(UnresolvedPolicy::Verbatim),
    )
    .decode_document(&value, &DocumentLayout::flat())
    .unwrap();
    assert_eq!(verbatim.to_value().unwrap(), value);

    let placeholder = GraphCodec::new(CodecOptions::default().with_unresolved(
        UnresolvedPolicy::Placeholder(Value::String("#/".into())),
    ))
    .decode_document(&value, &DocumentLayout::flat())
    .unwrap();
    assert_eq!(
        placeholder.to_value().unwrap(),
        json!({"Pet": {"items": {"$ref": "#/"}}})
    );
}
