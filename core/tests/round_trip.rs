use oas_dom::{
    CodecOptions, DocumentLayout, GraphCodec, Json, KeyStyle, SchemaKind, SchemaOrRef, Shape,
    TextFormat, Yaml,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const PETSTORE: &str = r#"
openapi: 3.0.3
info:
  title: Petstore
  version: 1.0.0
paths:
  /pets:
    get:
      responses:
        '200':
          description: ok
components:
  schemas:
    Pet:
      title: Pet
      type: object
      x-entity: true
      required:
        - id
        - name
      properties:
        id:
          type: integer
          format: int64
          minimum: 1
          exclusiveMinimum: false
        name:
          type: string
          maxLength: 64
          pattern: "^[a-z]+$"
        tag:
          type: string
          nullable: true
          enum: [dog, cat]
        owner:
          $ref: '#/components/schemas/Owner'
      additionalProperties: false
      externalDocs:
        url: https://example.com/pets
        x-audience: public
      xml:
        name: pet
        wrapped: true
    Owner:
      type: object
      properties:
        pets:
          type: array
          minItems: 0
          uniqueItems: true
          items:
            $ref: '#/components/schemas/Pet'
      additionalProperties:
        type: string
    Animal:
      oneOf:
        - $ref: '#/components/schemas/Pet'
        - $ref: 'https://example.com/schemas/wild.yaml#/Wolf'
      discriminator:
        propertyName: kind
        mapping:
          pet: '#/components/schemas/Pet'
"#;

#[test]
fn every_schema_encodes_back_to_its_source() {
    let codec = GraphCodec::default();
    let source = Yaml.parse(PETSTORE).unwrap();
    let schemas = source["components"]["schemas"].as_object().unwrap();

    for (name, schema) in schemas {
        let decoded = codec.decode(schema, Shape::SchemaOrReference).unwrap();
        let encoded = codec.encode(&decoded).unwrap();
        assert_eq!(&encoded, schema, "schema {name} did not round-trip");
    }
}

#[test]
fn document_keeps_untyped_sections() {
    let codec = GraphCodec::default();
    let document = codec
        .decode_document_str(PETSTORE, &Yaml, &DocumentLayout::openapi())
        .unwrap();

    let names: Vec<_> = document.definitions().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["Pet", "Owner", "Animal"]);

    let value = document.to_value().unwrap();
    let source = Yaml.parse(PETSTORE).unwrap();
    assert_eq!(value["info"], source["info"]);
    assert_eq!(value["paths"], source["paths"]);
    assert_eq!(
        value["components"]["schemas"]["Pet"]["properties"]["owner"],
        json!({"$ref": "#/components/schemas/Owner/"})
    );
    assert_eq!(
        value["components"]["schemas"]["Animal"]["oneOf"][1],
        json!({"$ref": "https://example.com/schemas/wild.yaml#/Wolf"})
    );
}

#[test]
fn snake_case_input_normalizes_to_wire_keys() {
    let codec = GraphCodec::default();
    let snake = json!({
        "type": "array",
        "min_items": 1,
        "unique_items": true,
        "items": {"type": "string", "max_length": 3, "read_only": true},
        "external_documentation": {"url": "https://example.com"}
    });
    let encoded = codec.encode(&codec.decode(&snake, Shape::Schema).unwrap()).unwrap();
    assert_eq!(
        encoded,
        json!({
            "type": "array",
            "externalDocs": {"url": "https://example.com"},
            "minItems": 1,
            "uniqueItems": true,
            "items": {"type": "string", "readOnly": true, "maxLength": 3}
        })
    );
}

#[test]
fn snake_case_output() {
    let codec = GraphCodec::new(CodecOptions::default().with_key_style(KeyStyle::Snake));
    let node = codec
        .decode_schema(&json!({"allOf": [{"type": "object", "maxProperties": 2}]}))
        .unwrap();
    assert_eq!(
        codec.encode_schema(&node).unwrap(),
        json!({"all_of": [{"type": "object", "max_properties": 2}]})
    );
}

#[test]
fn json_text_round_trip() {
    let codec = GraphCodec::default();
    let text = concat!(
        r##"{"title":"Tree","type":"object","properties":"##,
        r##"{"children":{"type":"array","items":{"$ref":"#/Tree"}}},"x-depth":3}"##,
    );
    let decoded = codec.decode_str(text, &Json::compact(), Shape::Schema).unwrap();

    let node = decoded.as_schema().unwrap();
    assert_eq!(node.kind, Some(SchemaKind::Object));
    let children = node.property("children").and_then(SchemaOrRef::as_schema).unwrap();
    assert_eq!(
        children.items.as_ref().and_then(|i| i.as_reference()).and_then(|r| r.target_key()),
        Some("Tree")
    );

    assert_eq!(codec.encode_str(&decoded, &Json::compact()).unwrap(), text);
}

#[test]
fn lenient_raw_members_survive_encoding() {
    let codec = GraphCodec::default();
    let value = json!({"anyOf": [true, {"type": "null"}], "items": [1, 2]});
    let decoded = codec.decode(&value, Shape::Schema).unwrap();
    assert_eq!(codec.encode(&decoded).unwrap(), value);
}
