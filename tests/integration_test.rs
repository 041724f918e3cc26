use openapi_declare::{
    error::{Error, Location, RefErrorKind},
    model::{Area, DataType, Definition, Method, Property, Request, Response, Schema},
    path_template,
    reflect::{Describe, FieldShape, Fields, Kind, Record, Shape},
    resolver::Resolver,
    routes::routes,
    schema_generator::{synthesize_shape, SchemaGenerator},
    serializer::{serialize_json, serialize_yaml},
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

struct Category;

impl Describe for Category {
    fn describe() -> Shape {
        Shape::record("Category", || {
            vec![
                FieldShape::of::<i64>("id"),
                FieldShape::of::<String>("name"),
            ]
        })
    }
}

struct Pet;

impl Describe for Pet {
    fn describe() -> Shape {
        Shape::record("Pet", || {
            vec![
                FieldShape::of::<i64>("id"),
                FieldShape::of::<String>("name"),
                FieldShape::of::<Vec<String>>("photo_urls").rename("photoUrls"),
                FieldShape::of::<Option<Category>>("category").tag("$ref:Category"),
            ]
        })
    }
}

/// Pet store whose component schemas are synthesized from type descriptions.
fn pet_store(with_category: bool) -> Definition {
    let mut generator = SchemaGenerator::new();
    generator.add_shape(&Pet::describe()).unwrap();
    if with_category {
        generator.add_shape(&Category::describe()).unwrap();
    }

    let mut def = Definition::new("Pet Store", "1.0.0");
    generator.merge_into(def.components_mut());
    def.add_method(
        "/pets/{petId:[0-9]+}",
        "get",
        Method::new()
            .handler("get_pet")
            .response(200, Response::json("A pet", "Pet")),
    )
    .unwrap();
    def.add_method(
        "/pets",
        "post",
        Method::new()
            .handler("add_pet")
            .request(Request::json("Pet"))
            .response(201, Response::new("Created")),
    )
    .unwrap();
    def
}

fn parse(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).unwrap()
}

fn record(name: &str, fields: Vec<FieldShape>) -> Shape {
    Shape::new(
        name,
        Kind::Struct(Record {
            name: name.to_string(),
            fields: Fields::Eager(fields),
        }),
    )
}

#[test]
fn test_pet_store_validates_and_emits() {
    let def = pet_store(true);
    assert!(Resolver::new(&def).validate().is_empty());

    let doc = parse(&serialize_yaml(&def).unwrap());
    assert_eq!(doc["openapi"], "3.0.3");
    assert_eq!(
        doc["paths"]["/pets/{petId}"]["get"]["responses"]["200"]["content"]["application/json"]
            ["schema"]["$ref"],
        "#/components/schemas/Pet"
    );
    assert_eq!(
        doc["components"]["schemas"]["Pet"]["properties"]["category"]["$ref"],
        "#/components/schemas/Category"
    );
}

#[test]
fn test_missing_category_is_one_unresolved_reference() {
    let def = pet_store(false);
    let errors = Resolver::new(&def).validate();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RefErrorKind::NotFound);
    assert_eq!(errors[0].reference, "#/components/schemas/Category");

    match serialize_yaml(&def) {
        Err(Error::Reference(error)) => {
            assert_eq!(error.reference, "#/components/schemas/Category")
        }
        other => panic!("Expected a reference error, got {:?}", other),
    }
}

#[test]
fn test_emission_is_deterministic() {
    let first = serialize_yaml(&pet_store(true)).unwrap();
    for _ in 0..5 {
        assert_eq!(serialize_yaml(&pet_store(true)).unwrap(), first);
    }
    assert_eq!(
        serialize_json(&pet_store(true)).unwrap(),
        serialize_json(&pet_store(true)).unwrap()
    );
}

#[test]
fn test_synthesized_schema_matches_hand_authored() {
    let synthesized = pet_store(true);

    let mut authored = Definition::new("Pet Store", "1.0.0");
    let components = authored.components_mut();
    components.schemas.push(
        Schema::object("Pet")
            .with_property(
                Property::new("id", DataType::Integer)
                    .with_format("int64")
                    .required(),
            )
            .with_property(Property::new("name", DataType::String).required())
            .with_property(Property::array_of("photoUrls", DataType::String).required())
            .with_property(Property::reference("category", "Category")),
    );

    let left = parse(&serialize_yaml(&synthesized).unwrap());
    let right = parse(&serialize_yaml(&authored).unwrap());
    assert_eq!(
        left["components"]["schemas"]["Pet"],
        right["components"]["schemas"]["Pet"]
    );
    assert_eq!(
        left["components"]["schemas"]["Pet"]["required"],
        json!(["id", "name", "photoUrls"])
    );
}

#[test]
fn test_required_list_is_deduplicated() {
    let mut def = Definition::new("Dedup", "1");
    def.components_mut().schemas.push(
        Schema::object("Pet")
            .with_required(&["name", "name", "id"])
            .with_property(Property::new("id", DataType::Integer).required())
            .with_property(Property::new("name", DataType::String).required()),
    );

    let doc = parse(&serialize_yaml(&def).unwrap());
    assert_eq!(
        doc["components"]["schemas"]["Pet"]["required"],
        json!(["name", "id"])
    );
}

#[test]
fn test_required_tag_forms() {
    let schema = synthesize_shape(
        &record(
            "Probe",
            vec![
                FieldShape::of::<Option<String>>("bare").tag("required"),
                FieldShape::of::<Option<String>>("explicit").tag("required:true"),
                FieldShape::of::<String>("off").tag("required:false"),
                FieldShape::of::<String>("implied"),
            ],
        ),
        None,
    )
    .unwrap();
    assert_eq!(schema.required_names(), vec!["bare", "explicit", "implied"]);
}

#[test]
fn test_unknown_tag_token_is_rejected() {
    let err = synthesize_shape(
        &record(
            "Probe",
            vec![FieldShape::of::<String>("name").tag("required,sparkly")],
        ),
        None,
    )
    .unwrap_err();
    match err {
        Error::Tag { field, token, .. } => {
            assert_eq!(field, "name");
            assert_eq!(token, "sparkly");
        }
        other => panic!("Expected a tag error, got {:?}", other),
    }
}

#[test]
fn test_path_parameter_extraction() {
    assert_eq!(
        path_template::extract("/foo/{fooId: [a-z]*}/bar/{barId}/{year}-{month}").unwrap(),
        vec!["fooId", "barId", "year", "month"]
    );
    assert!(path_template::extract("/foo/{unclosed").is_err());
}

#[test]
fn test_cycles_on_open_path_only() {
    let mut def = Definition::new("Graph", "1");
    let components = def.components_mut();
    components
        .schemas
        .push(Schema::object("A").with_property(Property::reference("b", "B")));
    components
        .schemas
        .push(Schema::object("B").with_property(Property::reference("a", "A")));
    components.schemas.push(
        Schema::object("C")
            .with_property(Property::reference("left", "D"))
            .with_property(Property::reference("right", "D")),
    );
    components
        .schemas
        .push(Schema::object("D").with_property(Property::new("id", DataType::Integer)));

    let resolver = Resolver::new(&def);
    let cyclic = resolver.check_cycles(Area::Schemas, "A", &Location::item("A"));
    assert!(!cyclic.is_empty());
    assert!(cyclic.iter().all(|e| e.kind == RefErrorKind::Cyclic));
    assert!(cyclic
        .iter()
        .any(|e| e.reference == "#/components/schemas/A"));

    let siblings = resolver.check_cycles(Area::Schemas, "C", &Location::item("C"));
    assert!(siblings.is_empty());
}

#[test]
fn test_route_table_from_pet_store() {
    let table = routes(&pet_store(true)).unwrap();
    let summary: Vec<(&str, &str)> = table
        .iter()
        .map(|r| (r.path.as_str(), r.method.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("/pets", "POST"), ("/pets/{petId:[0-9]+}", "GET")]
    );
    assert_eq!(table[1].handler.as_deref(), Some("get_pet"));
    assert_eq!(table[1].params, vec!["petId"]);
}
