use parcel_core::{
    DeclarationRegistry, DtoCollection, DtoError, DtoFlags, Factory, FactoryConfig, Map,
    SchemaDocument, Value,
};
use serde_json::json;

fn input(value: serde_json::Value) -> Map {
    Value::from(value).into_map().unwrap()
}

const TOML_SCHEMA: &str = r#"
[classes.User]
properties = { name = "string", age = ["null", "int"], tags = "string[]" }
defaults = { tags = [] }

[classes.Admin]
extends = "User"
implements = ["Privileged"]
properties = { level = "int" }

[classes.Team]
properties = { members = "UserCollection", lead = "?Privileged" }

[collections]
UserCollection = "User"
"#;

#[test]
fn test_toml_schema() {
    let factory = Factory::new(SchemaDocument::from_toml_str(TOML_SCHEMA).unwrap().into_registry());

    let admin = factory
        .make(
            "Admin",
            input(json!({ "name": "Ada", "age": null, "level": "3" })),
            DtoFlags::NONE,
        )
        .unwrap();

    assert_eq!(admin.get("level").unwrap(), Value::Int(3));
    assert_eq!(admin.get("tags").unwrap(), Value::List(Vec::new()));
    assert!(admin.is_instance_of("User"));
    assert!(admin.is_instance_of("Privileged"));

    let names: Vec<&str> = admin.metadata().property_names().collect();
    assert_eq!(names, vec!["name", "age", "tags", "level"]);
}

#[test]
fn test_schema_collections_and_interfaces() {
    let registry = SchemaDocument::from_toml_str(TOML_SCHEMA)
        .unwrap()
        .into_registry();
    let factory = Factory::new(registry);

    let admin = factory
        .make(
            "Admin",
            input(json!({ "name": "Ada", "age": 36, "level": 1 })),
            DtoFlags::NONE,
        )
        .unwrap();

    let mut data = input(json!({ "members": [{ "name": "Bob", "age": null }] }));
    data.insert("lead".to_string(), Value::from(admin));

    let team = factory.make("Team", data, DtoFlags::NONE).unwrap();
    let members = team.get("members").unwrap();
    let members = members.downcast_ref::<DtoCollection>().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(
        team.to_json().unwrap(),
        json!({
            "members": [{ "name": "Bob", "age": null, "tags": [] }],
            "lead": { "name": "Ada", "age": 36, "tags": [], "level": 1 },
        })
    );
}

#[test]
fn test_json_schema_into_existing_registry() {
    let registry = DeclarationRegistry::new();
    SchemaDocument::from_json_str(
        r#"{
            "classes": {
                "Point": { "properties": { "x": "int", "y": "int|float" } }
            }
        }"#,
    )
    .unwrap()
    .register_into(&registry);

    assert!(registry.contains("Point"));
    let factory = Factory::new(registry);
    let point = factory
        .make("Point", input(json!({ "x": 1, "y": 2.5 })), DtoFlags::NONE)
        .unwrap();
    assert_eq!(point.get("y").unwrap(), Value::Float(2.5));
}

#[test]
fn test_invalid_schema_default() {
    let registry = SchemaDocument::from_json_str(
        r#"{ "classes": { "Bad": { "properties": { "n": "int" }, "defaults": { "n": "x" } } } }"#,
    )
    .unwrap()
    .into_registry();

    let err = Factory::new(registry)
        .make("Bad", Map::new(), DtoFlags::NONE)
        .unwrap_err();
    assert_eq!(err.invalid_types()[0].property, "n");
}

#[test]
fn test_malformed_documents() {
    assert!(matches!(
        SchemaDocument::from_toml_str("[classes.User\nproperties = 1"),
        Err(DtoError::Schema(_))
    ));
    assert!(matches!(
        SchemaDocument::from_json_str(r#"{ "classes": { "User": { "properties": { "a": 1 } } } }"#),
        Err(DtoError::Schema(_))
    ));
}

#[test]
fn test_factory_config_from_toml() {
    let config = FactoryConfig::from_toml_str(
        r#"
        default_flags = ["MUTABLE", "NULLABLE_DEFAULT_TO_NULL"]
        max_depth = 16
        "#,
    )
    .unwrap();

    let registry = SchemaDocument::from_toml_str(TOML_SCHEMA)
        .unwrap()
        .into_registry();
    let factory = Factory::builder(registry).config(config).build();

    let mut user = factory
        .build("User", input(json!({ "name": "Ada" })))
        .unwrap();
    assert_eq!(user.get("age").unwrap(), Value::Null);

    user.set("age", 40).unwrap();
    assert_eq!(user.get("age").unwrap(), Value::Int(40));
    assert_eq!(factory.config().max_depth, 16);
}
