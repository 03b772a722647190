use parcel_core::{
    ClassDeclaration, CollectionDeclaration, DeclarationRegistry, DtoCollection, DtoError,
    DtoFlags, Factory, Map, Value,
};
use serde_json::json;

fn input(value: serde_json::Value) -> Map {
    Value::from(value).into_map().unwrap()
}

fn factory() -> Factory {
    let registry = DeclarationRegistry::new();
    registry.register(
        ClassDeclaration::new("Child")
            .property("first_name", ["string"])
            .property("parent", ["null", "Parent"])
            .default("parent", Value::Null),
    );
    registry.register(
        ClassDeclaration::new("Parent")
            .property("parent", ["null", "Parent"])
            .property("children", ["Child[]"])
            .default("parent", Value::Null),
    );
    registry.register(
        ClassDeclaration::new("Family").property("kids", ["ChildCollection"]),
    );
    registry.register_collection(CollectionDeclaration::new("ChildCollection", "Child"));
    Factory::new(registry)
}

fn sorted(mut paths: Vec<&str>) -> Vec<&str> {
    paths.sort();
    paths
}

#[test]
fn test_nested_invalid_types_carry_full_paths() {
    let err = factory()
        .make(
            "Child",
            input(json!({
                "parent": {
                    "parent": "bad",
                    "children": [
                        { "parent": "bad" },
                        { "first_name": null },
                    ],
                },
            })),
            DtoFlags::NONE,
        )
        .unwrap_err();

    let paths: Vec<&str> = err
        .invalid_types()
        .iter()
        .map(|failure| failure.property.as_str())
        .collect();
    assert_eq!(
        sorted(paths),
        vec![
            "parent.children.0.parent",
            "parent.children.1.first_name",
            "parent.parent",
        ]
    );
    assert!(err
        .invalid_types()
        .iter()
        .all(|failure| failure.class == "Child"));
}

#[test]
fn test_nested_failures_of_different_kinds_are_aggregated() {
    let err = factory()
        .make(
            "Child",
            input(json!({
                "parent": {
                    "parent": "bad",
                    "children": [
                        { "parent": "bad" },
                        {},
                    ],
                },
            })),
            DtoFlags::NONE,
        )
        .unwrap_err();

    match &err {
        DtoError::Aggregate { errors } => {
            assert!(matches!(errors[0], DtoError::InvalidType { .. }));
            assert!(matches!(errors[1], DtoError::UndefinedProperties { .. }));
        }
        other => panic!("Expected Aggregate, got {:?}", other),
    }

    let invalid: Vec<&str> = err
        .invalid_types()
        .iter()
        .map(|failure| failure.property.as_str())
        .collect();
    assert_eq!(
        sorted(invalid),
        vec!["parent.children.0.parent", "parent.parent"]
    );
    assert_eq!(
        err.undefined_properties(),
        vec!["parent.children.1.first_name"]
    );

    let message = err.to_string();
    assert!(message.contains("Child::parent.parent"));
    assert!(message.contains("parent.children.1.first_name"));
}

#[test]
fn test_unclaimed_list_elements_are_indexed() {
    let factory = factory();

    let err = factory
        .make(
            "Parent",
            input(json!({
                "children": [{ "first_name": "a" }, "nope", { "first_name": 3 }],
            })),
            DtoFlags::NONE,
        )
        .unwrap_err();
    let paths: Vec<&str> = err
        .invalid_types()
        .iter()
        .map(|failure| failure.property.as_str())
        .collect();
    assert_eq!(sorted(paths), vec!["children.1", "children.2.first_name"]);

    let err = factory
        .make(
            "Parent",
            input(json!({ "children": [{ "first_name": "a" }, "nope"] })),
            DtoFlags::NONE,
        )
        .unwrap_err();
    let failures = err.invalid_types();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].property, "children.1");
    assert_eq!(failures[0].expected, "Child");
    assert_eq!(failures[0].class, "Parent");
}

#[test]
fn test_nested_unknown_keys_are_prefixed() {
    let err = factory()
        .make(
            "Parent",
            input(json!({ "children": [{ "first_name": "a", "nickname": "b" }] })),
            DtoFlags::NONE,
        )
        .unwrap_err();

    assert_eq!(err.unknown_properties(), vec!["children.0.nickname"]);
}

#[test]
fn test_nested_flags_are_inherited() {
    let parent = factory()
        .make(
            "Parent",
            input(json!({ "children": [{ "first_name": "a", "nickname": "b" }] })),
            DtoFlags::TRACK_UNKNOWN_PROPERTIES,
        )
        .unwrap();

    let children = parent.get("children").unwrap();
    let child = children.as_list().unwrap()[0].as_dto().unwrap();
    assert_eq!(
        child.unknown_properties().get("nickname"),
        Some(&Value::from("b"))
    );
}

#[test]
fn test_nested_round_trip() {
    let data = json!({
        "first_name": "Ada",
        "parent": {
            "parent": null,
            "children": [{ "first_name": "Bob", "parent": null }],
        },
    });
    let child = factory()
        .make("Child", input(data.clone()), DtoFlags::NONE)
        .unwrap();

    let parent = child.get("parent").unwrap();
    assert_eq!(parent.as_dto().unwrap().class_name(), "Parent");
    assert_eq!(child.to_json().unwrap(), data);
}

#[test]
fn test_existing_instances_are_accepted() {
    let factory = factory();
    let parent = factory
        .make("Parent", input(json!({ "children": [] })), DtoFlags::NONE)
        .unwrap();

    let mut data = Map::new();
    data.insert("first_name".to_string(), Value::from("Ada"));
    data.insert("parent".to_string(), Value::from(parent.clone()));

    let child = factory.make("Child", data, DtoFlags::NONE).unwrap();
    assert_eq!(
        child.get("parent").unwrap().as_dto().map(|dto| dto.as_ref()),
        Some(&parent)
    );
}

#[test]
fn test_is_defined_paths() {
    let child = factory()
        .make(
            "Child",
            input(json!({ "first_name": "Ada", "parent": { "children": [] } })),
            DtoFlags::NONE,
        )
        .unwrap();

    assert!(child.is_defined("parent").unwrap());
    assert!(child.is_defined("parent.children").unwrap());
    assert!(child.is_defined("parent.parent").unwrap());
    assert!(!child.is_defined("parent.parent.children").unwrap());
    assert!(!child.is_defined("first_name.length").unwrap());

    let err = child.is_defined("parent.nickname").unwrap_err();
    assert_eq!(err.unknown_properties(), vec!["parent.nickname"]);
    assert!(child.is_defined("nickname").is_err());
}

#[test]
fn test_collection_cast() {
    let family = factory()
        .make(
            "Family",
            input(json!({ "kids": [{ "first_name": "Ada" }, { "first_name": "Bob" }] })),
            DtoFlags::NONE,
        )
        .unwrap();

    let kids = family.get("kids").unwrap();
    let collection = kids.downcast_ref::<DtoCollection>().unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.item_class(), "Child");
    assert_eq!(
        collection.get(1).unwrap().get("first_name").unwrap(),
        Value::from("Bob")
    );

    assert_eq!(
        family.to_json().unwrap(),
        json!({ "kids": [
            { "first_name": "Ada", "parent": null },
            { "first_name": "Bob", "parent": null },
        ] })
    );
}

#[test]
fn test_collection_element_failures_are_indexed() {
    let err = factory()
        .make(
            "Family",
            input(json!({ "kids": [{ "first_name": "Ada" }, { "first_name": 3 }, "nope"] })),
            DtoFlags::NONE,
        )
        .unwrap_err();

    let paths: Vec<&str> = err
        .invalid_types()
        .iter()
        .map(|failure| failure.property.as_str())
        .collect();
    assert_eq!(paths, vec!["kids.1.first_name", "kids.2"]);
}

#[test]
fn test_inheritance_and_interfaces() {
    let registry = DeclarationRegistry::new();
    registry.register(
        ClassDeclaration::new("Base")
            .property("id", ["int"])
            .implements("Identified"),
    );
    registry.register(
        ClassDeclaration::new("Derived")
            .extends("Base")
            .property("name", ["string"]),
    );
    registry.register(ClassDeclaration::new("Holder").property("item", ["Identified"]));
    let factory = Factory::new(registry);

    let derived = factory
        .make("Derived", input(json!({ "id": 1, "name": "x" })), DtoFlags::NONE)
        .unwrap();
    assert!(derived.is_instance_of("Base"));
    assert!(derived.is_instance_of("Identified"));
    assert_eq!(derived.to_array().unwrap(), input(json!({ "id": 1, "name": "x" })));

    let mut data = Map::new();
    data.insert("item".to_string(), Value::from(derived));
    assert!(factory.make("Holder", data, DtoFlags::NONE).is_ok());

    let mut bad = Map::new();
    bad.insert("item".to_string(), Value::from(1));
    let err = factory.make("Holder", bad, DtoFlags::NONE).unwrap_err();
    assert_eq!(err.invalid_types()[0].expected, "Identified");
}
