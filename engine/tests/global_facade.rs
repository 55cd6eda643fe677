use morph_engine::{
    global, MapperConfiguration, MapperError, MemberType, Object, ObjectRef, TypeSchema, Value,
};

fn schema(name: &str) -> TypeSchema {
    TypeSchema::builder(name)
        .member("Id", MemberType::Int)
        .member("Label", MemberType::String)
        .build()
}

// One test per binary: the global mapper can only be installed once per process.
#[test]
fn test_global_facade_lifecycle() {
    assert!(!global::is_installed());
    assert!(matches!(
        global::transform(&ObjectRef::new(Object::new("Tag")), "TagDto"),
        Err(MapperError::Configuration(_))
    ));

    let mapper = MapperConfiguration::new()
        .register_type(schema("Tag"))
        .register_type(schema("TagDto"))
        .add_profile_fn("tags", |maps| {
            maps.create_map("Tag", "TagDto");
        })
        .build()
        .unwrap();
    global::install(mapper.clone()).unwrap();
    assert!(global::is_installed());
    assert!(global::install(mapper).is_err());

    let tag = ObjectRef::new(Object::new("Tag").with("Id", 3).with("Label", "rust"));
    let dto = global::transform(&tag, "TagDto").unwrap();
    assert_eq!(dto.get("Label"), Value::from("rust"));

    let cleared = ObjectRef::new(Object::new("Tag").with("Id", 4));
    global::patch(&cleared, &dto).unwrap();
    assert_eq!(dto.get("Id"), Value::Int(4));
    assert_eq!(dto.get("Label"), Value::from("rust"));

    global::merge_into(&cleared, &dto).unwrap();
    assert!(dto.get("Label").is_null());
}
