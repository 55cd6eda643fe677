use morph_engine::{
    EngineConfig, Mapper, MapperConfiguration, MapperError, MemberType, Object, ObjectRef,
    RegistryBuilder, TypeSchema, Value,
};
use std::sync::{Arc, Mutex};

fn node_schema(name: &str, link: &str) -> TypeSchema {
    TypeSchema::builder(name)
        .member("Name", MemberType::String)
        .member("Child", MemberType::object(link))
        .member("Parent", MemberType::object(link))
        .member("Items", MemberType::list(MemberType::object(link)))
        .build()
}

fn build(config: EngineConfig, configure: impl Fn(&mut RegistryBuilder) + Send + Sync) -> Mapper {
    MapperConfiguration::new()
        .with_config(config)
        .register_type(node_schema("Node", "Node"))
        .register_type(node_schema("NodeDto", "NodeDto"))
        .add_profile_fn("nodes", configure)
        .build()
        .expect("mapper builds")
}

fn node(name: &str) -> ObjectRef {
    ObjectRef::new(Object::new("Node").with("Name", name))
}

fn chain(names: &[&str]) -> ObjectRef {
    let nodes: Vec<ObjectRef> = names.iter().map(|name| node(name)).collect();
    for pair in nodes.windows(2) {
        pair[0].set("Child", pair[1].clone());
    }
    nodes[0].clone()
}

fn child_of(object: &ObjectRef) -> Option<ObjectRef> {
    object.get("Child").as_object().cloned()
}

#[test]
fn test_mutual_references_map_to_one_destination_graph() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto").preserve_references();
    });
    let a = node("a");
    let b = node("b");
    a.set("Child", b.clone());
    b.set("Parent", a.clone());

    let dto = mapper.transform(&a, "NodeDto").unwrap();

    let child = child_of(&dto).expect("child mapped");
    assert_eq!(child.get("Name"), Value::from("b"));
    let parent = child.get("Parent");
    assert!(parent.as_object().expect("parent mapped").ptr_eq(&dto));
}

#[test]
fn test_shared_sources_stay_shared() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto").preserve_references();
    });
    let shared = node("shared");
    let root = node("root");
    root.set("Child", shared.clone());
    root.set(
        "Items",
        Value::List(vec![shared.clone().into(), shared.into()]),
    );

    let dto = mapper.transform(&root, "NodeDto").unwrap();

    let child = child_of(&dto).unwrap();
    let items = dto.get("Items");
    let items = items.as_list().unwrap();
    assert!(items[0].as_object().unwrap().ptr_eq(&child));
    assert!(items[1].as_object().unwrap().ptr_eq(&child));
}

#[test]
fn test_without_reference_tracking_shared_sources_are_copied() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto");
    });
    let shared = node("shared");
    let root = node("root");
    root.set(
        "Items",
        Value::List(vec![shared.clone().into(), shared.into()]),
    );

    let dto = mapper.transform(&root, "NodeDto").unwrap();

    let items = dto.get("Items");
    let items = items.as_list().unwrap();
    let first = items[0].as_object().unwrap();
    let second = items[1].as_object().unwrap();
    assert!(!first.ptr_eq(second));
    assert_eq!(first, second);
}

#[test]
fn test_max_depth_one_populates_first_level_only() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto").max_depth(1);
    });

    let dto = mapper.transform(&chain(&["a", "b", "c"]), "NodeDto").unwrap();

    let first = child_of(&dto).expect("first level populated");
    assert_eq!(first.get("Name"), Value::from("b"));
    assert!(first.get("Child").is_null());
}

#[test]
fn test_global_depth_limit_stops_unbounded_cycles() {
    let mapper = build(EngineConfig::default().with_max_depth(3), |maps| {
        maps.create_map("Node", "NodeDto");
    });
    let looped = node("loop");
    looped.set("Child", looped.clone());

    let dto = mapper.transform(&looped, "NodeDto").unwrap();

    let mut depth = 0;
    let mut current = dto;
    while let Some(next) = child_of(&current) {
        assert!(!next.ptr_eq(&current));
        depth += 1;
        current = next;
    }
    assert_eq!(depth, 3);
}

#[test]
fn test_hooks_run_around_member_mapping() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let before = events.clone();
    let after = events.clone();
    let mapper = build(EngineConfig::default(), move |maps| {
        let before = before.clone();
        let after = after.clone();
        maps.create_map("Node", "NodeDto")
            .before_map(move |_, dst| {
                before
                    .lock()
                    .unwrap()
                    .push(format!("before:{}", dst.get("Name")));
            })
            .after_map(move |_, dst| {
                after
                    .lock()
                    .unwrap()
                    .push(format!("after:{}", dst.get("Name")));
            });
    });

    mapper.transform(&node("n"), "NodeDto").unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["before:null".to_string(), "after:n".to_string()]
    );
}

#[test]
fn test_failed_merge_rolls_back_every_touched_object() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto").construct_using(|src| {
            match src.get("Name").as_str() {
                Some("boom") => anyhow::bail!("refusing to build {}", "boom"),
                _ => Ok(Object::new("NodeDto")),
            }
        });
    });

    let existing_child = ObjectRef::new(Object::new("NodeDto").with("Name", "old-child"));
    let destination = ObjectRef::new(
        Object::new("NodeDto")
            .with("Name", "old-root")
            .with("Child", existing_child.clone()),
    );
    let source = chain(&["new-root", "new-child", "boom"]);

    let err = mapper.merge_into(&source, &destination).unwrap_err();

    assert_eq!(
        err,
        MapperError::Construction {
            type_name: "NodeDto".into(),
            message: "refusing to build boom".to_string(),
        }
    );
    assert_eq!(destination.get("Name"), Value::from("old-root"));
    assert_eq!(existing_child.get("Name"), Value::from("old-child"));
    assert!(existing_child.get("Child").is_null());
}

#[test]
fn test_constructor_must_produce_destination_type() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto")
            .construct_using(|_| Ok(Object::new("Node")));
    });

    let err = mapper.transform(&node("n"), "NodeDto").unwrap_err();
    assert!(matches!(err, MapperError::Construction { .. }));
    assert!(err.to_string().contains("instance of Node"));
}

#[test]
fn test_type_mismatch_is_a_member_access_error() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto")
            .for_member("Name", |m| m.map_from(|_| Value::Int(42)));
    });

    let err = mapper.transform(&node("n"), "NodeDto").unwrap_err();
    assert!(matches!(
        err,
        MapperError::MemberAccess { ref member, .. } if member == "Name"
    ));
}

#[test]
fn test_flattening_reads_nested_paths() {
    let mapper = MapperConfiguration::new()
        .with_config(EngineConfig::default().with_flattening(true))
        .register_type(
            TypeSchema::builder("Order")
                .member("Customer", MemberType::object("Customer"))
                .build(),
        )
        .register_type(
            TypeSchema::builder("Customer")
                .member("Name", MemberType::String)
                .build(),
        )
        .register_type(
            TypeSchema::builder("OrderSummary")
                .member("CustomerName", MemberType::String)
                .build(),
        )
        .add_profile_fn("orders", |maps| {
            maps.create_map("Order", "OrderSummary");
        })
        .build()
        .unwrap();

    let order = ObjectRef::new(
        Object::new("Order").with("Customer", Object::new("Customer").with("Name", "Ada")),
    );
    let summary = mapper.transform(&order, "OrderSummary").unwrap();
    assert_eq!(summary.get("CustomerName"), Value::from("Ada"));

    let anonymous = ObjectRef::new(Object::new("Order"));
    let summary = mapper.transform(&anonymous, "OrderSummary").unwrap();
    assert!(summary.get("CustomerName").is_null());
}

#[test]
fn test_any_members_share_object_handles() {
    let envelope = |name: &str| {
        TypeSchema::builder(name)
            .member("Payload", MemberType::Any)
            .build()
    };
    let mapper = MapperConfiguration::new()
        .register_type(envelope("Envelope"))
        .register_type(envelope("EnvelopeDto"))
        .register_type(node_schema("Node", "Node"))
        .add_profile_fn("envelopes", |maps| {
            maps.create_map("Envelope", "EnvelopeDto");
        })
        .build()
        .unwrap();
    let payload = node("payload");
    let source = ObjectRef::new(Object::new("Envelope").with("Payload", payload.clone()));

    let dto = mapper.transform(&source, "EnvelopeDto").unwrap();

    let stored = dto.get("Payload");
    assert!(stored.as_object().expect("payload kept").ptr_eq(&payload));
}

#[test]
fn test_mapper_is_shared_across_threads() {
    let mapper = build(EngineConfig::default(), |maps| {
        maps.create_map("Node", "NodeDto");
    });

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mapper = mapper.clone();
            std::thread::spawn(move || {
                let name = format!("node-{}", i);
                let dto = mapper.transform(&chain(&[name.as_str(), "leaf"]), "NodeDto")?;
                Ok::<_, MapperError>(dto.get("Name"))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let name = handle.join().unwrap().unwrap();
        assert_eq!(name, Value::from(format!("node-{}", i)));
    }
}
