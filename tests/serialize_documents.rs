use chrono::DateTime;
use hypermap::descriptor::{AttributeDescriptor, AttributeKind, Registry, TypeDescriptor};
use hypermap::resource::{Resource, ResourceKey};
use hypermap::serialize::{SerializationMode, Serializer};
use hypermap::MapperError;
use serde_json::json;

fn setup() -> Registry {
    let mut registry = Registry::new();
    registry.register(
        TypeDescriptor::new("posts")
            .property("title")
            .property("body")
            .date("published")
            .to_one("author", "users")
            .to_many("comments", "comments"),
    );
    registry.register(TypeDescriptor::new("users").property("name"));
    registry.register(TypeDescriptor::new("comments").property("body"));
    registry
}

#[test]
fn dirty_mode_sends_relationships_but_no_clean_attributes() {
    let mut registry = Registry::new();
    registry.register(TypeDescriptor::new("posts").property("title").to_one("author", "users"));
    let mut post = Resource::with_id("posts", "1");
    post.set_to_one("author", Some(ResourceKey::new("users", "9")));
    let document = Serializer::new(&registry)
        .serialize(&[&post], SerializationMode::DirtyAttributes)
        .expect("serialize");
    assert_eq!(document, json!({"posts": {"id": "1", "links": {"author": "9"}}}));
}

#[test]
fn all_attributes_with_explicit_nulls() {
    let registry = setup();
    let mut post = Resource::new("posts");
    post.set("title", "Hi");
    post.set(
        "published",
        DateTime::parse_from_rfc3339("2014-05-01T10:20:30+02:00").expect("literal"),
    );
    let document = Serializer::new(&registry)
        .serialize(&[&post], SerializationMode::AllAttributes)
        .expect("serialize");
    assert_eq!(
        document,
        json!({"posts": {
            "title": "Hi",
            "body": null,
            "published": "2014-05-01T10:20:30+02:00",
            "links": {"author": null, "comments": []}
        }}),
        "no id for an unsaved resource, unset values as null"
    );
}

#[test]
fn several_resources_become_lists_per_type() {
    let registry = setup();
    let first = Resource::with_id("posts", "1");
    let user = Resource::with_id("users", "9");
    let second = Resource::with_id("posts", "2");
    let document = Serializer::new(&registry)
        .serialize(&[&first, &user, &second], SerializationMode::DirtyAttributes)
        .expect("serialize");
    let links = json!({"author": null, "comments": []});
    assert_eq!(
        document,
        json!({
            "posts": [{"id": "1", "links": links}, {"id": "2", "links": links}],
            "users": [{"id": "9"}]
        })
    );
}

#[test]
fn to_many_with_unsaved_member_is_a_precedence_violation() {
    let registry = setup();
    let mut post = Resource::with_id("posts", "1");
    post.add_to_many("comments", ResourceKey::new("comments", "c1"));
    post.add_to_many("comments", ResourceKey::unsaved("comments"));
    for mode in [SerializationMode::AllAttributes, SerializationMode::DirtyAttributes] {
        let err = Serializer::new(&registry).serialize(&[&post], mode).unwrap_err();
        assert!(
            matches!(err, MapperError::PrecedenceViolation { ref relationship, .. } if relationship == "comments"),
            "{err}"
        );
    }
}

#[test]
fn dirty_mode_emits_exactly_the_dirty_subset() {
    let registry = setup();
    let plain = ["title", "body", "published"];
    for mask in 0..(1 << plain.len()) {
        let mut post = Resource::with_id("posts", "1");
        post.set("title", "t");
        post.set("body", "b");
        post.set("published", DateTime::parse_from_rfc3339("2020-01-01T00:00:00Z").expect("literal"));
        post.mark_clean();
        let dirty: Vec<&str> = plain
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, name)| *name)
            .collect();
        for name in &dirty {
            post.set(name, "changed");
        }
        let representation = Serializer::new(&registry)
            .representation(&post, SerializationMode::DirtyAttributes)
            .expect("serialize");
        for name in plain {
            assert_eq!(representation.contains_key(name), dirty.contains(&name), "mask {mask}, {name}");
        }
        let links = representation["links"].as_object().expect("links always sent");
        assert!(links.contains_key("author") && links.contains_key("comments"), "mask {mask}");
    }
}

#[test]
fn wire_names_are_used_on_the_way_out() {
    let mut registry = Registry::new();
    registry.register(
        TypeDescriptor::new("posts")
            .attribute(AttributeDescriptor::new("title", AttributeKind::Property).with_wire_name("headline"))
            .attribute(
                AttributeDescriptor::new("writer", AttributeKind::ToOne)
                    .with_wire_name("author")
                    .with_related_type("users"),
            ),
    );
    let mut post = Resource::with_id("posts", "1");
    post.set("title", "Renamed");
    post.set_to_one("writer", Some(ResourceKey::new("users", "3")));
    let document = Serializer::new(&registry)
        .serialize(&[&post], SerializationMode::AllAttributes)
        .expect("serialize");
    assert_eq!(
        document,
        json!({"posts": {"id": "1", "headline": "Renamed", "links": {"author": "3"}}})
    );
}

#[test]
fn unregistered_type_cannot_be_serialized() {
    let registry = setup();
    let tag = Resource::with_id("tags", "t");
    let err = Serializer::new(&registry)
        .serialize(&[&tag], SerializationMode::AllAttributes)
        .unwrap_err();
    assert!(matches!(err, MapperError::UnregisteredType(_)));
}
