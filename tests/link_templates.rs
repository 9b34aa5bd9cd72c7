use std::collections::HashMap;

use hypermap::descriptor::{Registry, TypeDescriptor};
use hypermap::deserialize::Deserializer;
use hypermap::link::{interpolate, LinkTemplate, RelationshipLink};
use hypermap::resource::{KeyHasher, ResourceKey};
use hypermap::store::Store;
use serde_json::json;

fn setup() -> Registry {
    let mut registry = Registry::new();
    registry.register(
        TypeDescriptor::new("posts")
            .property("title")
            .to_one("author", "users")
            .to_many("comments", "comments"),
    );
    registry.register(TypeDescriptor::new("people").property("name"));
    registry.register(TypeDescriptor::new("users").property("name"));
    registry
}

#[test]
fn placeholders_use_own_id_and_known_ids() {
    let mut known: HashMap<String, Vec<String>, KeyHasher> = HashMap::default();
    known.insert("comments".to_string(), vec!["5".to_string(), "12".to_string()]);
    assert_eq!(
        interpolate("https://x/posts/{posts.id}/comments/{posts.comments}", "posts", Some("1"), &known),
        "https://x/posts/1/comments/5,12"
    );
    // other types and unknown relationships are left alone
    assert_eq!(
        interpolate("https://x/{users.id}/{posts.tags}", "posts", Some("1"), &known),
        "https://x/{users.id}/{posts.tags}"
    );
}

#[test]
fn template_keys_must_name_type_and_relationship() {
    assert!(LinkTemplate::parse("posts", &json!("https://x")).is_none());
    assert!(LinkTemplate::parse("posts.", &json!("https://x")).is_none());
    assert!(LinkTemplate::parse("posts.author", &json!(3)).is_none());
    let template = LinkTemplate::parse("posts.author", &json!({"href": "https://x/people/{posts.author}", "type": "people"}))
        .expect("template");
    assert_eq!(template.resource_type(), "posts");
    assert_eq!(template.relationship(), "author");
    assert_eq!(template.related_type(), Some("people"));
}

#[test]
fn explicit_link_data_wins_over_template() {
    let mut explicit = RelationshipLink {
        href: Some("https://explicit".to_string()),
        ids: None,
        resource_type: None,
    };
    explicit.merge(RelationshipLink {
        href: Some("https://template".to_string()),
        ids: Some(vec!["1".to_string()]),
        resource_type: Some("people".to_string()),
    });
    assert_eq!(explicit.href.as_deref(), Some("https://explicit"));
    assert_eq!(explicit.ids, Some(vec!["1".to_string()]));
    assert_eq!(explicit.resource_type.as_deref(), Some("people"));
}

#[test]
fn document_templates_fill_in_missing_links() {
    let registry = setup();
    let doc = json!({
        "links": {
            "posts.author": {"href": "https://api.example.com/people/{posts.author}", "type": "people"},
            "posts.comments": "https://api.example.com/comments?post={posts.id}"
        },
        "posts": [
            {"id": "1", "links": {"author": "9"}},
            {"id": "2", "links": {"author": {"href": "https://elsewhere/users/4", "id": "4", "type": "users"}}},
            {"id": "3"}
        ]
    });
    let (store, extract) = Deserializer::new(&registry)
        .deserialize_document(&doc, None)
        .expect("deserialize");

    let first = store.get("posts", "1").expect("post 1");
    let first = first.read();
    assert_eq!(first.to_one("author"), Some(&ResourceKey::new("people", "9")));
    assert_eq!(first.relationship_href("author"), Some("https://api.example.com/people/9"));
    assert_eq!(
        first.relationship_href("comments"),
        Some("https://api.example.com/comments?post=1")
    );
    assert!(first.relationship("comments").is_none(), "a template carries no ids");

    let second = store.get("posts", "2").expect("post 2");
    let second = second.read();
    assert_eq!(second.to_one("author"), Some(&ResourceKey::new("users", "4")));
    assert_eq!(second.relationship_href("author"), Some("https://elsewhere/users/4"));

    // no author ids known, so the placeholder stays in the href and the relationship unset
    let third = store.get("posts", "3").expect("post 3");
    let third = third.read();
    assert_eq!(
        third.relationship_href("author"),
        Some("https://api.example.com/people/{posts.author}")
    );
    assert!(third.relationship("author").is_none());

    assert!(store.get("people", "9").expect("stub").read().is_placeholder());
    assert_eq!(extract.resolution.unset, 4);
}

#[test]
fn href_from_an_earlier_document_survives_a_template() {
    let registry = setup();
    let deserializer = Deserializer::new(&registry);
    let mut store = Store::new();
    deserializer
        .deserialize_into(
            &json!({"posts": {"id": "1", "links": {"comments": {"href": "https://elsewhere/threads/1"}}}}),
            &mut store,
        )
        .expect("first");
    deserializer
        .deserialize_into(
            &json!({
                "links": {"posts.comments": "https://api.example.com/comments?post={posts.id}"},
                "posts": [{"id": "1", "title": "Again"}]
            }),
            &mut store,
        )
        .expect("second");
    let post = store.get("posts", "1").expect("post");
    assert_eq!(post.read().relationship_href("comments"), Some("https://elsewhere/threads/1"));
}
