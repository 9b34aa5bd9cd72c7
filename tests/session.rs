use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use hypermap::descriptor::{Registry, TypeDescriptor};
use hypermap::resource::{Resource, ResourceKey, ResourceRef};
use hypermap::router::{Query, UrlRouter};
use hypermap::session::Session;
use hypermap::transport::{Response, Transport};
use hypermap::{MapperError, Result};
use serde_json::{json, Value as Json};

// Answers from a fixed table and records every request it sees.
#[derive(Default)]
struct MockTransport {
    answers: Mutex<HashMap<(String, String), Response>>,
    requests: Mutex<Vec<(String, String, Option<Json>)>>,
}

impl MockTransport {
    fn answer(&self, method: &str, url: &str, status: u16, body: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert((method.to_string(), url.to_string()), Response::new(status, body));
    }
    fn respond(&self, method: &str, url: &str, body: Option<&Json>) -> Result<Response> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string(), body.cloned()));
        self.answers
            .lock()
            .unwrap()
            .get(&(method.to_string(), url.to_string()))
            .cloned()
            .ok_or_else(|| MapperError::Transport(format!("no answer for {method} {url}")))
    }
    fn last_request(&self) -> (String, String, Option<Json>) {
        self.requests.lock().unwrap().last().cloned().expect("a request")
    }
}

impl Transport for MockTransport {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response>> {
        async move { self.respond("GET", url, None) }.boxed()
    }
    fn post<'a>(&'a self, url: &'a str, body: &'a Json) -> BoxFuture<'a, Result<Response>> {
        async move { self.respond("POST", url, Some(body)) }.boxed()
    }
    fn put<'a>(&'a self, url: &'a str, body: &'a Json) -> BoxFuture<'a, Result<Response>> {
        async move { self.respond("PUT", url, Some(body)) }.boxed()
    }
    fn delete<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Response>> {
        async move { self.respond("DELETE", url, None) }.boxed()
    }
}

fn setup() -> (Session, Arc<MockTransport>) {
    let mut registry = Registry::new();
    registry.register(TypeDescriptor::new("posts").property("title").to_one("author", "users"));
    registry.register(TypeDescriptor::new("users").property("name"));
    let transport = Arc::new(MockTransport::default());
    let session = Session::new(
        registry,
        Arc::new(UrlRouter::new("https://api.test/")),
        transport.clone(),
    );
    (session, transport)
}

#[tokio::test]
async fn fetch_merges_into_the_session_store() {
    let (mut session, transport) = setup();
    transport.answer(
        "GET",
        "https://api.test/posts/1",
        200,
        r#"{"posts":{"id":"1","href":"https://api.test/posts/1","title":"Hi","links":{"author":"9"}}}"#,
    );
    transport.answer(
        "GET",
        "https://api.test/users/9",
        200,
        r#"{"users":[{"id":"9","name":"Ada"}]}"#,
    );
    let post = session.fetch_one("posts", "1").await.expect("fetch").expect("post");
    assert_eq!(post.read().attribute("title").and_then(|v| v.as_str()), Some("Hi"));
    let stub = session.store().get("users", "9").expect("stub");
    assert!(stub.read().is_placeholder());

    let authors = session.fetch_related(&post, "author").await.expect("related");
    assert_eq!(authors.len(), 1);
    assert!(authors[0].same(&stub), "the stub is filled in place");
    assert!(!stub.read().is_placeholder());
}

#[tokio::test]
async fn save_posts_new_and_puts_dirty_changes() {
    let (mut session, transport) = setup();
    let mut draft = Resource::with_id("posts", "p-1");
    draft.set("title", "New");
    draft.set_to_one("author", Some(ResourceKey::new("users", "9")));
    let draft = ResourceRef::new(draft);

    transport.answer(
        "POST",
        "https://api.test/posts",
        201,
        r#"{"posts":{"id":"p-1","href":"https://api.test/posts/p-1","title":"New","links":{"author":"9"}}}"#,
    );
    let kept = session.save(&draft).await.expect("create");
    assert!(kept.same(&draft));
    let (method, _, body) = transport.last_request();
    assert_eq!(method, "POST");
    assert_eq!(
        body,
        Some(json!({"posts": {"id": "p-1", "title": "New", "links": {"author": "9"}}}))
    );
    assert!(draft.read().is_persisted());
    assert_eq!(draft.read().dirty_attributes().count(), 0);
    assert!(session.store().get("posts", "p-1").expect("kept").same(&draft));

    draft.write().set("title", "Changed");
    transport.answer("PUT", "https://api.test/posts/p-1", 204, "");
    session.save(&draft).await.expect("update");
    let (method, url, body) = transport.last_request();
    assert_eq!((method.as_str(), url.as_str()), ("PUT", "https://api.test/posts/p-1"));
    assert_eq!(
        body,
        Some(json!({"posts": {"id": "p-1", "title": "Changed", "links": {"author": "9"}}}))
    );
    assert!(!draft.read().is_dirty("title"));
}

#[tokio::test]
async fn save_without_id_takes_the_server_id() {
    let (mut session, transport) = setup();
    let draft = ResourceRef::new(Resource::new("posts"));
    draft.write().set("title", "Anonymous");
    transport.answer(
        "POST",
        "https://api.test/posts",
        201,
        r#"{"posts":[{"id":"77","href":"https://api.test/posts/77","title":"Anonymous"}]}"#,
    );
    let kept = session.save(&draft).await.expect("create");
    assert_eq!(kept.read().id(), Some("77"));
    let (_, _, body) = transport.last_request();
    assert_eq!(
        body,
        Some(json!({"posts": {"title": "Anonymous", "links": {"author": null}}}))
    );
}

#[tokio::test]
async fn save_fills_an_already_kept_stub() {
    let (mut session, transport) = setup();
    let (stub, _) = session
        .store_mut()
        .keep(Resource::with_id("posts", "5"))
        .expect("keep");
    let mut draft = Resource::with_id("posts", "5");
    draft.set("title", "Five");
    draft.set_to_one("author", Some(ResourceKey::new("users", "9")));
    let draft = ResourceRef::new(draft);

    transport.answer("POST", "https://api.test/posts", 201, "");
    let kept = session.save(&draft).await.expect("create");
    assert!(kept.same(&stub));
    assert!(!kept.same(&draft));
    let kept = kept.read();
    assert_eq!(kept.attribute("title").and_then(|v| v.as_str()), Some("Five"));
    assert_eq!(kept.to_one("author"), Some(&ResourceKey::new("users", "9")));
    assert!(!kept.is_placeholder());
    assert_eq!(kept.dirty_attributes().count(), 0);
}

#[tokio::test]
async fn server_errors_carry_code_and_title() {
    let (mut session, transport) = setup();
    transport.answer(
        "GET",
        "https://api.test/posts/404",
        404,
        r#"{"errors":[{"id":"1404","title":"Post not found"}]}"#,
    );
    transport.answer("GET", "https://api.test/posts/500", 500, "");

    let err = session.fetch_one("posts", "404").await.unwrap_err();
    match err {
        MapperError::ServerReported { code, title } => {
            assert_eq!(code, 1404);
            assert_eq!(title.as_deref(), Some("Post not found"));
        }
        other => panic!("unexpected error {other}"),
    }
    let err = session.fetch_one("posts", "500").await.unwrap_err();
    assert!(matches!(err, MapperError::ServerReported { code: 500, title: None }), "{err}");
    assert!(session.store().is_empty());

    let err = session.fetch(&Query::new("users")).await.unwrap_err();
    assert!(matches!(err, MapperError::Transport(_)), "{err}");
}

#[tokio::test]
async fn delete_removes_from_store() {
    let (mut session, transport) = setup();
    let (post, _) = session
        .store_mut()
        .keep(Resource::with_id("posts", "3"))
        .expect("keep");
    transport.answer("DELETE", "https://api.test/posts/3", 204, "");
    session.delete(&post).await.expect("delete");
    assert!(session.store().get("posts", "3").is_none());

    let unsaved = ResourceRef::new(Resource::new("posts"));
    let err = session.delete(&unsaved).await.unwrap_err();
    assert!(matches!(err, MapperError::InvariantViolation(_)));
}
