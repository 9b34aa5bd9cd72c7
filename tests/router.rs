use hypermap::router::{Query, Router, UrlRouter};

fn setup() -> UrlRouter {
    UrlRouter::new("https://api.test/")
}

#[test]
fn plain_queries() {
    let router = setup();
    assert_eq!(router.url_for_type("posts"), "https://api.test/posts");
    assert_eq!(
        router.url_for_ids("posts", &["1".to_string(), "2".to_string()]),
        "https://api.test/posts/1,2"
    );
    let query = Query::new("posts")
        .whose("state", "draft")
        .sort_ascending("title")
        .sort_descending("published")
        .restrict_fields("posts", &["title", "author"])
        .include("author")
        .page(2)
        .page_size(25);
    assert_eq!(
        router.url_for_query(&query),
        "https://api.test/posts?filter[state]=draft&sort=title,-published&fields[posts]=title,author&include=author&page=2&page_size=25"
    );
}

#[test]
fn reserved_characters_are_escaped() {
    let router = setup();
    let query = Query::new("posts")
        .ids(["a/b", "c,d"])
        .whose("title", "a b&c")
        .whose("tag=x", "100%")
        .sort_descending("café")
        .include("author?");
    assert_eq!(
        router.url_for_query(&query),
        "https://api.test/posts/a%2Fb,c%2Cd?filter[title]=a%20b%26c&filter[tag%3Dx]=100%25&sort=-caf%C3%A9&include=author%3F"
    );
}

#[test]
fn hrefs_are_used_verbatim() {
    let router = setup();
    let query = Query::from_url("comments", "https://api.test/comments?post=1&x=a%20b");
    assert_eq!(router.url_for_query(&query), "https://api.test/comments?post=1&x=a%20b");
}
