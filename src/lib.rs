//! Hypermap – a client-side mapping layer between hypermedia JSON documents
//! and graphs of typed resources.
//!
//! A wire document is a JSON object keyed by plural resource types:
//! ```json
//! {
//!   "posts": [{"id": "1", "title": "Hi", "links": {"author": "9"}}],
//!   "linked": {"users": [{"id": "9", "name": "Ada"}]},
//!   "links": {"posts.comments": "https://api.example.com/comments?post={posts.id}"},
//!   "meta": {"count": 1, "limit": 25}
//! }
//! ```
//! and maps onto these pieces:
//! * A [`resource::Resource`] is a typed entity with an optional id, an optional
//!   canonical href, attribute values and relationships.
//! * A [`descriptor::TypeDescriptor`] declares which attributes a type has and
//!   of which [`descriptor::AttributeKind`]; the [`descriptor::Registry`] maps
//!   type names to descriptors and factories.
//! * The [`store::Store`] keeps one instance per (type, id). Relationships hold
//!   [`resource::ResourceKey`]s into it, so cyclic graphs cost no ownership cycles.
//!
//! ## Modules
//! * [`deserialize`] – document -> store, including link templates and pagination hints.
//! * [`resolve`] – turns relationship ids into keys of kept resources, stubbing the unknown.
//! * [`serialize`] – resources -> document, all attributes or only the dirty ones.
//! * [`router`] and [`transport`] – the addressing and network collaborators.
//! * [`session`] – a context object that fetches, saves and deletes through them.
//! * [`settings`] – file and environment configuration.
//!
//! ## Quick Start
//! ```
//! use hypermap::descriptor::{Registry, TypeDescriptor};
//! use hypermap::deserialize::Deserializer;
//!
//! let mut registry = Registry::new();
//! registry.register(TypeDescriptor::new("posts").property("title").to_one("author", "users"));
//! let doc = br#"{"posts":[{"id":"1","title":"Hi","links":{"author":{"id":"9","type":"users"}}}]}"#;
//! let (store, _) = Deserializer::new(&registry).deserialize(doc).unwrap();
//! let post = store.get("posts", "1").unwrap();
//! let author = store.to_one(&post.read(), "author").unwrap();
//! assert!(author.read().is_placeholder());
//! ```
//!
//! ## Leniency
//! Dates that fail to parse become the current time, and relationships
//! without any id information are left unset. Both are logged at `warn`.

pub mod descriptor;
pub mod deserialize;
pub mod error;
pub mod link;
pub mod resolve;
pub mod resource;
pub mod router;
pub mod serialize;
pub mod session;
pub mod settings;
pub mod store;
pub mod transport;
pub mod value;

pub use error::{MapperError, Result};
