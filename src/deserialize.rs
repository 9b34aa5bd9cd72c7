//! Wire document -> populated identity store.
//!
//! A document is a JSON object whose keys are resource types mapping to a
//! representation or a list of representations. Three keys are reserved:
//! `links` holds document-level link templates, `meta` holds free-form data
//! including pagination hints, and `linked` holds compound resources keyed
//! the same way as the top level, one level deep.
//!
//! Deserialization runs in passes:
//! 1. collect and validate every representation (shape, id, registered type,
//!    relationship link encodings),
//! 2. ingest them into the store, reusing kept instances by (type, id),
//! 3. apply link templates where a resource has no explicit href of its own,
//! 4. resolve relationships, stubbing referents that are not in the store,
//! 5. extract pagination hints from `meta`.
//!
//! Nothing touches the store before pass 1 succeeds, so a malformed document
//! or one naming an unregistered type leaves a passed-in store as it was.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::{debug, info, warn};

use crate::descriptor::{AttributeKind, Registry, TypeDescriptor};
use crate::error::{MapperError, Result};
use crate::link::{LinkTemplate, RelationshipLink};
use crate::resolve::{PendingLinks, Resolution, Resolver};
use crate::resource::{KeyHasher, ResourceRef};
use crate::store::Store;
use crate::value::{date_or_now, Value};

const LINKS: &str = "links";
const META: &str = "meta";
const LINKED: &str = "linked";

// ------------- PaginationMeta -------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub count: Option<u64>,
    pub limit: Option<u64>,
    pub before_cursor: Option<String>,
    pub after_cursor: Option<String>,
}

impl PaginationMeta {
    fn from_meta(meta: &Map<String, Json>) -> Option<PaginationMeta> {
        let read = |meta: &Map<String, Json>| {
            let cursor = |key: &str| match meta.get(key) {
                Some(Json::String(s)) => Some(s.clone()),
                Some(Json::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            PaginationMeta {
                count: meta.get("count").and_then(Json::as_u64),
                limit: meta.get("limit").and_then(Json::as_u64),
                before_cursor: cursor("before_cursor"),
                after_cursor: cursor("after_cursor"),
            }
        };
        let top = read(meta);
        if !top.is_empty() {
            return Some(top);
        }
        // some servers nest the hints under the resource type
        meta.values()
            .filter_map(Json::as_object)
            .map(read)
            .find(|nested| !nested.is_empty())
    }
    pub fn is_empty(&self) -> bool {
        self.count.is_none()
            && self.limit.is_none()
            && self.before_cursor.is_none()
            && self.after_cursor.is_none()
    }
}

// ------------- Extract -------------
/// What a deserialization produced besides the store itself.
#[derive(Debug, Default)]
pub struct Extract {
    /// resources listed at the top level, in document order
    pub primary: Vec<ResourceRef>,
    /// resources listed under `linked`
    pub linked: Vec<ResourceRef>,
    pub pagination: Option<PaginationMeta>,
    pub meta: Option<Map<String, Json>>,
    pub resolution: Resolution,
}

// one validated representation waiting to be ingested
struct Representation<'d> {
    resource_type: &'d str,
    id: String,
    body: &'d Map<String, Json>,
    primary: bool,
}

fn representation_id(resource_type: &str, body: &Map<String, Json>) -> Result<String> {
    match body.get("id") {
        Some(Json::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Json::Number(n)) => Ok(n.to_string()),
        _ => Err(MapperError::MalformedDocument(format!(
            "representation of '{}' has no usable id",
            resource_type
        ))),
    }
}

fn collect<'d>(
    resource_type: &'d str,
    raw: &'d Json,
    primary: bool,
    out: &mut Vec<Representation<'d>>,
) -> Result<()> {
    let mut push = |body: &'d Json| -> Result<()> {
        let body = body.as_object().ok_or_else(|| {
            MapperError::MalformedDocument(format!("'{}' holds a non-object representation", resource_type))
        })?;
        out.push(Representation {
            resource_type,
            id: representation_id(resource_type, body)?,
            body,
            primary,
        });
        Ok(())
    };
    match raw {
        Json::Array(items) => items.iter().try_for_each(push),
        Json::Object(_) => push(raw),
        Json::Null => Ok(()),
        _ => Err(MapperError::MalformedDocument(format!(
            "'{}' is neither a representation nor a list of them",
            resource_type
        ))),
    }
}

// relationship links of one representation, keyed by attribute name
fn stage_links(
    representation: &Representation,
    descriptor: &TypeDescriptor,
) -> Result<Vec<(String, RelationshipLink)>> {
    let body = representation.body;
    let own_links = body.get(LINKS).and_then(Json::as_object);
    let mut links = Vec::new();
    for attribute in descriptor.relationships() {
        let wire_name = attribute.wire_name();
        let raw = own_links
            .and_then(|links| links.get(wire_name))
            .or_else(|| body.get(wire_name));
        if let Some(raw) = raw {
            links.push((attribute.name().to_string(), RelationshipLink::from_json(raw)?));
        }
    }
    Ok(links)
}

// ------------- Deserializer -------------
pub struct Deserializer<'r> {
    registry: &'r Registry,
}

impl<'r> Deserializer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Parses raw bytes and deserializes them into a fresh store.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<(Store, Extract)> {
        let document: Json = serde_json::from_slice(bytes)
            .map_err(|e| MapperError::MalformedDocument(e.to_string()))?;
        self.deserialize_document(&document, None)
    }

    /// Deserializes into `store` when given one, otherwise into a fresh store.
    /// On error the store is gone; use [`Deserializer::deserialize_into`] to keep it.
    pub fn deserialize_document(&self, document: &Json, store: Option<Store>) -> Result<(Store, Extract)> {
        let mut store = store.unwrap_or_default();
        let extract = self.deserialize_into(document, &mut store)?;
        Ok((store, extract))
    }

    /// Merges a document into an existing store. Kept instances are
    /// overwritten in place so every holder of a handle sees the new state.
    pub fn deserialize_into(&self, document: &Json, store: &mut Store) -> Result<Extract> {
        let top = document
            .as_object()
            .ok_or_else(|| MapperError::MalformedDocument("top level is not an object".to_string()))?;

        let mut representations = Vec::new();
        for (key, raw) in top {
            match key.as_str() {
                LINKS | META => {}
                LINKED => {
                    let linked = raw.as_object().ok_or_else(|| {
                        MapperError::MalformedDocument("'linked' is not an object".to_string())
                    })?;
                    for (resource_type, nested) in linked {
                        collect(resource_type, nested, false, &mut representations)?;
                    }
                }
                resource_type => collect(resource_type, raw, true, &mut representations)?,
            }
        }
        let mut descriptors = HashMap::<&str, _, KeyHasher>::default();
        for representation in &representations {
            if !descriptors.contains_key(representation.resource_type) {
                let descriptor = self.registry.descriptor(representation.resource_type)?;
                descriptors.insert(representation.resource_type, descriptor);
            }
        }

        let staged = representations
            .iter()
            .map(|r| stage_links(r, &descriptors[r.resource_type]))
            .collect::<Result<Vec<_>>>()?;

        let mut extract = Extract::default();
        let mut pending = PendingLinks::new();
        for (representation, links) in representations.iter().zip(staged) {
            let descriptor = &descriptors[representation.resource_type];
            let resource = self.ingest(representation, descriptor, links, store, &mut pending)?;
            let list = if representation.primary { &mut extract.primary } else { &mut extract.linked };
            if !list.iter().any(|r| r.same(&resource)) {
                list.push(resource);
            }
        }

        if let Some(templates) = top.get(LINKS).and_then(Json::as_object) {
            self.apply_templates(templates, &mut pending);
        }

        extract.resolution = Resolver::new(self.registry).resolve(store, pending)?;

        if let Some(meta) = top.get(META).and_then(Json::as_object) {
            extract.pagination = PaginationMeta::from_meta(meta);
            extract.meta = Some(meta.clone());
        }
        info!(
            primary = extract.primary.len(),
            linked = extract.linked.len(),
            kept = store.len(),
            "document deserialized"
        );
        Ok(extract)
    }

    fn ingest(
        &self,
        representation: &Representation,
        descriptor: &TypeDescriptor,
        links: Vec<(String, RelationshipLink)>,
        store: &mut Store,
        pending: &mut PendingLinks,
    ) -> Result<ResourceRef> {
        let resource_type = representation.resource_type;
        let body = representation.body;
        let resource = match store.get(resource_type, &representation.id) {
            Some(kept) => kept,
            None => {
                let mut fresh = self.registry.instantiate(resource_type)?;
                fresh.set_id(&representation.id);
                store.keep(fresh)?.0
            }
        };
        let slot = pending.track(&resource);
        for (attribute, link) in links {
            pending.insert(slot, &attribute, link);
        }

        let mut kept = resource.write();
        if let Some(href) = body.get("href").and_then(Json::as_str) {
            kept.set_href(Some(href.to_string()));
        }
        for attribute in descriptor.attributes() {
            let wire_name = attribute.wire_name();
            match attribute.kind() {
                AttributeKind::Property => {
                    if let Some(raw) = body.get(wire_name) {
                        kept.load(attribute.name(), Value::from_json(raw));
                    }
                }
                AttributeKind::Date => match body.get(wire_name) {
                    Some(Json::Null) => kept.load(attribute.name(), Value::Null),
                    Some(raw) => kept.load(attribute.name(), Value::Date(date_or_now(raw))),
                    None => {}
                },
                AttributeKind::ToOne | AttributeKind::ToMany => {}
            }
        }
        debug!(resource = %kept.key(), "ingested");
        drop(kept);
        Ok(resource)
    }

    fn apply_templates(&self, templates: &Map<String, Json>, pending: &mut PendingLinks) {
        for (key, raw) in templates {
            let Some(template) = LinkTemplate::parse(key, raw) else {
                warn!(%key, "ignoring document link that is not a type.relationship template");
                continue;
            };
            let Ok(descriptor) = self.registry.descriptor(template.resource_type()) else {
                continue;
            };
            let Some(attribute) = descriptor
                .by_wire_name(template.relationship())
                .filter(|a| a.kind().is_relationship())
            else {
                debug!(%key, "template names no declared relationship");
                continue;
            };
            for i in 0..pending.len() {
                let resource = pending.resources()[i].clone();
                let (resource_type, id, has_href) = {
                    let r = resource.read();
                    (
                        r.resource_type().to_string(),
                        r.id().map(str::to_string),
                        r.relationship_href(attribute.name()).is_some(),
                    )
                };
                if resource_type != template.resource_type() {
                    continue;
                }
                if pending
                    .links_of(i)
                    .get(attribute.name())
                    .is_some_and(|link| link.href.is_some())
                {
                    continue;
                }
                let known: HashMap<String, Vec<String>, KeyHasher> = pending
                    .links_of(i)
                    .iter()
                    .filter_map(|(name, link)| {
                        let wire = descriptor.get(name)?.wire_name().to_string();
                        link.ids.clone().map(|ids| (wire, ids))
                    })
                    .collect();
                let mut contributed = template.apply(id.as_deref(), &known);
                // an href kept from an earlier document stays
                if has_href {
                    contributed.href = None;
                }
                pending.link_mut(i, attribute.name()).merge(contributed);
            }
        }
    }
}
