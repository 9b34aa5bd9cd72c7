//! An explicitly constructed context tying the registry, the identity store,
//! the router and the transport together. There is no global instance;
//! whoever builds a session owns its lifetime and configuration.

use std::sync::Arc;

use serde_json::Value as Json;
use tracing::{debug, info};

use crate::deserialize::{Deserializer, Extract};
use crate::descriptor::Registry;
use crate::error::{MapperError, Result};
use crate::resource::ResourceRef;
use crate::router::{Query, Router};
use crate::serialize::{SerializationMode, Serializer};
use crate::store::Store;
use crate::transport::{successful, Response, Transport};

fn parse_body(response: &Response) -> Result<Json> {
    serde_json::from_slice(&response.body).map_err(|e| MapperError::MalformedDocument(e.to_string()))
}

// the id the server gave the first representation of `resource_type`
fn echoed_id(document: &Json, resource_type: &str) -> Option<String> {
    let representation = match document.get(resource_type)? {
        Json::Array(items) => items.first()?,
        other => other,
    };
    match representation.get("id")? {
        Json::String(id) => Some(id.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct Session {
    registry: Registry,
    store: Store,
    router: Arc<dyn Router>,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn new(registry: Registry, router: Arc<dyn Router>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            store: Store::new(),
            router,
            transport,
        }
    }
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
    pub fn store(&self) -> &Store {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Fetches whatever the query addresses and merges it into the store.
    pub async fn fetch(&mut self, query: &Query) -> Result<Extract> {
        let url = self.router.url_for_query(query);
        info!(%url, "fetch");
        let response = successful(self.transport.get(&url).await?)?;
        let document = parse_body(&response)?;
        Deserializer::new(&self.registry).deserialize_into(&document, &mut self.store)
    }

    pub async fn fetch_one(&mut self, resource_type: &str, id: &str) -> Result<Option<ResourceRef>> {
        self.fetch(&Query::new(resource_type).ids([id])).await?;
        Ok(self.store.get(resource_type, id))
    }

    /// Loads the members of a relationship. Uses the relationship's href
    /// when the server gave one, otherwise addresses the known ids.
    pub async fn fetch_related(&mut self, resource: &ResourceRef, relationship: &str) -> Result<Vec<ResourceRef>> {
        let (query, keys) = {
            let r = resource.read();
            let descriptor = self.registry.descriptor(r.resource_type())?;
            let attribute = descriptor.get(relationship).ok_or_else(|| {
                MapperError::InvariantViolation(format!(
                    "'{}' declares no relationship '{}'",
                    r.resource_type(),
                    relationship
                ))
            })?;
            let keys: Vec<_> = match r.to_one(relationship) {
                Some(key) => vec![key.clone()],
                None => r.to_many(relationship).to_vec(),
            };
            let related_type = keys
                .first()
                .map(|k| k.resource_type().to_string())
                .unwrap_or_else(|| attribute.related_type());
            let query = match r.relationship_href(relationship) {
                Some(href) => Some(Query::from_url(&related_type, href)),
                None if keys.is_empty() => None,
                None => Some(Query::new(&related_type).ids(keys.iter().filter_map(|k| k.id()))),
            };
            (query, keys)
        };
        let Some(query) = query else {
            return Ok(Vec::new());
        };
        let extract = self.fetch(&query).await?;
        if keys.is_empty() {
            return Ok(extract.primary);
        }
        Ok(keys.iter().filter_map(|k| self.store.resolve(k)).collect())
    }

    /// Creates (POST, all attributes) a resource the server does not know
    /// yet, or updates (PUT, dirty attributes) one it does. The server's
    /// answer is merged back and the kept handle is returned.
    pub async fn save(&mut self, resource: &ResourceRef) -> Result<ResourceRef> {
        let (key, href) = {
            let r = resource.read();
            (r.key(), r.href().map(str::to_string))
        };
        let (mode, url) = match &href {
            Some(href) => (SerializationMode::DirtyAttributes, href.clone()),
            None => (SerializationMode::AllAttributes, self.router.url_for_type(key.resource_type())),
        };
        let body = Serializer::new(&self.registry).serialize_refs(std::slice::from_ref(resource), mode)?;
        info!(resource = %key, %url, ?mode, "save");
        let response = match href {
            Some(_) => self.transport.put(&url, &body).await?,
            None => self.transport.post(&url, &body).await?,
        };
        let response = successful(response)?;
        let document = if response.has_body() { Some(parse_body(&response)?) } else { None };

        if key.id().is_none() {
            let id = document
                .as_ref()
                .and_then(|d| echoed_id(d, key.resource_type()))
                .ok_or_else(|| {
                    MapperError::InvariantViolation(format!("server assigned no id to {}", key))
                })?;
            resource.write().set_id(&id);
        }
        let (kept, _) = self.store.keep_ref(resource.clone())?;
        if !kept.same(resource) {
            // an instance for this key was kept already (e.g. a placeholder)
            kept.write().absorb(&resource.read());
        }
        if let Some(document) = &document {
            Deserializer::new(&self.registry).deserialize_into(document, &mut self.store)?;
        }
        resource.write().mark_clean();
        if !kept.same(resource) {
            kept.write().mark_clean();
        }
        debug!(resource = %kept.key(), "saved");
        Ok(kept)
    }

    /// Deletes on the server, then removes the resource from the store.
    pub async fn delete(&mut self, resource: &ResourceRef) -> Result<()> {
        let (key, href) = {
            let r = resource.read();
            (r.key(), r.href().map(str::to_string))
        };
        let id = key
            .id()
            .ok_or_else(|| MapperError::InvariantViolation(format!("cannot delete {}", key)))?;
        let url = href.unwrap_or_else(|| self.router.url_for_ids(key.resource_type(), &[id.to_string()]));
        info!(resource = %key, %url, "delete");
        successful(self.transport.delete(&url).await?)?;
        self.store.remove(&key)?;
        Ok(())
    }
}
