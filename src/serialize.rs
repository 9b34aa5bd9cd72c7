//! Typed resources -> wire document.

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::descriptor::{AttributeKind, Registry};
use crate::error::{MapperError, Result};
use crate::resource::{Resource, ResourceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationMode {
    AllAttributes,
    /// Only plain attributes changed since the last sync. Relationships are always sent.
    DirtyAttributes,
}

// ------------- Serializer -------------
pub struct Serializer<'r> {
    registry: &'r Registry,
}

impl<'r> Serializer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// A single resource becomes `{type: representation}`; several become
    /// `{type: [representation, ...]}` per type, types in first-seen order.
    pub fn serialize(&self, resources: &[&Resource], mode: SerializationMode) -> Result<Json> {
        let mut document = Map::new();
        if let [single] = resources {
            document.insert(
                single.resource_type().to_string(),
                Json::Object(self.representation(single, mode)?),
            );
            return Ok(Json::Object(document));
        }
        for resource in resources {
            let representation = Json::Object(self.representation(resource, mode)?);
            let list = document
                .entry(resource.resource_type().to_string())
                .or_insert_with(|| Json::Array(Vec::new()));
            if let Json::Array(list) = list {
                list.push(representation);
            }
        }
        Ok(Json::Object(document))
    }

    pub fn serialize_refs(&self, resources: &[ResourceRef], mode: SerializationMode) -> Result<Json> {
        let guards: Vec<_> = resources.iter().map(ResourceRef::read).collect();
        let borrowed: Vec<&Resource> = guards.iter().map(|g| &**g).collect();
        self.serialize(&borrowed, mode)
    }

    pub fn representation(&self, resource: &Resource, mode: SerializationMode) -> Result<Map<String, Json>> {
        let descriptor = self.registry.descriptor(resource.resource_type())?;
        let mut representation = Map::new();
        if let Some(id) = resource.id() {
            representation.insert("id".to_string(), Json::String(id.to_string()));
        }
        for attribute in descriptor.plain() {
            if mode == SerializationMode::DirtyAttributes && !resource.is_dirty(attribute.name()) {
                continue;
            }
            // unset goes out as an explicit null, never omitted
            let value = resource
                .attribute(attribute.name())
                .map(|v| v.to_json())
                .unwrap_or(Json::Null);
            representation.insert(attribute.wire_name().to_string(), value);
        }

        let mut links = Map::new();
        for attribute in descriptor.relationships() {
            let value = match attribute.kind() {
                AttributeKind::ToOne => match resource.to_one(attribute.name()).and_then(|k| k.id()) {
                    Some(id) => Json::String(id.to_string()),
                    None => Json::Null,
                },
                AttributeKind::ToMany => {
                    let mut ids = Vec::new();
                    for key in resource.to_many(attribute.name()) {
                        match key.id() {
                            Some(id) if key.is_saved() => ids.push(Json::String(id.to_string())),
                            _ => {
                                return Err(MapperError::PrecedenceViolation {
                                    resource_type: resource.resource_type().to_string(),
                                    relationship: attribute.name().to_string(),
                                });
                            }
                        }
                    }
                    Json::Array(ids)
                }
                AttributeKind::Property | AttributeKind::Date => continue,
            };
            links.insert(attribute.wire_name().to_string(), value);
        }
        if !links.is_empty() {
            representation.insert("links".to_string(), Json::Object(links));
        }
        debug!(resource = %resource.key(), ?mode, "serialized");
        Ok(representation)
    }
}
