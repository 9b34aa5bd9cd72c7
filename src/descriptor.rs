//! Attribute descriptor tables and the type registry.
//!
//! A [`TypeDescriptor`] declares, per resource type, which named fields are
//! plain properties, dates, to-one or to-many relationships, and under
//! which wire name each one travels. The [`Registry`] maps a resource type
//! name to its descriptor and to a factory producing fresh instances; it
//! replaces looking up a concrete class by name at runtime.

use std::collections::HashMap;
use std::sync::Arc;

// used to map attribute names to wire names and back
use bimap::BiMap;
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, Result};
use crate::resource::{KeyHasher, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Property,
    Date,
    ToOne,
    ToMany,
}
impl AttributeKind {
    pub fn is_relationship(&self) -> bool {
        matches!(self, AttributeKind::ToOne | AttributeKind::ToMany)
    }
}

/// Type name assumed for a relationship when neither the wire nor the
/// descriptor says otherwise: the plural of the relationship name.
pub fn conventional_type(relationship: &str) -> String {
    if relationship.ends_with('s') {
        relationship.to_string()
    } else {
        format!("{relationship}s")
    }
}

// ------------- AttributeDescriptor -------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    name: String,
    kind: AttributeKind,
    #[serde(default)]
    wire_name: Option<String>,
    #[serde(default)]
    related_type: Option<String>,
}
impl AttributeDescriptor {
    pub fn new(name: &str, kind: AttributeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            wire_name: None,
            related_type: None,
        }
    }
    pub fn with_wire_name(mut self, wire_name: &str) -> Self {
        self.wire_name = Some(wire_name.to_string());
        self
    }
    pub fn with_related_type(mut self, related_type: &str) -> Self {
        self.related_type = Some(related_type.to_string());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }
    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }
    pub fn related_type(&self) -> String {
        match &self.related_type {
            Some(t) => t.clone(),
            None => conventional_type(&self.name),
        }
    }
}

// ------------- TypeDescriptor -------------
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    resource_type: String,
    attributes: Vec<AttributeDescriptor>,
    // attribute name <-> wire name
    wire_names: BiMap<String, String>,
}
impl TypeDescriptor {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            attributes: Vec::new(),
            wire_names: BiMap::new(),
        }
    }
    /// Declares an attribute. Redeclaring a name replaces the earlier
    /// declaration in place. An earlier attribute under a different name but
    /// the same wire name is dropped, so the later declaration wins.
    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.wire_names.insert(
            attribute.name().to_string(),
            attribute.wire_name().to_string(),
        );
        self.attributes
            .retain(|a| a.name == attribute.name || a.wire_name() != attribute.wire_name());
        match self.attributes.iter().position(|a| a.name == attribute.name) {
            Some(i) => self.attributes[i] = attribute,
            None => self.attributes.push(attribute),
        }
        self
    }
    pub fn property(self, name: &str) -> Self {
        self.attribute(AttributeDescriptor::new(name, AttributeKind::Property))
    }
    pub fn date(self, name: &str) -> Self {
        self.attribute(AttributeDescriptor::new(name, AttributeKind::Date))
    }
    pub fn to_one(self, name: &str, related_type: &str) -> Self {
        self.attribute(
            AttributeDescriptor::new(name, AttributeKind::ToOne).with_related_type(related_type),
        )
    }
    pub fn to_many(self, name: &str, related_type: &str) -> Self {
        self.attribute(
            AttributeDescriptor::new(name, AttributeKind::ToMany).with_related_type(related_type),
        )
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }
    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }
    pub fn by_wire_name(&self, wire_name: &str) -> Option<&AttributeDescriptor> {
        self.wire_names
            .get_by_right(wire_name)
            .and_then(|name| self.get(name))
    }
    /// Plain attributes (properties and dates) in declaration order.
    pub fn plain(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| !a.kind.is_relationship())
    }
    pub fn relationships(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.kind.is_relationship())
    }
}

// ------------- Registry -------------
pub type Factory = Arc<dyn Fn() -> Resource + Send + Sync>;

#[derive(Clone)]
struct Registration {
    descriptor: Arc<TypeDescriptor>,
    factory: Factory,
}

/// Resource type name -> descriptor and factory. Descriptors are frozen
/// behind an `Arc` once registered.
#[derive(Clone, Default)]
pub struct Registry {
    kept: HashMap<String, Registration, KeyHasher>,
}
impl Registry {
    pub fn new() -> Self {
        Self::default()
    }
    /// Registers a type whose instances start out empty. Returns whether
    /// the type was previously registered.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> bool {
        let resource_type = descriptor.resource_type().to_string();
        let factory: Factory = Arc::new(move || Resource::new(&resource_type));
        self.register_with_factory(descriptor, factory)
    }
    pub fn register_with_factory(&mut self, descriptor: TypeDescriptor, factory: Factory) -> bool {
        let resource_type = descriptor.resource_type().to_string();
        let registration = Registration {
            descriptor: Arc::new(descriptor),
            factory,
        };
        self.kept.insert(resource_type, registration).is_some()
    }
    pub fn unregister(&mut self, resource_type: &str) -> bool {
        self.kept.remove(resource_type).is_some()
    }
    pub fn is_registered(&self, resource_type: &str) -> bool {
        self.kept.contains_key(resource_type)
    }
    pub fn descriptor(&self, resource_type: &str) -> Result<Arc<TypeDescriptor>> {
        self.kept
            .get(resource_type)
            .map(|r| Arc::clone(&r.descriptor))
            .ok_or_else(|| MapperError::UnregisteredType(resource_type.to_string()))
    }
    /// Builds a fresh instance through the registered factory.
    pub fn instantiate(&self, resource_type: &str) -> Result<Resource> {
        let registration = self
            .kept
            .get(resource_type)
            .ok_or_else(|| MapperError::UnregisteredType(resource_type.to_string()))?;
        let resource = (registration.factory)();
        if resource.resource_type() != resource_type {
            return Err(MapperError::InvariantViolation(format!(
                "factory for '{}' produced a '{}'",
                resource_type,
                resource.resource_type()
            )));
        }
        Ok(resource)
    }
    /// A stub carrying only its identity. Registered types go through their
    /// factory; types nobody registered still get a bare stub so that
    /// relationship accessors never come up empty-handed.
    pub fn placeholder(&self, resource_type: &str, id: &str) -> Result<Resource> {
        let mut resource = if self.is_registered(resource_type) {
            self.instantiate(resource_type)?
        } else {
            Resource::new(resource_type)
        };
        resource.set_id(id);
        Ok(resource)
    }
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.kept.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Registry").field("types", &self.types()).finish()
    }
}
