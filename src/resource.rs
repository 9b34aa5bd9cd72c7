// other collections use HashSet or HashMap with a fast hasher
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::{HashMap, HashSet};

// used to share a resource between the store and whoever holds it
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// used to print out readable forms of a resource
use std::fmt;

use crate::value::Value;

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// ------------- ResourceKey -------------
/// Identity of a resource: its type plus an id, where the id is absent
/// for resources that have not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    resource_type: String,
    id: Option<String>,
}
impl ResourceKey {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: Some(id.to_string()),
        }
    }
    pub fn unsaved(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: None,
        }
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    pub fn is_saved(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.resource_type, id),
            None => write!(f, "{}/(unsaved)", self.resource_type),
        }
    }
}

// ------------- Relationship -------------
/// Relationships point into the store by key rather than owning the
/// related resource, so cyclic graphs (post -> author -> posts) never
/// form ownership cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    ToOne(Option<ResourceKey>),
    ToMany(Vec<ResourceKey>),
}

// ------------- Resource -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    resource_type: String,
    id: Option<String>,
    href: Option<String>,
    attributes: HashMap<String, Value, KeyHasher>,
    relationships: HashMap<String, Relationship, KeyHasher>,
    // hrefs of relationships whose members are not known yet
    relationship_hrefs: HashMap<String, String, KeyHasher>,
    dirty: HashSet<String, KeyHasher>,
}

impl Resource {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: None,
            href: None,
            attributes: HashMap::default(),
            relationships: HashMap::default(),
            relationship_hrefs: HashMap::default(),
            dirty: HashSet::default(),
        }
    }
    pub fn with_id(resource_type: &str, id: &str) -> Self {
        let mut resource = Self::new(resource_type);
        resource.id = Some(id.to_string());
        resource
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    pub fn set_id(&mut self, id: &str) {
        self.id = Some(id.to_string());
    }
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
    pub fn set_href(&mut self, href: Option<String>) {
        self.href = href;
    }
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            resource_type: self.resource_type.clone(),
            id: self.id.clone(),
        }
    }
    /// A server-side location means the server already knows about this resource.
    pub fn is_persisted(&self) -> bool {
        self.href.is_some()
    }
    /// True for stubs created while resolving relationships: nothing but
    /// the identity has been populated.
    pub fn is_placeholder(&self) -> bool {
        self.href.is_none()
            && self.attributes.is_empty()
            && self.relationships.is_empty()
            && self.relationship_hrefs.is_empty()
    }

    // attributes
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
    /// Sets an attribute and flags it as changed since the last sync.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
        self.dirty.insert(name.to_string());
    }
    // values coming from the server are in sync by definition
    pub(crate) fn load(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
        self.dirty.remove(name);
    }
    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }
    pub fn dirty_attributes(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }
    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    // relationships
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }
    pub fn to_one(&self, name: &str) -> Option<&ResourceKey> {
        match self.relationships.get(name) {
            Some(Relationship::ToOne(key)) => key.as_ref(),
            _ => None,
        }
    }
    pub fn to_many(&self, name: &str) -> &[ResourceKey] {
        match self.relationships.get(name) {
            Some(Relationship::ToMany(keys)) => keys,
            _ => &[],
        }
    }
    pub fn set_to_one(&mut self, name: &str, related: Option<ResourceKey>) {
        self.relationships
            .insert(name.to_string(), Relationship::ToOne(related));
    }
    pub fn set_to_many(&mut self, name: &str, related: Vec<ResourceKey>) {
        self.relationships
            .insert(name.to_string(), Relationship::ToMany(related));
    }
    pub fn add_to_many(&mut self, name: &str, related: ResourceKey) {
        match self.relationships.get_mut(name) {
            Some(Relationship::ToMany(keys)) => {
                if !keys.contains(&related) {
                    keys.push(related);
                }
            }
            _ => self.set_to_many(name, vec![related]),
        }
    }
    pub fn relationship_href(&self, name: &str) -> Option<&str> {
        self.relationship_hrefs.get(name).map(String::as_str)
    }
    pub(crate) fn set_relationship_href(&mut self, name: &str, href: String) {
        self.relationship_hrefs.insert(name.to_string(), href);
    }
    /// Copies the values, relationships and hrefs `other` holds over this
    /// resource's. Nothing `other` leaves unset is cleared.
    pub(crate) fn absorb(&mut self, other: &Resource) {
        if other.href.is_some() {
            self.href = other.href.clone();
        }
        for (name, value) in &other.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
        self.dirty.extend(other.dirty.iter().cloned());
        for (name, relationship) in &other.relationships {
            self.relationships.insert(name.clone(), relationship.clone());
        }
        for (name, href) in &other.relationship_hrefs {
            self.relationship_hrefs.insert(name.clone(), href.clone());
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        let mut s = String::new();
        for name in names {
            s += &format!("{}: {}, ", name, self.attributes[name]);
        }
        s.truncate(s.trim_end_matches([',', ' ']).len());
        write!(f, "{} {{{}}}", self.key(), s)
    }
}

// ------------- ResourceRef -------------
/// A shared handle to a kept resource. Two handles are the same instance
/// when [`ResourceRef::same`] holds; the store hands out one handle per
/// (type, id).
#[derive(Debug, Clone)]
pub struct ResourceRef(Arc<RwLock<Resource>>);

impl ResourceRef {
    pub fn new(resource: Resource) -> Self {
        Self(Arc::new(RwLock::new(resource)))
    }
    // lock poisoning is not surfaced
    pub fn read(&self) -> RwLockReadGuard<'_, Resource> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn write(&self) -> RwLockWriteGuard<'_, Resource> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn same(&self, other: &ResourceRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub fn key(&self) -> ResourceKey {
        self.read().key()
    }
}
