//! Turns pending relationship links into keys of live resources.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::descriptor::{AttributeKind, Registry};
use crate::error::Result;
use crate::link::RelationshipLink;
use crate::resource::{KeyHasher, ResourceKey, ResourceRef};
use crate::store::Store;

// ------------- PendingLinks -------------
/// Relationship links gathered during one deserialization, per resource
/// and keyed by attribute name, in the order resources were ingested.
#[derive(Debug, Default)]
pub struct PendingLinks {
    resources: Vec<ResourceRef>,
    index: HashMap<ResourceKey, usize, KeyHasher>,
    links: Vec<HashMap<String, RelationshipLink, KeyHasher>>,
}

impl PendingLinks {
    pub fn new() -> Self {
        Self::default()
    }
    /// Makes sure the resource takes part in resolution even without links
    /// of its own, and returns its slot.
    pub fn track(&mut self, resource: &ResourceRef) -> usize {
        let key = resource.key();
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        self.resources.push(resource.clone());
        self.links.push(HashMap::default());
        self.index.insert(key, self.resources.len() - 1);
        self.resources.len() - 1
    }
    /// Explicit per-resource data: replaces what an earlier representation of the same resource said.
    pub fn insert(&mut self, slot: usize, attribute: &str, link: RelationshipLink) {
        self.links[slot].insert(attribute.to_string(), link);
    }
    pub fn resources(&self) -> &[ResourceRef] {
        &self.resources
    }
    pub fn links_of(&self, i: usize) -> &HashMap<String, RelationshipLink, KeyHasher> {
        &self.links[i]
    }
    pub fn link_mut(&mut self, i: usize, attribute: &str) -> &mut RelationshipLink {
        self.links[i].entry(attribute.to_string()).or_default()
    }
    pub fn len(&self) -> usize {
        self.resources.len()
    }
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ------------- Resolution -------------
/// Tally of one resolution pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// references that found a resource already in the store
    pub resolved: usize,
    /// references that needed a placeholder
    pub stubbed: usize,
    /// relationships left unset for lack of any id information
    pub unset: usize,
}

// ------------- Resolver -------------
pub struct Resolver<'r> {
    registry: &'r Registry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Resolves every pending link against `store`. Referents that are not
    /// in the store are kept as placeholders, so relationship accessors
    /// always find something. A link without any ids leaves its
    /// relationship untouched.
    pub fn resolve(&self, store: &mut Store, pending: PendingLinks) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        for (i, resource) in pending.resources().iter().enumerate() {
            let owner = resource.key();
            let descriptor = self.registry.descriptor(owner.resource_type())?;
            for (name, link) in pending.links_of(i) {
                let Some(attribute) = descriptor.get(name) else {
                    continue;
                };
                if let Some(href) = &link.href {
                    resource.write().set_relationship_href(name, href.clone());
                }
                let Some(ids) = &link.ids else {
                    warn!(resource = %owner, relationship = %name, "relationship left unset, no id information");
                    resolution.unset += 1;
                    continue;
                };
                let related_type = link
                    .resource_type
                    .clone()
                    .unwrap_or_else(|| attribute.related_type());
                let mut keys = Vec::with_capacity(ids.len());
                for id in ids {
                    let key = ResourceKey::new(&related_type, id);
                    if store.resolve(&key).is_some() {
                        resolution.resolved += 1;
                    } else {
                        let placeholder = self.registry.placeholder(&related_type, id)?;
                        store.keep(placeholder)?;
                        debug!(resource = %owner, relationship = %name, related = %key, "placeholder created");
                        resolution.stubbed += 1;
                    }
                    keys.push(key);
                }
                match attribute.kind() {
                    AttributeKind::ToOne => {
                        if keys.len() > 1 {
                            warn!(resource = %owner, relationship = %name, count = keys.len(), "to-one relationship given several ids, keeping the first");
                        }
                        resource.write().set_to_one(name, keys.into_iter().next());
                    }
                    AttributeKind::ToMany => resource.write().set_to_many(name, keys),
                    AttributeKind::Property | AttributeKind::Date => {}
                }
            }
        }
        debug!(?resolution, "relationships resolved");
        Ok(resolution)
    }
}
