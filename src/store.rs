use std::collections::HashMap;

use tracing::debug;

use crate::error::{MapperError, Result};
use crate::resource::{KeyHasher, Resource, ResourceKey, ResourceRef};

// ------------- Bucket -------------
// All kept resources of one type, in insertion order with an id index beside it.
#[derive(Debug, Default)]
struct Bucket {
    ordered: Vec<ResourceRef>,
    lookup: HashMap<String, ResourceRef, KeyHasher>,
}

// ------------- Store -------------
/// The identity store keeps exactly one [`ResourceRef`] per (type, id).
///
/// Keeping a resource whose key is already present hands back the kept
/// handle and leaves membership untouched, the same contract the keepers
/// of a deduplicating database follow. Callers then mutate the kept
/// instance in place, so everyone holding the handle sees the change.
///
/// Not internally synchronized; concurrent use needs external locking.
#[derive(Debug, Default)]
pub struct Store {
    types: Vec<String>,
    buckets: HashMap<String, Bucket, KeyHasher>,
}

fn required_id<'k>(key: &'k ResourceKey) -> Result<&'k str> {
    match key.id() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(MapperError::InvariantViolation(format!(
            "store operation on {} without an identifier",
            key
        ))),
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }
    /// Upsert by value. Returns the kept handle and whether the key was previously kept.
    pub fn keep(&mut self, resource: Resource) -> Result<(ResourceRef, bool)> {
        let key = resource.key();
        required_id(&key)?;
        if let Some(kept) = self.resolve(&key) {
            return Ok((kept, true));
        }
        self.insert(&key, ResourceRef::new(resource))
    }
    /// Upsert an existing handle, e.g. a resource built by the caller and then saved.
    pub fn keep_ref(&mut self, resource: ResourceRef) -> Result<(ResourceRef, bool)> {
        let key = resource.key();
        required_id(&key)?;
        if let Some(kept) = self.resolve(&key) {
            return Ok((kept, true));
        }
        self.insert(&key, resource)
    }
    fn insert(&mut self, key: &ResourceKey, resource: ResourceRef) -> Result<(ResourceRef, bool)> {
        let id = required_id(key)?;
        let resource_type = key.resource_type();
        if !self.buckets.contains_key(resource_type) {
            self.types.push(resource_type.to_string());
        }
        let bucket = self.buckets.entry(resource_type.to_string()).or_default();
        bucket.ordered.push(resource.clone());
        bucket.lookup.insert(id.to_string(), resource.clone());
        debug!(%key, "kept");
        Ok((resource, false))
    }
    pub fn get(&self, resource_type: &str, id: &str) -> Option<ResourceRef> {
        self.buckets
            .get(resource_type)
            .and_then(|bucket| bucket.lookup.get(id))
            .cloned()
    }
    pub fn resolve(&self, key: &ResourceKey) -> Option<ResourceRef> {
        key.id().and_then(|id| self.get(key.resource_type(), id))
    }
    /// Resources of one type in the order they were first kept.
    pub fn all_of_type(&self, resource_type: &str) -> &[ResourceRef] {
        match self.buckets.get(resource_type) {
            Some(bucket) => &bucket.ordered,
            None => &[],
        }
    }
    /// Every kept resource, type by type in the order types were first seen.
    pub fn all(&self) -> Vec<ResourceRef> {
        self.types
            .iter()
            .flat_map(|t| self.all_of_type(t).iter().cloned())
            .collect()
    }
    pub fn remove(&mut self, key: &ResourceKey) -> Result<Option<ResourceRef>> {
        let id = required_id(key)?;
        let Some(bucket) = self.buckets.get_mut(key.resource_type()) else {
            return Ok(None);
        };
        let removed = bucket.lookup.remove(id);
        if let Some(removed) = &removed {
            bucket.ordered.retain(|r| !r.same(removed));
            debug!(%key, "removed");
        }
        Ok(removed)
    }
    pub fn types(&self) -> &[String] {
        &self.types
    }
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.ordered.len()).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // relationship traversal
    pub fn to_one(&self, resource: &Resource, relationship: &str) -> Option<ResourceRef> {
        resource.to_one(relationship).and_then(|key| self.resolve(key))
    }
    pub fn to_many(&self, resource: &Resource, relationship: &str) -> Vec<ResourceRef> {
        resource
            .to_many(relationship)
            .iter()
            .filter_map(|key| self.resolve(key))
            .collect()
    }
}
