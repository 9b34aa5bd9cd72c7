use std::collections::HashMap;

// the "standard" regular expression package, compiled once
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value as Json;

use crate::error::{MapperError, Result};
use crate::resource::KeyHasher;

lazy_static! {
    // {posts.id}, {posts.author}
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}.]+)\.([^{}.]+)\}").unwrap();
}

fn id_of(raw: &Json) -> Result<Option<String>> {
    match raw {
        Json::String(s) if s.is_empty() => Err(MapperError::MalformedDocument(
            "relationship id is an empty string".to_string(),
        )),
        Json::String(s) => Ok(Some(s.clone())),
        Json::Number(n) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}

fn ids_of(raw: &Json) -> Result<Vec<String>> {
    match raw {
        Json::Array(items) => items
            .iter()
            .map(|item| {
                id_of(item)?.ok_or_else(|| {
                    MapperError::MalformedDocument(format!("relationship id {} is not a string", item))
                })
            })
            .collect(),
        Json::Null => Ok(Vec::new()),
        other => id_of(other)?.map(|id| vec![id]).ok_or_else(|| {
            MapperError::MalformedDocument(format!("relationship ids {} are not a list", other))
        }),
    }
}

// ------------- RelationshipLink -------------
/// How a relationship arrived on the wire, before it is resolved against
/// the store. `ids` is `None` when nothing was said about the members and
/// `Some(vec![])` when the wire explicitly said there are none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipLink {
    pub href: Option<String>,
    pub ids: Option<Vec<String>>,
    pub resource_type: Option<String>,
}

impl RelationshipLink {
    /// Reads one of the accepted encodings: a bare id, an id array, null,
    /// or an object with `href`, `id`, `ids` and `type` keys.
    pub fn from_json(raw: &Json) -> Result<RelationshipLink> {
        match raw {
            Json::String(_) | Json::Number(_) => Ok(RelationshipLink {
                ids: id_of(raw)?.map(|id| vec![id]),
                ..Default::default()
            }),
            Json::Array(_) | Json::Null => Ok(RelationshipLink {
                ids: Some(ids_of(raw)?),
                ..Default::default()
            }),
            Json::Object(map) => {
                let ids = match (map.get("id"), map.get("ids")) {
                    (_, Some(ids)) => Some(ids_of(ids)?),
                    (Some(Json::Null), None) => Some(Vec::new()),
                    (Some(id), None) => Some(ids_of(id)?),
                    (None, None) => None,
                };
                Ok(RelationshipLink {
                    href: map.get("href").and_then(Json::as_str).map(str::to_string),
                    ids,
                    resource_type: map.get("type").and_then(Json::as_str).map(str::to_string),
                })
            }
            Json::Bool(_) => Err(MapperError::MalformedDocument(format!(
                "relationship link {} has no known encoding",
                raw
            ))),
        }
    }
    pub fn has_ids(&self) -> bool {
        self.ids.is_some()
    }
    /// Fills in whatever is still unset. Values already present always win.
    pub fn merge(&mut self, other: RelationshipLink) {
        if self.href.is_none() {
            self.href = other.href;
        }
        if self.ids.is_none() {
            self.ids = other.ids;
        }
        if self.resource_type.is_none() {
            self.resource_type = other.resource_type;
        }
    }
}

// ------------- LinkTemplate -------------
/// A document-level `links` entry keyed `"{resourceType}.{relationshipName}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTemplate {
    resource_type: String,
    relationship: String,
    href: Option<String>,
    related_type: Option<String>,
}

impl LinkTemplate {
    /// Returns `None` for keys that are not of the `type.relationship` form.
    pub fn parse(key: &str, raw: &Json) -> Option<LinkTemplate> {
        let (resource_type, relationship) = key.split_once('.')?;
        if resource_type.is_empty() || relationship.is_empty() {
            return None;
        }
        let (href, related_type) = match raw {
            Json::String(href) => (Some(href.clone()), None),
            Json::Object(map) => (
                map.get("href").and_then(Json::as_str).map(str::to_string),
                map.get("type").and_then(Json::as_str).map(str::to_string),
            ),
            _ => return None,
        };
        Some(LinkTemplate {
            resource_type: resource_type.to_string(),
            relationship: relationship.to_string(),
            href,
            related_type,
        })
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn relationship(&self) -> &str {
        &self.relationship
    }
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
    pub fn related_type(&self) -> Option<&str> {
        self.related_type.as_deref()
    }
    /// The link this template contributes to one resource: the href with
    /// its placeholders filled in from the resource's own id and the ids
    /// already known for its relationships (keyed by wire name).
    pub fn apply(
        &self,
        id: Option<&str>,
        known: &HashMap<String, Vec<String>, KeyHasher>,
    ) -> RelationshipLink {
        RelationshipLink {
            href: self
                .href
                .as_deref()
                .map(|href| interpolate(href, &self.resource_type, id, known)),
            ids: None,
            resource_type: self.related_type.clone(),
        }
    }
}

/// Replaces `{type.id}` with `id` and `{type.relationship}` with the
/// comma-joined known ids of that relationship. Placeholders naming another
/// type, or relationships nobody knows ids for, are left as they are.
pub fn interpolate(
    template: &str,
    resource_type: &str,
    id: Option<&str>,
    known: &HashMap<String, Vec<String>, KeyHasher>,
) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let whole = caps[0].to_string();
            if &caps[1] != resource_type {
                return whole;
            }
            match &caps[2] {
                "id" => id.map(str::to_string).unwrap_or(whole),
                field => known.get(field).map(|ids| ids.join(",")).unwrap_or(whole),
            }
        })
        .into_owned()
}
