//! Wire addresses for resource types, id sets and queries.

use std::collections::BTreeMap;

// used for escaping ids and query parameters
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

// everything but the RFC 3986 unreserved characters
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    Ascending(String),
    Descending(String),
}

// ------------- Query -------------
/// Everything needed to address a fetch. A query built from an href
/// (e.g. a relationship's location) bypasses the router's own layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    resource_type: String,
    ids: Vec<String>,
    filters: Vec<(String, String)>,
    sort: Vec<SortOrder>,
    fields: BTreeMap<String, Vec<String>>,
    include: Vec<String>,
    page: Option<u64>,
    page_size: Option<u64>,
    url: Option<String>,
}

impl Query {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            ..Default::default()
        }
    }
    pub fn from_url(resource_type: &str, url: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
        self
    }
    pub fn whose(mut self, field: &str, value: &str) -> Self {
        self.filters.push((field.to_string(), value.to_string()));
        self
    }
    pub fn sort_ascending(mut self, field: &str) -> Self {
        self.sort.push(SortOrder::Ascending(field.to_string()));
        self
    }
    pub fn sort_descending(mut self, field: &str) -> Self {
        self.sort.push(SortOrder::Descending(field.to_string()));
        self
    }
    /// Sparse fieldset: only these fields of `resource_type` come back.
    pub fn restrict_fields(mut self, resource_type: &str, fields: &[&str]) -> Self {
        self.fields
            .entry(resource_type.to_string())
            .or_default()
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }
    pub fn include(mut self, path: &str) -> Self {
        self.include.push(path.to_string());
        self
    }
    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

// ------------- Router -------------
pub trait Router: Send + Sync {
    fn url_for_type(&self, resource_type: &str) -> String;
    fn url_for_ids(&self, resource_type: &str, ids: &[String]) -> String;
    fn url_for_query(&self, query: &Query) -> String;
}

/// `{base}/{type}[/{id,id}]?filter[f]=v&sort=a,-b&fields[t]=x,y&include=p&page=n&page_size=m`
///
/// Ids, field names and values are percent-encoded one by one; the commas
/// joining them and the brackets of parameter names are written as is.
#[derive(Debug, Clone)]
pub struct UrlRouter {
    base_url: String,
}

impl UrlRouter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

fn encode_list<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items.into_iter().map(|item| encode(item)).collect::<Vec<_>>().join(",")
}

impl Router for UrlRouter {
    fn url_for_type(&self, resource_type: &str) -> String {
        format!("{}/{}", self.base_url, encode(resource_type))
    }
    fn url_for_ids(&self, resource_type: &str, ids: &[String]) -> String {
        if ids.is_empty() {
            return self.url_for_type(resource_type);
        }
        format!("{}/{}", self.url_for_type(resource_type), encode_list(ids))
    }
    fn url_for_query(&self, query: &Query) -> String {
        if let Some(url) = &query.url {
            return url.clone();
        }
        let mut parameters = Vec::new();
        for (field, value) in &query.filters {
            parameters.push(format!("filter[{}]={}", encode(field), encode(value)));
        }
        if !query.sort.is_empty() {
            let sort: Vec<String> = query
                .sort
                .iter()
                .map(|order| match order {
                    SortOrder::Ascending(field) => encode(field),
                    SortOrder::Descending(field) => format!("-{}", encode(field)),
                })
                .collect();
            parameters.push(format!("sort={}", sort.join(",")));
        }
        for (resource_type, fields) in &query.fields {
            parameters.push(format!("fields[{}]={}", encode(resource_type), encode_list(fields)));
        }
        if !query.include.is_empty() {
            parameters.push(format!("include={}", encode_list(&query.include)));
        }
        if let Some(page) = query.page {
            parameters.push(format!("page={}", page));
        }
        if let Some(page_size) = query.page_size {
            parameters.push(format!("page_size={}", page_size));
        }
        let url = self.url_for_ids(&query.resource_type, &query.ids);
        if parameters.is_empty() {
            url
        } else {
            format!("{}?{}", url, parameters.join("&"))
        }
    }
}
