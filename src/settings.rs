//! Configuration read through the `config` crate: an optional file plus
//! `HYPERMAP_`-prefixed environment variables (`HYPERMAP_BASE_URL`,
//! `HYPERMAP_LOG_LEVEL`). Resource types can be declared in the file:
//!
//! ```toml
//! base_url = "https://api.example.com"
//!
//! [[schema]]
//! resource_type = "posts"
//! attributes = [
//!     { name = "title", kind = "property" },
//!     { name = "published", kind = "date", wire_name = "published_at" },
//!     { name = "author", kind = "to_one", related_type = "users" },
//! ]
//! ```

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::descriptor::{AttributeDescriptor, Registry, TypeDescriptor};
use crate::error::Result;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
}

impl TypeConfig {
    pub fn descriptor(&self) -> TypeDescriptor {
        self.attributes
            .iter()
            .cloned()
            .fold(TypeDescriptor::new(&self.resource_type), TypeDescriptor::attribute)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapperConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub schema: Vec<TypeConfig>,
}

impl MapperConfig {
    /// Reads `path` when given (it must then exist) and layers the environment on top.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        let config = builder
            .add_source(Environment::with_prefix("HYPERMAP"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
    pub fn from_toml(source: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        for declared in &self.schema {
            registry.register(declared.descriptor());
        }
        registry
    }
}
