//! `hypermap <document.json> [config.toml]`
//!
//! Deserializes a wire document against the resource types declared in the
//! configuration and logs what ended up in the store. Handy for checking a
//! schema against real server payloads.

use std::env;
use std::fs;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hypermap::deserialize::Deserializer;
use hypermap::settings::MapperConfig;
use hypermap::{MapperError, Result};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(document_path) = args.first() else {
        eprintln!("usage: hypermap <document.json> [config.toml]");
        std::process::exit(2);
    };
    let config = MapperConfig::load(args.get(1).map(String::as_str))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let registry = config.registry();
    info!(types = ?registry.types(), "schema loaded");
    let bytes = fs::read(document_path)
        .map_err(|e| MapperError::Config(format!("cannot read {}: {}", document_path, e)))?;

    let (store, extract) = Deserializer::new(&registry).deserialize(&bytes)?;
    for resource_type in store.types() {
        let kept = store.all_of_type(resource_type);
        let stubs = kept.iter().filter(|r| r.read().is_placeholder()).count();
        info!(%resource_type, kept = kept.len(), stubs, "type");
        for resource in kept {
            println!("{}", resource.read());
        }
    }
    if extract.resolution.unset > 0 {
        warn!(unset = extract.resolution.unset, "relationships without id information");
    }
    if let Some(pagination) = extract.pagination {
        info!(?pagination, "pagination");
    }
    Ok(())
}
