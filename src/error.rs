use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    #[error("No factory registered for resource type '{0}'")]
    UnregisteredType(String),
    #[error("Server reported error {code}: {}", .title.as_deref().unwrap_or("(no title)"))]
    ServerReported { code: i64, title: Option<String> },
    #[error("Precedence violation: {relationship} of {resource_type} holds an unsaved resource")]
    PrecedenceViolation { resource_type: String, relationship: String },
    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;

// Helper conversions
impl From<serde_json::Error> for MapperError {
    fn from(e: serde_json::Error) -> Self { Self::Json(e.to_string()) }
}
impl From<config::ConfigError> for MapperError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
