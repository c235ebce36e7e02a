// src/error.rs

//! Error types for plugin resolution

use thiserror::Error;

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving a plugin install set
#[derive(Error, Debug)]
pub enum Error {
    /// Bad `name:version` syntax or an unparseable version
    #[error("malformed plugin spec: {0}")]
    MalformedSpec(String),

    /// The update site has no record for the requested name/version
    #[error("unknown plugin {0}")]
    UnknownPlugin(String),

    /// Network or IO failure while retrieving remote metadata
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Archive metadata is missing required fields or cannot be parsed
    #[error("bad plugin metadata: {0}")]
    MetadataParse(String),

    /// Malformed metadata formed a dependency cycle
    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    /// The solver hit its iteration cap without reaching a fixpoint
    #[error("resolution did not converge after {0} iterations")]
    DidNotConverge(u32),

    /// Request file shape problems
    #[error("bad request file: {0}")]
    Config(String),

    /// IO error during cache or output file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request file syntax error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
