//! Error types for the built-in resolvers.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the resolvers shipped with weave-engine.
///
/// The registry wraps these in `ResolveError::Resolver`, so inside a render
/// they only ever blank the offending token.
#[derive(Debug, Error)]
pub enum BuiltinError {
    /// Filesystem error while reading a document.
    #[error("document io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested document path escapes the document root.
    #[error("document path '{0}' is outside the document root")]
    OutsideRoot(String),

    /// `@context:name` named a variable the caller did not supply.
    #[error("context variable '{0}' is not set")]
    MissingVariable(String),

    /// `@config:a.b` named a key that is not configured.
    #[error("config key '{0}' is not set")]
    MissingKey(String),

    /// YAML serialization error while rendering a config subtree.
    #[error("config value serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
