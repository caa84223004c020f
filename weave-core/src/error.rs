//! Error types for weave-core.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by resolver implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can arise while resolving a reference.
///
/// `CircularReference` and `MaxDepthExceeded` are structural: they mean the
/// reference graph itself is broken and always abort a render. The others are
/// leaf failures that callers may blank out and continue past.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The string does not match `@kind:value`.
    #[error("invalid reference syntax: '{0}'")]
    InvalidReference(String),

    /// No resolver is registered for the reference kind.
    #[error("no resolver registered for kind '{0}'")]
    ResolverNotFound(String),

    /// The reference appears in its own resolution ancestry.
    #[error("circular reference detected: '{0}'")]
    CircularReference(String),

    /// Nesting reached the configured depth bound.
    #[error("maximum reference depth of {0} exceeded")]
    MaxDepthExceeded(usize),

    /// The resolver for this reference returned an error.
    #[error("resolver failed for '{reference}': {source}")]
    Resolver {
        reference: String,
        #[source]
        source: BoxError,
    },
}

impl ResolveError {
    /// `true` for the two variants that must propagate to the render caller.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ResolveError::CircularReference(_) | ResolveError::MaxDepthExceeded(_)
        )
    }
}

/// All errors that can arise from loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.weave/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The file parsed but holds values the engine cannot run with.
    #[error("invalid config: {0}")]
    Invalid(String),
}
