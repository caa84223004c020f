//! Weave core library: reference types, error taxonomy, configuration.
//!
//! Public API surface:
//! - [`types`] — [`Reference`], [`Context`], [`CacheStats`]
//! - [`error`] — [`ResolveError`], [`ConfigError`]
//! - [`config`] — [`EngineConfig`] and auto-injection settings, load from YAML

pub mod config;
pub mod error;
pub mod types;

pub use config::{AutoInjectionConfig, CacheConfig, EngineConfig};
pub use error::{BoxError, ConfigError, ResolveError};
pub use types::{value_to_text, CacheStats, Context, Reference};
