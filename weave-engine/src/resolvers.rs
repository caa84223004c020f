//! Resolvers shipped with the engine.
//!
//! | Kind      | Value              | Produces                                   |
//! |-----------|--------------------|--------------------------------------------|
//! | `doc`     | relative file path | file contents under the document root      |
//! | `context` | variable name      | the caller-supplied context value          |
//! | `config`  | dotted key path    | a value from the configured `values` tree  |

use std::path::{Component, Path, PathBuf};

use serde_yaml::{Mapping, Value as YamlValue};

use weave_core::{value_to_text, BoxError, Context};

use crate::error::BuiltinError;
use crate::resolver::Resolver;

// ---------------------------------------------------------------------------
// doc
// ---------------------------------------------------------------------------

/// Reads UTF-8 documents relative to a root directory.
#[derive(Debug, Clone)]
pub struct DocResolver {
    root: PathBuf,
}

impl DocResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `value` onto the root, refusing absolute paths and `..`.
    pub fn document_path(&self, value: &str) -> Result<PathBuf, BuiltinError> {
        let rel = Path::new(value);
        let confined = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined {
            return Err(BuiltinError::OutsideRoot(value.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl Resolver for DocResolver {
    fn kind(&self) -> &str {
        "doc"
    }

    fn resolve(&self, value: &str, _context: &Context) -> Result<String, BoxError> {
        let path = self.document_path(value)?;
        tracing::trace!(path = %path.display(), "reading document");
        let content = std::fs::read_to_string(&path)
            .map_err(|source| BuiltinError::Io { path, source })?;
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// context
// ---------------------------------------------------------------------------

/// Echoes a context variable. Never cached: the value belongs to one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextResolver;

impl Resolver for ContextResolver {
    fn kind(&self) -> &str {
        "context"
    }

    fn resolve(&self, value: &str, context: &Context) -> Result<String, BoxError> {
        context
            .get(value)
            .map(value_to_text)
            .ok_or_else(|| BuiltinError::MissingVariable(value.to_string()).into())
    }

    fn cacheable(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

/// Looks up dotted key paths in a static YAML tree.
///
/// Sequence elements are addressed by index: `servers.0.host`.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    values: YamlValue,
}

impl ConfigResolver {
    pub fn new(values: Mapping) -> Self {
        Self {
            values: YamlValue::Mapping(values),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<&YamlValue> {
        key.split('.').try_fold(&self.values, |node, segment| match node {
            YamlValue::Mapping(map) => map.get(segment),
            YamlValue::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

impl Resolver for ConfigResolver {
    fn kind(&self) -> &str {
        "config"
    }

    fn resolve(&self, value: &str, _context: &Context) -> Result<String, BoxError> {
        let node = self
            .lookup(value)
            .ok_or_else(|| BuiltinError::MissingKey(value.to_string()))?;
        Ok(yaml_to_text(node)?)
    }
}

fn yaml_to_text(value: &YamlValue) -> Result<String, BuiltinError> {
    Ok(match value {
        YamlValue::Null => String::new(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        other => serde_yaml::to_string(other)?.trim_end().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
