//! Engine configuration loaded from YAML.
//!
//! # Storage layout
//!
//! ```text
//! ~/.weave/
//!   config.yaml    (optional, defaults apply when absent)
//! ```
//!
//! # API pattern
//!
//! Loading has two forms:
//! - `load_at(home: &Path)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//!
//! Tests must NEVER call the no-arg wrapper; always use `load_at` or `load_from`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// 1. Types
// ---------------------------------------------------------------------------

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// When false, rendering passes text through untouched.
    pub enabled: bool,
    pub max_depth: usize,
    pub cache: CacheConfig,
    /// Directory served by the `doc` resolver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_root: Option<PathBuf>,
    /// Values served by the `config` resolver.
    pub values: serde_yaml::Mapping,
    pub auto_inject: AutoInjectionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: DEFAULT_MAX_DEPTH,
            cache: CacheConfig::default(),
            doc_root: None,
            values: serde_yaml::Mapping::new(),
            auto_inject: AutoInjectionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_depth must be at least 1".to_string(),
            ));
        }
        for (workflow, vars) in self.auto_inject.iter() {
            if workflow.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "auto_inject workflow names must not be empty".to_string(),
                ));
            }
            if let Some(name) = vars.keys().find(|name| name.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "auto_inject.{workflow} has an empty variable name '{name}'"
                )));
            }
        }
        Ok(())
    }
}

/// Cache bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// `workflow -> (variable -> reference template)`, in file order.
///
/// Templates may contain `{{var}}` placeholders that are filled from the
/// caller's variables before the result is resolved as a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct AutoInjectionConfig(pub IndexMap<String, IndexMap<String, String>>);

impl AutoInjectionConfig {
    /// Variables to inject for `workflow`, if it is configured.
    pub fn workflow(&self, workflow: &str) -> Option<&IndexMap<String, String>> {
        self.0.get(workflow)
    }

    /// Add or replace a single variable template for `workflow`.
    pub fn insert(
        &mut self,
        workflow: impl Into<String>,
        variable: impl Into<String>,
        template: impl Into<String>,
    ) {
        self.0
            .entry(workflow.into())
            .or_default()
            .insert(variable.into(), template.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 2. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.weave/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".weave").join("config.yaml")
}

// ---------------------------------------------------------------------------
// 3. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.weave/config.yaml`, falling back to defaults if it is absent.
///
/// Returns `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<EngineConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    load_from(&path)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<EngineConfig, ConfigError> {
    load_at(&home()?)
}

/// Load an explicit config file. Unlike [`load_at`], a missing file is an error.
///
/// A relative `doc_root` is resolved against the directory holding the file.
pub fn load_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut config: EngineConfig = if contents.trim().is_empty() {
        EngineConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    if let (Some(root), Some(dir)) = (config.doc_root.as_ref(), path.parent()) {
        if root.is_relative() {
            config.doc_root = Some(dir.join(root));
        }
    }

    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
