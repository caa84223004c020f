//! Subcommands and the engine setup they share.

pub mod inspect;
pub mod kinds;
pub mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use weave_core::{config, EngineConfig};
use weave_engine::ReferenceEngine;

/// Options for locating configuration, flattened into every subcommand.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Config file to load instead of ~/.weave/config.yaml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory served by the `doc` resolver (overrides `doc_root` in config).
    #[arg(long, value_name = "DIR")]
    pub doc_root: Option<PathBuf>,
}

impl EngineArgs {
    pub fn load_config(&self) -> Result<EngineConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => {
                let home: PathBuf =
                    dirs::home_dir().context("could not determine home directory")?;
                config::load_at(&home).context("failed to load ~/.weave/config.yaml")?
            }
        };
        if let Some(root) = &self.doc_root {
            cfg.doc_root = Some(root.clone());
        }
        tracing::debug!(
            enabled = cfg.enabled,
            max_depth = cfg.max_depth,
            doc_root = ?cfg.doc_root,
            "config loaded"
        );
        Ok(cfg)
    }

    pub fn build_engine(&self) -> Result<ReferenceEngine> {
        let cfg = self.load_config()?;
        Ok(ReferenceEngine::builder(cfg).builtin_resolvers().build())
    }
}
