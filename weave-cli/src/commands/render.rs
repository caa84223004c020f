//! `weave render <template>` — fill variables, expand references, print.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use weave_core::Context as Variables;

use super::EngineArgs;

/// Arguments for `weave render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template file to render; `-` reads stdin.
    pub template: PathBuf,

    /// Template variable, repeatable.
    #[arg(long = "var", short = 'v', value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Workflow whose auto-injected variables should be added.
    #[arg(long, short = 'w')]
    pub workflow: Option<String>,

    /// Fail if any reference had to be blanked.
    #[arg(long)]
    pub strict: bool,

    /// Print cache statistics to stderr after rendering.
    #[arg(long)]
    pub stats: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let engine = self.engine.build_engine()?;
        let template = read_template(&self.template)?;

        let variables: Variables = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let rendered = engine
            .render_template(&template, &variables, self.workflow.as_deref())
            .with_context(|| format!("render aborted for '{}'", self.template.display()))?;

        print!("{}", rendered.text);
        if !rendered.text.ends_with('\n') {
            println!();
        }

        if self.stats {
            let stats = engine.cache_stats();
            eprintln!(
                "{} hits={} misses={} size={} hit_rate={:.2}",
                "cache".bright_black(),
                stats.hits,
                stats.misses,
                stats.size,
                stats.hit_rate,
            );
        }

        if self.strict && !rendered.failures.is_empty() {
            for failure in &rendered.failures {
                eprintln!("  {} {}: {}", "✗".red(), failure.reference, failure.error);
            }
            bail!("{} reference(s) could not be resolved", rendered.failures.len());
        }
        Ok(())
    }
}

pub(crate) fn read_template(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read template from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("cannot read template '{}'", path.display()))
}

fn parse_var(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
