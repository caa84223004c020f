//! `weave kinds` — list registered resolver kinds.

use anyhow::Result;
use clap::Args;

use super::EngineArgs;

/// Arguments for `weave kinds`.
#[derive(Args, Debug)]
pub struct KindsArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

impl KindsArgs {
    pub fn run(self) -> Result<()> {
        let engine = self.engine.build_engine()?;
        for kind in engine.resolver_kinds() {
            println!("{kind}");
        }
        Ok(())
    }
}
