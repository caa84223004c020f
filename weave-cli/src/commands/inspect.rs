//! `weave inspect <template>` — show what a template will ask the engine for.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use weave_core::Reference;
use weave_engine::{scan, ReferenceEngine};

use super::render::read_template;
use super::EngineArgs;

/// Arguments for `weave inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Template file to inspect; `-` reads stdin.
    pub template: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Serialize, Tabled)]
struct ReferenceRow {
    #[tabled(rename = "reference")]
    token: String,
    kind: String,
    #[tabled(rename = "resolver")]
    status: String,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    variables: Vec<String>,
    references: Vec<ReferenceRow>,
}

impl InspectArgs {
    pub fn run(self) -> Result<()> {
        let engine = self.engine.build_engine()?;
        let template = read_template(&self.template)?;
        let report = build_report(&engine, &template);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize inspect JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

fn build_report(engine: &ReferenceEngine, template: &str) -> InspectReport {
    let references = scan::find_references(template)
        .into_iter()
        .filter_map(|m| {
            let reference = Reference::parse(&m.token).ok()?;
            let status = if engine.registry().contains(reference.kind()) {
                "registered"
            } else {
                "missing"
            };
            Some(ReferenceRow {
                kind: reference.kind().to_string(),
                status: status.to_string(),
                token: m.token,
            })
        })
        .collect();

    InspectReport {
        variables: scan::template_variables(template),
        references,
    }
}

fn print_table(report: InspectReport) {
    if report.variables.is_empty() {
        println!("Variables: none");
    } else {
        println!("Variables: {}", report.variables.join(", "));
    }

    if report.references.is_empty() {
        println!("No references found.");
        return;
    }

    let missing = report
        .references
        .iter()
        .filter(|row| row.status != "registered")
        .count();
    let mut table = Table::new(report.references);
    table.with(Style::rounded());
    println!("{table}");

    if missing > 0 {
        println!(
            "{}",
            format!("{missing} reference(s) have no registered resolver and will render empty.")
                .yellow()
        );
    }
}
