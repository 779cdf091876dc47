//! `intake forms` command - list the shipped form definitions

use miette::{IntoDiagnostic, Result};
use serde_json::json;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::schema::registry::FormRegistry;

#[derive(clap::Args, Debug)]
pub struct FormsArgs {}

pub fn run(_args: FormsArgs, global: &GlobalOpts) -> Result<()> {
    let registry = FormRegistry::load().into_diagnostic()?;

    match global.format {
        OutputFormat::Json => {
            let rows: Vec<_> = registry
                .definitions()
                .map(|d| {
                    json!({
                        "name": d.name,
                        "title": d.title,
                        "steps": d.step_count(),
                        "fields": d.fields.len(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).into_diagnostic()?
            );
        }
        OutputFormat::Tsv => {
            for definition in registry.definitions() {
                println!(
                    "{}\t{}\t{}\t{}",
                    definition.name,
                    definition.title,
                    definition.step_count(),
                    definition.fields.len()
                );
            }
        }
        OutputFormat::Auto | OutputFormat::Yaml => {
            let mut builder = Builder::default();
            builder.push_record(["NAME", "TITLE", "STEPS", "FIELDS"]);
            for definition in registry.definitions() {
                builder.push_record([
                    definition.name.clone(),
                    truncate_str(&definition.title, 40),
                    definition.step_count().to_string(),
                    definition.fields.len().to_string(),
                ]);
            }
            println!("{}", builder.build().with(Style::sharp()));
            if !global.quiet {
                println!("\nUse 'intake schema <name>' for field details");
            }
        }
    }

    Ok(())
}
