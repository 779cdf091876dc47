//! `intake schema` command - show a form definition
//!
//! Prints the raw YAML source by default so the output round-trips, or
//! JSON with `--format json` for automation.

use miette::{IntoDiagnostic, Result};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::schema::registry::FormRegistry;

#[derive(clap::Args, Debug)]
pub struct SchemaArgs {
    /// Form name (see `intake forms`)
    pub form: String,
}

pub fn run(args: SchemaArgs, global: &GlobalOpts) -> Result<()> {
    let registry = FormRegistry::load().into_diagnostic()?;

    let Some(definition) = registry.get(&args.form) else {
        return Err(miette::miette!(
            "Unknown form: '{}'. Available forms: {}",
            args.form,
            registry.names().join(", ")
        ));
    };

    match global.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(definition).into_diagnostic()?
            );
        }
        _ => {
            // the embedded source keeps comments and ordering intact
            if let Some(source) = registry.source(&args.form) {
                print!("{}", source);
            }
        }
    }

    Ok(())
}
