//! `intake validate` command - validate stored record files
//!
//! Each record file is a JSON document previously produced by `intake
//! run` (or by hand). Files are checked against the full rule set of the
//! named form; violations are printed as source-spanned diagnostics.

use chrono::Local;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::schema::registry::FormRegistry;
use crate::schema::report::RecordValidationError;
use crate::schema::validator::FormValidator;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    /// Form to validate against (see `intake forms`)
    pub form: String,

    /// Record files to validate
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Continue validation after first failing file
    #[arg(long)]
    pub keep_going: bool,

    /// Show summary only, don't show individual errors
    #[arg(long)]
    pub summary: bool,
}

/// Validation statistics
#[derive(Default)]
struct ValidationStats {
    files_checked: usize,
    files_passed: usize,
    files_failed: usize,
    total_errors: usize,
}

pub fn run(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let registry = FormRegistry::load().into_diagnostic()?;
    let Some(definition) = registry.get(&args.form) else {
        return Err(miette::miette!(
            "Unknown form: '{}'. Available forms: {}",
            args.form,
            registry.names().join(", ")
        ));
    };
    let validator = FormValidator::new(definition).into_diagnostic()?;
    let today = Local::now().date_naive();

    let mut stats = ValidationStats::default();
    let mut had_error = false;

    if !global.quiet {
        println!(
            "{} Validating {} file(s) against '{}'...\n",
            style("→").blue(),
            args.paths.len(),
            definition.name
        );
    }

    for path in &args.paths {
        stats.files_checked += 1;

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                if !args.summary {
                    println!("{} {} - {}", style("✗").red(), path.display(), e);
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        let json = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                if !args.summary {
                    println!(
                        "{} {} - invalid JSON: {}",
                        style("✗").red(),
                        path.display(),
                        e
                    );
                }
                stats.files_failed += 1;
                stats.total_errors += 1;
                had_error = true;
                if !args.keep_going {
                    break;
                }
                continue;
            }
        };

        let record = definition.record_from_json(&json).into_diagnostic()?;
        let report = validator.validate(&record, today);

        if report.is_valid() {
            stats.files_passed += 1;
            if !args.summary {
                println!("{} {}", style("✓").green(), path.display());
            }
        } else {
            stats.files_failed += 1;
            stats.total_errors += report.error_count();
            had_error = true;

            if !args.summary {
                println!(
                    "{} {} - {} error(s)",
                    style("✗").red(),
                    path.display(),
                    report.error_count()
                );

                let filename = path.file_name().unwrap_or_default().to_string_lossy();
                let diagnostic =
                    RecordValidationError::from_report(&filename, &content, &report);
                let report = miette::Report::new(diagnostic);
                println!("{:?}", report);
            }

            if !args.keep_going {
                break;
            }
        }
    }

    // Print summary
    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Validation Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Files checked:  {}", style(stats.files_checked).cyan());
    println!("  Files passed:   {}", style(stats.files_passed).green());
    println!("  Files failed:   {}", style(stats.files_failed).red());
    println!("  Total errors:   {}", style(stats.total_errors).red());
    println!();

    if had_error {
        if stats.files_failed == 1 {
            Err(miette::miette!("Validation failed: 1 file has errors"))
        } else {
            Err(miette::miette!(
                "Validation failed: {} files have errors",
                stats.files_failed
            ))
        }
    } else {
        println!(
            "{} All files passed validation!",
            style("✓").green().bold()
        );
        Ok(())
    }
}
