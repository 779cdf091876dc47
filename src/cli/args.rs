//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, forms::FormsArgs, run::RunArgs, schema::SchemaArgs,
    validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "intake")]
#[command(author, version, about = "Multi-step application form toolkit")]
#[command(
    long_about = "Collects, validates and submits multi-step application forms (passport, citizenship, family) defined as declarative YAML schemas."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill in a form interactively and submit it
    Run(RunArgs),

    /// Validate stored record files against a form definition
    Validate(ValidateArgs),

    /// List the available forms
    Forms(FormsArgs),

    /// Show a form definition
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically pick based on the command (table for lists, yaml for show)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
}
