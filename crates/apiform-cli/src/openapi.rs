//! # OpenAPI Subcommand
//!
//! Prints the API description generated from the registry. YAML by default.

use std::io::Write;

use clap::{Args, ValueEnum};

use apiform_schema::{describe, DescribeOptions};

/// Output format for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

/// Arguments for the openapi subcommand.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OpenApiArgs {
    /// Document format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// Render the document and write it to `out`.
pub fn run_openapi(args: &OpenApiArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let registry = crate::registry()?;
    let description = describe(&registry, &DescribeOptions::default());
    let text = match args.format {
        Format::Yaml => description.to_yaml()?,
        Format::Json => description.to_json()?,
    };
    writeln!(out, "{}", text.trim_end())?;
    tracing::debug!(operations = registry.len(), "printed OpenAPI document");
    Ok(())
}
