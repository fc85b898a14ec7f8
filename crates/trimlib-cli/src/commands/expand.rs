/*
 * expand.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `trimlib expand`: expand every tag of a document.

use anyhow::{Context, Result};
use tracing::info;
use trimlib::Trimlib;
use trimlib_markup::parse_document;

use super::{EngineArgs, input_path, print_diagnostics, read_input};

/// Arguments for the expand command
#[derive(Debug)]
pub struct ExpandArgs {
    /// Input document, or `-` for stdin
    pub input: String,
    /// Output file; stdout when absent
    pub output: Option<String>,
}

/// Execute the expand command
pub fn execute(engine: &EngineArgs, args: ExpandArgs) -> Result<()> {
    let trimlib = engine.build(input_path(&args.input))?;
    let source = read_input(&args.input)?;

    let result = expand_source(&trimlib, &source);
    print_diagnostics(&trimlib.take_diagnostics());
    let markup = result?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &markup).with_context(|| format!("Failed to write {}", path))?;
            info!(output = %path, "Wrote expanded document");
        }
        None => print!("{}", markup),
    }
    Ok(())
}

/// Expand `source` and serialize the result.
pub fn expand_source(trimlib: &Trimlib, source: &str) -> Result<String> {
    let document = parse_document(source).context("Failed to parse input document")?;
    let expanded = trimlib.expand_all(&document)?;
    info!(expanded, "Expanded tags");
    Ok(document.inner_html())
}
