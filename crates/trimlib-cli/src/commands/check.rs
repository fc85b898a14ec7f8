/*
 * check.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `trimlib check`: load every library and compile every template.

use anyhow::{Context, Result};
use tracing::info;
use trimlib::{Diagnostic, Trimlib};
use trimlib_markup::{Node, NodeRef, parse_document};

use super::{EngineArgs, input_path, print_diagnostics, read_input};

/// Arguments for the check command
#[derive(Debug)]
pub struct CheckArgs {
    /// Document providing library declarations
    pub input: Option<String>,
    /// Print diagnostics as JSON
    pub json: bool,
}

/// Outcome of checking the declared libraries.
#[derive(Debug, Default)]
pub struct CheckReport {
    pub libraries: usize,
    pub templates: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Execute the check command
pub fn execute(engine: &EngineArgs, args: CheckArgs) -> Result<()> {
    let trimlib = engine.build(args.input.as_deref().and_then(input_path))?;
    let document = match &args.input {
        Some(input) => {
            parse_document(&read_input(input)?).context("Failed to parse input document")?
        }
        None => Node::new_fragment(),
    };

    let report = check_libraries(&trimlib, &document)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.diagnostics)?);
    } else {
        print_diagnostics(&report.diagnostics);
    }

    if !report.passed() {
        anyhow::bail!(
            "{} problem(s) found in {} librar{}",
            report.diagnostics.len(),
            report.libraries,
            if report.libraries == 1 { "y" } else { "ies" }
        );
    }
    info!(
        libraries = report.libraries,
        templates = report.templates,
        "All templates compiled"
    );
    Ok(())
}

/// Compile every template of every registered library.
///
/// Unavailable libraries and broken templates end up in the report's
/// diagnostics.
pub fn check_libraries(trimlib: &Trimlib, document: &NodeRef) -> Result<CheckReport> {
    trimlib.initialize(document)?;
    let ctx = trimlib.load_context();
    let mut report = CheckReport::default();

    for namespace in trimlib.libraries() {
        let Some(library) = trimlib.lookup(&namespace) else {
            continue;
        };
        report.libraries += 1;
        // Load failures are already in the diagnostics
        let Ok(names) = library.template_names(&ctx) else {
            continue;
        };
        for name in names {
            if let Ok(Some(_)) = library.get_template(&name, &ctx) {
                report.templates += 1;
            }
        }
    }

    report.diagnostics = trimlib.take_diagnostics();
    Ok(report)
}
