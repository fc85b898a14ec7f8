/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `trimlib render`: render one template with data from the command line.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use trimlib::{Request, Trimlib};
use trimlib_markup::{Node, NodeExt, NodeRef, parse_document};

use super::{EngineArgs, print_diagnostics, read_input};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub namespace: String,
    pub template: String,
    /// Template data, a JSON object
    pub data: Option<String>,
    /// Document providing library declarations
    pub input: Option<String>,
}

/// Execute the render command
pub fn execute(engine: &EngineArgs, args: RenderArgs) -> Result<()> {
    let trimlib = engine.build(args.input.as_deref().and_then(super::input_path))?;
    let document = match &args.input {
        Some(input) => {
            parse_document(&read_input(input)?).context("Failed to parse input document")?
        }
        None => Node::new_fragment(),
    };

    let result = render_template(&trimlib, &document, &args);
    print_diagnostics(&trimlib.take_diagnostics());
    print!("{}", result?);
    Ok(())
}

/// Render the requested template into a scratch element and return its
/// markup.
pub fn render_template(
    trimlib: &Trimlib,
    document: &NodeRef,
    args: &RenderArgs,
) -> Result<String> {
    let data: Value = match &args.data {
        Some(data) => serde_json::from_str(data).context("--data is not valid JSON")?,
        None => Value::Null,
    };
    let payload = json!({
        "namespace": args.namespace,
        "template": args.template,
        "data": data,
    });
    let request = Request::from_args(Some("render"), Some(&payload))?;

    let target = Node::new_element("div", Vec::new());
    document.append(target.clone());
    trimlib.invoke(document, &[target.clone()], request)?;
    target.detach();
    Ok(target.inner_html())
}
