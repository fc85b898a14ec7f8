/*
 * interpolation.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Default template engine: literal markup with `${path}` placeholders.
//!
//! - `${name}` inserts the value of `name`
//! - `${user.name}` walks into objects (and arrays, by index)
//! - `$${` writes a literal `${`
//!
//! Data values are escaped on insertion, so `name="a &lt; b"` renders as
//! text. `__body` is already markup and is inserted as is.

use std::rc::Rc;

use serde_json::Value;
use trimlib_markup::escape_markup;

use crate::data::{BODY_KEY, RenderData};
use crate::error::TrimlibError;
use crate::template::{Renderable, TemplateEngine, TemplateError};

/// The default [`TemplateEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolationEngine;

impl TemplateEngine for InterpolationEngine {
    fn compile(&self, source: &str) -> Result<Rc<dyn Renderable>, TemplateError> {
        Ok(Rc::new(InterpolationTemplate::parse(source)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(Vec<String>),
}

/// A parsed interpolation template.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationTemplate {
    segments: Vec<Segment>,
}

impl InterpolationTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(index) = rest.find('$') {
            literal.push_str(&rest[..index]);
            let at = &rest[index..];

            if at.starts_with("$${") {
                literal.push_str("${");
                offset += index + 3;
                rest = &rest[index + 3..];
            } else if let Some(after) = at.strip_prefix("${") {
                let start = offset + index;
                let Some(close) = after.find('}') else {
                    return Err(TemplateError::Parse {
                        message: "unclosed placeholder".to_string(),
                        offset: start,
                    });
                };
                let path = parse_path(&after[..close], start)?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(path));
                offset += index + 2 + close + 1;
                rest = &after[close + 1..];
            } else {
                literal.push('$');
                offset += index + 1;
                rest = &rest[index + 1..];
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Top-level keys referenced by the template, in order of appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(path) = segment
                && let Some(first) = path.first()
                && !names.contains(&first.as_str())
            {
                names.push(first);
            }
        }
        names
    }
}

fn parse_path(inner: &str, offset: usize) -> Result<Vec<String>, TemplateError> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Err(TemplateError::Parse {
            message: "empty placeholder".to_string(),
            offset,
        });
    }
    let path: Vec<String> = trimmed.split('.').map(str::to_string).collect();
    if path
        .iter()
        .any(|part| part.is_empty() || part.chars().any(char::is_whitespace))
    {
        return Err(TemplateError::Parse {
            message: format!("invalid placeholder path '{}'", trimmed),
            offset,
        });
    }
    Ok(path)
}

impl Renderable for InterpolationTemplate {
    fn process(&self, data: &RenderData<'_>) -> Result<String, TrimlibError> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder(path) => {
                    let path: Vec<&str> = path.iter().map(String::as_str).collect();
                    if let Some(value) = data.resolve_path(&path)? {
                        let text = render_value(&value);
                        if path == [BODY_KEY] {
                            output.push_str(&text);
                        } else {
                            output.push_str(&escape_markup(&text));
                        }
                    }
                }
            }
        }
        Ok(output)
    }
}

/// Render a value as text for insertion.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
