/*
 * selector.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! A deliberately small selector language.
//!
//! Supported forms: `tag`, `*`, `prefix:tag`, attribute presence `[attr]`
//! and attribute equality `[attr=value]` (value optionally quoted), in any
//! combination such as `link[rel=trimlib][href]`. Tag and attribute names
//! compare case-insensitively, attribute values exactly.

use std::str::FromStr;

use crate::error::SelectorError;
use crate::node::{NodeExt, NodeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeTest {
    Present(String),
    Equals(String, String),
}

/// A compiled selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// `None` matches any element name.
    tag: Option<String>,
    attributes: Vec<AttributeTest>,
}

impl Selector {
    /// Compile a selector string.
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let input = selector.trim();
        if input.is_empty() {
            return Err(SelectorError::Empty);
        }

        let invalid = |offset: usize, message: &str| SelectorError::Invalid {
            selector: selector.to_string(),
            offset,
            message: message.to_string(),
        };

        let tag_end = input.find('[').unwrap_or(input.len());
        let tag = match &input[..tag_end] {
            "" | "*" => None,
            name if name.chars().all(is_name_char) => Some(name.to_string()),
            _ => return Err(invalid(0, "invalid tag name")),
        };

        let mut attributes = Vec::new();
        let mut rest = &input[tag_end..];
        let mut offset = tag_end;
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return Err(invalid(offset, "expected '['"));
            }
            let close = rest
                .find(']')
                .ok_or_else(|| invalid(offset, "unclosed attribute test"))?;
            let body = &rest[1..close];
            let test = match body.split_once('=') {
                Some((name, value)) => {
                    let name = name.trim();
                    let value = unquote(value.trim());
                    AttributeTest::Equals(name.to_string(), value.to_string())
                }
                None => AttributeTest::Present(body.trim().to_string()),
            };
            let name = match &test {
                AttributeTest::Present(name) | AttributeTest::Equals(name, _) => name,
            };
            if name.is_empty() || !name.chars().all(is_name_char) {
                return Err(invalid(offset + 1, "invalid attribute name"));
            }
            attributes.push(test);
            offset += close + 1;
            rest = &rest[close + 1..];
        }

        Ok(Selector { tag, attributes })
    }

    /// Check a single node against this selector.
    pub fn matches(&self, node: &NodeRef) -> bool {
        let Some(name) = node.name() else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(name) {
                return false;
            }
        }
        self.attributes.iter().all(|test| match test {
            AttributeTest::Present(attr) => node.attr(attr).is_some(),
            AttributeTest::Equals(attr, value) => node.attr(attr).as_deref() == Some(value),
        })
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// All descendants of `root` matching `selector`, in document order.
pub fn find_all(root: &NodeRef, selector: &Selector) -> Vec<NodeRef> {
    root.descendants()
        .into_iter()
        .filter(|node| selector.matches(node))
        .collect()
}
