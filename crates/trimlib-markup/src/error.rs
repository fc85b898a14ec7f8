/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for markup parsing and selector compilation.

use thiserror::Error;

/// Result type alias for trimlib-markup operations.
pub type Result<T> = std::result::Result<T, MarkupError>;

/// Errors that can occur while parsing a markup fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// Syntax error reported by quick-xml.
    #[error("Markup syntax error: {message}{}", at_byte(.position))]
    Syntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// End tag does not match the innermost open element.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>{}", at_byte(.position))]
    MismatchedEndTag {
        expected: String,
        found: String,
        position: Option<u64>,
    },

    /// End tag with no open element.
    #[error("Unexpected closing tag </{found}>{}", at_byte(.position))]
    UnexpectedEndTag { found: String, position: Option<u64> },

    /// Input ended while an element was still open.
    #[error("Unexpected end of input, expected closing tag </{name}>")]
    UnclosedElement { name: String },
}

/// Errors produced when compiling a selector string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Invalid selector '{selector}' at byte {offset}: {message}")]
    Invalid {
        selector: String,
        offset: usize,
        message: String,
    },
}

fn at_byte(position: &Option<u64>) -> String {
    match position {
        Some(pos) => format!(" at byte {}", pos),
        None => String::new(),
    }
}

impl From<quick_xml::Error> for MarkupError {
    fn from(err: quick_xml::Error) -> Self {
        MarkupError::Syntax {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for MarkupError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        MarkupError::Syntax {
            message: format!("Attribute error: {}", err),
            position: None,
        }
    }
}
