/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for library loading, rendering and expansion.

use thiserror::Error;
use trimlib_markup::{MarkupError, SelectorError};

use crate::diagnostics::Diagnostic;
use crate::expression::ExpressionError;
use crate::template::TemplateError;

/// Errors raised by the expansion engine.
#[derive(Debug, Error)]
pub enum TrimlibError {
    /// `render` was called without a namespace.
    #[error("Missing namespace in render request")]
    MissingNamespace,

    /// `render` was called without a template name.
    #[error("Missing template name in render request")]
    MissingTemplate,

    /// The entry point was called with an unsupported argument shape.
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The library's resource could not be fetched or parsed.
    #[error("Library '{namespace}' is unavailable ({href}): {message}")]
    LibraryUnavailable {
        namespace: String,
        href: String,
        message: String,
    },

    /// A template failed to compile.
    #[error("Template '{namespace}:{template}' failed to compile: {message}")]
    Compile {
        namespace: String,
        template: String,
        message: String,
    },

    /// A template failed while rendering.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A `javascript:` attribute could not be evaluated.
    #[error("Failed to evaluate attribute '{attribute}' ({expression}): {source}")]
    Expression {
        attribute: String,
        expression: String,
        #[source]
        source: ExpressionError,
    },

    /// Rendered markup could not be parsed back into the document.
    #[error("Rendered markup is malformed: {0}")]
    Markup(#[from] MarkupError),

    /// An internal selector failed to compile.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, TrimlibError>;

impl TrimlibError {
    /// Convert this error to a diagnostic with a `TL-*` code.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            TrimlibError::MissingNamespace => Diagnostic::error("Missing Namespace")
                .with_code("TL-3-1")
                .problem("A render request must name the namespace of the template")
                .build(),

            TrimlibError::MissingTemplate => Diagnostic::error("Missing Template Name")
                .with_code("TL-3-2")
                .problem("A render request must name the template to render")
                .build(),

            TrimlibError::InvalidArguments { message } => Diagnostic::error("Invalid Arguments")
                .with_code("TL-3-3")
                .problem(message.clone())
                .add_hint("Pass a render request object, or `expand` with no payload?")
                .build(),

            TrimlibError::LibraryUnavailable {
                namespace,
                href,
                message,
            } => Diagnostic::warning("Tag Library Unavailable")
                .with_code("TL-1-1")
                .problem(format!(
                    "The library for namespace `{}` could not be loaded",
                    namespace
                ))
                .add_detail(format!("Resource: {}", href))
                .add_detail(message.clone())
                .add_hint("Check the `href` of the library declaration?")
                .build(),

            TrimlibError::Compile {
                namespace,
                template,
                message,
            } => Diagnostic::error("Template Compilation Failed")
                .with_code("TL-2-1")
                .problem(format!(
                    "Template `{}` in library `{}` is malformed",
                    template, namespace
                ))
                .add_detail(message.clone())
                .build(),

            TrimlibError::Template(err) => Diagnostic::error("Template Rendering Failed")
                .with_code("TL-2-2")
                .problem(err.to_string())
                .build(),

            TrimlibError::Expression {
                attribute,
                expression,
                source,
            } => Diagnostic::error("Attribute Expression Failed")
                .with_code("TL-2-3")
                .problem(format!("Attribute `{}` could not be evaluated", attribute))
                .add_detail(format!("Expression: {}", expression))
                .add_detail(source.to_string())
                .build(),

            TrimlibError::Markup(err) => Diagnostic::error("Malformed Rendered Markup")
                .with_code("TL-2-4")
                .problem(err.to_string())
                .add_hint("Check that the template produces balanced tags?")
                .build(),

            TrimlibError::Selector(err) => Diagnostic::error("Invalid Selector")
                .with_code("TL-3-4")
                .problem(err.to_string())
                .build(),
        }
    }
}
