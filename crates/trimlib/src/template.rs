/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The seam between the expander and a template engine.
//!
//! The expander never looks inside a template. It asks a [`TemplateEngine`]
//! to compile source text once, keeps the resulting [`Renderable`], and
//! hands it a [`RenderData`] each time the template is used. Any engine can
//! be plugged in; [`InterpolationEngine`](crate::InterpolationEngine) is the
//! default.

use std::rc::Rc;

use thiserror::Error;

use crate::data::RenderData;
use crate::error::TrimlibError;

/// Errors raised by a template engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    /// The template source is malformed.
    #[error("Parse error at byte {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// The template could not be evaluated against its data.
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },
}

/// A compiled template bound to data at render time.
pub trait Renderable {
    /// Render the template.
    ///
    /// Deferred values in `data` (such as `__body`) are resolved only when
    /// the template refers to them, through [`RenderData::resolve`]. Errors
    /// raised by that resolution are returned unchanged.
    fn process(&self, data: &RenderData<'_>) -> Result<String, TrimlibError>;
}

/// Compiles template source text into a [`Renderable`].
pub trait TemplateEngine {
    fn compile(&self, source: &str) -> Result<Rc<dyn Renderable>, TemplateError>;
}
