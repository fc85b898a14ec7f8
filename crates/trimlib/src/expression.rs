/*
 * expression.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation of `javascript:` attribute values.
//!
//! Attribute values starting with `javascript:` are computed rather than
//! taken literally. The expansion engine only sees the [`ExpressionEvaluator`]
//! the host installs. Three are provided:
//!
//! - [`JsEvaluator`] (default): an embedded ECMAScript engine (`boa_engine`).
//!   Expressions share one global scope per evaluator.
//! - [`DisabledEvaluator`]: rejects every expression, for documents whose
//!   attributes are not trusted.
//! - any `Fn(&str) -> Result<Value, ExpressionError>` closure.
//!
//! Attribute content is a trust boundary: whatever evaluator is installed is
//! run on every `javascript:` attribute of every expanded tag.

use std::cell::RefCell;
use std::fmt;

use boa_engine::{Context, JsValue, Source};
use once_cell::unsync::OnceCell;
use serde_json::{Number, Value};
use thiserror::Error;

/// Errors raised while evaluating an attribute expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// The script failed to parse, threw, or produced an unconvertible value.
    #[error("Script error: {0}")]
    Script(String),

    #[error("Expression produced a non-finite number")]
    NonFinite,

    #[error("Expression evaluation is disabled")]
    Disabled,

    /// Failure reported by a host-supplied evaluator.
    #[error("{0}")]
    Host(String),
}

impl ExpressionError {
    pub fn host(message: impl Into<String>) -> Self {
        ExpressionError::Host(message.into())
    }
}

/// Capability to evaluate attribute expressions.
pub trait ExpressionEvaluator {
    /// Evaluate `expression` (the attribute value without its prefix).
    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError>;
}

impl<F> ExpressionEvaluator for F
where
    F: Fn(&str) -> Result<Value, ExpressionError>,
{
    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError> {
        self(expression)
    }
}

/// Evaluator that refuses to run anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEvaluator;

impl ExpressionEvaluator for DisabledEvaluator {
    fn evaluate(&self, _expression: &str) -> Result<Value, ExpressionError> {
        Err(ExpressionError::Disabled)
    }
}

/// JavaScript evaluator backed by `boa_engine`.
///
/// The engine context is created on first use and kept for the lifetime of
/// the evaluator, so globals defined by one attribute are visible to later
/// ones. Results are converted to JSON: integral numbers become JSON
/// integers (`1+1` yields `2`), `undefined` becomes `null`, and non-finite
/// numbers are errors.
#[derive(Default)]
pub struct JsEvaluator {
    context: OnceCell<RefCell<Context>>,
}

impl JsEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the engine context has been created.
    pub fn is_started(&self) -> bool {
        self.context.get().is_some()
    }
}

impl fmt::Debug for JsEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsEvaluator")
            .field("started", &self.is_started())
            .finish()
    }
}

impl ExpressionEvaluator for JsEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError> {
        let cell = self
            .context
            .get_or_init(|| RefCell::new(Context::default()));
        let mut context = cell.borrow_mut();
        let value = context
            .eval(Source::from_bytes(expression))
            .map_err(|e| ExpressionError::Script(e.to_string()))?;
        js_to_json(&value, &mut context)
    }
}

fn js_to_json(value: &JsValue, context: &mut Context) -> Result<Value, ExpressionError> {
    if value.is_undefined() || value.is_null() {
        return Ok(Value::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(Value::Bool(b));
    }
    if let Some(n) = value.as_number() {
        return number_to_json(n).map(Value::Number);
    }
    if let Some(s) = value.as_string() {
        return Ok(Value::String(s.to_std_string_escaped()));
    }
    let json = value
        .to_json(context)
        .map_err(|e| ExpressionError::Script(e.to_string()))?;
    Ok(Value::from(json))
}

/// Largest integer that survives the f64 round trip.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> Result<Number, ExpressionError> {
    if !n.is_finite() {
        return Err(ExpressionError::NonFinite);
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Ok(Number::from(n as i64));
    }
    Number::from_f64(n).ok_or(ExpressionError::NonFinite)
}
