/*
 * data.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Data handed to templates.
//!
//! A [`RenderData`] maps attribute names to values. Plain attributes become
//! JSON strings, `javascript:` attributes become whatever the installed
//! [`ExpressionEvaluator`](crate::ExpressionEvaluator) returns, and `__body`
//! holds the tag's content as a [`DeferredBody`].
//!
//! The body is deferred because expanding it is work (and may have effects
//! through nested templates) that a template which ignores its body must
//! never trigger. Templates reach values through [`RenderData::resolve`],
//! which is the only place a deferred body is resolved.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use tracing::trace;
use trimlib_markup::NodeRef;

use crate::context::Trimlib;
use crate::error::{Result, TrimlibError};

/// Key under which a tag's content is exposed to its template.
pub const BODY_KEY: &str = "__body";

/// Attribute value prefix marking a computed attribute.
pub const EXPRESSION_PREFIX: &str = "javascript:";

/// The content of a tag, expanded on first use.
#[derive(Clone)]
pub struct DeferredBody<'a> {
    trimlib: &'a Trimlib,
    element: NodeRef,
    resolved: Rc<OnceCell<String>>,
}

impl<'a> DeferredBody<'a> {
    pub(crate) fn new(trimlib: &'a Trimlib, element: NodeRef) -> Self {
        Self {
            trimlib,
            element,
            resolved: Rc::new(OnceCell::new()),
        }
    }

    /// The tag whose content this body is.
    pub fn element(&self) -> &NodeRef {
        &self.element
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Expand every tag inside the element, then return its inner markup.
    ///
    /// Expansion follows [`Trimlib::expand_all`]: outermost tags first, and
    /// nothing inside a tag that was left in place. The markup is computed
    /// once and shared by all clones of this body.
    pub fn resolve(&self) -> Result<String> {
        if let Some(markup) = self.resolved.get() {
            return Ok(markup.clone());
        }

        trace!(tag = ?self.element.name(), "Resolving deferred body");
        self.trimlib.expand_children(&self.element)?;

        let markup = self.element.inner_html();
        Ok(self.resolved.get_or_init(|| markup).clone())
    }
}

impl fmt::Debug for DeferredBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredBody")
            .field("element", &self.element.name())
            .field("resolved", &self.resolved.get())
            .finish()
    }
}

/// A value in a [`RenderData`].
#[derive(Debug, Clone)]
pub enum DataValue<'a> {
    Value(Value),
    Deferred(DeferredBody<'a>),
}

impl DataValue<'_> {
    /// The value, resolving a deferred body if necessary.
    pub fn resolve(&self) -> Result<Cow<'_, Value>> {
        match self {
            DataValue::Value(value) => Ok(Cow::Borrowed(value)),
            DataValue::Deferred(body) => Ok(Cow::Owned(Value::String(body.resolve()?))),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, DataValue::Deferred(_))
    }
}

impl PartialEq for DataValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataValue::Value(a), DataValue::Value(b)) => a == b,
            (DataValue::Deferred(a), DataValue::Deferred(b)) => Rc::ptr_eq(&a.element, &b.element),
            _ => false,
        }
    }
}

impl From<Value> for DataValue<'_> {
    fn from(value: Value) -> Self {
        DataValue::Value(value)
    }
}

impl From<&str> for DataValue<'_> {
    fn from(value: &str) -> Self {
        DataValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for DataValue<'_> {
    fn from(value: String) -> Self {
        DataValue::Value(Value::String(value))
    }
}

impl<'a> From<DeferredBody<'a>> for DataValue<'a> {
    fn from(body: DeferredBody<'a>) -> Self {
        DataValue::Deferred(body)
    }
}

/// Ordered mapping from key to value, handed to a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderData<'a> {
    entries: IndexMap<String, DataValue<'a>>,
}

impl<'a> RenderData<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DataValue<'a>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DataValue<'a>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue<'a>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Default `__body` to the empty string.
    pub fn ensure_body(&mut self) {
        self.entries
            .entry(BODY_KEY.to_string())
            .or_insert_with(|| DataValue::Value(Value::String(String::new())));
    }

    /// Resolve the value for `key`.
    pub fn resolve(&self, key: &str) -> Result<Option<Cow<'_, Value>>> {
        self.entries.get(key).map(DataValue::resolve).transpose()
    }

    /// Resolve `path[0]`, then walk the rest of the path through objects
    /// and arrays. Missing steps yield `None`.
    pub fn resolve_path(&self, path: &[&str]) -> Result<Option<Value>> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(None);
        };
        let Some(root) = self.resolve(first)? else {
            return Ok(None);
        };

        let mut current: &Value = root.as_ref();
        for key in rest {
            let next = match current {
                Value::Object(map) => map.get(*key),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current.clone()))
    }
}

impl TryFrom<Value> for RenderData<'_> {
    type Error = TrimlibError;

    /// Build data from a JSON object.
    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map
                    .into_iter()
                    .map(|(k, v)| (k, DataValue::Value(v)))
                    .collect(),
            }),
            Value::Null => Ok(Self::new()),
            other => Err(TrimlibError::InvalidArguments {
                message: format!("render data must be an object, got {}", other),
            }),
        }
    }
}

impl Trimlib {
    /// Build render data from a tag's attributes, in document order.
    ///
    /// `javascript:` attributes are evaluated by the installed evaluator;
    /// any failure is returned. The caller adds `__body`.
    pub fn build_data<'a>(&self, element: &NodeRef) -> Result<RenderData<'a>> {
        let mut data = RenderData::new();
        for attribute in element.attributes() {
            let value = match attribute.value.strip_prefix(EXPRESSION_PREFIX) {
                Some(expression) => {
                    trace!(attribute = %attribute.name, expression, "Evaluating attribute");
                    self.evaluator().evaluate(expression).map_err(|source| {
                        TrimlibError::Expression {
                            attribute: attribute.name.clone(),
                            expression: expression.to_string(),
                            source,
                        }
                    })?
                }
                None => Value::String(attribute.value.clone()),
            };
            data.insert(attribute.name, value);
        }
        Ok(data)
    }
}
