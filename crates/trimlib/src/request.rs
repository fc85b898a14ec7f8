/*
 * request.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The single entry point for applying the engine to selected elements.

use serde_json::Value;
use tracing::debug;
use trimlib_markup::{NodeRef, Selector, find_all};

use crate::context::Trimlib;
use crate::data::RenderData;
use crate::error::{Result, TrimlibError};

/// What to do with each target element.
#[derive(Debug, Clone, PartialEq)]
pub enum Request<'a> {
    /// Fill each target with a template's output.
    Render {
        namespace: String,
        template: String,
        data: Option<RenderData<'a>>,
    },
    /// Expand each target as a tag.
    Expand,
}

impl Request<'static> {
    /// Build a request from a loosely typed method name and payload.
    ///
    /// Accepted shapes:
    /// - no method and an object payload: render
    /// - `"render"` with an object payload
    /// - `"expand"` without a payload
    ///
    /// A render payload carries `namespace`, `template` and optionally
    /// `data` (an object). Anything else is an invalid-arguments error.
    pub fn from_args(method: Option<&str>, payload: Option<&Value>) -> Result<Self> {
        match (method, payload) {
            (None | Some("render"), Some(Value::Object(fields))) => {
                let field = |name: &str| {
                    fields
                        .get(name)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let data = match fields.get("data") {
                    None => None,
                    Some(value) => Some(RenderData::try_from(value.clone())?),
                };
                Ok(Request::Render {
                    namespace: field("namespace"),
                    template: field("template"),
                    data,
                })
            }
            (Some("expand"), None) => Ok(Request::Expand),
            (Some(method @ ("render" | "expand")), _) => Err(TrimlibError::InvalidArguments {
                message: format!("unexpected payload for '{}'", method),
            }),
            (Some(method), _) => Err(TrimlibError::InvalidArguments {
                message: format!("unknown method '{}'", method),
            }),
            (None, _) => Err(TrimlibError::InvalidArguments {
                message: "expected a render request object".to_string(),
            }),
        }
    }
}

impl Trimlib {
    /// Apply `request` to every target, in order.
    ///
    /// Libraries are registered from `document` first. The first error stops
    /// processing; targets already handled stay changed.
    pub fn invoke(
        &self,
        document: &NodeRef,
        targets: &[NodeRef],
        request: Request<'_>,
    ) -> Result<()> {
        self.initialize(document)?;
        match request {
            Request::Render {
                namespace,
                template,
                data,
            } => {
                debug!(%namespace, %template, targets = targets.len(), "Render request");
                for target in targets {
                    self.render(target, &namespace, &template, data.clone())?;
                }
            }
            Request::Expand => {
                debug!(targets = targets.len(), "Expand request");
                for target in targets {
                    self.expand(target)?;
                }
            }
        }
        Ok(())
    }

    /// Apply `request` to the elements of `document` matching `selector`.
    pub fn invoke_selector(
        &self,
        document: &NodeRef,
        selector: &str,
        request: Request<'_>,
    ) -> Result<()> {
        let selector = Selector::parse(selector)?;
        let targets = find_all(document, &selector);
        self.invoke(document, &targets, request)
    }
}
