/*
 * expand.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering templates into elements and expanding tags.
//!
//! [`Trimlib::render`] fills an element with a template's output.
//! [`Trimlib::expand`] replaces a `namespace:template` tag with the output of
//! that template, rendered from the tag's attributes and its (deferred)
//! content. Anything that is not a tag of a registered library is left
//! alone: documents may contain namespaced markup for other reasons.

use std::rc::Rc;

use tracing::{debug, trace};
use trimlib_markup::{Node, NodeExt, NodeRef};

use crate::context::Trimlib;
use crate::data::{BODY_KEY, DataValue, DeferredBody, RenderData};
use crate::error::{Result, TrimlibError};

/// A tag name split into namespace and template, both lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName {
    pub namespace: String,
    pub template: String,
}

impl TagName {
    /// Split `namespace:template`.
    ///
    /// `None` unless the name has exactly one `:` with text on both sides.
    pub fn parse(name: &str) -> Option<Self> {
        let (namespace, template) = name.split_once(':')?;
        if namespace.is_empty() || template.is_empty() || template.contains(':') {
            return None;
        }
        Some(Self {
            namespace: namespace.to_lowercase(),
            template: template.to_lowercase(),
        })
    }
}

impl Trimlib {
    /// Render `namespace:template` into `element`, replacing its content.
    ///
    /// Without `data` (or without `__body` in it) the template sees an empty
    /// body. An unknown namespace or template leaves the element untouched.
    /// So does a library that cannot be loaded or a template that does not
    /// compile, unless the context is strict; those failures are reported
    /// through the diagnostics either way.
    pub fn render(
        &self,
        element: &NodeRef,
        namespace: &str,
        template: &str,
        data: Option<RenderData<'_>>,
    ) -> Result<()> {
        self.render_into(element, namespace, template, data)
            .map(|_| ())
    }

    /// Like `render`, returning whether the element was filled.
    fn render_into(
        &self,
        element: &NodeRef,
        namespace: &str,
        template: &str,
        data: Option<RenderData<'_>>,
    ) -> Result<bool> {
        if namespace.trim().is_empty() {
            return Err(TrimlibError::MissingNamespace);
        }
        if template.trim().is_empty() {
            return Err(TrimlibError::MissingTemplate);
        }
        self.initialize(&element.root())?;

        let mut data = data.unwrap_or_default();
        data.ensure_body();

        let Some(library) = self.lookup(namespace) else {
            debug!(namespace, "Unknown namespace, nothing to render");
            return Ok(false);
        };
        let compiled = match library.get_template(template, &self.load_context()) {
            Ok(Some(compiled)) => compiled,
            Ok(None) => {
                debug!(namespace, template, "Unknown template, nothing to render");
                return Ok(false);
            }
            Err(err) if !self.config().strict => {
                debug!(namespace, template, error = %err, "Skipping unusable template");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let markup = compiled.process(&data)?;
        element.set_inner_html(&markup)?;
        Ok(true)
    }

    /// Replace a tag with the output of its template.
    ///
    /// The template receives the tag's attributes and, as `__body`, its
    /// content. Tags inside the content are expanded only if the template
    /// reads `__body`. Detached elements and elements that are not tags of a
    /// registered library are left alone.
    pub fn expand(&self, element: &NodeRef) -> Result<()> {
        self.try_expand(element).map(|_| ())
    }

    fn try_expand(&self, element: &NodeRef) -> Result<Expansion> {
        if element.parent().is_none() {
            return Ok(Expansion::NotATag);
        }
        let Some(tag) = element.name().and_then(TagName::parse) else {
            return Ok(Expansion::NotATag);
        };
        self.initialize(&element.root())?;

        let Some(library) = self.lookup(&tag.namespace) else {
            return Ok(Expansion::NotATag);
        };
        let ctx = self.load_context();
        if library.content(&ctx).is_err() {
            return Ok(Expansion::LeftInPlace);
        }
        if !library.has_template(&tag.template, &ctx) {
            return Ok(Expansion::NotATag);
        }

        trace!(namespace = %tag.namespace, template = %tag.template, "Expanding tag");
        let mut data = self.build_data(element)?;
        data.insert(
            BODY_KEY,
            DataValue::Deferred(DeferredBody::new(self, Rc::clone(element))),
        );

        let scratch = Node::new_element("div", Vec::new());
        if !self.render_into(&scratch, &tag.namespace, &tag.template, Some(data))? {
            return Ok(Expansion::LeftInPlace);
        }
        element.replace_with_html(&scratch.inner_html())?;
        Ok(Expansion::Replaced)
    }

    /// Expand every tag under `root`, in document order.
    ///
    /// Tags are expanded outermost first; markup produced by a template is
    /// not searched again, and neither is the content of a tag whose library
    /// or template is unusable. Returns the number of tags replaced at this
    /// level (tags expanded as part of a body are not counted).
    pub fn expand_all(&self, root: &NodeRef) -> Result<usize> {
        self.initialize(&root.root())?;
        self.expand_children(root)
    }

    pub(crate) fn expand_children(&self, node: &NodeRef) -> Result<usize> {
        let mut expanded = 0;
        for child in node.children() {
            if !child.is_element() || child.parent().is_none() {
                continue;
            }
            match self.try_expand(&child)? {
                Expansion::Replaced => expanded += 1,
                Expansion::NotATag => expanded += self.expand_children(&child)?,
                Expansion::LeftInPlace => {}
            }
        }
        Ok(expanded)
    }
}

/// What `try_expand` did with an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expansion {
    /// Replaced by its template's output.
    Replaced,
    /// Not a tag of a registered library, or one naming no template.
    NotATag,
    /// A tag whose library failed to load or whose template failed to
    /// compile. Its content is not expanded either.
    LeftInPlace,
}
