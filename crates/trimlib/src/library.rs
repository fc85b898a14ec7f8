/*
 * library.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag libraries and their template caches.
//!
//! A [`Library`] is fetched at most once, on the first question asked about
//! its templates. Templates are compiled on first use and kept for the life
//! of the library; a template that fails to compile is remembered as failed
//! and never compiled again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use once_cell::unsync::OnceCell;
use tracing::{debug, error, warn};
use trimlib_markup::node::is_raw_text_element;
use trimlib_markup::{MarkupError, parse_fragment};

use crate::diagnostics::DiagnosticCollector;
use crate::error::{Result, TrimlibError};
use crate::template::{Renderable, TemplateEngine};
use crate::transport::Transport;

/// Collaborators needed to load and compile a library's templates.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    pub transport: &'a dyn Transport,
    pub engine: &'a dyn TemplateEngine,
    pub diagnostics: &'a RefCell<DiagnosticCollector>,
}

/// Template sources declared by a library resource.
///
/// Only direct children of the resource with an `id` attribute declare
/// templates. Markup nested inside a template, including elements with an
/// `id`, is part of that template's source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryContent {
    sources: IndexMap<String, String>,
}

impl LibraryContent {
    pub fn parse(text: &str) -> std::result::Result<Self, MarkupError> {
        let root = parse_fragment(text)?;
        let mut sources = IndexMap::new();

        for child in root.element_children() {
            let Some(id) = child.attr("id") else {
                continue;
            };
            let name = id.trim().to_lowercase();
            if name.is_empty() {
                continue;
            }
            let source = match child.name() {
                Some(tag) if is_raw_text_element(tag) => child.text_content(),
                _ => child.inner_html(),
            };
            match sources.entry(name) {
                Entry::Vacant(entry) => {
                    entry.insert(source);
                }
                Entry::Occupied(entry) => {
                    warn!(template = %entry.key(), "Duplicate template id, keeping the first");
                }
            }
        }

        Ok(Self { sources })
    }

    /// Source of a template, by lowercase name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Declared template names, in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Why a library could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub message: String,
}

enum CacheEntry {
    Compiled(Rc<dyn Renderable>),
    Failed(String),
}

/// A tag library bound to a namespace.
pub struct Library {
    namespace: String,
    href: String,
    content: OnceCell<std::result::Result<LibraryContent, LoadFailure>>,
    templates: RefCell<HashMap<String, CacheEntry>>,
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("namespace", &self.namespace)
            .field("href", &self.href)
            .field("loaded", &self.is_loaded())
            .field("compiled", &self.templates.borrow().len())
            .finish()
    }
}

impl Library {
    /// Create an unloaded library. The namespace is stored lowercase.
    pub fn new(namespace: &str, href: impl Into<String>) -> Self {
        Self {
            namespace: namespace.trim().to_lowercase(),
            href: href.into(),
            content: OnceCell::new(),
            templates: RefCell::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Whether a fetch has been attempted.
    pub fn is_loaded(&self) -> bool {
        self.content.get().is_some()
    }

    /// The library's content, fetching it on first call.
    pub fn content(
        &self,
        ctx: &LoadContext<'_>,
    ) -> std::result::Result<&LibraryContent, &LoadFailure> {
        self.content.get_or_init(|| self.load(ctx)).as_ref()
    }

    fn load(&self, ctx: &LoadContext<'_>) -> std::result::Result<LibraryContent, LoadFailure> {
        debug!(namespace = %self.namespace, href = %self.href, "Fetching tag library");

        let loaded = ctx
            .transport
            .fetch(&self.href)
            .map_err(|err| err.to_string())
            .and_then(|text| LibraryContent::parse(&text).map_err(|err| err.to_string()));

        match loaded {
            Ok(content) => {
                debug!(
                    namespace = %self.namespace,
                    templates = content.len(),
                    "Loaded tag library"
                );
                Ok(content)
            }
            Err(message) => {
                warn!(
                    namespace = %self.namespace,
                    href = %self.href,
                    error = %message,
                    "Tag library unavailable"
                );
                let failure = LoadFailure { message };
                ctx.diagnostics
                    .borrow_mut()
                    .add(self.unavailable(&failure).to_diagnostic());
                Err(failure)
            }
        }
    }

    fn unavailable(&self, failure: &LoadFailure) -> TrimlibError {
        TrimlibError::LibraryUnavailable {
            namespace: self.namespace.clone(),
            href: self.href.clone(),
            message: failure.message.clone(),
        }
    }

    fn compile_error(&self, template: &str, message: &str) -> TrimlibError {
        TrimlibError::Compile {
            namespace: self.namespace.clone(),
            template: template.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the library declares `name`. Loads the library, never
    /// compiles. False when the library could not be loaded.
    pub fn has_template(&self, name: &str, ctx: &LoadContext<'_>) -> bool {
        self.content(ctx)
            .is_ok_and(|content| content.contains(&name.to_lowercase()))
    }

    /// The compiled template for `name`.
    ///
    /// `Ok(None)` when the library does not declare it. A library that could
    /// not be loaded, or a template that does not compile, is an error; both
    /// are reported to the diagnostics once, when they first happen.
    pub fn get_template(
        &self,
        name: &str,
        ctx: &LoadContext<'_>,
    ) -> Result<Option<Rc<dyn Renderable>>> {
        let key = name.to_lowercase();
        if let Some(entry) = self.templates.borrow().get(&key) {
            return match entry {
                CacheEntry::Compiled(template) => Ok(Some(Rc::clone(template))),
                CacheEntry::Failed(message) => Err(self.compile_error(&key, message)),
            };
        }

        let content = self
            .content(ctx)
            .map_err(|failure| self.unavailable(failure))?;
        let Some(source) = content.get(&key) else {
            return Ok(None);
        };

        debug!(namespace = %self.namespace, template = %key, "Compiling template");
        match ctx.engine.compile(source) {
            Ok(template) => {
                self.templates
                    .borrow_mut()
                    .insert(key, CacheEntry::Compiled(Rc::clone(&template)));
                Ok(Some(template))
            }
            Err(err) => {
                let message = err.to_string();
                error!(
                    namespace = %self.namespace,
                    template = %key,
                    error = %message,
                    "Template failed to compile"
                );
                let compile_error = self.compile_error(&key, &message);
                ctx.diagnostics
                    .borrow_mut()
                    .add(compile_error.to_diagnostic());
                self.templates
                    .borrow_mut()
                    .insert(key, CacheEntry::Failed(message));
                Err(compile_error)
            }
        }
    }

    /// Names of the declared templates, loading the library if needed.
    pub fn template_names(&self, ctx: &LoadContext<'_>) -> Result<Vec<String>> {
        let content = self
            .content(ctx)
            .map_err(|failure| self.unavailable(failure))?;
        Ok(content.names().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::InterpolationEngine;
    use crate::template::TemplateError;
    use crate::transport::MemoryTransport;
    use std::cell::Cell;

    const LIBRARY: &str = r#"
<textarea id="Greet">Hello, ${name}!</textarea>
<template id="card"><div class="card">${__body}<textarea id="inner">nested</textarea></div></template>
<textarea id="broken">${oops</textarea>
<textarea id="greet">second</textarea>
"#;

    struct Harness {
        transport: MemoryTransport,
        engine: InterpolationEngine,
        diagnostics: RefCell<DiagnosticCollector>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                transport: MemoryTransport::with_resources([("ui.html", LIBRARY)]),
                engine: InterpolationEngine,
                diagnostics: RefCell::new(DiagnosticCollector::new()),
            }
        }

        fn ctx(&self) -> LoadContext<'_> {
            LoadContext {
                transport: &self.transport,
                engine: &self.engine,
                diagnostics: &self.diagnostics,
            }
        }
    }

    #[test]
    fn test_content_direct_children_only() {
        let content = LibraryContent::parse(LIBRARY).unwrap();
        assert_eq!(
            content.names().collect::<Vec<_>>(),
            vec!["greet", "card", "broken"]
        );
        assert!(!content.contains("inner"));
        // First declaration wins
        assert_eq!(content.get("greet"), Some("Hello, ${name}!"));
        assert_eq!(
            content.get("card"),
            Some(r#"<div class="card">${__body}<textarea id="inner">nested</textarea></div>"#)
        );
    }

    #[test]
    fn test_has_template_loads_without_compiling() {
        let harness = Harness::new();
        let library = Library::new("UI", "ui.html");
        assert_eq!(library.namespace(), "ui");
        assert!(!library.is_loaded());

        assert!(library.has_template("GREET", &harness.ctx()));
        assert!(!library.has_template("inner", &harness.ctx()));
        assert!(library.is_loaded());
        assert!(library.templates.borrow().is_empty());
        assert_eq!(harness.transport.fetch_count("ui.html"), 1);
    }

    #[test]
    fn test_get_template_compiles_once() {
        struct CountingEngine(Cell<usize>);
        impl TemplateEngine for CountingEngine {
            fn compile(
                &self,
                source: &str,
            ) -> std::result::Result<Rc<dyn Renderable>, TemplateError> {
                self.0.set(self.0.get() + 1);
                InterpolationEngine.compile(source)
            }
        }

        let harness = Harness::new();
        let engine = CountingEngine(Cell::new(0));
        let ctx = LoadContext {
            engine: &engine,
            ..harness.ctx()
        };
        let library = Library::new("ui", "ui.html");

        let first = library.get_template("greet", &ctx).unwrap().unwrap();
        let second = library.get_template("Greet", &ctx).unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(engine.0.get(), 1);
        assert!(library.get_template("missing", &ctx).unwrap().is_none());
    }

    #[test]
    fn test_compile_failure_is_cached_and_reported_once() {
        let harness = Harness::new();
        let library = Library::new("ui", "ui.html");

        for _ in 0..2 {
            let err = library.get_template("broken", &harness.ctx()).err().unwrap();
            assert!(matches!(err, TrimlibError::Compile { .. }));
        }
        let diagnostics = harness.diagnostics.borrow();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.diagnostics()[0].code.as_deref(), Some("TL-2-1"));
    }

    #[test]
    fn test_unavailable_library_is_distinct_from_absence() {
        let harness = Harness::new();
        let library = Library::new("gone", "gone.html");

        assert!(!library.has_template("greet", &harness.ctx()));
        let err = library.get_template("greet", &harness.ctx()).err().unwrap();
        assert!(matches!(err, TrimlibError::LibraryUnavailable { .. }));
        assert!(library.template_names(&harness.ctx()).is_err());

        // Never retried, reported once
        assert_eq!(harness.transport.fetch_count("gone.html"), 1);
        assert_eq!(harness.diagnostics.borrow().len(), 1);
    }

    #[test]
    fn test_malformed_library_is_unavailable() {
        let harness = Harness::new();
        harness.transport.add("bad.html", "<div id=\"a\">x</span>");
        let library = Library::new("bad", "bad.html");

        assert!(!library.has_template("a", &harness.ctx()));
        assert!(matches!(
            library.get_template("a", &harness.ctx()),
            Err(TrimlibError::LibraryUnavailable { .. })
        ));
    }
}
