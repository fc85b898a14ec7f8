/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The [`Trimlib`] context.
//!
//! A host builds one context and passes it by reference to everything that
//! expands tags. The context owns the library registry and caches, so
//! libraries are fetched and templates compiled once per context.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::debug;
use trimlib_markup::NodeRef;

use crate::config::TrimlibConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::error::Result;
use crate::expression::{DisabledEvaluator, ExpressionEvaluator, JsEvaluator};
use crate::interpolation::InterpolationEngine;
use crate::library::{Library, LoadContext};
use crate::registry::{LibraryDeclaration, Registry, discover_declarations};
use crate::template::TemplateEngine;
use crate::transport::{FileSystemTransport, Transport};

/// Tag expansion context.
pub struct Trimlib {
    config: TrimlibConfig,
    registry: Registry,
    transport: Box<dyn Transport>,
    engine: Box<dyn TemplateEngine>,
    evaluator: Box<dyn ExpressionEvaluator>,
    diagnostics: RefCell<DiagnosticCollector>,
}

impl std::fmt::Debug for Trimlib {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trimlib")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for Trimlib {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Trimlib {
    pub fn builder() -> TrimlibBuilder {
        TrimlibBuilder::default()
    }

    pub fn config(&self) -> &TrimlibConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.is_initialized()
    }

    /// Register libraries, once.
    ///
    /// The first call registers the configured libraries followed by those
    /// declared in `document`. Later calls do nothing and return `false`.
    pub fn initialize(&self, document: &NodeRef) -> Result<bool> {
        if self.registry.is_initialized() {
            return Ok(false);
        }
        let discovered = discover_declarations(document)?;
        debug!(
            configured = self.config.libraries.len(),
            discovered = discovered.len(),
            "Initializing tag library registry"
        );
        let declarations = self
            .config
            .libraries
            .iter()
            .cloned()
            .chain(discovered);
        Ok(self.registry.initialize(declarations))
    }

    /// The library bound to `namespace`, ignoring case.
    pub fn lookup(&self, namespace: &str) -> Option<Rc<Library>> {
        self.registry.lookup(namespace)
    }

    /// Registered namespaces, sorted.
    pub fn libraries(&self) -> Vec<String> {
        self.registry.namespaces()
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().diagnostics().to_vec()
    }

    /// Take the diagnostics reported so far.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow_mut().take()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.borrow().has_errors()
    }

    pub(crate) fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    pub fn load_context(&self) -> LoadContext<'_> {
        LoadContext {
            transport: self.transport.as_ref(),
            engine: self.engine.as_ref(),
            diagnostics: &self.diagnostics,
        }
    }
}

/// Builder for [`Trimlib`].
///
/// Defaults: the filesystem transport rooted at `config.base_dir` (or the
/// current directory), [`InterpolationEngine`], and [`JsEvaluator`] unless
/// `config.expressions` is false.
#[derive(Default)]
pub struct TrimlibBuilder {
    config: TrimlibConfig,
    transport: Option<Box<dyn Transport>>,
    engine: Option<Box<dyn TemplateEngine>>,
    evaluator: Option<Box<dyn ExpressionEvaluator>>,
}

impl TrimlibBuilder {
    pub fn config(mut self, config: TrimlibConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    pub fn engine(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Install an expression evaluator. Ignored when expressions are
    /// disabled in the configuration.
    pub fn evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    /// Declare a library ahead of those found in documents.
    pub fn declare(mut self, namespace: impl Into<String>, href: impl Into<String>) -> Self {
        self.config
            .libraries
            .push(LibraryDeclaration::new(namespace, href));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    pub fn expressions(mut self, enabled: bool) -> Self {
        self.config.expressions = enabled;
        self
    }

    pub fn build(self) -> Trimlib {
        let transport = self.transport.unwrap_or_else(|| {
            let base_dir = self
                .config
                .base_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            Box::new(FileSystemTransport::new(base_dir))
        });
        let engine = self
            .engine
            .unwrap_or_else(|| Box::new(InterpolationEngine));
        let evaluator: Box<dyn ExpressionEvaluator> = if self.config.expressions {
            self.evaluator.unwrap_or_else(|| Box::new(JsEvaluator::new()))
        } else {
            Box::new(DisabledEvaluator)
        };

        Trimlib {
            config: self.config,
            registry: Registry::new(),
            transport,
            engine,
            evaluator,
            diagnostics: RefCell::new(DiagnosticCollector::new()),
        }
    }
}
