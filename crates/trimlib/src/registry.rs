/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Namespace to library index, built once.

use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use trimlib_markup::{NodeRef, Selector, find_all};

use crate::error::Result;
use crate::library::Library;

/// Selector for library declarations in a document.
pub const DECLARATION_SELECTOR: &str = "link[rel=trimlib]";

/// A namespace bound to a library resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDeclaration {
    pub namespace: String,
    pub href: String,
}

impl LibraryDeclaration {
    pub fn new(namespace: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            href: href.into(),
        }
    }

    /// Read a declaration from a `<link rel="trimlib">` element.
    ///
    /// `None` when the namespace or the href is missing or empty.
    pub fn from_element(element: &NodeRef) -> Option<Self> {
        let namespace = element.attr("namespace")?;
        let href = element.attr("href")?;
        if namespace.trim().is_empty() || href.trim().is_empty() {
            return None;
        }
        Some(Self::new(namespace.trim(), href.trim()))
    }
}

/// Find every library declaration in `document`, in document order.
pub fn discover_declarations(document: &NodeRef) -> Result<Vec<LibraryDeclaration>> {
    let selector = Selector::parse(DECLARATION_SELECTOR)?;
    let mut declarations = Vec::new();
    for element in find_all(document, &selector) {
        match LibraryDeclaration::from_element(&element) {
            Some(declaration) => declarations.push(declaration),
            None => warn!(
                markup = %element.outer_html(),
                "Ignoring library declaration without namespace or href"
            ),
        }
    }
    Ok(declarations)
}

/// Index of libraries by lowercase namespace.
///
/// Filled exactly once; until then every lookup misses.
#[derive(Debug, Default)]
pub struct Registry {
    libraries: OnceCell<HashMap<String, Rc<Library>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.libraries.get().is_some()
    }

    /// Register `declarations` if the registry is still empty.
    ///
    /// Returns whether this call did the registration. A namespace declared
    /// twice is bound to its last declaration.
    pub fn initialize(&self, declarations: impl IntoIterator<Item = LibraryDeclaration>) -> bool {
        if self.is_initialized() {
            return false;
        }

        let mut libraries = HashMap::new();
        for declaration in declarations {
            let library = Library::new(&declaration.namespace, declaration.href);
            debug!(
                namespace = library.namespace(),
                href = library.href(),
                "Registering tag library"
            );
            if let Some(previous) =
                libraries.insert(library.namespace().to_string(), Rc::new(library))
            {
                debug!(
                    namespace = previous.namespace(),
                    href = previous.href(),
                    "Replacing earlier declaration"
                );
            }
        }
        self.libraries.set(libraries).is_ok()
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, namespace: &str) -> Option<Rc<Library>> {
        self.libraries
            .get()?
            .get(&namespace.trim().to_lowercase())
            .cloned()
    }

    /// Registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self
            .libraries
            .get()
            .map(|libraries| libraries.keys().cloned().collect())
            .unwrap_or_default();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.libraries.get().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
