/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expansion of namespaced custom tags through template libraries.
//!
//! A document declares tag libraries with
//! `<link rel="trimlib" namespace="ui" href="ui.html"/>`. A library resource
//! holds named templates as direct children with an `id`:
//!
//! ```html
//! <textarea id="greet">Hello, ${name}!</textarea>
//! ```
//!
//! Expanding `<ui:greet name="World"/>` then replaces the tag with
//! `Hello, World!`. Tag content is available to templates as `__body`, and
//! is expanded only if the template uses it.
//!
//! # Architecture
//!
//! - [`Trimlib`]: the context owning the registry, caches and collaborators
//! - [`Library`]: one tag library; fetched once, templates compiled once
//! - [`RenderData`] / [`DeferredBody`]: data handed to templates
//! - [`Request`]: the entry point's render/expand request
//! - [`Transport`], [`TemplateEngine`], [`ExpressionEvaluator`]: pluggable
//!   collaborators with default implementations
//!
//! # Example
//!
//! ```
//! use trimlib::{MemoryTransport, Trimlib};
//! use trimlib_markup::parse_document;
//!
//! let transport = MemoryTransport::new();
//! transport.add("ui.html", r#"<textarea id="greet">Hello, ${name}!</textarea>"#);
//!
//! let trimlib = Trimlib::builder()
//!     .transport(transport)
//!     .declare("ui", "ui.html")
//!     .build();
//!
//! let doc = parse_document(r#"<p><ui:greet name="World"/></p>"#).unwrap();
//! trimlib.expand_all(&doc).unwrap();
//! assert_eq!(doc.inner_html(), "<p>Hello, World!</p>");
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod expression;
pub mod interpolation;
pub mod library;
pub mod registry;
pub mod request;
pub mod template;
pub mod transport;

pub use config::{CONFIG_FILENAME, ConfigError, TrimlibConfig};
pub use context::{Trimlib, TrimlibBuilder};
pub use data::{BODY_KEY, DataValue, DeferredBody, EXPRESSION_PREFIX, RenderData};
pub use diagnostics::{Diagnostic, DiagnosticBuilder, DiagnosticCollector, DiagnosticKind};
pub use error::{Result, TrimlibError};
pub use expand::TagName;
pub use expression::{DisabledEvaluator, ExpressionError, ExpressionEvaluator, JsEvaluator};
pub use interpolation::{InterpolationEngine, InterpolationTemplate};
pub use library::{Library, LibraryContent, LoadContext, LoadFailure};
pub use registry::{DECLARATION_SELECTOR, LibraryDeclaration, Registry, discover_declarations};
pub use request::Request;
pub use template::{Renderable, TemplateEngine, TemplateError};
pub use transport::{FileSystemTransport, MemoryTransport, NullTransport, Transport, TransportError};
