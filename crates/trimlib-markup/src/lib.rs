/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Mutable markup trees for trimlib.
//!
//! This crate is the document layer the expansion engine works against. It
//! wraps [`quick-xml`] to parse markup fragments into a tree of
//! reference-counted [`Node`]s that can be queried, serialized and rewritten
//! in place while callers hold handles into it.
//!
//! # Overview
//!
//! The main items are:
//! - [`parse_fragment`] / [`parse_document`]: markup to [`NodeRef`]
//! - [`Node`]: element, text, comment or fragment, with attribute access
//! - [`NodeExt`]: structural mutation (`append`, `detach`, `set_inner_html`,
//!   `replace_with_html`) and traversal (`descendants`, `root`)
//! - [`Selector`] / [`find_all`]: element lookup
//!
//! # Example
//!
//! ```rust
//! use trimlib_markup::{NodeExt, Selector, find_all, parse_document};
//!
//! let doc = parse_document(r#"<body><x:hello who="you"/></body>"#).unwrap();
//! let selector = Selector::parse("x:hello").unwrap();
//! let hello = &find_all(&doc, &selector)[0];
//! assert_eq!(hello.attr("who").as_deref(), Some("you"));
//!
//! hello.replace_with_html("<p>Hello, you!</p>").unwrap();
//! assert_eq!(doc.inner_html(), "<body><p>Hello, you!</p></body>");
//! ```

pub mod error;
pub mod node;
pub mod parser;
pub mod selector;
pub mod serialize;

pub use error::{MarkupError, Result, SelectorError};
pub use node::{Attribute, Node, NodeData, NodeExt, NodeRef};
pub use parser::{parse_document, parse_fragment};
pub use selector::{Selector, find_all};
pub use serialize::escape_markup;
