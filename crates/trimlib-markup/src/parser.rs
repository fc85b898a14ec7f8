/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Fragment parser that builds [`NodeRef`] trees from markup.
//!
//! The input is XHTML-style markup with a few HTML conveniences: void
//! elements (`<br>`, `<link ...>`) need no end tag, raw-text elements
//! (`<textarea>`, `<script>`, `<style>`) keep their content as text, a handful
//! of common named entities are understood, and attributes may be unquoted or
//! valueless. Any number of top-level nodes is accepted.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::QName;

use crate::error::{MarkupError, Result};
use crate::node::{Attribute, Node, NodeExt, NodeRef, is_raw_text_element, is_void_element};

/// Parse markup into a fragment node whose children are the top-level nodes.
///
/// # Example
///
/// ```rust
/// use trimlib_markup::parse_fragment;
///
/// let fragment = parse_fragment("<p>Hello</p><br>").unwrap();
/// assert_eq!(fragment.children().len(), 2);
/// assert_eq!(fragment.inner_html(), "<p>Hello</p><br/>");
/// ```
///
/// # Errors
///
/// Returns an error if the markup is malformed (mismatched or unclosed tags,
/// invalid syntax).
pub fn parse_fragment(markup: &str) -> Result<NodeRef> {
    let mut parser = FragmentParser::new(markup);
    parser.parse()
}

/// Parse a whole document.
///
/// Documents are parsed exactly like fragments; the returned node is the
/// container of the top-level nodes, so prologs and multiple roots are fine.
pub fn parse_document(markup: &str) -> Result<NodeRef> {
    parse_fragment(markup)
}

/// Internal parser state.
struct FragmentParser<'a> {
    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// The input the reader was built from.
    source: &'a str,

    /// Open elements; the bottom entry is the fragment itself.
    stack: Vec<NodeRef>,
}

impl<'a> FragmentParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;
        // End tags are matched here so void elements can be handled.
        reader.config_mut().check_end_names = false;

        Self {
            reader,
            source,
            stack: vec![Node::new_fragment()],
        }
    }

    fn parse(&mut self) -> Result<NodeRef> {
        loop {
            let event_start = self.reader.buffer_position();

            match self.reader.read_event() {
                Ok(Event::Start(e)) => self.handle_start(e, event_start)?,
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    self.handle_end(&name, event_start)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.make_element(&e, event_start)?;
                    self.current().append(element);
                }
                Ok(Event::Text(e)) => {
                    let text = unescape_text(&e);
                    self.push_text(&text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.push_text(&text);
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.current().append(Node::new_comment(text));
                }
                Ok(Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {
                    // Prologs carry nothing the tree needs
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(MarkupError::Syntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if self.stack.len() > 1 {
            let open = self.current();
            return Err(MarkupError::UnclosedElement {
                name: open.name().unwrap_or_default().to_string(),
            });
        }

        Ok(self.stack.remove(0))
    }

    fn current(&self) -> NodeRef {
        // The fragment is never popped, so the stack is never empty.
        self.stack[self.stack.len() - 1].clone()
    }

    fn handle_start(&mut self, e: BytesStart<'_>, event_start: u64) -> Result<()> {
        let element = self.make_element(&e, event_start)?;
        let name = element.name().unwrap_or_default().to_string();
        self.current().append(element.clone());

        if is_void_element(&name) {
            return Ok(());
        }

        if is_raw_text_element(&name) {
            let end = self
                .raw_text_end_name(&name)
                .unwrap_or_else(|| e.name().as_ref().to_vec());
            let raw = self
                .reader
                .read_text(QName(&end))
                .map_err(|err| MarkupError::Syntax {
                    message: format!("Unterminated <{}>: {}", name, err),
                    position: Some(event_start),
                })?;
            if !raw.is_empty() {
                element.append(Node::new_text(decode_entities(&raw)));
            }
            return Ok(());
        }

        self.stack.push(element);
        Ok(())
    }

    /// The name of the end tag closing the raw-text element `name`, spelled
    /// as in the source. End tags match in any case.
    fn raw_text_end_name(&self, name: &str) -> Option<Vec<u8>> {
        let start = usize::try_from(self.reader.buffer_position()).ok()?;
        let rest = self.source.get(start..)?;
        let lower = rest.to_ascii_lowercase();
        let needle = format!("</{}", name.to_ascii_lowercase());

        let mut from = 0;
        while let Some(found) = lower[from..].find(&needle) {
            let at = from + found;
            let after = at + needle.len();
            // `</textarea>` or `</textarea >`, not `</textareas>`
            if lower[after..].starts_with(|c: char| c == '>' || c.is_ascii_whitespace()) {
                return Some(rest.as_bytes()[at + 2..after].to_vec());
            }
            from = after;
        }
        None
    }

    fn handle_end(&mut self, name: &str, event_start: u64) -> Result<()> {
        if is_void_element(name) {
            // `<br></br>` style end tags for void elements are ignored
            return Ok(());
        }

        if self.stack.len() == 1 {
            return Err(MarkupError::UnexpectedEndTag {
                found: name.to_string(),
                position: Some(event_start),
            });
        }

        let open = self.current();
        let expected = open.name().unwrap_or_default();
        if !expected.eq_ignore_ascii_case(name) {
            return Err(MarkupError::MismatchedEndTag {
                expected: expected.to_string(),
                found: name.to_string(),
                position: Some(event_start),
            });
        }

        self.stack.pop();
        Ok(())
    }

    fn make_element(&self, e: &BytesStart<'_>, event_start: u64) -> Result<NodeRef> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let attributes = parse_attributes(e, event_start)?;
        Ok(Node::new_element(name, attributes))
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let current = self.current();
        // Adjacent text (e.g. text followed by CDATA) collapses into one node
        if let Some(last) = current.children().last() {
            if let crate::NodeData::Text { contents } = last.data() {
                contents.borrow_mut().push_str(text);
                return;
            }
        }
        current.append(Node::new_text(text));
    }
}

fn parse_attributes(e: &BytesStart<'_>, tag_start: u64) -> Result<Vec<Attribute>> {
    let mut attributes = Vec::new();

    for attr_result in e.html_attributes() {
        let attr = attr_result.map_err(|err| MarkupError::Syntax {
            message: format!("Attribute error: {}", err),
            position: Some(tag_start),
        })?;

        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        attributes.push(Attribute {
            name,
            value: decode_entities(&raw),
        });
    }

    Ok(attributes)
}

fn unescape_text(e: &BytesText<'_>) -> String {
    let raw = String::from_utf8_lossy(e.as_ref());
    decode_entities(&raw)
}

/// Unescape XML and common HTML entities. Text with an unknown entity is kept verbatim.
fn decode_entities(raw: &str) -> String {
    match unescape_with(raw, resolve_html_entity) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => raw.to_string(),
    }
}

fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    let resolved = match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "hellip" => "\u{2026}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "middot" => "\u{b7}",
        "times" => "\u{d7}",
        _ => return None,
    };
    Some(resolved)
}
