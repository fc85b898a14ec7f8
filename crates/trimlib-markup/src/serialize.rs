/*
 * serialize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Markup serialization.
//!
//! Output is XHTML-flavoured: void elements are self-closed (`<br/>`), every
//! other element gets an explicit end tag, and the contents of raw-text
//! elements are written verbatim.

use std::borrow::Cow;

use quick_xml::escape::{escape, partial_escape};

use crate::node::{Node, NodeData, is_raw_text_element, is_void_element};

/// Escape text so it can be spliced into markup as content or as a quoted
/// attribute value.
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    escape(text)
}

/// Serialize a node including its own tag.
pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, false, &mut out);
    out
}

/// Serialize only the children of a node.
pub fn serialize_children(node: &Node) -> String {
    let raw = node.name().is_some_and(is_raw_text_element);
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, raw, &mut out);
    }
    out
}

fn write_node(node: &Node, raw_text: bool, out: &mut String) {
    match node.data() {
        NodeData::Fragment => {
            for child in node.children() {
                write_node(&child, false, out);
            }
        }
        NodeData::Text { contents } => {
            let contents = contents.borrow();
            if raw_text {
                out.push_str(&contents);
            } else {
                out.push_str(&partial_escape(contents.as_str()));
            }
        }
        NodeData::Comment { contents } => {
            out.push_str("<!--");
            out.push_str(contents);
            out.push_str("-->");
        }
        NodeData::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for attr in attributes.borrow().iter() {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }

            if is_void_element(name) && !node.has_children() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            let raw = is_raw_text_element(name);
            for child in node.children() {
                write_node(&child, raw, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{Attribute, Node, NodeExt};
    use crate::parse_fragment;

    #[test]
    fn test_escape_markup() {
        assert_eq!(super::escape_markup("plain"), "plain");
        assert_eq!(
            super::escape_markup(r#"a < b & "c""#),
            "a &lt; b &amp; &quot;c&quot;"
        );
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let p = Node::new_element("p", vec![Attribute::new("title", "a \"b\" & c")]);
        p.append(Node::new_text("1 < 2 & 3"));
        assert_eq!(
            p.outer_html(),
            r#"<p title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn test_raw_text_written_verbatim() {
        let fragment = parse_fragment("<script>if (a < b) {}</script>").unwrap();
        assert_eq!(fragment.inner_html(), "<script>if (a < b) {}</script>");
        assert_eq!(fragment.children()[0].inner_html(), "if (a < b) {}");
    }

    #[test]
    fn test_round_trip_keeps_structure() {
        let markup = r#"<ul class="list"><li>one</li><li><b>two</b></li></ul><hr/>"#;
        let fragment = parse_fragment(markup).unwrap();
        insta::assert_snapshot!(fragment.inner_html(), @r#"<ul class="list"><li>one</li><li><b>two</b></li></ul><hr/>"#);
    }
}
