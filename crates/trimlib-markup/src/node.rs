/*
 * node.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Reference-counted markup tree.
//!
//! Nodes are shared through [`NodeRef`] (`Rc<Node>`). Children are owned by
//! their parent; the parent link is weak, so a detached subtree is freed as
//! soon as the last outside handle is dropped. All mutation goes through
//! interior mutability, which lets callers keep handles to nodes while the
//! tree around them is rewritten.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::parser::parse_fragment;
use crate::serialize::{serialize_children, serialize_node};

/// Shared handle to a node.
pub type NodeRef = Rc<Node>;

/// Elements whose content is raw text (no nested markup).
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea"];

/// HTML void elements; they never have children and need no end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Check whether `name` is a raw-text element (case-insensitive).
pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(name))
}

/// Check whether `name` is a void element (case-insensitive).
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// A single attribute, value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The payload of a node.
#[derive(Debug)]
pub enum NodeData {
    /// Container for top-level nodes of a parsed fragment or document.
    Fragment,

    /// An element with a tag name (prefix included, case preserved).
    Element {
        name: String,
        attributes: RefCell<Vec<Attribute>>,
    },

    /// Character data (already unescaped).
    Text { contents: RefCell<String> },

    /// A comment, kept so documents round-trip.
    Comment { contents: String },
}

/// A node in the markup tree.
pub struct Node {
    data: NodeData,
    parent: RefCell<Option<Weak<Node>>>,
    children: RefCell<Vec<NodeRef>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("data", &self.data)
            .field("children", &self.children.borrow().len())
            .finish()
    }
}

impl Node {
    fn new(data: NodeData) -> NodeRef {
        Rc::new(Node {
            data,
            parent: RefCell::new(None),
            children: RefCell::new(Vec::new()),
        })
    }

    /// Create an empty fragment container.
    pub fn new_fragment() -> NodeRef {
        Node::new(NodeData::Fragment)
    }

    /// Create a detached element.
    pub fn new_element(name: impl Into<String>, attributes: Vec<Attribute>) -> NodeRef {
        Node::new(NodeData::Element {
            name: name.into(),
            attributes: RefCell::new(attributes),
        })
    }

    /// Create a detached text node.
    pub fn new_text(contents: impl Into<String>) -> NodeRef {
        Node::new(NodeData::Text {
            contents: RefCell::new(contents.into()),
        })
    }

    /// Create a detached comment node.
    pub fn new_comment(contents: impl Into<String>) -> NodeRef {
        Node::new(NodeData::Comment {
            contents: contents.into(),
        })
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.data, NodeData::Fragment)
    }

    /// Tag name of an element, `None` for other node kinds.
    pub fn name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Case-insensitive tag name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name().is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    /// Attribute value by name. Attribute names compare case-insensitively.
    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes
                .borrow()
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(name))
                .map(|a| a.value.clone()),
            _ => None,
        }
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> Vec<Attribute> {
        match &self.data {
            NodeData::Element { attributes, .. } => attributes.borrow().clone(),
            _ => Vec::new(),
        }
    }

    /// Set (or add) an attribute. No-op on non-elements.
    pub fn set_attr(&self, name: &str, value: impl Into<String>) {
        if let NodeData::Element { attributes, .. } = &self.data {
            let mut attributes = attributes.borrow_mut();
            let value = value.into();
            match attributes
                .iter_mut()
                .find(|a| a.name.eq_ignore_ascii_case(name))
            {
                Some(existing) => existing.value = value,
                None => attributes.push(Attribute::new(name, value)),
            }
        }
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Snapshot of the direct children.
    pub fn children(&self) -> Vec<NodeRef> {
        self.children.borrow().clone()
    }

    /// Snapshot of the direct element children.
    pub fn element_children(&self) -> Vec<NodeRef> {
        self.children
            .borrow()
            .iter()
            .filter(|c| c.is_element())
            .cloned()
            .collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children.borrow().is_empty()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize the children of this node.
    pub fn inner_html(&self) -> String {
        serialize_children(self)
    }

    /// Serialize this node and its children.
    pub fn outer_html(&self) -> String {
        serialize_node(self)
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// Operations that need the owning `Rc` of a node.
pub trait NodeExt {
    /// Append `child` as the last child, detaching it from any previous parent.
    fn append(&self, child: NodeRef);

    /// Remove this node from its parent. No-op when already detached.
    fn detach(&self);

    /// Top-most ancestor (the node itself when detached).
    fn root(&self) -> NodeRef;

    /// All descendants in document order, excluding this node.
    fn descendants(&self) -> Vec<NodeRef>;

    /// True when `ancestor` is a proper ancestor of this node.
    fn is_descendant_of(&self, ancestor: &NodeRef) -> bool;

    /// Replace all children with the nodes parsed from `markup`.
    fn set_inner_html(&self, markup: &str) -> Result<()>;

    /// Replace this node in its parent with the nodes parsed from `markup`.
    ///
    /// Returns the inserted nodes. When the node is detached nothing happens
    /// and an empty list is returned.
    fn replace_with_html(&self, markup: &str) -> Result<Vec<NodeRef>>;
}

impl NodeExt for NodeRef {
    fn append(&self, child: NodeRef) {
        child.detach();
        *child.parent.borrow_mut() = Some(Rc::downgrade(self));
        self.children.borrow_mut().push(child);
    }

    fn detach(&self) {
        let parent = self.parent.borrow_mut().take().and_then(|w| w.upgrade());
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(c, self));
        }
    }

    fn root(&self) -> NodeRef {
        let mut current = Rc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeRef> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    fn is_descendant_of(&self, ancestor: &NodeRef) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if Rc::ptr_eq(&node, ancestor) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    fn set_inner_html(&self, markup: &str) -> Result<()> {
        let fragment = parse_fragment(markup)?;
        for child in self.children() {
            child.detach();
        }
        for child in fragment.children() {
            self.append(child);
        }
        Ok(())
    }

    fn replace_with_html(&self, markup: &str) -> Result<Vec<NodeRef>> {
        let Some(parent) = self.parent() else {
            return Ok(Vec::new());
        };
        let fragment = parse_fragment(markup)?;
        let inserted = fragment.children();

        let mut siblings = parent.children.borrow_mut();
        let Some(index) = siblings.iter().position(|c| Rc::ptr_eq(c, self)) else {
            return Ok(Vec::new());
        };
        siblings.remove(index);
        for (offset, node) in inserted.iter().enumerate() {
            *node.parent.borrow_mut() = Some(Rc::downgrade(&parent));
            siblings.insert(index + offset, Rc::clone(node));
        }
        drop(siblings);

        // The fragment still lists the moved nodes; empty it so it does not
        // keep them alive or claim them.
        fragment.children.borrow_mut().clear();
        *self.parent.borrow_mut() = None;
        Ok(inserted)
    }
}
