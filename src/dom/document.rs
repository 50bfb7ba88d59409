//! Document - per-thread arena of markup nodes.
//!
//! Nodes are addressed by [`NodeId`] and live in one append-only arena per
//! thread. An id stays valid until [`reset_document`]; detached nodes keep
//! their subtree and can be reattached (the `if` directive relies on this).
//!
//! # Tree Operations
//!
//! ```text
//! append_child(parent, child)          child moves to the end of parent
//! insert_before(parent, child, refn)   child moves before refn (or to the end)
//! replace_with(old, new)               new takes old's position, old detached
//! remove(node)                         detach from parent
//! ```
//!
//! Inserting a fragment moves its children instead of the fragment itself.
//! Moving a node always detaches it from its previous parent first.

use std::cell::RefCell;
use std::fmt;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::{Error, Result};

// =============================================================================
// Types
// =============================================================================

/// Handle to a node in the current thread's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Fragment,
}

bitflags! {
    /// Per-node runtime state that is never cloned.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// The user is typing into a `model`-bound field.
        const TYPING = 1 << 0;
        /// Owned by a structural directive (an `else` branch); the compiler skips it.
        const CLAIMED = 1 << 1;
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    /// Lowercase tag name for elements, empty otherwise.
    tag: String,
    attributes: IndexMap<String, String>,
    /// Character data of text and comment nodes.
    data: String,
    /// Current value of form fields.
    value: String,
    flags: NodeFlags,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            attributes: IndexMap::new(),
            data: String::new(),
            value: String::new(),
            flags: NodeFlags::empty(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes.get_mut(id.0).ok_or(Error::UnknownNode(id.0))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(node.0).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Insert `child` into `parent` at `position` (end when `None`).
    fn insert(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        let parent_kind = self.node(parent)?.kind;
        if !matches!(parent_kind, NodeKind::Element | NodeKind::Fragment) {
            return Err(Error::type_error(format!("node {parent} cannot have children")));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(Error::type_error(format!(
                "cannot insert {child} into its own subtree"
            )));
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(Error::type_error(format!(
                    "{reference} is not a child of {parent}"
                )));
            }
        }

        let moving = if self.node(child)?.kind == NodeKind::Fragment {
            let moving = std::mem::take(&mut self.node_mut(child)?.children);
            for &node in &moving {
                self.node_mut(node)?.parent = None;
            }
            moving
        } else {
            self.detach(child)?;
            vec![child]
        };

        for &node in &moving {
            self.node_mut(node)?.parent = Some(parent);
        }
        let siblings = &mut self.node_mut(parent)?.children;
        let at = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.splice(at..at, moving);
        Ok(())
    }

    fn clone_subtree(&mut self, id: NodeId, deep: bool) -> Result<NodeId> {
        let source = self.node(id)?;
        let copy = NodeData {
            parent: None,
            children: Vec::new(),
            flags: NodeFlags::empty(),
            ..source.clone()
        };
        let children = if deep { source.children.clone() } else { Vec::new() };

        let clone = self.alloc(copy);
        for child in children {
            let child_clone = self.clone_subtree(child, true)?;
            self.node_mut(child_clone)?.parent = Some(clone);
            self.node_mut(clone)?.children.push(child_clone);
        }
        Ok(clone)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else { return };
        match node.kind {
            NodeKind::Text => out.push_str(&node.data),
            NodeKind::Comment => {}
            NodeKind::Element | NodeKind::Fragment => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

thread_local! {
    static DOCUMENT: RefCell<Document> = RefCell::new(Document::default());
}

fn with_doc<R>(f: impl FnOnce(&Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&doc.borrow()))
}

fn with_doc_mut<R>(f: impl FnOnce(&mut Document) -> R) -> R {
    DOCUMENT.with(|doc| f(&mut doc.borrow_mut()))
}

// =============================================================================
// Creation
// =============================================================================

pub fn create_element(tag: &str) -> NodeId {
    let mut data = NodeData::new(NodeKind::Element);
    data.tag = tag.to_ascii_lowercase();
    with_doc_mut(|doc| doc.alloc(data))
}

pub fn create_text(text: &str) -> NodeId {
    let mut data = NodeData::new(NodeKind::Text);
    data.data = text.to_string();
    with_doc_mut(|doc| doc.alloc(data))
}

pub fn create_comment(text: &str) -> NodeId {
    let mut data = NodeData::new(NodeKind::Comment);
    data.data = text.to_string();
    with_doc_mut(|doc| doc.alloc(data))
}

pub fn create_fragment() -> NodeId {
    with_doc_mut(|doc| doc.alloc(NodeData::new(NodeKind::Fragment)))
}

/// Copy of `node`, with its whole subtree when `deep`. Attributes, text and
/// input values are copied; flags and event listeners are not.
pub fn clone_node(node: NodeId, deep: bool) -> Result<NodeId> {
    with_doc_mut(|doc| doc.clone_subtree(node, deep))
}

/// Drop every node of the current thread's document (for testing).
pub fn reset_document() {
    with_doc_mut(|doc| doc.nodes.clear());
    super::events::reset_listeners();
}

/// Number of nodes ever created since the last reset.
pub fn node_count() -> usize {
    with_doc(|doc| doc.nodes.len())
}

// =============================================================================
// Navigation
// =============================================================================

pub fn kind(node: NodeId) -> Option<NodeKind> {
    with_doc(|doc| doc.node(node).ok().map(|n| n.kind))
}

pub fn is_element(node: NodeId) -> bool {
    kind(node) == Some(NodeKind::Element)
}

/// Lowercase tag name of an element.
pub fn tag_name(node: NodeId) -> Option<String> {
    with_doc(|doc| {
        doc.node(node)
            .ok()
            .filter(|n| n.kind == NodeKind::Element)
            .map(|n| n.tag.clone())
    })
}

pub fn parent(node: NodeId) -> Option<NodeId> {
    with_doc(|doc| doc.node(node).ok().and_then(|n| n.parent))
}

/// Snapshot of the child list.
pub fn children(node: NodeId) -> Vec<NodeId> {
    with_doc(|doc| doc.node(node).map(|n| n.children.clone()).unwrap_or_default())
}

pub fn first_child(node: NodeId) -> Option<NodeId> {
    with_doc(|doc| doc.node(node).ok().and_then(|n| n.children.first().copied()))
}

fn sibling_after(doc: &Document, node: NodeId) -> Option<(usize, Vec<NodeId>)> {
    let parent = doc.node(node).ok()?.parent?;
    let siblings = doc.node(parent).ok()?.children.clone();
    let at = siblings.iter().position(|&c| c == node)?;
    Some((at, siblings))
}

pub fn next_sibling(node: NodeId) -> Option<NodeId> {
    with_doc(|doc| {
        let (at, siblings) = sibling_after(doc, node)?;
        siblings.get(at + 1).copied()
    })
}

pub fn previous_sibling(node: NodeId) -> Option<NodeId> {
    with_doc(|doc| {
        let (at, siblings) = sibling_after(doc, node)?;
        at.checked_sub(1).and_then(|i| siblings.get(i).copied())
    })
}

/// The next sibling that is an element, skipping text and comments.
pub fn next_element_sibling(node: NodeId) -> Option<NodeId> {
    with_doc(|doc| {
        let (at, siblings) = sibling_after(doc, node)?;
        siblings[at + 1..]
            .iter()
            .copied()
            .find(|&s| doc.node(s).is_ok_and(|n| n.kind == NodeKind::Element))
    })
}

/// Whether `node` is `ancestor` or lies inside its subtree.
pub fn contains(ancestor: NodeId, node: NodeId) -> bool {
    with_doc(|doc| doc.is_inclusive_ancestor(ancestor, node))
}

// =============================================================================
// Mutation
// =============================================================================

pub fn append_child(parent: NodeId, child: NodeId) -> Result<()> {
    with_doc_mut(|doc| doc.insert(parent, child, None))
}

/// Insert `child` before `reference`, or at the end when `reference` is `None`.
pub fn insert_before(parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
    with_doc_mut(|doc| doc.insert(parent, child, reference))
}

/// Insert `node` right before `reference` in `reference`'s parent.
/// No-op when `reference` is detached.
pub fn insert_before_node(reference: NodeId, node: NodeId) -> Result<()> {
    with_doc_mut(|doc| match doc.node(reference)?.parent {
        Some(parent) => doc.insert(parent, node, Some(reference)),
        None => Ok(()),
    })
}

/// Put `new` where `old` is and detach `old`. No-op when `old` is detached.
pub fn replace_with(old: NodeId, new: NodeId) -> Result<()> {
    with_doc_mut(|doc| {
        let Some(parent) = doc.node(old)?.parent else {
            doc.node(new)?;
            return Ok(());
        };
        if old == new {
            return Ok(());
        }
        doc.insert(parent, new, Some(old))?;
        doc.detach(old)
    })
}

/// Detach `node` from its parent. No-op when already detached.
pub fn remove(node: NodeId) -> Result<()> {
    with_doc_mut(|doc| doc.detach(node))
}

// =============================================================================
// Attributes
// =============================================================================

pub fn get_attribute(node: NodeId, name: &str) -> Option<String> {
    with_doc(|doc| doc.node(node).ok().and_then(|n| n.attributes.get(name).cloned()))
}

pub fn has_attribute(node: NodeId, name: &str) -> bool {
    with_doc(|doc| doc.node(node).is_ok_and(|n| n.attributes.contains_key(name)))
}

pub fn set_attribute(node: NodeId, name: &str, value: &str) -> Result<()> {
    with_doc_mut(|doc| {
        let data = doc.node_mut(node)?;
        if data.kind != NodeKind::Element {
            return Err(Error::type_error(format!("{node} is not an element")));
        }
        data.attributes.insert(name.to_string(), value.to_string());
        Ok(())
    })
}

/// Remove an attribute, keeping the order of the others.
pub fn remove_attribute(node: NodeId, name: &str) -> Result<()> {
    with_doc_mut(|doc| {
        doc.node_mut(node)?.attributes.shift_remove(name);
        Ok(())
    })
}

/// Snapshot of `(name, value)` pairs in document order.
pub fn attributes(node: NodeId) -> Vec<(String, String)> {
    with_doc(|doc| {
        doc.node(node)
            .map(|n| {
                n.attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    })
}

// =============================================================================
// Text & values
// =============================================================================

/// Character data of a text or comment node.
pub fn text(node: NodeId) -> String {
    with_doc(|doc| doc.node(node).map(|n| n.data.clone()).unwrap_or_default())
}

/// Concatenated text of `node` and its descendants.
pub fn text_content(node: NodeId) -> String {
    with_doc(|doc| {
        let mut out = String::new();
        doc.collect_text(node, &mut out);
        out
    })
}

/// DOM `textContent` setter: character data for text/comment nodes; for
/// elements and fragments the children are replaced by one text node (none
/// when `text` is empty).
pub fn set_text_content(node: NodeId, text: &str) -> Result<()> {
    with_doc_mut(|doc| {
        match doc.node(node)?.kind {
            NodeKind::Text | NodeKind::Comment => {
                doc.node_mut(node)?.data = text.to_string();
            }
            NodeKind::Element | NodeKind::Fragment => {
                let old = std::mem::take(&mut doc.node_mut(node)?.children);
                for child in old {
                    doc.node_mut(child)?.parent = None;
                }
                if !text.is_empty() {
                    let mut data = NodeData::new(NodeKind::Text);
                    data.data = text.to_string();
                    data.parent = Some(node);
                    let child = doc.alloc(data);
                    doc.node_mut(node)?.children.push(child);
                }
            }
        }
        Ok(())
    })
}

/// Current value of a form field.
pub fn value(node: NodeId) -> String {
    with_doc(|doc| doc.node(node).map(|n| n.value.clone()).unwrap_or_default())
}

pub fn set_value(node: NodeId, value: &str) -> Result<()> {
    with_doc_mut(|doc| {
        doc.node_mut(node)?.value = value.to_string();
        Ok(())
    })
}

// =============================================================================
// Flags
// =============================================================================

pub fn flags(node: NodeId) -> NodeFlags {
    with_doc(|doc| doc.node(node).map(|n| n.flags).unwrap_or_default())
}

pub fn has_flag(node: NodeId, flag: NodeFlags) -> bool {
    flags(node).contains(flag)
}

pub fn set_flag(node: NodeId, flag: NodeFlags, on: bool) -> Result<()> {
    with_doc_mut(|doc| {
        doc.node_mut(node)?.flags.set(flag, on);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (NodeId, NodeId, NodeId, NodeId) {
        reset_document();
        let root = create_element("DIV");
        let a = create_element("span");
        let b = create_text("b");
        let c = create_element("p");
        for node in [a, b, c] {
            append_child(root, node).unwrap();
        }
        (root, a, b, c)
    }

    #[test]
    fn test_append_and_navigation() {
        let (root, a, b, c) = setup();
        assert_eq!(tag_name(root).as_deref(), Some("div"));
        assert_eq!(children(root), vec![a, b, c]);
        assert_eq!(next_sibling(a), Some(b));
        assert_eq!(previous_sibling(c), Some(b));
        assert_eq!(next_element_sibling(a), Some(c));
        assert_eq!(parent(b), Some(root));
    }

    #[test]
    fn test_replace_keeps_position() {
        let (root, a, b, c) = setup();
        let anchor = create_text("");
        replace_with(b, anchor).unwrap();
        assert_eq!(children(root), vec![a, anchor, c]);
        assert_eq!(parent(b), None);

        replace_with(anchor, b).unwrap();
        assert_eq!(children(root), vec![a, b, c]);

        // Detached old node: nothing happens.
        replace_with(anchor, c).unwrap();
        assert_eq!(children(root), vec![a, b, c]);
    }

    #[test]
    fn test_fragment_insertion_moves_children() {
        let (root, a, _b, _c) = setup();
        let fragment = create_fragment();
        let x = create_text("x");
        let y = create_text("y");
        append_child(fragment, x).unwrap();
        append_child(fragment, y).unwrap();

        insert_before(root, fragment, Some(a)).unwrap();
        assert_eq!(&children(root)[..2], &[x, y]);
        assert!(children(fragment).is_empty());
    }

    #[test]
    fn test_hierarchy_errors() {
        let (root, a, b, _c) = setup();
        assert!(append_child(a, root).is_err());
        assert!(append_child(b, a).is_err());
        assert_eq!(
            append_child(root, NodeId(9999)).unwrap_err(),
            Error::UnknownNode(9999)
        );
    }

    #[test]
    fn test_text_content() {
        let (root, a, _b, _c) = setup();
        set_text_content(a, "hello ").unwrap();
        assert_eq!(text_content(root), "hello b");
        set_text_content(a, "").unwrap();
        assert!(children(a).is_empty());
    }

    #[test]
    fn test_deep_clone_copies_content_not_flags() {
        let (root, a, _b, _c) = setup();
        set_attribute(a, "class", "x").unwrap();
        set_text_content(a, "inner").unwrap();
        set_flag(a, NodeFlags::TYPING, true).unwrap();

        let copy = clone_node(root, true).unwrap();
        assert_ne!(copy, root);
        let copy_a = children(copy)[0];
        assert_eq!(get_attribute(copy_a, "class").as_deref(), Some("x"));
        assert_eq!(text_content(copy_a), "inner");
        assert!(flags(copy_a).is_empty());
        assert_eq!(parent(copy), None);

        let shallow = clone_node(root, false).unwrap();
        assert!(children(shallow).is_empty());
    }

    #[test]
    fn test_attributes_keep_order() {
        let (_root, a, _b, _c) = setup();
        set_attribute(a, "one", "1").unwrap();
        set_attribute(a, "two", "2").unwrap();
        set_attribute(a, "three", "3").unwrap();
        remove_attribute(a, "two").unwrap();
        let names: Vec<_> = attributes(a).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["one", "three"]);
    }
}
