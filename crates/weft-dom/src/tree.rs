//! DOM tree (arena-based allocation)
//!
//! All nodes live in one vector and are addressed by `NodeId`. Removal
//! detaches a subtree but keeps its nodes in the arena, so IDs held by
//! callers (templates, temporaries, event tables) never dangle.

use crate::node::{ElementData, Node, NodeData, TextData};
use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Node not found
    NotFound,
    /// Hierarchy error (e.g. inserting a node into its own subtree)
    HierarchyRequest,
    /// Operation not defined for this node type
    InvalidNodeType,
    /// Node has no parent
    NotAChild,
    /// Child index past the end of the child list
    IndexOutOfBounds,
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "node not found"),
            Self::HierarchyRequest => write!(f, "hierarchy request error"),
            Self::InvalidNodeType => write!(f, "operation not valid for this node type"),
            Self::NotAChild => write!(f, "node has no parent"),
            Self::IndexOutOfBounds => write!(f, "child index out of bounds"),
        }
    }
}

impl std::error::Error for DomError {}

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_valid() {
            self.nodes.get(id.index())
        } else {
            None
        }
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_valid() {
            self.nodes.get_mut(id.index())
        } else {
            None
        }
    }

    /// Number of nodes in the arena, detached subtrees included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds only the document node
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound)
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.get_mut(id).ok_or(DomError::NotFound)
    }

    fn element(&self, id: NodeId) -> DomResult<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Ok(el),
            _ => Err(DomError::InvalidNodeType),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> DomResult<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Ok(el),
            _ => Err(DomError::InvalidNodeType),
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(tag_name, None)))
    }

    /// Create a detached element in the given namespace
    pub fn create_element_ns(&mut self, namespace: &str, tag_name: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(
            tag_name,
            Some(namespace),
        )))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(TextData {
            content: content.to_string(),
        }))
    }

    /// Unlink a node from its parent, if it has one
    fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let parent = self.node(id)?.parent;
        if parent.is_valid() {
            let siblings = &mut self.node_mut(parent)?.children;
            siblings.retain(|&c| c != id);
            self.node_mut(id)?.parent = NodeId::NONE;
        }
        Ok(())
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        match self.node(child)?.data {
            NodeData::Document => return Err(DomError::HierarchyRequest),
            NodeData::Element(_) | NodeData::Text(_) => {}
        }
        if let NodeData::Text(_) = self.node(parent)?.data {
            return Err(DomError::HierarchyRequest);
        }
        // Reject cycles: the parent must not live inside the child.
        let mut cursor = parent;
        while cursor.is_valid() {
            if cursor == child {
                return Err(DomError::HierarchyRequest);
            }
            cursor = self.node(cursor)?.parent;
        }
        Ok(())
    }

    /// Append a child as the parent's last child, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insertion(parent, child)?;
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = parent;
        Ok(())
    }

    /// Insert `new` into `parent` immediately before `reference`.
    /// Returns the index `new` ends up at.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new: NodeId,
        reference: NodeId,
    ) -> DomResult<usize> {
        self.check_insertion(parent, new)?;
        if !self.node(parent)?.children.contains(&reference) {
            return Err(DomError::NotAChild);
        }
        // Detach before indexing: moving an earlier sibling shifts the
        // reference's position.
        self.detach(new)?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == reference)
            .ok_or(DomError::NotAChild)?;
        self.node_mut(parent)?.children.insert(index, new);
        self.node_mut(new)?.parent = parent;
        Ok(index)
    }

    /// Replace `old` with `new` in `old`'s parent. `old` ends up detached.
    /// Returns the index the replacement took over.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> DomResult<usize> {
        let parent = self.node(old)?.parent;
        if !parent.is_valid() {
            return Err(DomError::NotAChild);
        }
        self.check_insertion(parent, new)?;
        self.detach(new)?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or(DomError::NotAChild)?;
        self.node_mut(parent)?.children[index] = new;
        self.node_mut(new)?.parent = parent;
        self.node_mut(old)?.parent = NodeId::NONE;
        Ok(index)
    }

    /// Detach a node from the tree. Detached nodes are a no-op.
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        self.detach(id)
    }

    /// First child, or `NodeId::NONE`
    pub fn first_child(&self, id: NodeId) -> DomResult<NodeId> {
        Ok(self.node(id)?.children.first().copied().unwrap_or(NodeId::NONE))
    }

    /// Next sibling, or `NodeId::NONE`
    pub fn next_sibling(&self, id: NodeId) -> DomResult<NodeId> {
        let parent = self.node(id)?.parent;
        if !parent.is_valid() {
            return Ok(NodeId::NONE);
        }
        let siblings = &self.node(parent)?.children;
        let position = siblings
            .iter()
            .position(|&c| c == id)
            .ok_or(DomError::NotAChild)?;
        Ok(siblings.get(position + 1).copied().unwrap_or(NodeId::NONE))
    }

    /// The n-th child
    pub fn child(&self, parent: NodeId, n: usize) -> DomResult<NodeId> {
        self.node(parent)?
            .children
            .get(n)
            .copied()
            .ok_or(DomError::IndexOutOfBounds)
    }

    /// Number of children
    pub fn child_count(&self, parent: NodeId) -> DomResult<usize> {
        Ok(self.node(parent)?.children.len())
    }

    /// Index of a node within its parent's child list, `None` while detached
    pub fn position(&self, id: NodeId) -> DomResult<Option<usize>> {
        let parent = self.node(id)?.parent;
        if !parent.is_valid() {
            return Ok(None);
        }
        Ok(self.node(parent)?.children.iter().position(|&c| c == id))
    }

    /// Clone a node. A deep clone copies the whole subtree; either way the
    /// clone is detached.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let data = self.node(id)?.data.clone();
        if let NodeData::Document = data {
            return Err(DomError::InvalidNodeType);
        }
        let clone = self.alloc(data);
        if deep {
            let children = self.node(id)?.children.clone();
            for child in children {
                let child_clone = self.clone_node(child, true)?;
                self.node_mut(clone)?.children.push(child_clone);
                self.node_mut(child_clone)?.parent = clone;
            }
        }
        Ok(clone)
    }

    /// Set the text content of a node. On a text node this rewrites the
    /// content; on an element it detaches all children and inserts a single
    /// new text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) => {
                t.content.clear();
                t.content.push_str(text);
                Ok(())
            }
            NodeData::Element(_) => {
                let children = std::mem::take(&mut self.node_mut(id)?.children);
                for child in children {
                    self.node_mut(child)?.parent = NodeId::NONE;
                }
                let text_node = self.create_text(text);
                self.node_mut(id)?.children.push(text_node);
                self.node_mut(text_node)?.parent = id;
                Ok(())
            }
            NodeData::Document => Err(DomError::InvalidNodeType),
        }
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self, id: NodeId) -> DomResult<String> {
        let mut out = String::new();
        self.collect_text(id, &mut out)?;
        Ok(out)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) -> DomResult<()> {
        let node = self.node(id)?;
        if let Some(text) = node.as_text() {
            out.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, out)?;
        }
        Ok(())
    }

    /// Set an attribute, mirroring volatile attributes into their live
    /// properties (`value`, `checked`, `selected`).
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let el = self.element_mut(id)?;
        match el.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => {
                v.clear();
                v.push_str(value);
            }
            None => el.attributes.push((name.to_string(), value.to_string())),
        }
        match name {
            "value" => el.value = Some(value.to_string()),
            "checked" => el.checked = true,
            "selected" => el.selected = true,
            _ => {}
        }
        Ok(())
    }

    /// Remove an attribute, resetting the live property for volatile ones
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let el = self.element_mut(id)?;
        el.attributes.retain(|(n, _)| n != name);
        match name {
            "value" => el.value = None,
            "checked" => el.checked = false,
            "selected" => el.selected = false,
            _ => {}
        }
        Ok(())
    }

    /// Look up an attribute
    pub fn attribute(&self, id: NodeId, name: &str) -> DomResult<Option<&str>> {
        Ok(self.element(id)?.attribute(name))
    }

    /// Set the element's class, reflected as the `class` attribute
    pub fn set_class_name(&mut self, id: NodeId, class: &str) -> DomResult<()> {
        self.set_attribute(id, "class", class)
    }

    /// Tag name of an element
    pub fn tag_name(&self, id: NodeId) -> DomResult<&str> {
        Ok(&self.element(id)?.tag_name)
    }

    /// Namespace URI of an element, `None` for the null namespace
    pub fn namespace(&self, id: NodeId) -> DomResult<Option<&str>> {
        Ok(self.element(id)?.namespace.as_deref())
    }

    /// Live `value` property of an element
    pub fn value(&self, id: NodeId) -> DomResult<Option<&str>> {
        Ok(self.element(id)?.value.as_deref())
    }

    /// Live `checked` property of an element
    pub fn is_checked(&self, id: NodeId) -> DomResult<bool> {
        Ok(self.element(id)?.checked)
    }

    /// Live `selected` property of an element
    pub fn is_selected(&self, id: NodeId) -> DomResult<bool> {
        Ok(self.element(id)?.selected)
    }

    /// Collect a node and all of its descendants, depth first
    pub fn collect_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) -> DomResult<()> {
        out.push(id);
        let children = self.node(id)?.children.clone();
        for child in children {
            self.collect_subtree(child, out)?;
        }
        Ok(())
    }

    /// Serialize a node and its subtree as HTML
    pub fn outer_html(&self, id: NodeId) -> DomResult<String> {
        let mut out = String::new();
        self.write_html(id, &mut out)?;
        Ok(out)
    }

    fn write_html(&self, id: NodeId, out: &mut String) -> DomResult<()> {
        let node = self.node(id)?;
        match &node.data {
            NodeData::Document => {
                for &child in &node.children {
                    self.write_html(child, out)?;
                }
            }
            NodeData::Text(t) => escape_into(&t.content, out),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag_name);
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag_name.as_str()) {
                    return Ok(());
                }
                for &child in &node.children {
                    self.write_html(child, out)?;
                }
                out.push_str("</");
                out.push_str(&el.tag_name);
                out.push('>');
            }
        }
        Ok(())
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
