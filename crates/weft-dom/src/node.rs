//! DOM node types

use crate::NodeId;

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Element,
    Text,
    Document,
}

/// DOM node
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node, `NodeId::NONE` while detached
    pub parent: NodeId,
    /// Children in document order
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            children: Vec::new(),
            data,
        }
    }

    /// Node type of this node's data
    pub fn node_type(&self) -> NodeType {
        match self.data {
            NodeData::Element(_) => NodeType::Element,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Document => NodeType::Document,
        }
    }

    /// Element data, if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Text content, if this is a text node
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(ElementData),
    Text(TextData),
    Document,
}

/// Element node data
#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag_name: String,
    /// Namespace URI, `None` for the null namespace
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// Live `value` property. Tracks the `value` attribute only when the
    /// attribute is written through the tree; the wire protocol calls such
    /// attributes "volatile".
    pub value: Option<String>,
    /// Live `checked` property
    pub checked: bool,
    /// Live `selected` property
    pub selected: bool,
}

impl ElementData {
    pub(crate) fn new(tag_name: &str, namespace: Option<&str>) -> Self {
        Self {
            tag_name: tag_name.to_string(),
            namespace: namespace.map(|ns| ns.to_string()),
            attributes: Vec::new(),
            value: None,
            checked: false,
            selected: false,
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Text node data
#[derive(Debug, Clone)]
pub struct TextData {
    pub content: String,
}
