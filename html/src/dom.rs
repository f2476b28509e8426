use std::collections::HashMap;
use std::fmt::Display;

use tracing::trace;

use crate::parsing;
use crate::view::DomView;

/// Index of a node inside the [`Document`] that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag_name: String,
    pub attributes: Attributes,
}

impl Element {
    /// Tag names are stored lowercase so lookups never have to care about the source's casing
    pub fn new(name: impl Display, attributes: Option<Attributes>) -> Self {
        Self {
            tag_name: name.to_string().to_ascii_lowercase(),
            attributes: attributes.unwrap_or_default(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(pub HashMap<String, String>);

impl Attributes {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// The first occurrence of a repeated attribute wins, as in HTML
impl FromIterator<(String, String)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut map = HashMap::new();
        for (name, value) in iter {
            map.entry(name).or_insert(value);
        }
        Self(map)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// Arena of nodes. Node `0` is always the document node.
///
/// Detached nodes stay in the arena so that handles held elsewhere keep resolving; they simply
/// stop being reachable from the root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: vec![],
                data: NodeData::Document,
            }],
        }
    }

    /// Parse a complete page
    pub fn parse(input: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_html(root, input);
        doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node.
    ///
    /// # Panics
    /// If `id` was not produced by this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0).and_then(Node::as_element)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: vec![],
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.append(parent, NodeData::Element(element))
    }

    /// Append text, merging into the previous child when that is already a text node
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let text = text.into();
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeData::Text(existing) = &mut self.nodes[last.0].data {
                existing.push_str(&text);
                return last;
            }
        }
        self.append(parent, NodeData::Text(text))
    }

    /// Parse `input` as a fragment and append it under `parent`, returning the new top-level
    /// nodes
    pub fn append_html(&mut self, parent: NodeId, input: &str) -> Vec<NodeId> {
        parsing::build(self, parent, input)
    }

    /// Remove `id` from its parent. The subtree stays intact and addressable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            trace!(?id, ?parent, "Detaching node");
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Every connected element with the given tag name, in document order
    pub fn get_elements_by_name(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.tag_name(id) == Some(name))
            .collect()
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Comment(_) => {}
            NodeData::Document | NodeData::Element(_) => {
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn element_siblings(&self, id: NodeId) -> Option<(&[NodeId], usize)> {
        let parent = self.nodes.get(id.0)?.parent?;
        let siblings = self.nodes[parent.0].children.as_slice();
        let position = siblings.iter().position(|&c| c == id)?;
        Some((siblings, position))
    }
}

impl DomView for Document {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag_name.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.get_attribute(name))
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if node.0 < self.nodes.len() {
            self.collect_text(node, &mut out);
        }
        out
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node.0)?.parent?;
        self.element(parent).map(|_| parent)
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|&c| self.element(c).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn previous_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (siblings, position) = self.element_siblings(node)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (siblings, position) = self.element_siblings(node)?;
        siblings[position + 1..]
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some())
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current.0 == 0 {
                return true;
            }
            match self.nodes.get(current.0).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}
