use std::fmt::Debug;
use std::hash::Hash;

/// Read-only navigation over a document tree owned by someone else.
///
/// Node handles are cheap identities. A handle may outlive its place in the tree (the host can
/// detach it at any time); every method must still answer for such a node, typically with
/// `None` or an empty result.
pub trait DomView {
    type Node: Copy + Eq + Hash + Debug;

    /// The document node. It is not an element and has no tag name.
    fn root(&self) -> Self::Node;

    /// Lowercase tag name, or `None` for anything that is not an element
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Concatenation of every text node below `node`, in document order
    fn text_content(&self, node: Self::Node) -> String;

    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;

    fn element_children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn previous_element_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    fn next_element_sibling(&self, node: Self::Node) -> Option<Self::Node>;

    /// Whether `node` can still be reached from [`DomView::root`]
    fn is_connected(&self, node: Self::Node) -> bool;

    /// Check if the `class` attribute is present and contains the specified class
    fn has_class(&self, node: Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|c| c.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Every element below `node` in document order, excluding `node` itself
    fn descendants(&self, node: Self::Node) -> Vec<Self::Node> {
        let mut found = Vec::new();
        let mut stack: Vec<Self::Node> = self.element_children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            found.push(next);
            stack.extend(self.element_children(next).into_iter().rev());
        }
        found
    }

    /// `node` followed by each of its ancestor elements, nearest first
    fn inclusive_ancestors(&self, node: Self::Node) -> Vec<Self::Node> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent_element(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }
}
