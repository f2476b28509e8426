use html::DomView;

use super::{AttributeSelector, Selector, SelectorList, SimpleSelector};

/// Anything that can decide whether it selects a node
pub trait Matcher {
    fn matches<D: DomView>(&self, dom: &D, node: D::Node) -> bool;
}

impl Matcher for SimpleSelector {
    fn matches<D: DomView>(&self, dom: &D, node: D::Node) -> bool {
        let Some(name) = dom.tag_name(node) else {
            return false;
        };
        match self {
            SimpleSelector::Type(t) => name.eq_ignore_ascii_case(t),
            SimpleSelector::Universal => true,
            SimpleSelector::Attribute(attr) => attr.matches(dom.attribute(node, attr.name())),
            SimpleSelector::Class(class) => dom.has_class(node, class),
            SimpleSelector::ID(id) => dom.attribute(node, "id") == Some(id.as_str()),
        }
    }
}

impl Matcher for Selector {
    fn matches<D: DomView>(&self, dom: &D, node: D::Node) -> bool {
        match self {
            Selector::Simple(s) => s.matches(dom, node),
            Selector::Compound(sels) => sels.iter().all(|s| s.matches(dom, node)),
        }
    }
}

impl Matcher for SelectorList {
    fn matches<D: DomView>(&self, dom: &D, node: D::Node) -> bool {
        self.0.iter().any(|s| s.matches(dom, node))
    }
}

impl AttributeSelector {
    pub fn name(&self) -> &str {
        match self {
            AttributeSelector::Has(name)
            | AttributeSelector::Equals(name, _)
            | AttributeSelector::Includes(name, _)
            | AttributeSelector::Begins(name, _)
            | AttributeSelector::Prefix(name, _)
            | AttributeSelector::Suffix(name, _)
            | AttributeSelector::Contains(name, _) => name,
        }
    }

    /// Check an attribute value (`None` when the attribute is absent) against this selector
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            AttributeSelector::Has(_) => true,
            AttributeSelector::Equals(_, v) => value == v,
            AttributeSelector::Includes(_, v) => value.split_ascii_whitespace().any(|w| w == v),
            AttributeSelector::Begins(_, v) => {
                value == v
                    || value
                        .strip_prefix(v.as_str())
                        .map(|rest| rest.starts_with('-'))
                        .unwrap_or(false)
            }
            // The substring forms never match an empty value
            AttributeSelector::Prefix(_, v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttributeSelector::Suffix(_, v) => !v.is_empty() && value.ends_with(v.as_str()),
            AttributeSelector::Contains(_, v) => !v.is_empty() && value.contains(v.as_str()),
        }
    }
}

/// First element below `scope` (excluding `scope` itself) selected by `matcher`
pub fn query_selector<D, M>(dom: &D, scope: D::Node, matcher: &M) -> Option<D::Node>
where
    D: DomView,
    M: Matcher,
{
    dom.descendants(scope)
        .into_iter()
        .find(|&node| matcher.matches(dom, node))
}

/// Every element below `scope` selected by `matcher`, in document order
pub fn query_selector_all<D, M>(dom: &D, scope: D::Node, matcher: &M) -> Vec<D::Node>
where
    D: DomView,
    M: Matcher,
{
    dom.descendants(scope)
        .into_iter()
        .filter(|&node| matcher.matches(dom, node))
        .collect()
}

/// `node` itself or its nearest ancestor selected by `matcher`
pub fn closest<D, M>(dom: &D, node: D::Node, matcher: &M) -> Option<D::Node>
where
    D: DomView,
    M: Matcher,
{
    dom.inclusive_ancestors(node)
        .into_iter()
        .find(|&n| matcher.matches(dom, n))
}
