//! Tolerant HTML parsing into an arena-backed DOM.
//!
//! Pages in the wild are rarely well formed, so [`Document::parse`] never fails: stray `<`
//! characters become text, unmatched end tags are dropped and anything still open at the end of
//! the input is closed implicitly.

mod dom;
mod entities;
mod parsing;
mod view;

pub use dom::{Attributes, Document, Element, Node, NodeData, NodeId};
pub use entities::decode_entities;
pub use view::DomView;

/// Build an [`Attributes`] map from `"name" => "value"` pairs
#[macro_export]
macro_rules! attributes {
    ($($k:literal => $v:literal),* $(,)?) => {
        $crate::Attributes::from_iter([$(($k.to_string(), $v.to_string())),*])
    };
}
