//! CSS selectors: parsing and matching against any [`html::DomView`].
//!
//! Only what is needed to recognise formula markup is supported: type, universal, class, id and
//! attribute selectors, compounds of those and comma-separated lists. Combinators are rejected.

use thiserror::Error;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SelectorList(pub Vec<Selector>);

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Selector {
    Simple(SimpleSelector),
    Compound(Vec<SimpleSelector>),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SimpleSelector {
    Type(String),
    Universal,
    Attribute(AttributeSelector),
    Class(String),
    ID(String),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum AttributeSelector {
    // [att]
    Has(String),
    // [att=val]
    Equals(String, String),
    // [att~=val]
    // Whitespace separated list containing `val`
    Includes(String, String),
    // [att|=val]
    // `att` is `val` or begins with `val-`
    Begins(String, String),
    // [att^=val]
    Prefix(String, String),
    // [att$=val]
    Suffix(String, String),
    // [att*=val]
    Contains(String, String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid selector `{selector}` at offset {offset}")]
    Invalid { selector: String, offset: usize },
    #[error("expected a single selector, found {count} in `{selector}`")]
    NotSingle { selector: String, count: usize },
}

#[macro_export]
macro_rules! simple_selector {
    (#$x:ident) => {
        $crate::SimpleSelector::ID(stringify!($x).to_string())
    };
    (.$x:ident) => {
        $crate::SimpleSelector::Class(stringify!($x).to_string())
    };
    (*) => {
        $crate::SimpleSelector::Universal
    };
    ([$x:ident]) => {
        $crate::SimpleSelector::Attribute($crate::AttributeSelector::Has(stringify!($x).to_string()))
    };
    ($x:ident) => {
        $crate::SimpleSelector::Type(stringify!($x).to_string())
    };
}

#[macro_export]
macro_rules! compound_selector {
    ($($sel:expr),*) => {$crate::Selector::Compound(vec![$($sel),*])}
}

mod matching;
mod parsing;

pub use matching::{closest, query_selector, query_selector_all, Matcher};
pub use parsing::selector_list;
