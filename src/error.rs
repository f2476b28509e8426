use thiserror::Error;

use crate::shell::ClipboardError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read page: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Selector(#[from] css::SelectorError),
    #[error("refusing to load `{0}`: only local files are supported")]
    UnsupportedScheme(String),
    #[error("`{0}` does not name a local file")]
    InvalidPath(String),
    #[error("no formula #{index}: the page has {count}")]
    NoSuchFormula { index: usize, count: usize },
    #[error("copy failed: {0}")]
    Clipboard(#[from] ClipboardError),
}
