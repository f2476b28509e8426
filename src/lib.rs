//! Recover the LaTeX source of formulas rendered by MathJax or KaTeX.
//!
//! [`locate_all`] finds rendered formulas in a document, [`extract`] recovers the source of one
//! of them, and [`Controller`] wires both to hover, click and clipboard events.

/// Tunable delays, limits and formula signatures
pub mod config;
/// Hover/click handling and the presentation traits it drives
pub mod controller;
pub mod error;
/// The source recovery strategy chain
pub mod extract;
/// Finding formula containers
pub mod locate;
/// Loading saved pages
pub mod page;
/// Copy button positioning
pub mod placement;
/// Waiting for the renderer before the first scan
pub mod ready;
/// Terminal clipboard and surface
pub mod shell;

pub use config::Config;
pub use controller::Controller;
pub use error::{Error, Result};
pub use extract::{extract, extract_with_strategy, Extraction, Strategy};
pub use locate::locate_all;
pub use page::Page;
