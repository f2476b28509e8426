use css::{query_selector_all, Selector};
use html::DomView;
use tracing::{debug, span, Level};

/// Every element matching any of the formula signatures.
///
/// Signatures are queried one after another, so an element matching two of them (a KaTeX root
/// that also carries `katex-display`, say) appears twice. Deduplication is the caller's job.
pub fn locate_all<D: DomView>(dom: &D, signatures: &[Selector]) -> Vec<D::Node> {
    let span = span!(Level::DEBUG, "Locating formulas");
    let _enter = span.enter();
    let formulas: Vec<D::Node> = signatures
        .iter()
        .flat_map(|sig| query_selector_all(dom, dom.root(), sig))
        .collect();
    if !formulas.is_empty() {
        debug!(count = formulas.len(), "Found formula candidates");
    }
    formulas
}
