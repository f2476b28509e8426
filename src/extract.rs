//! Recovery of the LaTeX source behind a rendered formula.
//!
//! Renderers leave their input behind in different places depending on the library and its
//! version: a `<script type="math/tex">` next to (or inside) the output, a MathML `<annotation>`
//! carrying the TeX, or an explicit `data-latex` attribute set by the page author. The
//! strategies in [`CHAIN`] are tried in order and the first non-empty answer wins. Nothing here
//! writes to the document.

use css::{closest, query_selector, AttributeSelector, Selector, SimpleSelector};
use html::DomView;
use lazy_static::lazy_static;
use tracing::{debug, span, trace, Level};

/// Attribute authors use to state the source explicitly
pub const LATEX_ATTRIBUTE: &str = "data-latex";

const TEX_TYPE: &str = "math/tex";

lazy_static! {
    /// `script[type*="math/tex"]`
    static ref TEX_SCRIPT: Selector = Selector::Compound(vec![
        SimpleSelector::Type("script".to_string()),
        SimpleSelector::Attribute(AttributeSelector::Contains(
            "type".to_string(),
            TEX_TYPE.to_string(),
        )),
    ]);
    /// `annotation[encoding="application/x-tex"]`
    static ref TEX_ANNOTATION: Selector = Selector::Compound(vec![
        SimpleSelector::Type("annotation".to_string()),
        SimpleSelector::Attribute(AttributeSelector::Equals(
            "encoding".to_string(),
            "application/x-tex".to_string(),
        )),
    ]);
    static ref ANY_ANNOTATION: Selector =
        Selector::Simple(SimpleSelector::Type("annotation".to_string()));
    static ref MJX_CONTAINER: Selector =
        Selector::Simple(SimpleSelector::Type("mjx-container".to_string()));
    static ref KATEX_ROOT: Selector = Selector::Simple(SimpleSelector::Class("katex".to_string()));
    static ref HAS_LATEX_ATTRIBUTE: Selector = Selector::Simple(SimpleSelector::Attribute(
        AttributeSelector::Has(LATEX_ATTRIBUTE.to_string())
    ));
}

/// One way of recovering the source, in decreasing order of confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `data-latex` on the element itself
    Override,
    /// MathJax 2 keeps the source in a `script[type*="math/tex"]`
    LegacyScript,
    /// MathML output with a TeX annotation
    TexAnnotation,
    /// A TeX script right before or after the enclosing `mjx-container`
    ContainerSibling,
    /// Only attempted when the element sits inside a `.katex` root
    Katex(KatexStrategy),
    /// Any annotation at all, whatever its encoding
    AnyAnnotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KatexStrategy {
    RootOverride,
    AncestorOverride,
    Annotation,
    PrecedingScript,
}

/// The full strategy chain, in the order it is attempted
pub static CHAIN: &[Strategy] = &[
    Strategy::Override,
    Strategy::LegacyScript,
    Strategy::TexAnnotation,
    Strategy::ContainerSibling,
    Strategy::Katex(KatexStrategy::RootOverride),
    Strategy::Katex(KatexStrategy::AncestorOverride),
    Strategy::Katex(KatexStrategy::Annotation),
    Strategy::Katex(KatexStrategy::PrecedingScript),
    Strategy::AnyAnnotation,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub latex: String,
    pub strategy: Strategy,
}

impl Strategy {
    /// Run this strategy alone. Empty results count as a miss.
    pub fn attempt<D: DomView>(self, dom: &D, element: D::Node) -> Option<String> {
        let found = match self {
            Strategy::Override => dom.attribute(element, LATEX_ATTRIBUTE).map(str::to_string),
            Strategy::LegacyScript => first_text(dom, element, &TEX_SCRIPT),
            Strategy::TexAnnotation => first_text(dom, element, &TEX_ANNOTATION),
            Strategy::ContainerSibling => container_sibling(dom, element),
            Strategy::Katex(step) => {
                let root = closest(dom, element, &*KATEX_ROOT)?;
                step.attempt(dom, root)
            }
            Strategy::AnyAnnotation => first_text(dom, element, &ANY_ANNOTATION),
        };
        found.filter(|latex| !latex.is_empty())
    }
}

impl KatexStrategy {
    fn attempt<D: DomView>(self, dom: &D, root: D::Node) -> Option<String> {
        match self {
            KatexStrategy::RootOverride => dom.attribute(root, LATEX_ATTRIBUTE).map(str::to_string),
            KatexStrategy::AncestorOverride => {
                let parent = dom.parent_element(root)?;
                let holder = closest(dom, parent, &*HAS_LATEX_ATTRIBUTE)?;
                dom.attribute(holder, LATEX_ATTRIBUTE).map(str::to_string)
            }
            KatexStrategy::Annotation => first_text(dom, root, &TEX_ANNOTATION),
            KatexStrategy::PrecedingScript => {
                let prev = dom.previous_element_sibling(root)?;
                is_tex_script(dom, prev, |t| t == TEX_TYPE).then(|| dom.text_content(prev))
            }
        }
    }
}

/// Recover the LaTeX source of `element`, or `None` if no strategy finds any
pub fn extract<D: DomView>(dom: &D, element: D::Node) -> Option<String> {
    extract_with_strategy(dom, element).map(|e| e.latex)
}

/// Like [`extract`], also reporting which strategy produced the answer
pub fn extract_with_strategy<D: DomView>(dom: &D, element: D::Node) -> Option<Extraction> {
    let span = span!(Level::DEBUG, "Extracting LaTeX", ?element);
    let _enter = span.enter();
    trace!(tag = ?dom.tag_name(element), class = ?dom.attribute(element, "class"));
    let found = CHAIN.iter().find_map(|&strategy| {
        strategy
            .attempt(dom, element)
            .map(|latex| Extraction { latex, strategy })
    });
    match &found {
        Some(e) => debug!(strategy = ?e.strategy, latex = %e.latex, "Extracted"),
        None => debug!("No LaTeX source found"),
    }
    found
}

/// Text of the first descendant of `scope` matching `selector`. Only that first match is
/// consulted, even if its text is empty.
fn first_text<D: DomView>(dom: &D, scope: D::Node, selector: &Selector) -> Option<String> {
    query_selector(dom, scope, selector).map(|n| dom.text_content(n))
}

fn is_tex_script<D: DomView>(dom: &D, node: D::Node, type_ok: impl Fn(&str) -> bool) -> bool {
    dom.tag_name(node) == Some("script") && dom.attribute(node, "type").map(type_ok).unwrap_or(false)
}

/// The previous sibling of the enclosing `mjx-container` wins over the next one, even when its
/// text turns out to be empty
fn container_sibling<D: DomView>(dom: &D, element: D::Node) -> Option<String> {
    let container = closest(dom, element, &*MJX_CONTAINER)?;
    [
        dom.previous_element_sibling(container),
        dom.next_element_sibling(container),
    ]
    .into_iter()
    .flatten()
    .find(|&sibling| is_tex_script(dom, sibling, |t| t.contains(TEX_TYPE)))
    .map(|script| dom.text_content(script))
}

#[cfg(test)]
mod tests {
    use html::{Document, NodeId};

    use super::*;

    fn first(doc: &Document, selector: &str) -> NodeId {
        let selector: Selector = selector.parse().unwrap();
        query_selector(doc, doc.root(), &selector).unwrap()
    }

    #[test]
    fn override_dominates() {
        let doc = Document::parse(
            r#"<span class="katex" data-latex="\alpha"><script type="math/tex">\beta</script><annotation encoding="application/x-tex">\gamma</annotation></span>"#,
        );
        let el = first(&doc, ".katex");
        assert_eq!(extract(&doc, el).as_deref(), Some(r"\alpha"));
        assert_eq!(
            extract_with_strategy(&doc, el).unwrap().strategy,
            Strategy::Override
        );
    }

    #[test]
    fn legacy_script_descendant() {
        let doc = Document::parse(
            r#"<div class="MathJax_Display"><span class="math">x</span><script type="math/tex; mode=display">\sum_{i=0}^n i</script></div>"#,
        );
        let el = first(&doc, ".MathJax_Display");
        assert_eq!(extract(&doc, el).as_deref(), Some(r"\sum_{i=0}^n i"));
    }

    #[test]
    fn script_before_annotation() {
        let doc = Document::parse(
            r#"<span class="MathJax"><annotation encoding="application/x-tex">from annotation</annotation><script type="math/tex">from script</script></span>"#,
        );
        let el = first(&doc, ".MathJax");
        assert_eq!(
            extract_with_strategy(&doc, el),
            Some(Extraction {
                latex: "from script".to_string(),
                strategy: Strategy::LegacyScript,
            })
        );
    }

    #[test]
    fn annotation_entities_are_decoded() {
        let doc = Document::parse(
            r#"<mjx-container class="MathJax"><mjx-assistive-mml><math><semantics><annotation encoding="application/x-tex">a &lt; b</annotation></semantics></math></mjx-assistive-mml></mjx-container>"#,
        );
        let el = first(&doc, "mjx-container");
        assert_eq!(extract(&doc, el).as_deref(), Some("a < b"));
    }

    #[test]
    fn container_siblings() {
        let doc = Document::parse(
            r#"<p><script type="math/tex">before</script><mjx-container><mjx-math><mjx-mi>x</mjx-mi></mjx-math></mjx-container><script type="math/tex">after</script></p>"#,
        );
        let container = first(&doc, "mjx-container");
        assert_eq!(extract(&doc, container).as_deref(), Some("before"));
        // Hovering a node inside the container finds the same source
        let inner = first(&doc, "mjx-mi");
        assert_eq!(
            extract_with_strategy(&doc, inner).map(|e| e.strategy),
            Some(Strategy::ContainerSibling)
        );

        let doc = Document::parse(
            r#"<p><span>text</span><mjx-container><mjx-math></mjx-math></mjx-container><script type="math/tex; mode=display">after</script></p>"#,
        );
        let container = first(&doc, "mjx-container");
        assert_eq!(extract(&doc, container).as_deref(), Some("after"));

        // An empty preceding script shadows the following one
        let doc = Document::parse(
            r#"<script type="math/tex"></script><mjx-container></mjx-container><script type="math/tex">after</script>"#,
        );
        assert_eq!(extract(&doc, first(&doc, "mjx-container")), None);
    }

    fn katex_fixture(root_attr: bool, outer_attr: bool, annotation: bool, script_type: &str) -> Document {
        let outer = if outer_attr { r#" data-latex="outer""# } else { "" };
        let root = if root_attr { r#" data-latex="root""# } else { "" };
        let annotation = if annotation {
            r#"<annotation encoding="application/x-tex">annotation</annotation>"#
        } else {
            ""
        };
        Document::parse(&format!(
            r#"<div{outer}><script type="{script_type}">script</script><span class="katex"{root}><span class="katex-mathml"><math><semantics><mrow><mi>x</mi></mrow>{annotation}</semantics></math></span><span class="katex-html"><span class="base">x</span></span></span></div>"#
        ))
    }

    #[test]
    fn katex_chain_order() {
        let cases = [
            (true, true, true, "math/tex", "root", KatexStrategy::RootOverride),
            (false, true, true, "math/tex", "outer", KatexStrategy::AncestorOverride),
            (false, false, true, "math/tex", "annotation", KatexStrategy::Annotation),
            (false, false, false, "math/tex", "script", KatexStrategy::PrecedingScript),
        ];
        for (root, outer, annotation, script_type, expected, strategy) in cases {
            let doc = katex_fixture(root, outer, annotation, script_type);
            let base = first(&doc, ".base");
            assert_eq!(
                extract_with_strategy(&doc, base),
                Some(Extraction {
                    latex: expected.to_string(),
                    strategy: Strategy::Katex(strategy),
                })
            );
        }
    }

    #[test]
    fn katex_preceding_script_needs_exact_type() {
        let doc = katex_fixture(false, false, false, "math/tex; mode=display");
        assert_eq!(extract(&doc, first(&doc, ".base")), None);
    }

    #[test]
    fn katex_root_annotation_found_before_katex_chain() {
        // Hovering the root itself finds its own annotation through the generic lookup
        let doc = katex_fixture(false, true, true, "math/tex");
        let root = first(&doc, ".katex");
        assert_eq!(
            extract_with_strategy(&doc, root).map(|e| e.strategy),
            Some(Strategy::TexAnnotation)
        );
    }

    #[test]
    fn katex_holder_further_up() {
        let doc = Document::parse(
            r#"<div data-latex="\outer"><section><p><span class="katex"><span class="katex-html">x</span></span></p></section></div>"#,
        );
        let found = extract_with_strategy(&doc, first(&doc, ".katex-html")).unwrap();
        assert_eq!(found.latex, r"\outer");
        assert_eq!(
            found.strategy,
            Strategy::Katex(KatexStrategy::AncestorOverride)
        );
    }

    #[test]
    fn katex_empty_holder_stops_the_search() {
        let doc = Document::parse(
            r#"<div data-latex="\outer"><p data-latex=""><span class="katex"><span class="katex-mathml"><annotation encoding="application/x-tex">\inner</annotation></span><span class="katex-html">x</span></span></p></div>"#,
        );
        let el = first(&doc, ".katex-html");
        assert_eq!(
            Strategy::Katex(KatexStrategy::AncestorOverride).attempt(&doc, el),
            None
        );
        let found = extract_with_strategy(&doc, el).unwrap();
        assert_eq!(found.latex, r"\inner");
        assert_eq!(found.strategy, Strategy::Katex(KatexStrategy::Annotation));
    }

    #[test]
    fn any_annotation_last_resort() {
        let doc = Document::parse(
            r#"<span class="katex-display"><math><semantics><annotation encoding="text/plain">plain</annotation></semantics></math></span>"#,
        );
        let el = first(&doc, ".katex-display");
        assert_eq!(
            extract_with_strategy(&doc, el),
            Some(Extraction {
                latex: "plain".to_string(),
                strategy: Strategy::AnyAnnotation,
            })
        );
    }

    #[test]
    fn nothing_found() {
        let doc = Document::parse(r#"<span class="MathJax"><span>x</span></span>"#);
        let el = first(&doc, ".MathJax");
        assert_eq!(extract(&doc, el), None);
        assert_eq!(extract(&doc, doc.root()), None);
    }

    #[test]
    fn empty_results_fall_through() {
        let doc = Document::parse(
            r#"<span class="MathJax" data-latex=""><script type="math/tex"></script><annotation encoding="application/x-tex">y</annotation></span>"#,
        );
        let el = first(&doc, ".MathJax");
        assert_eq!(
            extract_with_strategy(&doc, el).map(|e| e.strategy),
            Some(Strategy::TexAnnotation)
        );
    }

    #[test]
    fn repeated_extraction_is_stable() {
        let doc = katex_fixture(false, true, true, "math/tex");
        let base = first(&doc, ".base");
        assert_eq!(extract(&doc, base), extract(&doc, base));
        assert_eq!(extract(&doc, base).as_deref(), Some("outer"));
    }

    #[test]
    fn detached_formula_is_still_readable() {
        let mut doc = Document::parse(
            r#"<p><span class="MathJax"><script type="math/tex">kept</script></span></p>"#,
        );
        let el = first(&doc, ".MathJax");
        doc.detach(el);
        assert_eq!(extract(&doc, el).as_deref(), Some("kept"));
    }

    /// Minimal hand-built tree, to check the chain relies on nothing beyond [`DomView`]
    struct FakeTree(Vec<FakeNode>);

    struct FakeNode {
        tag: Option<&'static str>,
        attrs: &'static [(&'static str, &'static str)],
        text: &'static str,
        parent: Option<usize>,
    }

    impl FakeTree {
        fn children(&self, node: usize) -> Vec<usize> {
            (0..self.0.len())
                .filter(|&i| self.0[i].parent == Some(node))
                .collect()
        }

        fn sibling(&self, node: usize, offset: isize) -> Option<usize> {
            let parent = self.0[node].parent?;
            let siblings = self.children(parent);
            let pos = siblings.iter().position(|&n| n == node)? as isize + offset;
            usize::try_from(pos).ok().and_then(|p| siblings.get(p).copied())
        }
    }

    impl DomView for FakeTree {
        type Node = usize;

        fn root(&self) -> usize {
            0
        }

        fn tag_name(&self, node: usize) -> Option<&str> {
            self.0[node].tag
        }

        fn attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.0[node]
                .attrs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        }

        fn text_content(&self, node: usize) -> String {
            let mut text = self.0[node].text.to_string();
            for child in self.children(node) {
                text.push_str(&self.text_content(child));
            }
            text
        }

        fn parent_element(&self, node: usize) -> Option<usize> {
            self.0[node].parent.filter(|&p| p != 0)
        }

        fn element_children(&self, node: usize) -> Vec<usize> {
            self.children(node)
        }

        fn previous_element_sibling(&self, node: usize) -> Option<usize> {
            self.sibling(node, -1)
        }

        fn next_element_sibling(&self, node: usize) -> Option<usize> {
            self.sibling(node, 1)
        }

        fn is_connected(&self, _node: usize) -> bool {
            true
        }
    }

    #[test]
    fn works_over_any_tree() {
        let node = |tag, attrs, text, parent| FakeNode {
            tag: Some(tag),
            attrs,
            text,
            parent: Some(parent),
        };
        let tree = FakeTree(vec![
            FakeNode {
                tag: None,
                attrs: &[],
                text: "",
                parent: None,
            },
            node("p", &[], "", 0),
            node("span", &[("class", "katex")], "", 1),
            node("span", &[("class", "katex-html")], "x", 2),
            node("script", &[("type", "math/tex")], r"\frac12", 1),
        ]);
        // The script follows the KaTeX root, so only the container lookup could see it, and
        // there is no container
        assert_eq!(extract(&tree, 3), None);

        let tree = FakeTree(vec![
            FakeNode {
                tag: None,
                attrs: &[],
                text: "",
                parent: None,
            },
            node("script", &[("type", "math/tex")], r"\frac12", 0),
            node("span", &[("class", "katex")], "", 0),
            node("span", &[("class", "katex-html")], "x", 2),
        ]);
        assert_eq!(
            extract_with_strategy(&tree, 3),
            Some(Extraction {
                latex: r"\frac12".to_string(),
                strategy: Strategy::Katex(KatexStrategy::PrecedingScript),
            })
        );
    }
}
