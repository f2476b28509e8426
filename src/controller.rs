//! Turns pointer and document events into copy buttons, clipboard writes and notifications.
//!
//! Everything runs on the caller's thread. Timers (the hide grace period, the rescan debounce
//! and notification expiry) are deadlines checked by [`Controller::tick`], which the host calls
//! with its own clock.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

use css::Selector;
use html::DomView;
use tracing::{debug, info, span, warn, Level};

use crate::config::Config;
use crate::error::Result;
use crate::extract::extract;
use crate::locate::locate_all;
use crate::placement::{place_button, Position, Rect, Size};
use crate::shell::Clipboard;

pub const COPIED_MESSAGE: &str = "LaTeX copied to clipboard!";

#[derive(Debug, Clone, PartialEq)]
pub struct CopyButton<N> {
    pub formula: N,
    pub latex: String,
    pub tooltip: String,
    /// `None` when the surface cannot measure the formula
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub preview: Option<String>,
    /// Untruncated text, for surfaces that can show it on demand
    pub full_text: Option<String>,
}

/// Which clipboard path a copy went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyPath {
    Clipboard,
    Selection,
}

/// The on-page half of the presentation shell
pub trait Surface<N> {
    fn show_button(&mut self, button: &CopyButton<N>);
    fn move_button(&mut self, button: &CopyButton<N>);
    fn hide_button(&mut self, button: &CopyButton<N>);
    /// Whether the pointer is resting on the button right now
    fn pointer_over_button(&self, button: &CopyButton<N>) -> bool;
    fn formula_rect(&self, formula: N) -> Option<Rect>;
    /// Size of the rendered button; zero until it has been laid out
    fn button_size(&self) -> Size;
    fn viewport_width(&self) -> f64;
    fn show_notification(&mut self, notification: &Notification);
    fn dismiss_notification(&mut self, notification: &Notification);
    /// Reveal the untruncated LaTeX behind a notification
    fn show_full_text(&mut self, text: &str);
}

pub struct Controller<N, S, C> {
    config: Config,
    signatures: Vec<Selector>,
    /// Side table standing in for a per-node "listeners attached" marker
    attached: HashSet<N>,
    attach_order: Vec<N>,
    current: Option<CopyButton<N>>,
    /// Bumped on every hover so that stale delayed hides are ignored
    generation: u64,
    pending_hide: Option<(u64, Instant)>,
    rescan_at: Option<Instant>,
    notifications: Vec<(Notification, Instant)>,
    next_notification: u64,
    surface: S,
    clipboard: C,
}

impl<N, S, C> Controller<N, S, C>
where
    N: Copy + Eq + Hash + Debug,
    S: Surface<N>,
    C: Clipboard,
{
    pub fn new(config: Config, surface: S, clipboard: C) -> Result<Self> {
        let signatures = config.formula_selectors()?;
        Ok(Self {
            config,
            signatures,
            attached: HashSet::new(),
            attach_order: Vec::new(),
            current: None,
            generation: 0,
            pending_hide: None,
            rescan_at: None,
            notifications: Vec::new(),
            next_notification: 0,
            surface,
            clipboard,
        })
    }

    /// Find formulas and attach to those not seen before. Returns how many were new.
    pub fn scan<D: DomView<Node = N>>(&mut self, dom: &D) -> usize {
        let span = span!(Level::DEBUG, "Scanning document");
        let _enter = span.enter();
        let before = self.attached.len();
        self.attached.retain(|&n| dom.is_connected(n));
        if self.attached.len() != before {
            debug!(removed = before - self.attached.len(), "Forgot detached formulas");
            self.attach_order.retain(|n| self.attached.contains(n));
        }
        let mut added = 0;
        for formula in locate_all(dom, &self.signatures) {
            if self.attached.insert(formula) {
                self.attach_order.push(formula);
                added += 1;
            }
        }
        if added > 0 {
            info!(added, total = self.attached.len(), "Attached to formulas");
        }
        added
    }

    pub fn is_attached(&self, node: N) -> bool {
        self.attached.contains(&node)
    }

    /// Attached formulas in the order they were first found
    pub fn attached(&self) -> &[N] {
        &self.attach_order
    }

    pub fn current_button(&self) -> Option<&CopyButton<N>> {
        self.current.as_ref()
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().map(|(n, _)| n)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Pointer entered a formula. Replaces any visible button; returns whether a new one is shown.
    pub fn hover_enter<D: DomView<Node = N>>(&mut self, dom: &D, formula: N) -> bool {
        self.hide_button();
        self.generation += 1;
        self.pending_hide = None;
        let Some(latex) = extract(dom, formula) else {
            debug!(?formula, "Cannot extract LaTeX source");
            return false;
        };
        let button = CopyButton {
            formula,
            tooltip: truncate(&latex, self.config.tooltip_max_len),
            latex,
            position: self.position_for(formula),
        };
        self.surface.show_button(&button);
        self.current = Some(button);
        true
    }

    /// Pointer left a formula; hide after the grace period unless it is on the button by then
    pub fn hover_leave(&mut self, now: Instant) {
        if self.current.is_some() {
            self.pending_hide = Some((self.generation, now + self.config.hide_button_delay));
        }
    }

    pub fn button_leave(&mut self) {
        self.hide_button();
    }

    /// Copy the LaTeX of the visible button. Returns `false` if there is no button.
    pub fn button_click(&mut self, now: Instant) -> Result<bool> {
        let Some(latex) = self.current.as_ref().map(|b| b.latex.clone()) else {
            return Ok(false);
        };
        self.copy(&latex, now)?;
        Ok(true)
    }

    /// Copy straight away, without a button. Returns whether anything was copied.
    pub fn double_click<D: DomView<Node = N>>(
        &mut self,
        dom: &D,
        formula: N,
        now: Instant,
    ) -> Result<bool> {
        if !self.config.double_click_copy {
            return Ok(false);
        }
        match extract(dom, formula) {
            Some(latex) => {
                self.copy(&latex, now)?;
                Ok(true)
            }
            None => {
                debug!(?formula, "Cannot extract LaTeX source");
                Ok(false)
            }
        }
    }

    /// The document changed. Bursts of changes collapse into a single rescan once things have
    /// been quiet for the debounce delay.
    pub fn dom_mutated(&mut self, now: Instant) {
        self.rescan_at = Some(now + self.config.debounce_delay);
    }

    pub fn viewport_resized(&mut self) {
        let Some(formula) = self.current.as_ref().map(|b| b.formula) else {
            return;
        };
        let position = self.position_for(formula);
        if let Some(button) = self.current.as_mut() {
            button.position = position;
            self.surface.move_button(button);
        }
    }

    /// Fire every timer due at `now`
    pub fn tick<D: DomView<Node = N>>(&mut self, dom: &D, now: Instant) {
        if let Some((generation, due)) = self.pending_hide {
            if now >= due {
                self.pending_hide = None;
                let over = self
                    .current
                    .as_ref()
                    .map(|b| self.surface.pointer_over_button(b))
                    .unwrap_or(false);
                if generation == self.generation && !over {
                    self.hide_button();
                }
            }
        }
        if self.rescan_at.map(|due| now >= due).unwrap_or(false) {
            self.rescan_at = None;
            self.scan(dom);
        }
        let (expired, live): (Vec<_>, Vec<_>) = self
            .notifications
            .drain(..)
            .partition(|(_, expires)| now >= *expires);
        self.notifications = live;
        for (notification, _) in expired {
            self.surface.dismiss_notification(&notification);
        }
    }

    /// Earliest pending timer, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_hide
            .map(|(_, due)| due)
            .into_iter()
            .chain(self.rescan_at)
            .chain(self.notifications.iter().map(|(_, expires)| *expires))
            .min()
    }

    /// Write `latex` to the clipboard, falling back to a selection copy, and announce it
    pub fn copy(&mut self, latex: &str, now: Instant) -> Result<CopyPath> {
        let path = match self.clipboard.write_text(latex) {
            Ok(()) => CopyPath::Clipboard,
            Err(e) => {
                debug!(%e, "Clipboard write failed, copying through a selection");
                if let Err(e) = self.clipboard.copy_selection(latex) {
                    warn!(%e, "Selection copy failed");
                    return Err(e.into());
                }
                CopyPath::Selection
            }
        };
        self.notify(COPIED_MESSAGE, Some(latex), now);
        Ok(path)
    }

    /// A live notification was clicked. Shows its full text; returns `false` if the
    /// notification is gone or carries no text.
    pub fn notification_click(&mut self, id: u64) -> bool {
        let full_text = self
            .notifications
            .iter()
            .find(|(n, _)| n.id == id)
            .and_then(|(n, _)| n.full_text.clone());
        match full_text {
            Some(text) => {
                self.surface.show_full_text(&text);
                true
            }
            None => false,
        }
    }

    fn notify(&mut self, message: &str, latex: Option<&str>, now: Instant) {
        let notification = Notification {
            id: self.next_notification,
            message: message.to_string(),
            preview: latex.map(|l| truncate(l, self.config.preview_max_len)),
            full_text: latex.map(str::to_string),
        };
        self.next_notification += 1;
        self.surface.show_notification(&notification);
        self.notifications
            .push((notification, now + self.config.notification_duration));
    }

    fn hide_button(&mut self) {
        if let Some(button) = self.current.take() {
            self.surface.hide_button(&button);
        }
    }

    fn position_for(&self, formula: N) -> Option<Position> {
        let rect = self.surface.formula_rect(formula)?;
        Some(place_button(
            rect,
            self.surface.button_size(),
            self.surface.viewport_width(),
            self.config.button_offset,
            self.config.viewport_padding,
        ))
    }
}

/// Cut `text` to `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use html::{Document, NodeId};

    use super::*;
    use crate::shell::ClipboardError;

    #[derive(Default)]
    struct FakeSurface {
        shown: Vec<String>,
        hidden: usize,
        moved: Vec<Option<Position>>,
        pointer_over: bool,
        rect: Option<Rect>,
        notifications: Vec<Notification>,
        dismissed: Vec<u64>,
        full_text: Vec<String>,
    }

    impl Surface<NodeId> for FakeSurface {
        fn show_button(&mut self, button: &CopyButton<NodeId>) {
            self.shown.push(button.tooltip.clone());
        }

        fn move_button(&mut self, button: &CopyButton<NodeId>) {
            self.moved.push(button.position);
        }

        fn hide_button(&mut self, _button: &CopyButton<NodeId>) {
            self.hidden += 1;
        }

        fn pointer_over_button(&self, _button: &CopyButton<NodeId>) -> bool {
            self.pointer_over
        }

        fn formula_rect(&self, _formula: NodeId) -> Option<Rect> {
            self.rect
        }

        fn button_size(&self) -> Size {
            Size {
                width: 100.0,
                height: 30.0,
            }
        }

        fn viewport_width(&self) -> f64 {
            1000.0
        }

        fn show_notification(&mut self, notification: &Notification) {
            self.notifications.push(notification.clone());
        }

        fn dismiss_notification(&mut self, notification: &Notification) {
            self.dismissed.push(notification.id);
        }

        fn show_full_text(&mut self, text: &str) {
            self.full_text.push(text.to_string());
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        fail_primary: bool,
        fail_selection: bool,
        primary: Vec<String>,
        selection: Vec<String>,
    }

    impl Clipboard for FakeClipboard {
        fn write_text(&mut self, text: &str) -> std::result::Result<(), ClipboardError> {
            if self.fail_primary {
                return Err(ClipboardError::Unavailable("denied"));
            }
            self.primary.push(text.to_string());
            Ok(())
        }

        fn copy_selection(&mut self, text: &str) -> std::result::Result<(), ClipboardError> {
            if self.fail_selection {
                return Err(ClipboardError::Unavailable("no selection support"));
            }
            self.selection.push(text.to_string());
            Ok(())
        }
    }

    type TestController = Controller<NodeId, FakeSurface, FakeClipboard>;

    fn controller() -> TestController {
        Controller::new(
            Config::default(),
            FakeSurface::default(),
            FakeClipboard::default(),
        )
        .unwrap()
    }

    const PAGE: &str = r#"<p>
        <span class="katex"><span class="katex-mathml"><math><semantics><annotation encoding="application/x-tex">x^2</annotation></semantics></math></span></span>
        <mjx-container class="MathJax"><mjx-math>y</mjx-math></mjx-container><script type="math/tex">y</script>
        <span class="MathJax_Display">no source</span>
    </p>"#;

    /// Formulas in attachment order: the `mjx-container` (`y`), the display span with no
    /// source, then the KaTeX root (`x^2`)
    fn formula(doc: &Document, index: usize) -> NodeId {
        let formulas = locate_all(doc, &Config::default().formula_selectors().unwrap());
        let mut seen = Vec::new();
        for f in formulas {
            if !seen.contains(&f) {
                seen.push(f);
            }
        }
        seen[index]
    }

    #[test]
    fn scan_attaches_once() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        // The mjx-container matches two signatures but is attached once
        assert_eq!(c.scan(&doc), 3);
        assert_eq!(c.scan(&doc), 0);
        assert_eq!(c.attached().len(), 3);
        let container = doc.get_elements_by_name("mjx-container")[0];
        assert!(c.is_attached(container));
        assert_eq!(c.attached().iter().filter(|&&n| n == container).count(), 1);
    }

    #[test]
    fn rescan_is_debounced_and_prunes() {
        let mut doc = Document::parse(PAGE);
        let mut c = controller();
        c.scan(&doc);
        let t0 = Instant::now();

        let p = doc.get_elements_by_name("p")[0];
        let katex = formula(&doc, 2);
        doc.detach(katex);
        doc.append_html(p, r#"<span class="katex" data-latex="z"></span>"#);
        c.dom_mutated(t0);
        c.dom_mutated(t0 + Duration::from_millis(100));

        c.tick(&doc, t0 + Duration::from_millis(350));
        assert!(c.is_attached(katex));
        c.tick(&doc, t0 + Duration::from_millis(400));
        assert!(!c.is_attached(katex));
        assert_eq!(c.attached().len(), 3);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn hover_shows_button() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        c.scan(&doc);
        assert!(c.hover_enter(&doc, formula(&doc, 2)));
        let button = c.current_button().unwrap();
        assert_eq!(button.latex, "x^2");
        assert_eq!(button.position, None);
        assert_eq!(c.surface().shown, vec!["x^2"]);

        // No source: the old button goes and nothing replaces it
        assert!(!c.hover_enter(&doc, formula(&doc, 1)));
        assert!(c.current_button().is_none());
        assert_eq!(c.surface().hidden, 1);
    }

    #[test]
    fn tooltip_is_truncated() {
        let long = "a".repeat(150);
        let doc = Document::parse(&format!(r#"<span class="katex" data-latex="{long}"></span>"#));
        let mut c = controller();
        assert!(c.hover_enter(&doc, formula(&doc, 0)));
        let button = c.current_button().unwrap();
        assert_eq!(button.latex.len(), 150);
        assert_eq!(button.tooltip, format!("{}...", "a".repeat(100)));
    }

    #[test]
    fn delayed_hide() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        let t0 = Instant::now();
        c.hover_enter(&doc, formula(&doc, 2));
        c.hover_leave(t0);
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(500)));
        c.tick(&doc, t0 + Duration::from_millis(499));
        assert!(c.current_button().is_some());
        c.tick(&doc, t0 + Duration::from_millis(500));
        assert!(c.current_button().is_none());
    }

    #[test]
    fn pointer_on_button_keeps_it() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        let t0 = Instant::now();
        c.hover_enter(&doc, formula(&doc, 2));
        c.hover_leave(t0);
        c.surface_mut().pointer_over = true;
        c.tick(&doc, t0 + Duration::from_secs(1));
        assert!(c.current_button().is_some());
        c.button_leave();
        assert!(c.current_button().is_none());
    }

    #[test]
    fn new_hover_supersedes_pending_hide() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        let t0 = Instant::now();
        c.hover_enter(&doc, formula(&doc, 2));
        c.hover_leave(t0);
        c.hover_enter(&doc, formula(&doc, 0));
        c.tick(&doc, t0 + Duration::from_secs(1));
        let button = c.current_button().unwrap();
        assert_eq!(button.formula, formula(&doc, 0));
        assert_eq!(button.latex, "y");
    }

    #[test]
    fn click_copies_and_notifies() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        let t0 = Instant::now();
        assert!(!c.button_click(t0).unwrap());
        c.hover_enter(&doc, formula(&doc, 2));
        assert!(c.button_click(t0).unwrap());
        assert_eq!(c.clipboard().primary, vec!["x^2"]);
        let shown = &c.surface().notifications;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, COPIED_MESSAGE);
        assert_eq!(shown[0].preview.as_deref(), Some("x^2"));

        c.tick(&doc, t0 + Duration::from_millis(2999));
        assert_eq!(c.notifications().count(), 1);
        c.tick(&doc, t0 + Duration::from_millis(3000));
        assert_eq!(c.notifications().count(), 0);
        assert_eq!(c.surface().dismissed, vec![0]);
    }

    #[test]
    fn clipboard_falls_back_to_selection() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        c.clipboard.fail_primary = true;
        let now = Instant::now();
        assert!(c.double_click(&doc, formula(&doc, 0), now).unwrap());
        assert_eq!(c.clipboard().selection, vec!["y"]);
        assert_eq!(c.surface().notifications.len(), 1);

        assert_eq!(c.copy("z", now).unwrap(), CopyPath::Selection);
        c.clipboard.fail_primary = false;
        assert_eq!(c.copy("z", now).unwrap(), CopyPath::Clipboard);
    }

    #[test]
    fn double_failure_is_reported() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        c.clipboard.fail_primary = true;
        c.clipboard.fail_selection = true;
        assert!(c.double_click(&doc, formula(&doc, 2), Instant::now()).is_err());
        assert!(c.surface().notifications.is_empty());
    }

    #[test]
    fn double_click_can_be_disabled() {
        let doc = Document::parse(PAGE);
        let config = Config {
            double_click_copy: false,
            ..Config::default()
        };
        let mut c = Controller::new(config, FakeSurface::default(), FakeClipboard::default())
            .unwrap();
        assert!(!c.double_click(&doc, formula(&doc, 2), Instant::now()).unwrap());
        assert!(c.clipboard().primary.is_empty());
        // Nothing to copy is not an error either
        let mut c = controller();
        assert!(!c.double_click(&doc, formula(&doc, 1), Instant::now()).unwrap());
    }

    #[test]
    fn button_follows_viewport() {
        let doc = Document::parse(PAGE);
        let mut c = controller();
        c.surface_mut().rect = Some(Rect {
            x: 200.0,
            y: 300.0,
            width: 60.0,
            height: 20.0,
        });
        c.hover_enter(&doc, formula(&doc, 2));
        assert_eq!(
            c.current_button().unwrap().position,
            Some(Position { x: 180.0, y: 262.0 })
        );
        c.surface_mut().rect = Some(Rect {
            x: 0.0,
            y: 5.0,
            width: 20.0,
            height: 20.0,
        });
        c.viewport_resized();
        assert_eq!(c.surface().moved, vec![Some(Position { x: 10.0, y: 33.0 })]);
    }

    #[test]
    fn clicking_notification_reveals_full_text() {
        let mut c = controller();
        let t0 = Instant::now();
        let long = format!(r"\frac{{1}}{{{}}}", "x".repeat(80));
        c.copy(&long, t0).unwrap();
        let shown = c.surface().notifications[0].clone();
        assert_eq!(shown.preview.as_deref().map(|p| p.ends_with("...")), Some(true));

        assert!(c.notification_click(shown.id));
        assert_eq!(c.surface().full_text, vec![long]);
        assert!(!c.notification_click(shown.id + 1));

        let doc = Document::new();
        c.tick(&doc, t0 + Duration::from_secs(3));
        assert!(!c.notification_click(shown.id));
        assert_eq!(c.surface().full_text.len(), 1);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("αβγ", 2), "αβ...");
        assert_eq!(truncate("αβ", 2), "αβ");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn invalid_signature_is_an_error() {
        let config = Config {
            formula_selectors: vec!["span >".to_string()],
            ..Config::default()
        };
        assert!(TestController::new(config, FakeSurface::default(), FakeClipboard::default()).is_err());
    }
}
