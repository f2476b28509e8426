//! Delivery shell for a terminal session. Copies go to the platform clipboard, with the
//! terminal's own clipboard (OSC 52) as the fallback. The button and notifications become lines
//! on stderr.

use std::fmt::Debug;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, trace};

use crate::controller::{CopyButton, Notification, Surface};
use crate::placement::{Rect, Size};

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(&'static str),
    #[error("clipboard access failed: {0}")]
    AccessFailed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
    /// Compatibility path, used when [`Clipboard::write_text`] fails
    fn copy_selection(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard through `arboard`, falling back to the terminal.
///
/// The fallback sends OSC 52 when `out` is a terminal. Otherwise it prints the text itself, so
/// it can be piped into something else.
pub struct SystemClipboard<W> {
    platform: Option<arboard::Clipboard>,
    out: W,
    is_terminal: bool,
}

impl<W: Write> SystemClipboard<W> {
    /// Connect to the platform clipboard. Failing to is not an error, only the fallback is left.
    pub fn new(out: W, is_terminal: bool) -> Self {
        let platform = match arboard::Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                debug!(%e, "No platform clipboard");
                None
            }
        };
        Self::with_platform(platform, out, is_terminal)
    }

    pub fn with_platform(
        platform: Option<arboard::Clipboard>,
        out: W,
        is_terminal: bool,
    ) -> Self {
        Self {
            platform,
            out,
            is_terminal,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl SystemClipboard<io::Stdout> {
    pub fn stdout() -> Self {
        use std::io::IsTerminal;
        let out = io::stdout();
        let is_terminal = out.is_terminal();
        Self::new(out, is_terminal)
    }
}

impl<W: Write> Clipboard for SystemClipboard<W> {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let platform = self
            .platform
            .as_mut()
            .ok_or(ClipboardError::Unavailable("no platform clipboard"))?;
        platform
            .set_text(text)
            .map_err(|e| ClipboardError::AccessFailed(e.to_string()))
    }

    fn copy_selection(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.is_terminal {
            trace!(len = text.len(), "Sending OSC 52");
            write!(self.out, "\x1b]52;c;{}\x07", STANDARD.encode(text))?;
        } else {
            writeln!(self.out, "{}", text)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Shows buttons and notifications as text. It has no geometry, so buttons are never placed.
pub struct TerminalSurface<W> {
    out: W,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: std::fmt::Arguments) {
        // Losing a status line is not worth failing over
        if let Err(e) = writeln!(self.out, "{}", args) {
            trace!(%e, "Could not write to terminal");
        }
    }
}

impl TerminalSurface<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<N: Debug, W: Write> Surface<N> for TerminalSurface<W> {
    fn show_button(&mut self, button: &CopyButton<N>) {
        self.line(format_args!("[Copy LaTeX] {}", button.tooltip));
    }

    fn move_button(&mut self, _button: &CopyButton<N>) {}

    fn hide_button(&mut self, button: &CopyButton<N>) {
        trace!(formula = ?button.formula, "Button hidden");
    }

    fn pointer_over_button(&self, _button: &CopyButton<N>) -> bool {
        false
    }

    fn formula_rect(&self, _formula: N) -> Option<Rect> {
        None
    }

    fn button_size(&self) -> Size {
        Size::default()
    }

    fn viewport_width(&self) -> f64 {
        0.0
    }

    fn show_notification(&mut self, notification: &Notification) {
        match &notification.preview {
            Some(preview) => self.line(format_args!("{} {}", notification.message, preview)),
            None => self.line(format_args!("{}", notification.message)),
        }
    }

    fn dismiss_notification(&mut self, notification: &Notification) {
        trace!(id = notification.id, "Notification dismissed");
    }

    fn show_full_text(&mut self, text: &str) {
        self.line(format_args!("Full LaTeX: {}", text));
    }
}
