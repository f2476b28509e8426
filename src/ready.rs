use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, span, warn, Level};

use crate::config::Config;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartupError {
    #[error("renderer failed to start: {0}")]
    Failed(String),
    #[error("renderer went away before signalling startup")]
    Disconnected,
    #[error("renderer did not signal startup within {0:?}")]
    TimedOut(Duration),
}

/// Completion signal of the page's math renderer, which may never arrive
pub trait StartupSignal {
    /// Block until the renderer has finished its first pass, for at most `timeout`
    fn wait(&self, timeout: Duration) -> Result<(), StartupError>;
}

impl StartupSignal for Receiver<Result<(), String>> {
    fn wait(&self, timeout: Duration) -> Result<(), StartupError> {
        match self.recv_timeout(timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(StartupError::Failed(reason)),
            Err(RecvTimeoutError::Timeout) => Err(StartupError::TimedOut(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(StartupError::Disconnected),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// No renderer signal to wait for
    Absent,
    Ready,
    Failed,
    TimedOut,
}

/// Give the renderer time to finish before the first scan.
///
/// Waits at least `init_delay` and at most `startup_timeout` for `signal`, then lets the page
/// settle for another `init_delay`. A renderer that fails or never answers only costs time.
/// Without a signal this returns straight away.
pub fn wait_for_ready(signal: Option<&dyn StartupSignal>, config: &Config) -> RendererState {
    let Some(signal) = signal else {
        debug!("No renderer to wait for");
        return RendererState::Absent;
    };
    let span = span!(Level::DEBUG, "Waiting for renderer");
    let _enter = span.enter();
    let start = Instant::now();
    let state = match signal.wait(config.startup_timeout) {
        Ok(()) => RendererState::Ready,
        Err(e @ StartupError::TimedOut(_)) => {
            warn!(%e, "Continuing without the renderer");
            RendererState::TimedOut
        }
        Err(e) => {
            warn!(%e, "Continuing anyway");
            RendererState::Failed
        }
    };
    if let Some(rest) = config.init_delay.checked_sub(start.elapsed()) {
        thread::sleep(rest);
    }
    thread::sleep(config.init_delay);
    debug!(?state, elapsed = ?start.elapsed(), "Ready to scan");
    state
}
