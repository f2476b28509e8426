use std::time::Duration;

use css::{Selector, SelectorError};

/// Signatures of the containers MathJax (v2 and v3) and KaTeX render into
pub static DEFAULT_FORMULA_SELECTORS: &[&str] = &[
    ".MathJax",
    ".MathJax_Display",
    "mjx-container",
    ".katex",
    ".katex-display",
];

/// Timing and presentation knobs. None of these affect what is extracted, only when and how it
/// is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub formula_selectors: Vec<String>,
    /// Settle time before the first scan, applied once before and once after the renderer
    /// signal
    pub init_delay: Duration,
    /// Quiet period after a document mutation before rescanning
    pub debounce_delay: Duration,
    /// Grace period after the pointer leaves a formula, so it can reach the button
    pub hide_button_delay: Duration,
    pub notification_duration: Duration,
    /// Upper bound on waiting for the renderer's startup signal
    pub startup_timeout: Duration,
    pub button_offset: f64,
    pub viewport_padding: f64,
    pub tooltip_max_len: usize,
    pub preview_max_len: usize,
    pub double_click_copy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            formula_selectors: DEFAULT_FORMULA_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            init_delay: Duration::from_millis(500),
            debounce_delay: Duration::from_millis(300),
            hide_button_delay: Duration::from_millis(500),
            notification_duration: Duration::from_millis(3000),
            startup_timeout: Duration::from_millis(3000),
            button_offset: 8.0,
            viewport_padding: 10.0,
            tooltip_max_len: 100,
            preview_max_len: 60,
            double_click_copy: true,
        }
    }
}

impl Config {
    /// Apply command line overrides on top of the defaults.
    ///
    /// Durations are given in milliseconds. `--selector` may be repeated and replaces the
    /// default signature list entirely.
    pub fn from_args(pargs: &mut pico_args::Arguments) -> Result<Self, pico_args::Error> {
        let mut config = Self::default();
        if let Some(d) = opt_millis(pargs, "--init-delay")? {
            config.init_delay = d;
        }
        if let Some(d) = opt_millis(pargs, "--debounce")? {
            config.debounce_delay = d;
        }
        if let Some(d) = opt_millis(pargs, "--hide-delay")? {
            config.hide_button_delay = d;
        }
        if let Some(d) = opt_millis(pargs, "--notification")? {
            config.notification_duration = d;
        }
        if let Some(d) = opt_millis(pargs, "--startup-timeout")? {
            config.startup_timeout = d;
        }
        if pargs.contains("--no-dblclick") {
            config.double_click_copy = false;
        }
        let selectors: Vec<String> = pargs.values_from_str("--selector")?;
        if !selectors.is_empty() {
            config.formula_selectors = selectors;
        }
        Ok(config)
    }

    /// Parse the configured formula signatures
    pub fn formula_selectors(&self) -> Result<Vec<Selector>, SelectorError> {
        self.formula_selectors.iter().map(|s| s.parse()).collect()
    }
}

fn opt_millis(
    pargs: &mut pico_args::Arguments,
    key: &'static str,
) -> Result<Option<Duration>, pico_args::Error> {
    Ok(pargs
        .opt_value_from_str::<_, u64>(key)?
        .map(Duration::from_millis))
}
