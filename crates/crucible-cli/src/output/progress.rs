//! Progress bar and spinner utilities for the `build`/`push`/`run` verbs.

use indicatif::{
    MultiProgress as IndicatifMultiProgress, ProgressBar as IndicatifProgressBar,
    ProgressStyle as IndicatifProgressStyle,
};
use std::time::Duration;

/// Progress bar style presets.
#[derive(Debug, Clone, Copy)]
pub enum ProgressStyle {
    /// Standard progress bar with percentage, for iterating a known
    /// number of images (`build`, `push`).
    Bar,
    /// Spinner for indeterminate progress (an in-flight sandbox run,
    /// a graph query, a single `run` invocation).
    Spinner,
}

impl ProgressStyle {
    const fn template(self, unicode: bool) -> &'static str {
        match self {
            Self::Bar if unicode => "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            Self::Bar => "{spinner} [{bar:40}] {pos}/{len} {msg}",
            Self::Spinner if unicode => "{spinner:.green} {msg}",
            Self::Spinner => "{spinner} {msg}",
        }
    }

    const fn spinner_chars(self, unicode: bool) -> &'static str {
        if unicode {
            "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"
        } else {
            "-\\|/"
        }
    }

    fn to_indicatif(self, unicode: bool) -> IndicatifProgressStyle {
        IndicatifProgressStyle::default_bar()
            .template(self.template(unicode))
            .expect("valid template")
            .tick_chars(self.spinner_chars(unicode))
            .progress_chars(if unicode { "█▓▒░" } else { "=>-" })
    }
}

/// Wrapper around indicatif's `ProgressBar` with our styling.
pub struct ProgressBar {
    inner: IndicatifProgressBar,
}

impl ProgressBar {
    /// Create a new progress bar with the given length.
    pub fn new(len: u64, style: ProgressStyle) -> Self {
        let unicode = crate::output::unicode_enabled();
        let pb = IndicatifProgressBar::new(len);
        pb.set_style(style.to_indicatif(unicode));
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { inner: pb }
    }

    /// Create a hidden progress bar (for quiet mode).
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifProgressBar::hidden(),
        }
    }

    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    pub fn set_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.set_message(msg);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    pub fn abandon_with_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.abandon_with_message(msg);
    }
}

/// A spinner for a single indeterminate-length operation.
pub struct Spinner {
    inner: IndicatifProgressBar,
}

impl Spinner {
    pub fn new(msg: impl Into<std::borrow::Cow<'static, str>>) -> Self {
        let unicode = crate::output::unicode_enabled();
        let pb = IndicatifProgressBar::new_spinner();
        pb.set_style(ProgressStyle::Spinner.to_indicatif(unicode));
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { inner: pb }
    }

    pub fn hidden() -> Self {
        Self {
            inner: IndicatifProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.set_message(msg);
    }

    pub fn finish_with_message(&self, msg: impl Into<std::borrow::Cow<'static, str>>) {
        self.inner.finish_with_message(msg);
    }

    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// Container for running several progress indicators side by side,
/// used by `build`/`push` when iterating more than one sandbox image.
pub struct MultiProgress {
    inner: IndicatifMultiProgress,
}

impl MultiProgress {
    pub fn new() -> Self {
        Self {
            inner: IndicatifMultiProgress::new(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            inner: IndicatifMultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()),
        }
    }

    pub fn add(&self, len: u64, style: ProgressStyle) -> ProgressBar {
        let unicode = crate::output::unicode_enabled();
        let pb = self.inner.add(IndicatifProgressBar::new(len));
        pb.set_style(style.to_indicatif(unicode));
        pb.enable_steady_tick(Duration::from_millis(80));
        ProgressBar { inner: pb }
    }
}

impl Default for MultiProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_styles_produce_valid_templates() {
        for style in [ProgressStyle::Bar, ProgressStyle::Spinner] {
            let _ = style.to_indicatif(true);
            let _ = style.to_indicatif(false);
        }
    }
}
