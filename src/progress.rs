// src/progress.rs

//! Spinner shown while a buffering engine flushes after its input ended.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Rotating indicator for the trailing, unmetered part of a run.
///
/// Draws on stderr; indicatif hides it automatically when stderr is not a
/// terminal. A disabled spinner is a no-op.
#[derive(Debug)]
pub struct FlushSpinner {
    bar: Option<ProgressBar>,
}

impl FlushSpinner {
    pub fn new(message: impl Into<String>, enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }

        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("|/-\\ ");
        bar.set_style(style);
        bar.set_message(message.into());

        Self { bar: Some(bar) }
    }

    pub fn disabled() -> Self {
        Self { bar: None }
    }

    pub fn tick(&self) {
        if let Some(bar) = &self.bar {
            bar.tick();
        }
    }

    pub fn finish(&self, message: impl Into<String>) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.into());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.bar.as_ref().map(ProgressBar::elapsed).unwrap_or_default()
    }
}

impl Drop for FlushSpinner {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.finish_and_clear();
            }
        }
    }
}
