use indicatif::{ProgressBar, ProgressStyle};
use tracing::Span;

/// Per-run logging context handed to every component.
///
/// Replaces process-wide verbosity: the span scopes all log lines of one
/// selection run, and `progress` decides whether bars are drawn.
#[derive(Debug, Clone)]
pub struct RunContext {
    span: Span,
    progress: bool,
}

impl RunContext {
    pub fn new(strategy: &str, progress: bool) -> Self {
        Self {
            span: tracing::info_span!("selection", strategy = %strategy),
            progress,
        }
    }

    /// No span, no progress bar.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self {
            span: Span::none(),
            progress: false,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn progress_bar(&self, len: u64, message: &'static str) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("|| "));
        }
        pb.set_message(message);
        pb
    }
}
