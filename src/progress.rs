use std::cell::RefCell;

use indicatif::{ProgressBar, ProgressStyle};

/// Receives `[current/total]` events from the indexer and executor.
///
/// Rendering is a presentation concern: the core only reports positions and
/// the path currently being worked on.
pub trait ProgressReporter {
    fn begin(&self, total: u64, label: &str);
    fn update(&self, current: u64, detail: &str);
    fn finish(&self);
}

/// Reporter that renders nothing, used for --no-progress and JSON output.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn begin(&self, _total: u64, _label: &str) {}
    fn update(&self, _current: u64, _detail: &str) {}
    fn finish(&self) {}
}

/// Terminal progress bar backed by indicatif.
pub struct TermProgress {
    bar: RefCell<Option<ProgressBar>>,
}

impl TermProgress {
    pub fn new() -> Self {
        Self {
            bar: RefCell::new(None),
        }
    }
}

impl ProgressReporter for TermProgress {
    fn begin(&self, total: u64, label: &str) {
        let bar = ProgressBar::new(total);
        let style = ProgressStyle::with_template("{prefix} [{pos}/{len}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(label.to_string());
        *self.bar.borrow_mut() = Some(bar);
    }

    fn update(&self, current: u64, detail: &str) {
        if let Some(bar) = self.bar.borrow().as_ref() {
            bar.set_position(current);
            bar.set_message(detail.to_string());
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.finish_and_clear();
        }
    }
}
