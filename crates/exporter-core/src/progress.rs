//! Progress tracking for export operations.

use crate::error::Result;
use crate::task::{FailureMode, Task, TaskCore};

use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Number of progress ticks of one export.
pub const EXPORT_TICKS: u64 = 5;

/// Interval between two refreshes of the progress display.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const BAR_TEMPLATE: &str = "{prefix:<32} {percent:>3}%|{bar:30}| {pos}/{len} [{msg}]";

/// Progress indicator of one export.
#[derive(Clone)]
pub struct ProgressHandle {
    bar: ProgressBar,
}

impl ProgressHandle {
    /// A progress indicator that is never drawn.
    pub fn hidden() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(EXPORT_TICKS);
        Self { bar }
    }

    pub fn set_message(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Advance by one tick and update the message.
    pub fn tick(&self, msg: &str) {
        self.bar.inc(1);
        self.set_message(msg);
    }

    /// Jump to completion with a final message.
    pub fn finish_with(&self, msg: &str) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.set_message(msg);
    }

    pub fn is_finished(&self) -> bool {
        self.bar.length().is_some_and(|len| self.bar.position() >= len)
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    fn refresh(&self) {
        self.bar.tick();
    }

    fn close(&self) {
        self.bar.abandon();
    }
}

/// Task that keeps the progress bars of one batch up to date.
///
/// The monitor finishes on its own once every registered bar is complete,
/// otherwise it runs until stopped.
pub struct ProgressMonitor {
    core: TaskCore,
    multi: MultiProgress,
    style: ProgressStyle,
    bars: Mutex<Vec<ProgressHandle>>,
}

impl ProgressMonitor {
    pub fn new(visible: bool, cancel: CancellationToken) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self {
            core: TaskCore::new("Progress Bar", FailureMode::Isolate, cancel),
            multi: MultiProgress::with_draw_target(target),
            style,
            bars: Mutex::new(Vec::new()),
        }
    }

    /// Add a bar of `total` ticks.
    pub fn register(&self, name: &str, total: u64, initial_message: &str) -> ProgressHandle {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_prefix(name.to_string());
        bar.set_message(initial_message.to_string());

        let handle = ProgressHandle { bar };
        self.bars.lock().push(handle.clone());
        handle
    }

    pub fn all_finished(&self) -> bool {
        self.bars.lock().iter().all(ProgressHandle::is_finished)
    }

    fn refresh(&self) {
        for bar in self.bars.lock().iter() {
            bar.refresh();
        }
    }
}

#[async_trait]
impl Task for ProgressMonitor {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    async fn run(&self) -> Result<()> {
        let _running = self.core.enter();

        while !self.all_finished() && !self.core.is_stopped() {
            self.refresh();
            tokio::select! {
                _ = tokio::time::sleep(REFRESH_INTERVAL) => {}
                _ = self.core.token().cancelled() => {}
            }
        }

        self.refresh();
        for bar in self.bars.lock().iter() {
            bar.close();
        }
        Ok(())
    }
}
