//! Unit-of-work abstraction shared by every export step.
//!
//! A task runs once, can be stopped cooperatively from another worker and can
//! roll back the destination-side effects of itself and the children it owns.
//! Stopping cancels the task's [`CancellationToken`]; children are created from
//! a child token so a stop reaches them even before they start running.

use crate::error::{ExportError, RemoteError, Result};
use crate::status::{Status, StatusSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How a task treats a failure once it has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Keep the failure at the task boundary.
    #[default]
    Isolate,
    /// Return the failure to the caller.
    Abort,
}

/// A cancellable, rollback-capable unit of work.
#[async_trait]
pub trait Task: Send + Sync {
    /// Shared bookkeeping of this task.
    fn core(&self) -> &TaskCore;

    /// Execute the task.
    async fn run(&self) -> Result<()>;

    /// Undo destination-side effects. Children are rolled back first.
    async fn rollback(&self) -> Result<()> {
        self.core().rollback_children().await
    }

    fn id(&self) -> &str {
        self.core().id()
    }

    /// Request a cooperative stop of this task and everything it owns.
    fn stop(&self) {
        self.core().stop();
    }

    fn is_running(&self) -> bool {
        self.core().is_running()
    }

    fn status(&self) -> StatusSet {
        self.core().status()
    }

    fn failures(&self) -> Vec<ExportError> {
        self.core().failures()
    }
}

/// State common to all tasks.
pub struct TaskCore {
    id: String,
    mode: FailureMode,
    running: AtomicBool,
    cancel: CancellationToken,
    status: Mutex<StatusSet>,
    failures: Mutex<Vec<ExportError>>,
    children: Mutex<Vec<Arc<dyn Task>>>,
}

impl TaskCore {
    pub fn new(id: impl Into<String>, mode: FailureMode, cancel: CancellationToken) -> Self {
        Self {
            id: id.into(),
            mode,
            running: AtomicBool::new(false),
            cancel,
            status: Mutex::new(StatusSet::new()),
            failures: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> FailureMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Mark the task as running until the returned guard is dropped.
    pub fn enter(&self) -> RunningGuard<'_> {
        self.running.store(true, Ordering::SeqCst);
        RunningGuard {
            running: &self.running,
        }
    }

    /// Token for a child task; stopping this task stops the child.
    pub fn child_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Token observed by this task's checkpoints.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Interruption checkpoint.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ExportError::Interrupted(self.id.clone()));
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        self.running.store(false, Ordering::SeqCst);
        for child in self.children() {
            child.stop();
        }
    }

    pub fn mark(&self, status: Status) {
        self.status.lock().insert(status);
    }

    pub fn status(&self) -> StatusSet {
        *self.status.lock()
    }

    /// Wrap a collaborator failure with this task's identity.
    pub fn task_error(&self, source: RemoteError) -> ExportError {
        ExportError::Task {
            task: self.id.clone(),
            source,
        }
    }

    /// Wrap a compensation failure with this task's identity.
    pub fn rollback_error(&self, source: RemoteError) -> ExportError {
        ExportError::Rollback {
            task: self.id.clone(),
            source,
        }
    }

    /// Append a failure to the captured list and set its status marker.
    pub fn record(&self, error: &ExportError) {
        if let Some(marker) = error.status_marker() {
            self.mark(marker);
        }
        debug!(task = %self.id, error = ?error, "Captured failure");
        self.failures.lock().push(error.clone());
    }

    /// Apply the failure mode to an already recorded failure.
    pub fn escalate(&self, error: ExportError) -> Result<()> {
        match self.mode {
            FailureMode::Abort => Err(error),
            FailureMode::Isolate => {
                info!(task = %self.id, "{error}");
                Ok(())
            }
        }
    }

    pub fn failures(&self) -> Vec<ExportError> {
        self.failures.lock().clone()
    }

    /// Take ownership of a child task.
    pub fn adopt(&self, child: Arc<dyn Task>) {
        self.children.lock().push(child);
    }

    pub fn children(&self) -> Vec<Arc<dyn Task>> {
        self.children.lock().clone()
    }

    pub async fn rollback_children(&self) -> Result<()> {
        for child in self.children() {
            child.rollback().await?;
        }
        Ok(())
    }
}

/// Clears the running flag of a task when dropped.
pub struct RunningGuard<'a> {
    running: &'a AtomicBool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf {
        core: TaskCore,
    }

    #[async_trait]
    impl Task for Leaf {
        fn core(&self) -> &TaskCore {
            &self.core
        }

        async fn run(&self) -> Result<()> {
            let _running = self.core.enter();
            self.core.checkpoint()
        }
    }

    fn leaf(id: &str, token: CancellationToken) -> Arc<Leaf> {
        Arc::new(Leaf {
            core: TaskCore::new(id, FailureMode::Abort, token),
        })
    }

    #[tokio::test]
    async fn test_running_flag_only_during_run() {
        let task = leaf("leaf", CancellationToken::new());
        assert!(!task.is_running());
        task.run().await.unwrap();
        assert!(!task.is_running());

        let guard = task.core().enter();
        assert!(task.is_running());
        drop(guard);
        assert!(!task.is_running());
    }

    #[tokio::test]
    async fn test_stop_propagates_to_children() {
        let parent = leaf("parent", CancellationToken::new());
        let adopted = leaf("adopted", CancellationToken::new());
        let derived = leaf("derived", parent.core().child_token());
        parent.core().adopt(adopted.clone());

        parent.stop();

        assert!(parent.core().is_stopped());
        assert!(adopted.core().is_stopped());
        assert!(derived.core().is_stopped());
        assert!(matches!(
            derived.run().await,
            Err(ExportError::Interrupted(id)) if id == "derived"
        ));
    }

    #[test]
    fn test_record_and_escalate() {
        let core = TaskCore::new("a->b", FailureMode::Isolate, CancellationToken::new());
        let err = ExportError::NoSourceProject("a".into());
        core.record(&err);
        assert!(core.escalate(err).is_ok());
        assert!(core.status().contains(Status::NoSourceProject));
        assert_eq!(core.failures().len(), 1);

        let core = TaskCore::new("a->b", FailureMode::Abort, CancellationToken::new());
        let err = core.task_error(RemoteError::ApiError("boom".into()));
        assert!(core.escalate(err).is_err());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_isolated_failures_stay_below_warn() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let core = TaskCore::new("a->b", FailureMode::Isolate, CancellationToken::new());
            let err = ExportError::NoSourceProject("a".into());
            core.record(&err);
            assert!(core.escalate(err).is_ok());
        });

        assert!(captured.0.lock().is_empty());
    }
}
