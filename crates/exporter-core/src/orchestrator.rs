//! Batch scheduler: runs export tasks batch by batch, and stops and rolls
//! back everything that was started when the run is cancelled or aborted.

use crate::error::{ExportError, Result};
use crate::export::{ExportContext, ExportTask};
use crate::progress::{ProgressHandle, ProgressMonitor, EXPORT_TICKS};
use crate::remote::{DestinationHost, SourceHost, VersionControl};
use crate::report::{ExportReport, ProjectReport};
use crate::status::StatusSet;
use crate::task::{FailureMode, Task};
use crate::types::{ConflictPolicy, ProjectDescriptor};

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default number of projects exported concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default time to wait for stopped workers before rolling back.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings of one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub conflict_policy: ConflictPolicy,
    /// Temporary base directory for clones. Must not exist yet.
    pub tmp_dir: PathBuf,
    /// Maximum number of projects per batch.
    pub batch_size: usize,
    /// How long stopped workers are waited for.
    pub stop_timeout: Duration,
    /// Mark every project as a dry run and execute nothing.
    pub dry_run: bool,
    /// Whether a failing project aborts the whole run.
    pub failure_mode: FailureMode,
    /// Draw progress bars on stderr.
    pub show_progress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            tmp_dir: PathBuf::from("tmp"),
            batch_size: DEFAULT_BATCH_SIZE,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            dry_run: false,
            failure_mode: FailureMode::default(),
            show_progress: false,
        }
    }
}

impl ExportOptions {
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_tmp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_dir = path.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}

/// Split `projects` into consecutive batches of at most `size` entries.
pub fn split_into_batches(projects: &[ProjectDescriptor], size: usize) -> Vec<&[ProjectDescriptor]> {
    projects.chunks(size.max(1)).collect()
}

/// Exclusive temporary directory, removed on drop.
struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    fn create(path: &Path) -> Result<Self> {
        let work_dir_error = |e: std::io::Error| ExportError::WorkDir {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        std::fs::create_dir(path).map_err(work_dir_error)?;
        let path = path.canonicalize().map_err(work_dir_error)?;
        debug!(path = %path.display(), "Created working directory");
        Ok(Self { path })
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), "Failed to remove working directory: {e}");
        }
    }
}

/// How a batch ended.
enum BatchEnd {
    Completed,
    Cancelled,
    Aborted { task: String, error: ExportError },
}

/// Runs export tasks for a list of projects.
pub struct Exporter {
    source: Arc<dyn SourceHost>,
    destination: Arc<dyn DestinationHost>,
    vcs: Arc<dyn VersionControl>,
    cancel: CancellationToken,
}

impl Exporter {
    pub fn new(
        source: Arc<dyn SourceHost>,
        destination: Arc<dyn DestinationHost>,
        vcs: Arc<dyn VersionControl>,
    ) -> Self {
        Self {
            source,
            destination,
            vcs,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token to cancel runs.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels the current run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Export `projects`.
    ///
    /// Fails only when the run cannot be set up; per-project outcomes,
    /// cancellation and aborts are described by the returned report.
    pub async fn run(
        &self,
        projects: &[ProjectDescriptor],
        options: &ExportOptions,
    ) -> Result<ExportReport> {
        let mut report = ExportReport::new();
        let batches = split_into_batches(projects, options.batch_size);
        info!(
            projects = projects.len(),
            batches = batches.len(),
            dry_run = options.dry_run,
            "Starting export"
        );

        let work_dir = if options.dry_run {
            None
        } else {
            Some(WorkDir::create(&options.tmp_dir)?)
        };
        let context = ExportContext {
            source: self.source.clone(),
            destination: self.destination.clone(),
            vcs: self.vcs.clone(),
            base_dir: work_dir
                .as_ref()
                .map_or_else(|| options.tmp_dir.clone(), |w| w.path.clone()),
            conflict_policy: options.conflict_policy,
            failure_mode: options.failure_mode,
        };
        let run_token = self.cancel.child_token();

        let mut constructed: Vec<Arc<ExportTask>> = Vec::new();
        let mut started: Vec<Arc<ExportTask>> = Vec::new();
        let mut end = BatchEnd::Completed;

        for (index, batch) in batches.iter().enumerate() {
            if options.dry_run {
                for project in batch.iter() {
                    let task = Arc::new(ExportTask::new(
                        project.clone(),
                        context.clone(),
                        ProgressHandle::hidden(),
                        run_token.child_token(),
                    ));
                    task.mark_dry_run();
                    info!(task = %task.id(), "Dry run, nothing executed");
                    constructed.push(task);
                }
                continue;
            }

            if self.cancel.is_cancelled() {
                end = BatchEnd::Cancelled;
                break;
            }

            info!(batch = index + 1, of = batches.len(), size = batch.len(), "Starting batch");
            let monitor = Arc::new(ProgressMonitor::new(
                options.show_progress,
                run_token.child_token(),
            ));
            let tasks: Vec<Arc<ExportTask>> = batch
                .iter()
                .map(|project| {
                    let progress = monitor.register(&project.label(), EXPORT_TICKS, "WAITING");
                    Arc::new(ExportTask::new(
                        project.clone(),
                        context.detached(),
                        progress,
                        run_token.child_token(),
                    ))
                })
                .collect();
            constructed.extend(tasks.iter().cloned());
            started.extend(tasks.iter().cloned());

            end = self.run_batch(&tasks, monitor, options).await;
            if !matches!(end, BatchEnd::Completed) {
                break;
            }
            debug!(batch = index + 1, "Batch finished");
        }

        match &end {
            BatchEnd::Completed => {}
            BatchEnd::Cancelled => {
                warn!("Export cancelled, rolling back");
                report.interrupted = true;
            }
            BatchEnd::Aborted { task, error } => {
                error!(task = %task, "Export aborted: {error}");
                report.aborted_by = Some(task.clone());
            }
        }
        if !matches!(end, BatchEnd::Completed) {
            report.rollback_failures = rollback_all(&started).await;
        }

        let mut tasks = constructed.iter();
        let mut next = tasks.next();
        for project in projects {
            let entry = match next {
                Some(task) if task.project() == project => {
                    next = tasks.next();
                    ProjectReport::new(project, !options.dry_run, task.status()).with_failures(
                        task.failures().iter().map(ToString::to_string).collect(),
                    )
                }
                _ => ProjectReport::new(project, false, StatusSet::new()),
            };
            report.projects.push(entry);
        }

        drop(work_dir);
        report.complete();
        info!(successful = report.is_successful(), "Export finished");
        Ok(report)
    }

    async fn run_batch(
        &self,
        tasks: &[Arc<ExportTask>],
        monitor: Arc<ProgressMonitor>,
        options: &ExportOptions,
    ) -> BatchEnd {
        let monitor_worker = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.run().await })
        };

        let mut workers = JoinSet::new();
        for task in tasks {
            let task = task.clone();
            workers.spawn(async move {
                let id = task.id().to_string();
                let outcome = AssertUnwindSafe(task.run()).catch_unwind().await;
                let result = outcome.unwrap_or_else(|panic| {
                    Err(ExportError::WorkerPanicked {
                        task: id.clone(),
                        message: panic_message(panic.as_ref()),
                    })
                });
                (id, result)
            });
        }

        let mut end = BatchEnd::Completed;
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok((_, Ok(())))) => {}
                    Some(Ok((task, Err(error)))) => {
                        end = BatchEnd::Aborted { task, error };
                        break;
                    }
                    Some(Err(join_error)) => {
                        end = BatchEnd::Aborted {
                            task: "worker".to_string(),
                            error: ExportError::WorkerPanicked {
                                task: "worker".to_string(),
                                message: join_error.to_string(),
                            },
                        };
                        break;
                    }
                },
                _ = self.cancel.cancelled() => {
                    end = BatchEnd::Cancelled;
                    break;
                }
            }
        }

        // Stopped tasks may all have returned before the cancellation branch won.
        if matches!(end, BatchEnd::Completed) && self.cancel.is_cancelled() {
            end = BatchEnd::Cancelled;
        }

        if !matches!(end, BatchEnd::Completed) {
            for task in tasks {
                task.stop();
            }
            let drained = tokio::time::timeout(options.stop_timeout, async {
                while let Some(joined) = workers.join_next().await {
                    if let Ok((task, Err(e))) = joined {
                        debug!(task = %task, "Stopped worker failed: {e}");
                    }
                }
            })
            .await;
            if drained.is_err() {
                warn!(
                    remaining = workers.len(),
                    "Workers did not stop within {:?}, detaching them",
                    options.stop_timeout
                );
                workers.detach_all();
            }
        }

        monitor.stop();
        match tokio::time::timeout(options.stop_timeout, monitor_worker).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Progress monitor terminated abnormally: {e}"),
            Err(_) => warn!("Progress monitor did not stop in time"),
        }
        end
    }
}

/// Roll back `tasks` in order, continuing past failures.
async fn rollback_all(tasks: &[Arc<ExportTask>]) -> Vec<String> {
    let mut failures = Vec::new();
    for task in tasks {
        match task.rollback().await {
            Ok(()) => info!(task = %task.id(), "ROLLBACK successful"),
            Err(e) => {
                error!(task = %task.id(), "ROLLBACK error: {e}");
                failures.push(e.to_string());
            }
        }
    }
    failures
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;

    fn projects(count: usize) -> Vec<ProjectDescriptor> {
        (0..count)
            .map(|i| ProjectDescriptor::new(format!("p{i}"), format!("p{i}"), Visibility::Private))
            .collect()
    }

    #[test]
    fn test_batches_preserve_order_and_size() {
        let all = projects(7);
        let batches = split_into_batches(&all, 3);

        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(batches[2][0].source, "p6");
    }

    #[test]
    fn test_batch_size_zero_is_one() {
        assert_eq!(split_into_batches(&projects(2), 0).len(), 2);
        assert!(split_into_batches(&[], 5).is_empty());
    }

    #[test]
    fn test_work_dir_must_not_exist() {
        let parent = tempfile::TempDir::new().unwrap();
        let path = parent.path().join("tmp");

        let work_dir = WorkDir::create(&path).unwrap();
        assert!(path.is_dir());
        assert!(matches!(
            WorkDir::create(&path),
            Err(ExportError::WorkDir { .. })
        ));

        std::fs::write(path.join("file"), "x").unwrap();
        drop(work_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
