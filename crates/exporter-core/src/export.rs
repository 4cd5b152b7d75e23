//! Export of one project: conflict resolution, fetch, push and rollback.

use crate::error::{ExportError, Result};
use crate::fetch::FetchTask;
use crate::progress::ProgressHandle;
use crate::push::PushTask;
use crate::remote::{DestinationHost, SourceHost, VersionControl};
use crate::status::Status;
use crate::task::{FailureMode, Task, TaskCore};
use crate::types::{ConflictPolicy, ProjectDescriptor};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Collaborators and settings shared by the exports of one run.
#[derive(Clone)]
pub struct ExportContext {
    pub source: Arc<dyn SourceHost>,
    pub destination: Arc<dyn DestinationHost>,
    pub vcs: Arc<dyn VersionControl>,
    /// Shared directory the clones are placed in.
    pub base_dir: PathBuf,
    pub conflict_policy: ConflictPolicy,
    pub failure_mode: FailureMode,
}

impl ExportContext {
    /// Copy of this context with freshly cloned host clients.
    pub fn detached(&self) -> Self {
        Self {
            source: self.source.clone_client(),
            destination: self.destination.clone_client(),
            ..self.clone()
        }
    }
}

/// Exports a single project from the source host to the destination host.
pub struct ExportTask {
    core: TaskCore,
    project: ProjectDescriptor,
    context: ExportContext,
    progress: ProgressHandle,
    existed_before: Mutex<Option<bool>>,
}

impl ExportTask {
    pub fn new(
        project: ProjectDescriptor,
        context: ExportContext,
        progress: ProgressHandle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            core: TaskCore::new(project.id(), context.failure_mode, cancel),
            project,
            context,
            progress,
            existed_before: Mutex::new(None),
        }
    }

    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Whether the destination repository existed when the export started.
    ///
    /// `None` until the conflict check has run.
    pub fn existed_before(&self) -> Option<bool> {
        *self.existed_before.lock()
    }

    /// Record a dry run without executing anything.
    pub fn mark_dry_run(&self) {
        self.core.mark(Status::DryRun);
        self.progress.finish_with("DRY RUN");
    }

    async fn export(&self) -> Result<()> {
        self.core.checkpoint()?;
        let destination = &self.context.destination;
        let name = &self.project.destination;

        self.progress.set_message("Checking GitHub repo");
        let owner = destination
            .login()
            .await
            .map_err(|e| self.core.task_error(e))?;
        let existed = destination
            .repository_exists(name, &owner)
            .await
            .map_err(|e| self.core.task_error(e))?;
        *self.existed_before.lock() = Some(existed);

        if existed {
            if !self.context.conflict_policy.overwrites() {
                info!(
                    task = %self.core.id(),
                    "Skipping export, '{name}' already exists on GitHub"
                );
                self.core.mark(Status::Skipped);
                self.progress.finish_with("SKIPPED");
                return Ok(());
            }

            self.progress.set_message("Deleting GitHub project");
            info!(task = %self.core.id(), "Overwriting GitHub project '{name}'");
            destination
                .delete_repository(name, &owner)
                .await
                .map_err(|e| self.core.task_error(e))?;
            self.core.mark(Status::Overwritten);
            self.progress.set_message("GitHub project deleted");
        }

        let fetch = Arc::new(FetchTask::new(
            self.context.source.clone(),
            self.context.vcs.clone(),
            self.project.source.clone(),
            self.context.base_dir.clone(),
            self.progress.clone(),
            FailureMode::Abort,
            self.core.child_token(),
        ));
        self.core.adopt(fetch.clone());
        self.core.checkpoint()?;
        self.progress.set_message("Starting fetching GitLab project");
        let repo = fetch.fetch().await?;
        self.core.mark(Status::Fetched);

        let push = Arc::new(PushTask::new(
            destination.clone(),
            self.context.vcs.clone(),
            repo,
            name.clone(),
            self.project.visibility,
            self.progress.clone(),
            FailureMode::Abort,
            self.core.child_token(),
        ));
        self.core.adopt(push.clone());
        self.core.checkpoint()?;
        self.progress.set_message("Starting pushing to GitHub");
        push.push().await?;

        self.core.mark(Status::Success);
        self.progress.finish_with("DONE");
        info!(task = %self.core.id(), "Export finished");
        Ok(())
    }

    async fn undo(&self) -> Result<()> {
        self.core.rollback_children().await?;

        if self.existed_before() != Some(false) {
            debug!(task = %self.core.id(), "Destination not created by this run, keeping it");
            return Ok(());
        }

        let destination = &self.context.destination;
        let name = &self.project.destination;
        let owner = destination
            .login()
            .await
            .map_err(|e| self.core.rollback_error(e))?;
        let exists = destination
            .repository_exists(name, &owner)
            .await
            .map_err(|e| self.core.rollback_error(e))?;
        if exists {
            destination
                .delete_repository(name, &owner)
                .await
                .map_err(|e| self.core.rollback_error(e))?;
            info!(task = %self.core.id(), "Deleted GitHub repository '{name}'");
        }
        Ok(())
    }
}

#[async_trait]
impl Task for ExportTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    async fn run(&self) -> Result<()> {
        let _running = self.core.enter();

        match self.export().await {
            Ok(()) => Ok(()),
            Err(ExportError::Interrupted(_)) => {
                self.core.mark(Status::Interrupted);
                self.progress.set_message("INTERRUPTED");
                warn!(task = %self.core.id(), "Export interrupted");
                Ok(())
            }
            Err(e) => {
                self.core.mark(Status::Error);
                self.core.record(&e);
                self.progress.set_message("RUN ERROR");
                debug!(task = %self.core.id(), error = ?e, "Export failed");
                self.core.escalate(e)
            }
        }
    }

    async fn rollback(&self) -> Result<()> {
        match self.undo().await {
            Ok(()) => {
                self.core.mark(Status::Rollbacked);
                self.progress.set_message("ROLLBACKED");
                Ok(())
            }
            Err(e) => {
                self.core.mark(Status::RollbackedError);
                self.core.record(&e);
                self.progress.set_message("ROLLBACK ERROR");
                error!(task = %self.core.id(), "{e}");
                Err(e)
            }
        }
    }
}
