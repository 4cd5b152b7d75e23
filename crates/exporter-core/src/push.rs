//! Creation of the destination repository and upload of a local clone.

use crate::error::Result;
use crate::progress::ProgressHandle;
use crate::remote::{DestinationHost, RepoHandle, VersionControl};
use crate::task::{FailureMode, Task, TaskCore};
use crate::types::Visibility;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Creates the destination repository and pushes a fetched clone into it.
pub struct PushTask {
    core: TaskCore,
    destination: Arc<dyn DestinationHost>,
    vcs: Arc<dyn VersionControl>,
    repo: RepoHandle,
    name: String,
    visibility: Visibility,
    progress: ProgressHandle,
}

impl PushTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        destination: Arc<dyn DestinationHost>,
        vcs: Arc<dyn VersionControl>,
        repo: RepoHandle,
        name: impl Into<String>,
        visibility: Visibility,
        progress: ProgressHandle,
        mode: FailureMode,
        cancel: CancellationToken,
    ) -> Self {
        let name = name.into();
        Self {
            core: TaskCore::new(repo.path.display().to_string(), mode, cancel),
            destination,
            vcs,
            repo,
            name,
            visibility,
            progress,
        }
    }

    /// Run the push. Failures are recorded on this task and always returned.
    pub async fn push(&self) -> Result<()> {
        let _running = self.core.enter();
        let outcome = self.try_push().await;
        if let Err(e) = &outcome {
            self.core.record(e);
        }
        outcome
    }

    async fn try_push(&self) -> Result<()> {
        self.core.checkpoint()?;
        self.progress.set_message("Creating GitHub repo");
        self.destination
            .create_repository(&self.name, self.visibility)
            .await
            .map_err(|e| self.core.task_error(e))?;
        self.progress.tick("GitHub repo created");

        let url = self
            .destination
            .push_url(&self.name)
            .await
            .map_err(|e| self.core.task_error(e))?;
        let remote = self
            .vcs
            .add_remote(&self.repo, &format!("github_{}", self.name), &url)
            .await
            .map_err(|e| self.core.task_error(e))?;

        self.core.checkpoint()?;
        let commits = self
            .vcs
            .commit_count(&self.repo)
            .await
            .map_err(|e| self.core.task_error(e))?;
        if commits == 0 {
            info!(repository = %self.name, "Local clone has no history, nothing to push");
            self.progress.tick("Nothing to push");
            return Ok(());
        }

        self.progress.set_message("Pushing to GitHub");
        self.vcs
            .push(&remote)
            .await
            .map_err(|e| self.core.task_error(e))?;
        self.progress.tick("Pushing to GitHub done");

        info!(repository = %self.name, commits, "Pushed to destination");
        Ok(())
    }
}

#[async_trait]
impl Task for PushTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    async fn run(&self) -> Result<()> {
        match self.push().await {
            Ok(()) => Ok(()),
            Err(e) => self.core.escalate(e),
        }
    }
}
