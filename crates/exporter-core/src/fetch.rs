//! Retrieval of one source project into the shared working directory.

use crate::error::{ExportError, Result};
use crate::progress::ProgressHandle;
use crate::remote::{RepoHandle, SourceHost, SourceProject, VersionControl};
use crate::task::{FailureMode, Task, TaskCore};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Length of the random suffix appended to clone directories.
const CLONE_SUFFIX_LEN: usize = 5;

/// Clones one source project, including its large-file objects.
pub struct FetchTask {
    core: TaskCore,
    source: Arc<dyn SourceHost>,
    vcs: Arc<dyn VersionControl>,
    name: String,
    base_dir: PathBuf,
    progress: ProgressHandle,
}

impl FetchTask {
    pub fn new(
        source: Arc<dyn SourceHost>,
        vcs: Arc<dyn VersionControl>,
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        progress: ProgressHandle,
        mode: FailureMode,
        cancel: CancellationToken,
    ) -> Self {
        let name = name.into();
        Self {
            core: TaskCore::new(name.clone(), mode, cancel),
            source,
            vcs,
            name,
            base_dir: base_dir.into(),
            progress,
        }
    }

    /// Run the fetch and hand over the local clone.
    ///
    /// Failures are recorded on this task and always returned.
    pub async fn fetch(&self) -> Result<RepoHandle> {
        let _running = self.core.enter();
        let outcome = self.try_fetch().await;
        if let Err(e) = &outcome {
            self.core.record(e);
        }
        outcome
    }

    async fn try_fetch(&self) -> Result<RepoHandle> {
        self.core.checkpoint()?;
        self.progress.set_message("Searching for project");
        let matches = self
            .source
            .lookup_by_name(&self.name)
            .await
            .map_err(|e| self.core.task_error(e))?;
        self.progress.tick("Searching for project done");
        let project = self.single_match(matches)?;

        let url = self
            .source
            .clone_url(&project)
            .map_err(|e| self.core.task_error(e))?;

        self.core.checkpoint()?;
        self.progress.set_message("Cloning GitLab repo");
        let target = clone_dir(&self.base_dir, &self.name);
        debug!(project = %self.name, path = %target.display(), "Cloning source project");
        let repo = self
            .vcs
            .clone_repo(&url, &target)
            .await
            .map_err(|e| self.core.task_error(e))?;

        self.core.checkpoint()?;
        self.progress.tick("Fetching GitLab LFS files");
        self.vcs
            .fetch_large_file_refs(&repo)
            .await
            .map_err(|e| self.core.task_error(e))?;
        self.progress.tick("Fetching GitLab LFS files done");

        info!(project = %self.name, path = %repo.path.display(), "Source project fetched");
        Ok(repo)
    }

    fn single_match(&self, mut matches: Vec<SourceProject>) -> Result<SourceProject> {
        match matches.len() {
            0 => Err(ExportError::NoSourceProject(self.name.clone())),
            1 => Ok(matches.remove(0)),
            count => Err(ExportError::MultipleSourceProjects {
                name: self.name.clone(),
                count,
            }),
        }
    }
}

#[async_trait]
impl Task for FetchTask {
    fn core(&self) -> &TaskCore {
        &self.core
    }

    async fn run(&self) -> Result<()> {
        match self.fetch().await {
            Ok(_) => Ok(()),
            Err(e) => self.core.escalate(e),
        }
    }
}

/// Directory for a clone of `name`, unique among concurrent fetches.
fn clone_dir(base_dir: &Path, name: &str) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CLONE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    base_dir.join(format!("{}{suffix}", name.replace('/', "_")))
}
