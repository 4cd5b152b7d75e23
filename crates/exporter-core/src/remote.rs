//! Boundaries to the hosting services and to git.

use crate::error::RemoteResult;
use crate::types::Visibility;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A project found on the source host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProject {
    pub name: String,
    /// URL-safe project path (last segment of the namespace path).
    pub path: String,
    /// Username of the project owner, used for HTTPS credentials.
    pub owner: String,
    /// Plain HTTPS clone URL.
    pub http_url: String,
}

/// Local clone produced by [`VersionControl::clone_repo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    pub path: PathBuf,
}

/// Remote registered on a local clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle {
    pub repo: PathBuf,
    pub name: String,
}

/// Host the projects are exported from.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Owned projects whose name or path equals `name` exactly.
    async fn lookup_by_name(&self, name: &str) -> RemoteResult<Vec<SourceProject>>;

    /// Clone URL carrying credentials for `project`.
    fn clone_url(&self, project: &SourceProject) -> RemoteResult<String>;

    /// Independent client with the same credentials.
    fn clone_client(&self) -> Arc<dyn SourceHost>;
}

/// Host the projects are exported to.
#[async_trait]
pub trait DestinationHost: Send + Sync {
    /// Login of the authenticated user.
    async fn login(&self) -> RemoteResult<String>;

    async fn repository_exists(&self, name: &str, owner: &str) -> RemoteResult<bool>;

    async fn create_repository(&self, name: &str, visibility: Visibility) -> RemoteResult<()>;

    async fn delete_repository(&self, name: &str, owner: &str) -> RemoteResult<()>;

    /// Push URL carrying credentials for repository `name` of the authenticated user.
    async fn push_url(&self, name: &str) -> RemoteResult<String>;

    /// Independent client with the same credentials.
    fn clone_client(&self) -> Arc<dyn DestinationHost>;
}

/// Version-control operations on local clones.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone the full history of `url` into `path`.
    async fn clone_repo(&self, url: &str, path: &Path) -> RemoteResult<RepoHandle>;

    /// Download every large-file object referenced by the clone.
    async fn fetch_large_file_refs(&self, repo: &RepoHandle) -> RemoteResult<()>;

    async fn add_remote(&self, repo: &RepoHandle, name: &str, url: &str)
        -> RemoteResult<RemoteHandle>;

    /// Push all branches, tags and large-file objects to `remote`.
    async fn push(&self, remote: &RemoteHandle) -> RemoteResult<()>;

    /// Number of commits reachable from any ref.
    async fn commit_count(&self, repo: &RepoHandle) -> RemoteResult<usize>;
}
