//! GitLab source host.

use crate::client::{ApiClient, Auth};
use crate::error::{RemoteError, RemoteResult};
use crate::remote::{SourceHost, SourceProject};

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Default GitLab instance.
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.fit.cvut.cz";

#[derive(Debug, Deserialize)]
struct GitLabProject {
    name: String,
    path: String,
    http_url_to_repo: String,
    owner: Option<GitLabUser>,
    namespace: Option<GitLabNamespace>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GitLabNamespace {
    path: String,
}

impl GitLabProject {
    fn matches(&self, name: &str) -> bool {
        self.path == name || self.name == name
    }

    fn into_source_project(self) -> SourceProject {
        let owner = self
            .owner
            .map(|o| o.username)
            .or_else(|| self.namespace.map(|n| n.path))
            .unwrap_or_else(|| "oauth2".to_string());
        SourceProject {
            name: self.name,
            path: self.path,
            owner,
            http_url: self.http_url_to_repo,
        }
    }
}

/// Client for the GitLab v4 API.
#[derive(Clone)]
pub struct GitLabClient {
    api: ApiClient,
}

impl GitLabClient {
    /// Create a client for the instance at `gitlab_url` (e.g. "https://gitlab.com").
    pub fn new(gitlab_url: &str, token: &str) -> RemoteResult<Self> {
        let api = ApiClient::new(
            format!("{}/api/v4", gitlab_url.trim_end_matches('/')),
            Auth::PrivateToken(token.to_string()),
        )?;
        Ok(Self { api })
    }
}

#[async_trait]
impl SourceHost for GitLabClient {
    async fn lookup_by_name(&self, name: &str) -> RemoteResult<Vec<SourceProject>> {
        let found: Vec<GitLabProject> = self
            .api
            .get_paginated(
                "/projects",
                &[("owned", "true".to_string()), ("search", name.to_string())],
            )
            .await?;
        debug!(search = %name, candidates = found.len(), "GitLab project search");

        Ok(found
            .into_iter()
            .filter(|p| p.matches(name))
            .map(GitLabProject::into_source_project)
            .collect())
    }

    fn clone_url(&self, project: &SourceProject) -> RemoteResult<String> {
        let mut url = Url::parse(&project.http_url)?;
        url.set_username(&project.owner)
            .and_then(|()| url.set_password(Some(self.api.token())))
            .map_err(|()| RemoteError::InvalidUrl(project.http_url.clone()))?;
        Ok(url.to_string())
    }

    fn clone_client(&self) -> Arc<dyn SourceHost> {
        Arc::new(self.clone())
    }
}
