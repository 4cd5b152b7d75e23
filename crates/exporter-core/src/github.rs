//! GitHub destination host.

use crate::client::{ApiClient, Auth};
use crate::error::{RemoteError, RemoteResult};
use crate::remote::DestinationHost;
use crate::types::Visibility;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

/// Default GitHub REST API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default GitHub web host, used for git remotes.
pub const DEFAULT_GITHUB_WEB_URL: &str = "https://github.com";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
}

/// Client for the GitHub REST API.
pub struct GitHubClient {
    api: ApiClient,
    web_url: String,
    login: OnceCell<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, web_url: &str, token: &str) -> RemoteResult<Self> {
        let api = ApiClient::new(api_url, Auth::Token(token.to_string()))?;
        Ok(Self {
            api,
            web_url: web_url.trim_end_matches('/').to_string(),
            login: OnceCell::new(),
        })
    }

    /// Client for github.com.
    pub fn github_com(token: &str) -> RemoteResult<Self> {
        Self::new(DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_WEB_URL, token)
    }

    async fn fetch_login(&self) -> RemoteResult<String> {
        let user: GitHubUser = self.api.get_json("/user", &[]).await?;
        debug!(login = %user.login, "Resolved GitHub login");
        Ok(user.login)
    }
}

#[async_trait]
impl DestinationHost for GitHubClient {
    async fn login(&self) -> RemoteResult<String> {
        self.login
            .get_or_try_init(|| self.fetch_login())
            .await
            .cloned()
    }

    async fn repository_exists(&self, name: &str, owner: &str) -> RemoteResult<bool> {
        self.api.exists(&format!("/repos/{owner}/{name}")).await
    }

    async fn create_repository(&self, name: &str, visibility: Visibility) -> RemoteResult<()> {
        self.api
            .post(
                "/user/repos",
                &CreateRepoRequest {
                    name,
                    private: visibility.is_private(),
                },
            )
            .await
    }

    async fn delete_repository(&self, name: &str, owner: &str) -> RemoteResult<()> {
        self.api.delete(&format!("/repos/{owner}/{name}")).await
    }

    async fn push_url(&self, name: &str) -> RemoteResult<String> {
        let login = self.login().await?;
        let mut url = Url::parse(&format!("{}/{login}/{name}.git", self.web_url))?;
        url.set_username(&login)
            .and_then(|()| url.set_password(Some(self.api.token())))
            .map_err(|()| RemoteError::InvalidUrl(self.web_url.clone()))?;
        Ok(url.to_string())
    }

    fn clone_client(&self) -> Arc<dyn DestinationHost> {
        Arc::new(Self {
            api: self.api.clone(),
            web_url: self.web_url.clone(),
            login: OnceCell::new(),
        })
    }
}
