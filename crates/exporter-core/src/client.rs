//! Authenticated JSON client shared by the hosting-service integrations.

use crate::error::{RemoteError, RemoteResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

/// Page size requested from paginated endpoints.
const PER_PAGE: usize = 100;

/// How the token is presented to the API.
#[derive(Clone)]
pub enum Auth {
    /// `PRIVATE-TOKEN: <token>` (GitLab).
    PrivateToken(String),
    /// `Authorization: token <token>` (GitHub).
    Token(String),
}

impl Auth {
    pub fn secret(&self) -> &str {
        match self {
            Self::PrivateToken(token) | Self::Token(token) => token,
        }
    }
}

/// Client for one REST API rooted at `base_url`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> RemoteResult<Self> {
        let client = Client::builder()
            .user_agent("exporter")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        self.auth.secret()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let request = self.client.request(method, url);
        match &self.auth {
            Auth::PrivateToken(token) => request.header("PRIVATE-TOKEN", token),
            Auth::Token(token) => request.header("Authorization", format!("token {token}")),
        }
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> RemoteResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
                RemoteError::AuthenticationFailed(format!("{} for {path}", response.status())),
            ),
            StatusCode::NOT_FOUND => Err(RemoteError::RepositoryNotFound(path.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RemoteError::ApiError(format!(
                    "Request to {path} failed with status {status}: {body}"
                )))
            }
        }
    }

    /// GET a single JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RemoteResult<T> {
        let response = self
            .send(self.request(Method::GET, path).query(query), path)
            .await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::ApiError(e.to_string()))
    }

    /// GET every page of a JSON array endpoint.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> RemoteResult<Vec<T>> {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let mut paged = query.to_vec();
            paged.push(("page", page.to_string()));
            paged.push(("per_page", PER_PAGE.to_string()));

            let items: Vec<T> = self.get_json(path, &paged).await?;
            let count = items.len();
            all_items.extend(items);

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all_items)
    }

    /// POST a JSON body, ignoring the response body.
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> RemoteResult<()> {
        self.send(self.request(Method::POST, path).json(body), path)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> RemoteResult<()> {
        self.send(self.request(Method::DELETE, path), path).await?;
        Ok(())
    }

    /// Check whether GET `path` succeeds; a 404 means "does not exist".
    pub async fn exists(&self, path: &str) -> RemoteResult<bool> {
        match self.send(self.request(Method::GET, path), path).await {
            Ok(_) => Ok(true),
            Err(RemoteError::RepositoryNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
