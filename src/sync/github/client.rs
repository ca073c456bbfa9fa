use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sync::config::RepoInfo;

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("article-sync/", env!("CARGO_PKG_VERSION"));

/// Client for the GitHub repository contents API
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: String,
}

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file as returned by `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    /// Blob sha, the revision token required for updates
    pub sha: String,
    /// Encoded body; empty when `encoding` is "none"
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Body of a create-or-update request
#[derive(Debug, Serialize)]
pub struct PutFileRequest<'a> {
    pub message: &'a str,
    pub content: &'a str,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutFileResponse {
    content: Option<PutFileContent>,
}

#[derive(Debug, Deserialize)]
struct PutFileContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl GitHubClient {
    /// Create a client sharing an existing reqwest client
    pub fn with_client(client: Client, api_base: &str, token: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base,
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        let path: Vec<_> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/contents/{}", self.repo_url(owner, repo), path.join("/"))
    }

    /// Attach auth and media-type headers
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, ACCEPT_V3)
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }

    /// Turn a non-2xx response into an API error carrying GitHub's message
    async fn api_error(response: Response) -> GitHubError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        GitHubError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// GET /repos/{owner}/{repo}
    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<RepoInfo, GitHubError> {
        let url = self.repo_url(owner, repo);
        log::debug!("GET {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| GitHubError::Decode(format!("unexpected repository response: {}", e)))
    }

    /// GET /repos/{owner}/{repo}/contents/{path}?ref={branch}
    ///
    /// Returns `None` when the file does not exist.
    pub async fn get_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<RemoteFile>, GitHubError> {
        let url = self.contents_url(owner, repo, path);
        log::debug!("GET {} (ref={})", url, branch);

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("ref", branch)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(Self::api_error(response).await),
            _ => {}
        }

        let body = response.text().await?;
        let file: RemoteFile = serde_json::from_str(&body)
            .map_err(|e| GitHubError::Decode(format!("unexpected contents response: {}", e)))?;
        Ok(Some(file))
    }

    /// PUT /repos/{owner}/{repo}/contents/{path}
    ///
    /// Creates the file when `request.sha` is `None`, updates it otherwise.
    /// Returns the new blob sha when GitHub reports one.
    pub async fn put_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        request: &PutFileRequest<'_>,
    ) -> Result<Option<String>, GitHubError> {
        let url = self.contents_url(owner, repo, path);
        log::debug!(
            "PUT {} (branch={}, sha={:?})",
            url,
            request.branch,
            request.sha
        );

        let response = self
            .authorized(self.client.put(&url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let new_sha = response
            .json::<PutFileResponse>()
            .await
            .ok()
            .and_then(|r| r.content)
            .map(|c| c.sha);
        Ok(new_sha)
    }
}
