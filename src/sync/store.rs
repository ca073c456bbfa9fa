use chrono::Local;
use reqwest::Client;
use thiserror::Error;

use super::cache::DocumentCache;
use super::config::{ConnectionResult, Document, RepoConfig, RepoConfigInput, SaveResult};
use super::github::{decode_document, encode_document, GitHubClient, GitHubError, PutFileRequest};
use super::settings::{SettingsError, SettingsStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("GitHub is not configured: token, owner and repository are required")]
    NotConfigured,
    #[error("GitHub API error: {status} - {message}")]
    Remote { status: u16, message: String },
    #[error("Connection failed: {0}")]
    Transport(String),
    #[error("Invalid remote document: {0}")]
    Decode(String),
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl From<GitHubError> for StoreError {
    fn from(e: GitHubError) -> Self {
        match e {
            GitHubError::Api { status, message } => StoreError::Remote { status, message },
            GitHubError::Http(e) => StoreError::Transport(e.to_string()),
            GitHubError::Decode(msg) => StoreError::Decode(msg),
            GitHubError::Base64(e) => StoreError::Decode(e.to_string()),
            GitHubError::Json(e) => StoreError::Decode(e.to_string()),
        }
    }
}

/// Article collection stored as one JSON file in a GitHub repository,
/// with a local cache that is always written first and read on failure.
pub struct DocumentStore<C: DocumentCache> {
    config: RepoConfig,
    cache: C,
    http: Client,
}

impl<C: DocumentCache> DocumentStore<C> {
    /// Create a store with a default HTTP client
    pub fn new(config: RepoConfig, cache: C) -> Result<Self, StoreError> {
        let http = Client::builder()
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self::with_http_client(config, cache, http))
    }

    /// Create a store using a caller-supplied HTTP client
    pub fn with_http_client(config: RepoConfig, cache: C, http: Client) -> Self {
        Self { config, cache, http }
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Replace the in-memory configuration. Returns whether it is complete.
    pub fn reconfigure(&mut self, config: RepoConfig) -> bool {
        self.config = config;
        self.is_configured()
    }

    /// Persist new settings and switch to them. Credentials are not checked.
    pub fn configure(
        &mut self,
        settings: &SettingsStore,
        input: RepoConfigInput,
    ) -> Result<bool, StoreError> {
        let config = RepoConfig {
            api_base: self.config.api_base.clone(),
            document_path: self.config.document_path.clone(),
            ..RepoConfig::from_input(input)
        };
        settings.save(&config)?;

        let configured = self.reconfigure(config);
        log::info!(
            "GitHub settings saved for {} (configured={})",
            self.config.full_name(),
            configured
        );
        Ok(configured)
    }

    /// URL of the raw document on github.com. Does not check configuration.
    pub fn raw_document_url(&self) -> String {
        self.config.raw_document_url()
    }

    fn github(&self) -> GitHubClient {
        GitHubClient::with_client(self.http.clone(), &self.config.api_base, &self.config.token)
    }

    /// Check that the repository is reachable with the configured token
    pub async fn test_connection(&self) -> Result<ConnectionResult, StoreError> {
        if !self.is_configured() {
            return Err(StoreError::NotConfigured);
        }

        match self.github().get_repo(&self.config.owner, &self.config.repo).await {
            Ok(repo) => {
                log::info!("GitHub connection test succeeded: {}", repo.full_name);
                Ok(ConnectionResult::connected(repo))
            }
            Err(e) => {
                log::error!(
                    "GitHub connection test to {} failed: {:?}",
                    self.config.full_name(),
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Cached document, empty when nothing is cached or the cache is unreadable
    fn cached_document(&self) -> Document {
        match self.cache.load() {
            Ok(Some(document)) => document,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Local cache unreadable, using empty document: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_remote(&self) -> Result<Document, StoreError> {
        let file = self
            .github()
            .get_file(
                &self.config.owner,
                &self.config.repo,
                &self.config.document_path,
                &self.config.branch,
            )
            .await?;

        let Some(file) = file else {
            log::info!(
                "{} does not exist in {} yet",
                self.config.document_path,
                self.config.full_name()
            );
            return Ok(Vec::new());
        };

        if file.encoding.as_deref() == Some("none") {
            return Err(StoreError::Decode(format!(
                "file is too large for the contents API ({} bytes)",
                file.size
            )));
        }

        Ok(decode_document(&file.content)?)
    }

    /// Load the document. Never fails: remote problems fall back to the cache.
    pub async fn fetch_document(&self) -> Document {
        if !self.is_configured() {
            log::info!("GitHub not configured, reading local cache");
            return self.cached_document();
        }

        match self.fetch_remote().await {
            Ok(document) => {
                log::info!(
                    "Fetched {} records from {}",
                    document.len(),
                    self.config.full_name()
                );
                document
            }
            Err(e) => {
                log::warn!("Failed to fetch from GitHub, using local cache: {}", e);
                self.cached_document()
            }
        }
    }

    /// Current blob sha of the document, if it can be read.
    ///
    /// Every failure is treated as "does not exist" so the write becomes a
    /// create; a stale or missing sha is then rejected by GitHub itself.
    async fn revision_token(&self) -> Option<String> {
        let result = self
            .github()
            .get_file(
                &self.config.owner,
                &self.config.repo,
                &self.config.document_path,
                &self.config.branch,
            )
            .await;

        match result {
            Ok(Some(file)) => Some(file.sha),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Could not read current revision, writing without sha: {}", e);
                None
            }
        }
    }

    async fn save_remote(&self, document: &Document) -> Result<Option<String>, StoreError> {
        let sha = self.revision_token().await;
        let content = encode_document(document)?;
        let message = format!("Update diary - {}", Local::now().format("%Y/%m/%d %H:%M:%S"));

        let request = PutFileRequest {
            message: &message,
            content: &content,
            branch: &self.config.branch,
            sha: sha.as_deref(),
        };

        Ok(self
            .github()
            .put_file(
                &self.config.owner,
                &self.config.repo,
                &self.config.document_path,
                &request,
            )
            .await?)
    }

    /// Persist the document. The local cache is updated before anything
    /// else; the result reports whether the remote write succeeded.
    pub async fn save_document(&self, document: &Document) -> SaveResult {
        let cache_error = self.cache.store(document).err();
        if let Some(e) = &cache_error {
            log::error!("Failed to update local cache: {}", e);
        }

        if !self.is_configured() {
            log::info!("GitHub not configured, saved locally only");
            return match cache_error {
                None => SaveResult::success("Articles saved locally (GitHub not configured)"),
                Some(e) => SaveResult::error(format!("Failed to save articles locally: {}", e)),
            };
        }

        match self.save_remote(document).await {
            Ok(new_sha) => {
                log::info!(
                    "Saved {} records to {} (sha={:?})",
                    document.len(),
                    self.config.full_name(),
                    new_sha
                );
                match cache_error {
                    None => SaveResult::success("Articles saved to GitHub"),
                    Some(e) => SaveResult::success(format!(
                        "Articles saved to GitHub (local cache not updated: {})",
                        e
                    )),
                }
            }
            Err(e) => {
                log::error!("Failed to save to GitHub: {}", e);
                let reason = match e {
                    StoreError::Remote { message, .. } => message,
                    other => other.to_string(),
                };
                match cache_error {
                    None => SaveResult::error(format!(
                        "Failed to save to GitHub: {} (articles are saved locally)",
                        reason
                    )),
                    Some(cache) => SaveResult::error(format!(
                        "Failed to save to GitHub: {} (local cache also failed: {})",
                        reason, cache
                    )),
                }
            }
        }
    }
}
