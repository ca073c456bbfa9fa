use serde::{Deserialize, Serialize};

/// Default GitHub REST API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Host serving raw file contents for github.com repositories
pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Branch used when none is configured
pub const DEFAULT_BRANCH: &str = "main";

/// Location of the article collection inside the repository
pub const DOCUMENT_PATH: &str = "data/articles.json";

/// The article collection. Records are opaque JSON values.
pub type Document = Vec<serde_json::Value>;

/// Repository access configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfig {
    /// Personal access token
    #[serde(skip)]
    pub token: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Target branch
    pub branch: String,
    /// Path of the JSON document within the repository
    #[serde(skip, default = "default_document_path")]
    pub document_path: String,
    /// REST API base URL
    #[serde(skip, default = "default_api_base")]
    pub api_base: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: DEFAULT_BRANCH.to_string(),
            document_path: default_document_path(),
            api_base: default_api_base(),
        }
    }
}

fn default_document_path() -> String {
    DOCUMENT_PATH.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl RepoConfig {
    /// Build a config from user input, filling in the default branch
    pub fn from_input(input: RepoConfigInput) -> Self {
        Self {
            token: input.token,
            owner: input.owner,
            repo: input.repo,
            branch: normalize_branch(&input.branch),
            ..Self::default()
        }
    }

    /// Point the config at a different API host (GitHub Enterprise, test servers)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// True iff token, owner and repo are all set
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.owner.is_empty() && !self.repo.is_empty()
    }

    /// "owner/repo"
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Publicly reachable URL of the raw document on the configured branch
    pub fn raw_document_url(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            RAW_CONTENT_BASE, self.owner, self.repo, self.branch, self.document_path
        )
    }
}

/// An empty branch means the default branch
pub fn normalize_branch(branch: &str) -> String {
    let branch = branch.trim();
    if branch.is_empty() {
        DEFAULT_BRANCH.to_string()
    } else {
        branch.to_string()
    }
}

/// Input for (re)configuring repository access
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoConfigInput {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub branch: String,
}

/// Repository metadata returned by a connection test, in GitHub's field names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Canonical "owner/name" identifier
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Result of a connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoInfo>,
}

impl ConnectionResult {
    pub fn connected(repo: RepoInfo) -> Self {
        Self {
            success: true,
            message: format!("Connected to repository {}", repo.full_name),
            repo: Some(repo),
        }
    }
}

/// Result of saving the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResult {
    pub success: bool,
    pub message: String,
}

impl SaveResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
