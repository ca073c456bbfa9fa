use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::{normalize_branch, RepoConfig};

const KEYRING_SERVICE: &str = "article-sync";
const KEYRING_TOKEN_KEY: &str = "github-token";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not determine data directory")]
    DataDirNotFound,
}

/// On-disk layout of settings.json
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    github_repo_owner: String,
    #[serde(default)]
    github_repo_name: String,
    #[serde(default)]
    github_repo_branch: String,
}

/// Persisted repository settings rooted at a data directory.
///
/// Non-secret fields live in `settings.json`; the token is kept in a
/// separate owner-only file and mirrored to the OS keyring when available.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    data_dir: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Platform default data directory
    pub fn default_data_dir() -> Result<PathBuf, SettingsError> {
        dirs::data_local_dir()
            .map(|p| p.join("article-sync"))
            .ok_or(SettingsError::DataDirNotFound)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    fn token_path(&self) -> PathBuf {
        self.data_dir.join(".credentials").join(KEYRING_TOKEN_KEY)
    }

    /// Keyring account name, scoped to this data directory so separate
    /// profiles never read each other's token
    fn keyring_user(&self) -> String {
        format!("{}:{}", KEYRING_TOKEN_KEY, self.data_dir.display())
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.keyring_user()).ok()
    }

    /// Load the persisted config. Missing files yield an unconfigured default.
    pub fn load(&self) -> Result<RepoConfig, SettingsError> {
        let path = self.settings_path();
        let stored = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            StoredSettings::default()
        };

        Ok(RepoConfig {
            token: self.load_token(),
            owner: stored.github_repo_owner,
            repo: stored.github_repo_name,
            branch: normalize_branch(&stored.github_repo_branch),
            ..RepoConfig::default()
        })
    }

    /// Overwrite the persisted config
    pub fn save(&self, config: &RepoConfig) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.data_dir)?;

        let stored = StoredSettings {
            github_repo_owner: config.owner.clone(),
            github_repo_name: config.repo.clone(),
            github_repo_branch: config.branch.clone(),
        };
        std::fs::write(self.settings_path(), serde_json::to_string_pretty(&stored)?)?;

        self.store_token(&config.token)?;
        log::debug!("Saved settings to {:?}", self.data_dir);
        Ok(())
    }

    /// Remove persisted settings and token
    pub fn clear(&self) -> Result<(), SettingsError> {
        let _ = std::fs::remove_file(self.settings_path());
        let _ = std::fs::remove_file(self.token_path());

        if let Some(entry) = self.keyring_entry() {
            let _ = entry.delete_credential();
        }
        Ok(())
    }

    /// Token from file first, then keyring. Absent means empty.
    fn load_token(&self) -> String {
        if let Ok(data) = std::fs::read_to_string(self.token_path()) {
            return data.trim().to_string();
        }

        self.keyring_entry()
            .and_then(|entry| entry.get_password().ok())
            .unwrap_or_default()
    }

    fn store_token(&self, token: &str) -> Result<(), SettingsError> {
        let path = self.token_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, token)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        // Best-effort mirror
        if let Some(entry) = self.keyring_entry() {
            let _ = entry.set_password(token);
        }
        Ok(())
    }
}
