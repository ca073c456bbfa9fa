pub mod cache;
pub mod config;
pub mod github;
pub mod settings;

mod store;

pub use cache::{CacheError, DocumentCache, FileCache, MemoryCache, NoopCache};
pub use config::{
    ConnectionResult, Document, RepoConfig, RepoConfigInput, RepoInfo, SaveResult,
    DEFAULT_BRANCH, DOCUMENT_PATH,
};
pub use github::{GitHubClient, GitHubError, RemoteFile};
pub use settings::{SettingsError, SettingsStore};
pub use store::{DocumentStore, StoreError};
