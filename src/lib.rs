//! Article collection persisted to a JSON file in a GitHub repository,
//! with a local cache used as the durable fallback.

pub mod sync;

pub use sync::{
    CacheError, ConnectionResult, Document, DocumentCache, DocumentStore, FileCache, MemoryCache,
    NoopCache, RepoConfig, RepoConfigInput, SaveResult, SettingsStore, StoreError,
};
