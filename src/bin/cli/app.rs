use std::path::PathBuf;

use anyhow::{Context, Result};

use article_sync::{DocumentStore, FileCache, SettingsStore};

/// Settings and store opened from a data directory
pub struct App {
    pub settings: SettingsStore,
    pub store: DocumentStore<FileCache>,
}

impl App {
    /// Open the given data directory, or the platform default
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => SettingsStore::default_data_dir().context("Failed to get data directory")?,
        };

        let settings = SettingsStore::new(data_dir.clone());
        let config = settings
            .load()
            .with_context(|| format!("Failed to load settings from {}", data_dir.display()))?;
        let cache = FileCache::in_dir(&data_dir);
        let store = DocumentStore::new(config, cache).context("Failed to create HTTP client")?;

        Ok(Self { settings, store })
    }
}
