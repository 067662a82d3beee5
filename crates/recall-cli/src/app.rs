//! Snapshot-backed store shared by the management commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use recall::config::Config;
use recall::embedding::{Embedder, embedder_from_config};
use recall::memory::MemoryStore;

use crate::error::CliResult;

pub struct App {
    pub config: Config,
    pub store: MemoryStore,
    pub snapshot_path: PathBuf,
    embedder: Option<Arc<dyn Embedder>>,
}

impl App {
    /// Build the store from `config` and load the long-term snapshot
    ///
    /// `data_dir` overrides `config.storage.data_dir`.
    pub async fn open(mut config: Config, data_dir: Option<&Path>) -> CliResult<Self> {
        if let Some(dir) = data_dir {
            config.storage.data_dir = dir.to_path_buf();
        }

        let snapshot_path = config.storage.snapshot_path();
        let store = MemoryStore::new(config.memory.clone());
        store.load(&snapshot_path).await?;
        let embedder = embedder_from_config(&config.embedding)?;

        Ok(Self {
            config,
            store,
            snapshot_path,
            embedder,
        })
    }

    /// Replace the embedder built from configuration
    pub fn with_embedder(mut self, embedder: Option<Arc<dyn Embedder>>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn embedder(&self) -> Option<&dyn Embedder> {
        self.embedder.as_deref()
    }

    /// Write the long-term tier back to the snapshot file
    pub async fn persist(&self) -> CliResult<()> {
        self.store.save(&self.snapshot_path).await?;
        Ok(())
    }
}
