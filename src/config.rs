//! Configuration for AtlasORM
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{OrmError, Result};

/// Main configuration for an AtlasORM instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file used by the file-backed store
    pub data_file: PathBuf,

    /// Sync strategy: how often the file store rewrites its snapshot
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Key Scheme Configuration
    // -------------------------------------------------------------------------
    /// Delimiter between key components
    pub key_delimiter: char,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Fail a save when a sorted relationship target has no document
    /// (otherwise the member is kept unscored and a warning is logged)
    pub strict_relationship_scores: bool,
}

/// Snapshot sync strategy for the file store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Rewrite the snapshot after every mutation (safest, slowest)
    EveryWrite,

    /// Rewrite the snapshot after N mutations
    EveryNWrites { count: usize },

    /// Only on explicit `flush()` (or drop)
    Manual,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./atlasorm_data/store.db"),
            sync_strategy: SyncStrategy::EveryNWrites { count: 100 },
            key_delimiter: ':',
            strict_relationship_scores: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.key_delimiter.is_alphanumeric() || self.key_delimiter == '%' {
            return Err(OrmError::Config(format!(
                "Key delimiter {:?} must not be alphanumeric or '%'",
                self.key_delimiter
            )));
        }

        if let SyncStrategy::EveryNWrites { count: 0 } = self.sync_strategy {
            return Err(OrmError::Config(
                "EveryNWrites count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file of the file store
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = path.into();
        self
    }

    /// Set the snapshot sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the key delimiter
    pub fn key_delimiter(mut self, delimiter: char) -> Self {
        self.config.key_delimiter = delimiter;
        self
    }

    /// Require sort scores for sorted relationship members
    pub fn strict_relationship_scores(mut self, strict: bool) -> Self {
        self.config.strict_relationship_scores = strict;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
