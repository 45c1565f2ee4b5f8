//! Shared test utilities for secretsync-core integration tests

use secretsync_core::memory::{MemoryBlobStore, MemoryResourceSource};
use secretsync_core::{ResourceRecord, SyncConfig, SyncEngine, SyncMode, DEFAULT_BACKUP_ROOT};
use std::sync::Arc;

/// A cluster and a store wired to the default backup root
pub struct Fixture {
    pub source: Arc<MemoryResourceSource>,
    pub store: Arc<MemoryBlobStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            source: Arc::new(MemoryResourceSource::new()),
            store: Arc::new(MemoryBlobStore::new(DEFAULT_BACKUP_ROOT)),
        }
    }

    /// Engine over this fixture
    pub fn engine(&self, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(config, self.source.clone(), self.store.clone())
            .expect("valid test configuration")
    }

    pub fn backup(&self, namespaces: &[&str]) -> SyncEngine {
        self.engine(SyncConfig::new(namespaces.iter().copied()))
    }

    pub fn restore(&self, namespaces: &[&str], force_overwrite: bool) -> SyncEngine {
        self.engine(
            SyncConfig::new(namespaces.iter().copied())
                .with_mode(SyncMode::Restore)
                .with_force_overwrite(force_overwrite),
        )
    }
}

/// The `db-cred` secret used throughout the scenarios
pub fn db_cred() -> ResourceRecord {
    ResourceRecord::new("default", "db-cred").with_data("password", "cGFzcw==")
}
