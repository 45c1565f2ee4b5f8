//! Sync engine
//!
//! Drives Backup and Restore over a [`ResourceSource`] and a [`BlobStore`].
//!
//! Namespaces and records are processed concurrently, bounded by
//! `SyncConfig::concurrency`. All steps for one `(namespace, name)` run in
//! sequence inside a single future, so no two operations on the same key ever
//! interleave. The first fatal error (store or cluster unreachable) stops new
//! records from starting; records already in flight finish and the run returns
//! a partial [`SyncReport`] carrying the cause.

mod backup;
mod restore;

use crate::config::{SyncConfig, SyncMode};
use crate::error::{ConfigError, SyncError};
use crate::report::{RecordOutcome, SyncDecision, SyncReport};
use crate::source::ResourceSource;
use crate::store::BlobStore;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Backup/restore orchestrator
pub struct SyncEngine {
    config: SyncConfig,
    source: Arc<dyn ResourceSource>,
    store: Arc<dyn BlobStore>,
}

impl SyncEngine {
    /// Create an engine after validating the configuration
    ///
    /// The store must be rooted at the configured backup root.
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn ResourceSource>,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self, ConfigError> {
        let config = config.validate()?;

        let store_root = store.backup_root().trim_end_matches('/');
        if store_root != config.backup_root {
            return Err(ConfigError::invalid(
                "backup_root",
                format!(
                    "store '{}' is rooted at '{}', expected '{}'",
                    store.name(),
                    store_root,
                    config.backup_root
                ),
            ));
        }

        Ok(Self {
            config,
            source,
            store,
        })
    }

    /// Run the flow selected by `config.mode`
    pub async fn run(&self) -> SyncReport {
        info!(
            "Starting {} of {} namespace(s) using {} and {}",
            self.config.mode,
            self.config.namespaces.len(),
            self.source.name(),
            self.store.name()
        );

        let report = match self.config.mode {
            SyncMode::Backup => self.backup().await,
            SyncMode::Restore => self.restore().await,
        };

        match &report.fatal {
            None => info!("{} completed: {}", report.mode, report.summary),
            Some(cause) => warn!(
                "{} aborted after {} record(s): {}",
                report.mode,
                report.summary.total(),
                cause
            ),
        }

        report
    }
}

/// Shared state of one run
struct RunState {
    aborted: AtomicBool,
    fatal: OnceLock<SyncError>,
    permits: Semaphore,
}

impl RunState {
    fn new(concurrency: usize) -> Self {
        Self {
            aborted: AtomicBool::new(false),
            fatal: OnceLock::new(),
            permits: Semaphore::new(concurrency),
        }
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Stop starting new work; only the first cause is kept
    fn abort(&self, cause: SyncError) {
        self.aborted.store(true, Ordering::SeqCst);
        if self.fatal.set(cause).is_ok() {
            warn!("Fatal error, no further records will be started");
        }
    }

    fn into_fatal(self) -> Option<SyncError> {
        self.fatal.into_inner()
    }

    /// Run the steps for one record under a permit
    ///
    /// Returns None when the run was aborted before the record started.
    async fn guarded<F>(&self, namespace: &str, name: String, work: F) -> Option<RecordOutcome>
    where
        F: Future<Output = Result<RecordOutcome, SyncError>>,
    {
        if self.is_aborted() {
            return None;
        }
        let _permit = self.permits.acquire().await.ok()?;
        if self.is_aborted() {
            return None;
        }

        match work.await {
            Ok(outcome) => Some(outcome),
            Err(cause) => {
                warn!("Failed {}/{}: {}", namespace, name, cause);
                let outcome =
                    RecordOutcome::new(namespace, name, SyncDecision::Failed(cause.to_string()));
                self.abort(cause);
                Some(outcome)
            }
        }
    }
}
