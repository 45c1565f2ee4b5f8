//! Kubernetes secret backup and restore against object storage
//!
//! This crate holds the synchronization engine:
//! - **Record codec**: canonical, byte-stable JSON form of a secret
//! - **Fingerprints**: SHA-256 of the stored form, used to detect change
//! - **Capabilities**: [`BlobStore`] and [`ResourceSource`] traits the engine
//!   drives, with in-memory implementations in [`memory`]
//! - **Engine**: one-way Backup (cluster -> store, write on change) and
//!   Restore (store -> cluster, create or opt-in overwrite)
//!
//! # Example
//!
//! ```no_run
//! use secretsync_core::memory::{MemoryBlobStore, MemoryResourceSource};
//! use secretsync_core::{ResourceRecord, SyncConfig, SyncEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Arc::new(MemoryResourceSource::new());
//!     source
//!         .insert(ResourceRecord::new("default", "db-cred").with_data("password", "cGFzcw=="))
//!         .await;
//!     let store = Arc::new(MemoryBlobStore::new("k8s-secrets-backup"));
//!
//!     let engine = SyncEngine::new(SyncConfig::new(["default"]), source, store)?;
//!     let report = engine.run().await;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod key;
pub mod memory;
pub mod record;
pub mod report;
pub mod source;
pub mod store;

// Re-export commonly used items
pub use config::{parse_namespace_list, SyncConfig, SyncMode, DEFAULT_CONCURRENCY};
pub use engine::SyncEngine;
pub use error::{CodecError, ConfigError, SourceError, StoreError, SyncError};
pub use fingerprint::Fingerprint;
pub use key::{BlobKey, DEFAULT_BACKUP_ROOT};
pub use record::{ResourceRecord, DEFAULT_SECRET_TYPE, SERVICE_ACCOUNT_TOKEN_TYPE};
pub use report::{RecordOutcome, SkipReason, Summary, SyncDecision, SyncReport};
pub use source::ResourceSource;
pub use store::BlobStore;
