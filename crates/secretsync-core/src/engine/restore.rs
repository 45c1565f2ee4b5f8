//! Restore flow: blob store -> live secrets
//!
//! Per record: fetch the blob, decode it, look up the live secret, then create
//! or (only with force-overwrite) replace. A create that races into an
//! existing secret, or a replace that races into a deleted one, is retried
//! once down the other branch.

use super::{RunState, SyncEngine};
use crate::codec;
use crate::config::SyncMode;
use crate::error::{SourceError, SyncError};
use crate::key::BlobKey;
use crate::record::ResourceRecord;
use crate::report::{RecordOutcome, SkipReason, SyncDecision, SyncReport};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

impl SyncEngine {
    /// Apply every stored blob under the configured namespaces to the cluster
    ///
    /// Existing live secrets are left untouched unless force-overwrite is set.
    /// A blob that fails to decode is skipped without stopping the run.
    pub async fn restore(&self) -> SyncReport {
        let started = Instant::now();
        let state = RunState::new(self.config.concurrency);

        let per_namespace: Vec<Vec<RecordOutcome>> = stream::iter(self.config.namespaces.iter())
            .map(|namespace| self.restore_namespace(namespace, &state))
            .buffer_unordered(self.config.concurrency)
            .collect()
            .await;

        let outcomes = per_namespace.into_iter().flatten().collect();
        SyncReport::new(SyncMode::Restore, outcomes, state.into_fatal())
            .with_elapsed(started.elapsed())
    }

    async fn restore_namespace(&self, namespace: &str, state: &RunState) -> Vec<RecordOutcome> {
        if state.is_aborted() {
            return Vec::new();
        }
        info!("Restoring secrets in namespace: {}", namespace);

        let keys = match self.store.list(namespace).await {
            Ok(keys) => keys,
            Err(e) => {
                state.abort(e.into());
                return Vec::new();
            }
        };

        let root = self.store.backup_root();
        let mut outcomes = Vec::new();
        let mut blobs = Vec::with_capacity(keys.len());
        for key in keys {
            match BlobKey::parse(root, namespace, &key) {
                Some(blob) => blobs.push(blob),
                None => {
                    debug!("Ignoring non-record object: {}", key);
                    outcomes.push(RecordOutcome::new(
                        namespace,
                        key,
                        SyncDecision::Skipped(SkipReason::UnrecognizedKey),
                    ));
                }
            }
        }

        let restored: Vec<RecordOutcome> = stream::iter(blobs)
            .map(|blob| {
                let name = blob.name().to_string();
                state.guarded(namespace, name, self.restore_record(blob))
            })
            .buffer_unordered(self.config.concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        outcomes.extend(restored);
        outcomes
    }

    async fn restore_record(&self, blob: BlobKey) -> Result<RecordOutcome, SyncError> {
        let namespace = blob.namespace();
        let name = blob.name();
        let skipped = |reason: SkipReason| {
            RecordOutcome::new(namespace, name, SyncDecision::Skipped(reason))
        };

        let Some(bytes) = self.store.get(namespace, name).await? else {
            info!("Backup for secret {}/{} not found, skipping", namespace, name);
            return Ok(skipped(SkipReason::BackupVanished));
        };

        let mut record = match codec::decode(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed backup {}: {}", blob, e);
                return Ok(skipped(SkipReason::MalformedBackup).with_detail(e.to_string()));
            }
        };

        if record.namespace != namespace || record.name != name {
            warn!(
                "Backup {} describes {}, restoring it as {}/{}",
                blob,
                record.qualified_name(),
                namespace,
                name
            );
            record.namespace = namespace.to_string();
            record.name = name.to_string();
        }

        if record.is_service_account_token() {
            info!("Skipping service account token backup: {}", blob);
            return Ok(skipped(SkipReason::ServiceAccountToken));
        }

        let decision = match self.source.get(namespace, name).await? {
            None => self.create_secret(&record).await?,
            Some(_) => self.apply_to_existing(&record, false).await?,
        };

        Ok(RecordOutcome::new(namespace, name, decision))
    }

    /// Live secret absent: create it, or fall into the exists branch if it
    /// appeared in the meantime
    async fn create_secret(&self, record: &ResourceRecord) -> Result<SyncDecision, SyncError> {
        info!("Creating secret {}", record.qualified_name());
        match self.source.create(&record.namespace, record).await {
            Ok(()) => Ok(SyncDecision::Created),
            Err(SourceError::AlreadyExists { .. }) => {
                debug!(
                    "Secret {} appeared before create, treating it as existing",
                    record.qualified_name()
                );
                self.apply_to_existing(record, true).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Live secret present: skip, or replace when force-overwrite is set
    ///
    /// `retried` is set when we got here from a failed create; a replace that
    /// then finds nothing is not retried again.
    async fn apply_to_existing(
        &self,
        record: &ResourceRecord,
        retried: bool,
    ) -> Result<SyncDecision, SyncError> {
        if !self.config.force_overwrite {
            info!(
                "Secret {} exists, skipping (force overwrite disabled)",
                record.qualified_name()
            );
            return Ok(SyncDecision::Skipped(SkipReason::ExistsOverwriteDisabled));
        }

        info!(
            "Secret {} exists, overwriting due to force overwrite",
            record.qualified_name()
        );
        match self.source.replace(&record.namespace, record).await {
            Ok(()) => Ok(SyncDecision::Updated),
            Err(SourceError::NotFound { .. }) if !retried => {
                debug!(
                    "Secret {} vanished before replace, creating it",
                    record.qualified_name()
                );
                match self.source.create(&record.namespace, record).await {
                    Ok(()) => Ok(SyncDecision::Created),
                    Err(e) if e.is_conflict() => Ok(unresolved(record, e)),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) if e.is_conflict() => Ok(unresolved(record, e)),
            Err(e) => Err(e.into()),
        }
    }
}

fn unresolved(record: &ResourceRecord, cause: SourceError) -> SyncDecision {
    warn!(
        "Giving up on {} after a second conflict: {}",
        record.qualified_name(),
        cause
    );
    SyncDecision::Failed(format!("conflict persisted after retry: {}", cause))
}
