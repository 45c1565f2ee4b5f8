//! Per-record decisions and run summaries

use crate::config::SyncMode;
use crate::error::SyncError;
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a record was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Blob was listed but gone by the time we fetched it
    BackupVanished,
    /// Blob did not decode into a record
    MalformedBackup,
    /// Live secret exists and force-overwrite is off
    ExistsOverwriteDisabled,
    /// Object under the namespace prefix is not a record blob
    UnrecognizedKey,
    /// Blob holds a cluster-managed token
    ServiceAccountToken,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::BackupVanished => "backup vanished",
            SkipReason::MalformedBackup => "malformed backup",
            SkipReason::ExistsOverwriteDisabled => "exists, overwrite disabled",
            SkipReason::UnrecognizedKey => "unrecognized key",
            SkipReason::ServiceAccountToken => "service account token",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one `(namespace, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum SyncDecision {
    Created,
    Updated,
    Unchanged,
    Skipped(SkipReason),
    /// Stored blob without a live secret; left in place
    DeletionNotSupported,
    Failed(String),
}

impl SyncDecision {
    pub fn label(&self) -> &'static str {
        match self {
            SyncDecision::Created => "created",
            SyncDecision::Updated => "updated",
            SyncDecision::Unchanged => "unchanged",
            SyncDecision::Skipped(_) => "skipped",
            SyncDecision::DeletionNotSupported => "deletion-not-supported",
            SyncDecision::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDecision::Skipped(reason) => write!(f, "skipped ({})", reason),
            SyncDecision::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// A decision tied to its record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub namespace: String,
    pub name: String,
    #[serde(flatten)]
    pub decision: SyncDecision,
    /// Extra context, e.g. the decode error behind a malformed backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RecordOutcome {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        decision: SyncDecision,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            decision,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Decision counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub deletion_not_supported: usize,
}

impl Summary {
    /// Count one decision
    pub fn record(&mut self, decision: &SyncDecision) {
        match decision {
            SyncDecision::Created => self.created += 1,
            SyncDecision::Updated => self.updated += 1,
            SyncDecision::Unchanged => self.unchanged += 1,
            SyncDecision::Skipped(_) => self.skipped += 1,
            SyncDecision::DeletionNotSupported => self.deletion_not_supported += 1,
            SyncDecision::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.created
            + self.updated
            + self.unchanged
            + self.skipped
            + self.failed
            + self.deletion_not_supported
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created={}, updated={}, unchanged={}, skipped={}, failed={}, deletion-not-supported={}",
            self.created,
            self.updated,
            self.unchanged,
            self.skipped,
            self.failed,
            self.deletion_not_supported
        )
    }
}

/// Result of one Backup or Restore run
///
/// A run that hit a fatal error still returns a report: the outcomes gathered
/// before the abort plus the cause.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub mode: SyncMode,
    pub outcomes: Vec<RecordOutcome>,
    pub summary: Summary,
    /// False when a fatal error cut the run short
    pub complete: bool,
    #[serde(serialize_with = "serialize_fatal")]
    pub fatal: Option<SyncError>,
    pub elapsed_ms: u64,
}

impl SyncReport {
    /// Build a report; outcomes are sorted by `(namespace, name)`
    pub fn new(
        mode: SyncMode,
        mut outcomes: Vec<RecordOutcome>,
        fatal: Option<SyncError>,
    ) -> Self {
        outcomes.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        let mut summary = Summary::default();
        for outcome in &outcomes {
            summary.record(&outcome.decision);
        }
        Self {
            mode,
            outcomes,
            summary,
            complete: fatal.is_none(),
            fatal,
            elapsed_ms: 0,
        }
    }

    pub fn with_elapsed(mut self, elapsed: std::time::Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Outcome for one record, if it was processed
    pub fn outcome(&self, namespace: &str, name: &str) -> Option<&RecordOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.namespace == namespace && o.name == name)
    }

    /// Process exit code: 0 clean, 1 aborted, 2 finished with failed records
    pub fn exit_code(&self) -> i32 {
        if !self.is_complete() {
            1
        } else if self.summary.failed > 0 {
            2
        } else {
            0
        }
    }
}

fn serialize_fatal<S: Serializer>(fatal: &Option<SyncError>, s: S) -> Result<S::Ok, S::Error> {
    match fatal {
        Some(err) => s.serialize_some(&err.to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_summary_counts() {
        let report = SyncReport::new(
            SyncMode::Restore,
            vec![
                RecordOutcome::new("b", "x", SyncDecision::Created),
                RecordOutcome::new("a", "y", SyncDecision::Skipped(SkipReason::MalformedBackup)),
                RecordOutcome::new("a", "x", SyncDecision::Updated),
                RecordOutcome::new("a", "z", SyncDecision::Failed("boom".into())),
            ],
            None,
        );
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.updated, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.total(), 4);

        let order: Vec<(&str, &str)> = report
            .outcomes
            .iter()
            .map(|o| (o.namespace.as_str(), o.name.as_str()))
            .collect();
        assert_eq!(order, vec![("a", "x"), ("a", "y"), ("a", "z"), ("b", "x")]);
    }

    #[test]
    fn test_exit_codes() {
        let clean = SyncReport::new(SyncMode::Backup, vec![], None);
        assert_eq!(clean.exit_code(), 0);

        let failed_record = SyncReport::new(
            SyncMode::Backup,
            vec![RecordOutcome::new("a", "x", SyncDecision::Failed("boom".into()))],
            None,
        );
        assert_eq!(failed_record.exit_code(), 2);

        let aborted = SyncReport::new(
            SyncMode::Backup,
            vec![],
            Some(StoreError::Unavailable("timeout".into()).into()),
        );
        assert!(!aborted.is_complete());
        assert_eq!(aborted.exit_code(), 1);
    }

    #[test]
    fn test_report_json_shape() {
        let report = SyncReport::new(
            SyncMode::Restore,
            vec![RecordOutcome::new(
                "default",
                "db-cred",
                SyncDecision::Skipped(SkipReason::ExistsOverwriteDisabled),
            )],
            None,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "restore");
        assert_eq!(json["outcomes"][0]["decision"], "skipped");
        assert_eq!(json["outcomes"][0]["reason"], "exists_overwrite_disabled");
        assert_eq!(json["summary"]["skipped"], 1);
        assert_eq!(json["complete"], true);
        assert!(json["fatal"].is_null());
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(
            SyncDecision::Skipped(SkipReason::BackupVanished).to_string(),
            "skipped (backup vanished)"
        );
        assert_eq!(SyncDecision::Unchanged.to_string(), "unchanged");
    }
}
