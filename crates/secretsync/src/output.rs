//! Terminal output utilities

use anyhow::Result;
use console::style;
use secretsync_core::{RecordOutcome, SyncDecision, SyncReport};
use tabled::{settings::Style, Table, Tabled};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", style("✗").red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("⚠").yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", style(msg).bold().underlined());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

#[derive(Tabled)]
struct OutcomeRow {
    namespace: String,
    name: String,
    decision: String,
    detail: String,
}

impl From<&RecordOutcome> for OutcomeRow {
    fn from(outcome: &RecordOutcome) -> Self {
        let detail = match (&outcome.decision, &outcome.detail) {
            (_, Some(detail)) => detail.clone(),
            (SyncDecision::Skipped(reason), None) => reason.to_string(),
            (SyncDecision::Failed(reason), None) => reason.clone(),
            _ => String::new(),
        };
        Self {
            namespace: outcome.namespace.clone(),
            name: outcome.name.clone(),
            decision: outcome.decision.label().to_string(),
            detail,
        }
    }
}

/// Render a report as JSON on stdout
pub fn report_json(report: &SyncReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Render a report as a table plus a summary line
///
/// Unchanged records are left out of the table unless `all` is set.
pub fn report_table(report: &SyncReport, all: bool) {
    let rows: Vec<OutcomeRow> = report
        .outcomes
        .iter()
        .filter(|o| all || o.decision != SyncDecision::Unchanged)
        .map(OutcomeRow::from)
        .collect();

    header(&format!("{} report", capitalize(report.mode.as_str())));
    if rows.is_empty() {
        info("Nothing to report");
    } else {
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    kv("Summary", &report.summary.to_string());
    kv("Elapsed", &format!("{} ms", report.elapsed_ms));

    match &report.fatal {
        Some(cause) => error(&format!("{} aborted: {}", report.mode, cause)),
        None if report.summary.failed > 0 => warning(&format!(
            "{} finished with {} failed record(s)",
            report.mode, report.summary.failed
        )),
        None => success(&format!("{} complete", capitalize(report.mode.as_str()))),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secretsync_core::SkipReason;

    #[test]
    fn test_row_detail() {
        let skipped = RecordOutcome::new(
            "default",
            "db-cred",
            SyncDecision::Skipped(SkipReason::ExistsOverwriteDisabled),
        );
        let row = OutcomeRow::from(&skipped);
        assert_eq!(row.decision, "skipped");
        assert_eq!(row.detail, "exists, overwrite disabled");

        let malformed = RecordOutcome::new(
            "default",
            "broken",
            SyncDecision::Skipped(SkipReason::MalformedBackup),
        )
        .with_detail("Malformed record: expected value");
        assert_eq!(
            OutcomeRow::from(&malformed).detail,
            "Malformed record: expected value"
        );

        let created = RecordOutcome::new("default", "new", SyncDecision::Created);
        assert_eq!(OutcomeRow::from(&created).detail, "");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("backup"), "Backup");
        assert_eq!(capitalize(""), "");
    }
}
