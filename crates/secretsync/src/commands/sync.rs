//! backup / restore / run
//!
//! All three resolve settings, build the kubectl source and the S3 store, run
//! the engine once and render the report.

use anyhow::{Context, Result};
use camino::Utf8Path;
use secretsync_core::{SyncEngine, SyncMode, SyncReport};
use secretsync_kube::KubectlSource;
use secretsync_s3::S3BlobStore;
use std::sync::Arc;
use tracing::info;

use crate::cli::{RestoreArgs, RunArgs, SyncArgs};
use crate::output;
use crate::settings::{self, FileConfig, ModeChoice, Settings};

/// Presentation options taken from the global flags
#[derive(Debug, Clone, Copy)]
pub struct Render {
    pub json: bool,
    pub quiet: bool,
    pub verbose: bool,
}

pub async fn backup(args: SyncArgs, config: Option<&Utf8Path>, render: Render) -> Result<i32> {
    let choice = ModeChoice {
        mode: Some(SyncMode::Backup),
        force_overwrite: None,
    };
    execute(&args, choice, config, render).await
}

pub async fn restore(args: RestoreArgs, config: Option<&Utf8Path>, render: Render) -> Result<i32> {
    let choice = ModeChoice {
        mode: Some(SyncMode::Restore),
        force_overwrite: args.force_overwrite,
    };
    execute(&args.sync, choice, config, render).await
}

pub async fn run(args: RunArgs, config: Option<&Utf8Path>, render: Render) -> Result<i32> {
    let choice = ModeChoice {
        mode: args
            .restore_mode
            .map(|restore| if restore { SyncMode::Restore } else { SyncMode::Backup }),
        force_overwrite: args.restore.force_overwrite,
    };
    execute(&args.restore.sync, choice, config, render).await
}

async fn execute(
    args: &SyncArgs,
    choice: ModeChoice,
    config: Option<&Utf8Path>,
    render: Render,
) -> Result<i32> {
    let file = FileConfig::load(config).context("Failed to load configuration")?;
    let settings = settings::resolve(args, choice, file).context("Invalid configuration")?;

    let report = sync(settings).await?;

    if render.json {
        output::report_json(&report)?;
    } else if !render.quiet {
        output::report_table(&report, render.verbose);
    }
    Ok(report.exit_code())
}

/// Connect both adapters and run the engine once
async fn sync(settings: Settings) -> Result<SyncReport> {
    info!(
        "Starting {} of {} namespace(s) against s3://{}/{}",
        settings.sync.mode,
        settings.sync.namespaces.len(),
        settings.s3.bucket,
        settings.s3.backup_root
    );

    let source = KubectlSource::new(&settings.kube).context("Cannot use kubectl")?;
    let store = S3BlobStore::new(&settings.s3).await;
    store
        .check_bucket()
        .await
        .with_context(|| format!("Cannot use bucket {}", settings.s3.bucket))?;

    let engine = SyncEngine::new(settings.sync, Arc::new(source), Arc::new(store))
        .context("Invalid engine configuration")?;
    Ok(engine.run().await)
}
