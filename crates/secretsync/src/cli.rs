//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// secretsync - back up Kubernetes secrets to S3 and restore them
#[derive(Parser, Debug)]
#[command(name = "secretsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a YAML config file
    #[arg(short, long, global = true, env = "SECRETSYNC_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    /// Print the sync report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy live secrets into the bucket, writing only what changed
    Backup(SyncArgs),

    /// Create secrets from the bucket; existing ones are kept unless forced
    Restore(RestoreArgs),

    /// Back up, or restore when RESTORE_MODE is set
    Run(RunArgs),
}

/// Settings shared by every mode
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Comma-separated namespaces to sync
    #[arg(short, long, env = "NAMESPACES")]
    pub namespaces: Option<String>,

    /// Key prefix for stored secrets [default: k8s-secrets-backup]
    #[arg(long, env = "S3_BACKUP_DIR")]
    pub backup_dir: Option<String>,

    /// Bucket holding the backups
    #[arg(long, env = "S3_BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Custom S3-compatible endpoint (e.g., MinIO)
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub endpoint: Option<String>,

    /// Bucket region [default: us-east-1]
    #[arg(long, env = "S3_REGION")]
    pub region: Option<String>,

    /// Static access key id; the AWS credential chain is used when unset
    #[arg(long, env = "S3_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    /// Static secret access key
    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    /// kubeconfig context [default: current context]
    #[arg(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,

    /// kubectl binary [default: kubectl]
    #[arg(long, env = "KUBECTL")]
    pub kubectl: Option<String>,

    /// Maximum secrets processed at once [default: 8]
    #[arg(long, env = "SYNC_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Replace secrets that already exist in the cluster
    #[arg(
        long,
        env = "FORCE_OVERWRITE",
        value_parser = parse_switch,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub force_overwrite: Option<bool>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub restore: RestoreArgs,

    /// Restore instead of backing up
    #[arg(
        long,
        env = "RESTORE_MODE",
        value_parser = parse_switch,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub restore_mode: Option<bool>,
}

/// Boolean switch values; an empty value reads as false
fn parse_switch(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
        "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
        other => Err(format!("'{}' is not a boolean (expected true or false)", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "SECRETSYNC_CONFIG",
        "NAMESPACES",
        "S3_BACKUP_DIR",
        "S3_BUCKET_NAME",
        "S3_ENDPOINT_URL",
        "S3_REGION",
        "S3_ACCESS_KEY_ID",
        "S3_SECRET_ACCESS_KEY",
        "KUBE_CONTEXT",
        "KUBECTL",
        "SYNC_CONCURRENCY",
        "FORCE_OVERWRITE",
        "RESTORE_MODE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    #[serial]
    fn test_backup_flags() {
        clear_env();
        let cli = Cli::try_parse_from([
            "secretsync",
            "-vv",
            "backup",
            "--namespaces",
            "default,apps",
            "--bucket",
            "backups",
            "--concurrency",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Backup(args) = cli.command else {
            panic!("expected backup");
        };
        assert_eq!(args.namespaces.as_deref(), Some("default,apps"));
        assert_eq!(args.bucket.as_deref(), Some("backups"));
        assert_eq!(args.concurrency, Some(4));
        assert!(args.context.is_none());
    }

    #[test]
    #[serial]
    fn test_env_fallback() {
        clear_env();
        std::env::set_var("NAMESPACES", "default");
        std::env::set_var("S3_BUCKET_NAME", "from-env");
        std::env::set_var("FORCE_OVERWRITE", "YES");

        let cli = Cli::try_parse_from(["secretsync", "restore", "--bucket", "from-flag"]).unwrap();
        clear_env();

        let Commands::Restore(args) = cli.command else {
            panic!("expected restore");
        };
        assert_eq!(args.sync.namespaces.as_deref(), Some("default"));
        assert_eq!(args.sync.bucket.as_deref(), Some("from-flag"));
        assert_eq!(args.force_overwrite, Some(true));
    }

    #[test]
    #[serial]
    fn test_force_overwrite_flag_forms() {
        clear_env();
        let parse = |extra: &[&str]| {
            let mut argv = vec!["secretsync", "restore"];
            argv.extend_from_slice(extra);
            match Cli::try_parse_from(argv).unwrap().command {
                Commands::Restore(args) => args.force_overwrite,
                _ => unreachable!(),
            }
        };

        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&["--force-overwrite"]), Some(true));
        assert_eq!(parse(&["--force-overwrite=false"]), Some(false));
        assert_eq!(parse(&["--force-overwrite=0"]), Some(false));
    }

    #[test]
    #[serial]
    fn test_run_mode_from_env() {
        clear_env();
        std::env::set_var("RESTORE_MODE", "true");
        let cli = Cli::try_parse_from(["secretsync", "run"]).unwrap();
        clear_env();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.restore_mode, Some(true));
        assert_eq!(args.restore.force_overwrite, None);
    }

    #[test]
    fn test_parse_switch() {
        for value in ["true", "TRUE", "yes", "1", " on "] {
            assert_eq!(parse_switch(value), Ok(true), "{value}");
        }
        for value in ["", "  ", "false", "No", "0", "off"] {
            assert_eq!(parse_switch(value), Ok(false), "{value:?}");
        }
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    #[serial]
    fn test_empty_restore_mode_is_backup() {
        clear_env();
        std::env::set_var("RESTORE_MODE", "");
        std::env::set_var("FORCE_OVERWRITE", "");
        let cli = Cli::try_parse_from(["secretsync", "run"]).unwrap();
        clear_env();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.restore_mode.unwrap_or(false));
        assert!(!args.restore.force_overwrite.unwrap_or(false));
    }

    #[test]
    #[serial]
    fn test_invalid_bool_rejected() {
        clear_env();
        std::env::set_var("RESTORE_MODE", "maybe");
        let result = Cli::try_parse_from(["secretsync", "run"]);
        clear_env();
        assert!(result.is_err());
    }
}
