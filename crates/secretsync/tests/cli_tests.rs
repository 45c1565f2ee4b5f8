//! CLI tests that stop before touching a cluster or a bucket

use std::io::Write;
use std::process::{Command, Output};

const SETTINGS_ENV: &[&str] = &[
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
    "RUST_LOG",
];

fn secretsync(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_secretsync"));
    for var in SETTINGS_ENV {
        cmd.env_remove(var);
    }
    cmd.envs(env.iter().copied());
    cmd.args(args).output().expect("failed to run secretsync")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_help_lists_modes() {
    let output = secretsync(&["--help"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for mode in ["backup", "restore", "run"] {
        assert!(stdout.contains(mode), "help is missing {mode}");
    }
}

#[test]
fn test_restore_help_documents_env() {
    let output = secretsync(&["restore", "--help"], &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FORCE_OVERWRITE"));
    assert!(stdout.contains("S3_BUCKET_NAME"));
}

#[test]
fn test_version_exits_zero() {
    let output = secretsync(&["--version"], &[]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_unknown_subcommand_exits_one() {
    let output = secretsync(&["sync"], &[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_restore_mode_exits_one() {
    let output = secretsync(&["run"], &[("RESTORE_MODE", "maybe")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("maybe"));
}

#[test]
fn test_invalid_concurrency_exits_one() {
    let output = secretsync(&["backup"], &[("SYNC_CONCURRENCY", "abc")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("abc"));
}

#[test]
fn test_empty_restore_mode_means_backup() {
    // Parsing succeeds and the run stops at the first missing setting
    let output = secretsync(&["run"], &[("RESTORE_MODE", ""), ("FORCE_OVERWRITE", "")]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("At least one namespace is required"));
    assert!(!stderr.contains("invalid value"));
}

#[test]
fn test_missing_namespaces_fails() {
    let output = secretsync(&["backup", "--bucket", "backups"], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("At least one namespace is required"));
}

#[test]
fn test_missing_bucket_fails() {
    let output = secretsync(&["run"], &[("NAMESPACES", "default")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("S3_BUCKET_NAME"));
}

#[test]
fn test_half_credentials_fail() {
    let output = secretsync(
        &["backup"],
        &[
            ("NAMESPACES", "default"),
            ("S3_BUCKET_NAME", "backups"),
            ("S3_ACCESS_KEY_ID", "AKIA"),
        ],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("S3_SECRET_ACCESS_KEY"));
}

#[test]
fn test_invalid_namespace_fails() {
    let output = secretsync(&["backup", "-n", "Default/x", "--bucket", "backups"], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid namespace"));
}

#[test]
fn test_invalid_config_file_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"namespaces: [default\n").unwrap();
    let path = file.path().to_str().unwrap();

    let output = secretsync(&["--config", path, "backup"], &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load config file"));
}

#[test]
fn test_missing_kubectl_fails_before_sync() {
    let output = secretsync(
        &["backup", "--kubectl", "secretsync-no-such-kubectl"],
        &[("NAMESPACES", "default"), ("S3_BUCKET_NAME", "backups")],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Cannot use kubectl"));
}
