//! Integration tests for the signpipe binary

use std::process::Command;
use std::sync::Arc;

use signpipe_core::stages::combine;
use signpipe_core::{DataSigner, MultiHash, SignerConfig, SigningContext, SingleHash};

fn signpipe(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_signpipe"));
    cmd.current_dir(dir)
        .args(["--hash1-latency-ms", "0", "--hash2-latency-ms", "0"]);
    cmd
}

fn expected_digest(items: &[&str]) -> String {
    let ctx = SigningContext::new(Arc::new(DataSigner::new(SignerConfig::instant())));
    let single = SingleHash::new(ctx.clone());
    let multi = MultiHash::new(ctx);
    combine(items.iter().map(|i| multi.digest(&single.sign(i))).collect())
}

#[test]
fn run_prints_combined_digest() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path())
        .args(["run", "0", "1", "1", "2", "3", "5", "8"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(
        stdout.trim_end(),
        expected_digest(&["0", "1", "1", "2", "3", "5", "8"])
    );
}

#[test]
fn run_reads_items_from_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("items.txt"), "7\n\n9\n").unwrap();
    let out = signpipe(dir.path())
        .args(["run", "--file", "items.txt"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.trim_end(), expected_digest(&["7", "9"]));
}

#[test]
fn run_without_items_prints_empty_digest() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path()).arg("run").output().unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "\n");
}

#[test]
fn missing_item_file_fails_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path())
        .args(["run", "--file", "absent.txt"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn zero_channel_capacity_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path())
        .args(["--channel-capacity", "0", "run", "1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn zero_in_flight_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path())
        .args(["--max-in-flight", "0", "run", "1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn single_worker_gives_same_digest() {
    let dir = tempfile::tempdir().unwrap();
    let out = signpipe(dir.path())
        .args(["--max-in-flight", "1", "run", "4", "2", "4"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.trim_end(), expected_digest(&["4", "2", "4"]));
}

#[test]
fn config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("signpipe.toml"),
        "[pipeline]\nchannel_capacity = 3\n",
    )
    .unwrap();
    let out = signpipe(dir.path()).arg("config").output().unwrap();
    assert!(out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Channel capacity"));
    assert!(stderr.contains('3'));
}
