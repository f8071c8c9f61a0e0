#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;

fn cli() -> Command {
    Command::cargo_bin("graycode-calib").expect("binary built")
}

fn write_patterns(dir: &Path, width: u32, height: u32) {
    cli()
        .args(["patterns", "--width", &width.to_string()])
        .args(["--height", &height.to_string()])
        .arg("--out")
        .arg(dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
}

#[test]
fn patterns_writes_full_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    write_patterns(&out, 64, 32);

    let count = std::fs::read_dir(&out).unwrap().count();
    assert_eq!(count, 24);
    assert!(out.join("frame_000.png").is_file());
    assert!(out.join("frame_023.png").is_file());
}

#[test]
fn decode_round_trips_generated_patterns() {
    let dir = tempfile::tempdir().unwrap();
    write_patterns(&dir.path().join("frames"), 32, 16);

    let config = dir.path().join("job.json");
    std::fs::write(
        &config,
        r#"{
            "frames_dir": "frames",
            "projector": {"width": 32, "height": 16},
            "decode": {"min_point_count": 10},
            "report_path": "report.json",
            "mask_path": "mask.png"
        }"#,
    )
    .unwrap();

    cli()
        .args(["--log-level", "warn", "decode", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("decoded 512 correspondences"));

    assert!(dir.path().join("mask.png").is_file());
    let report: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["point_count"], 512);
    assert_eq!(report["frame_count"], 20);
    assert_eq!(report["error_threshold"], 0);
    assert_eq!(report["camera_points"][33], serde_json::json!([1, 1]));
    assert_eq!(report["projector_points"][33], serde_json::json!([1, 1]));
}

#[test]
fn report_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    write_patterns(&dir.path().join("frames"), 8, 8);
    let config = dir.path().join("job.json");
    std::fs::write(
        &config,
        r#"{"frames_dir": "frames", "projector": {"width": 8, "height": 8}}"#,
    )
    .unwrap();
    let report = dir.path().join("elsewhere.json");

    cli()
        .args(["decode", "--config"])
        .arg(&config)
        .arg("--report")
        .arg(&report)
        .assert()
        .success();
    assert!(report.is_file());
}

#[test]
fn decode_rejects_wrong_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    write_patterns(&dir.path().join("frames"), 16, 16);
    let config = dir.path().join("job.json");
    std::fs::write(
        &config,
        r#"{"frames_dir": "frames", "projector": {"width": 32, "height": 16}}"#,
    )
    .unwrap();

    cli()
        .args(["decode", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected at least 18 frames, got 16"));
}

fn small_job(dir: &Path) -> std::path::PathBuf {
    write_patterns(&dir.join("frames"), 8, 8);
    let config = dir.join("job.json");
    std::fs::write(
        &config,
        r#"{"frames_dir": "frames", "projector": {"width": 8, "height": 8}}"#,
    )
    .unwrap();
    config
}

#[test]
fn log_level_reaches_stderr_without_rust_log() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_job(dir.path());

    // 64 pixels against the default request of 100 points
    cli()
        .env_remove("RUST_LOG")
        .args(["--log-level", "warn", "decode", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("fewer than the requested 100"))
        .stderr(predicate::str::contains("INFO").not());

    cli()
        .env_remove("RUST_LOG")
        .args(["--log-level", "off", "decode", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[cfg(feature = "tracing")]
#[test]
fn json_log_format_emits_json_events() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_job(dir.path());

    cli()
        .env_remove("RUST_LOG")
        .args(["--log-level", "warn", "--log-format", "json", "decode", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains(r#""level":"WARN""#))
        .stderr(predicate::str::contains("fewer than the requested 100"));
}

#[test]
fn missing_config_fails() {
    cli()
        .args(["decode", "--config", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
