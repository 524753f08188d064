#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "sensorlink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn sensorlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sensorlink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .env_remove("SENSORLINK_CONFIG")
        .output()
        .expect("sensorlink should run")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

const TEMPERATURE_FRAME: &str =
    "a16174190aab0000000000000000000000000000000000000000000000000005";

#[test]
fn encode_pads_frame_and_appends_sequence() {
    let output = sensorlink(&["--format", "json", "encode", "-f", "t=2731", "--seq", "5"]);
    assert!(output.status.success());

    let json = json_stdout(&output);
    assert_eq!(json["sequence"], 5);
    assert_eq!(json["payload"], "a16174190aab");
    assert_eq!(json["payload_len"], 6);
    assert_eq!(json["frame"], TEMPERATURE_FRAME);
}

#[test]
fn decode_maps_field_to_sensor_type() {
    let output = sensorlink(&["--format", "json", "decode", TEMPERATURE_FRAME]);
    assert!(output.status.success());

    let json = json_stdout(&output);
    assert_eq!(json["frame_len"], 32);
    assert_eq!(json["sequence"], 5);
    assert_eq!(json["payload"], "a16174190aab");
    let fields = json["fields"].as_array().expect("fields should be an array");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0]["name"], "t");
    assert_eq!(fields[0]["value"], 2731);
    assert_eq!(fields[0]["sensor_type"], "ambient_temperature_raw");
}

#[test]
fn decode_reports_unmapped_field_as_null() {
    let output = sensorlink(&["--format", "json", "decode", "a1627a7a05000003"]);
    assert!(output.status.success());

    let json = json_stdout(&output);
    assert_eq!(json["fields"][0]["name"], "zz");
    assert!(json["fields"][0]["sensor_type"].is_null());
}

#[test]
fn decode_invalid_hex_returns_60() {
    let output = sensorlink(&["decode", "a1zz"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid frame hex"));
}

#[test]
fn decode_malformed_payload_returns_60() {
    // A map announcing one entry with nothing after it.
    let output = sensorlink(&["decode", "a10001"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn decode_empty_payload_respects_reject_flag() {
    let accepted = sensorlink(&["--format", "json", "decode", "000007"]);
    assert!(accepted.status.success());
    let json = json_stdout(&accepted);
    assert_eq!(json["fields"].as_array().map(Vec::len), Some(0));

    let rejected = sensorlink(&["decode", "--reject-empty", "000007"]);
    assert_eq!(rejected.status.code(), Some(60));
}

#[test]
fn encode_without_field_is_usage_error() {
    let output = sensorlink(&["encode"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn replay_dispatches_frames_to_listeners() {
    let dir = unique_temp_dir("replay");
    let frames = dir.join("frames.txt");
    std::fs::write(
        &frames,
        format!(
            "# channel frame\n\
             1 {TEMPERATURE_FRAME}\n\
             \n\
             2 a1617419012c0000000000000000000000000000000000000000000000000009\n\
             3 a1617401000000000000000000000000000000000000000000000000000002\n"
        ),
    )
    .expect("frames file should be writable");

    let output = sensorlink(&[
        "--format",
        "json",
        "replay",
        frames.to_str().expect("temp path should be utf-8"),
        "--node",
        "b3b4b5b6f1",
        "--node",
        "b3b4b5b6cd",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = json_stdout(&output);
    assert_eq!(json["frames_queued"], 3);

    let readings = json["readings"].as_array().expect("readings should be an array");
    assert_eq!(readings.len(), 2);
    let nodes: Vec<&str> = readings
        .iter()
        .filter_map(|reading| reading["node"].as_str())
        .collect();
    assert!(nodes.contains(&"b3b4b5b6f1"));
    assert!(nodes.contains(&"b3b4b5b6cd"));
    assert!(readings
        .iter()
        .all(|reading| reading["sensor_type"] == "ambient_temperature_raw"));

    let stats = &json["stats"];
    assert_eq!(stats["frames_read"], 3);
    assert_eq!(stats["fields_dispatched"], 2);
    // Channel 3 has no node assigned.
    assert_eq!(stats["unassigned_channel"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn replay_rejects_bad_channel_line() {
    let dir = unique_temp_dir("replay-bad");
    let frames = dir.join("frames.txt");
    std::fs::write(&frames, "9 a1617401\n").expect("frames file should be writable");

    let output = sensorlink(&["replay", frames.to_str().expect("temp path should be utf-8")]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid channel"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = sensorlink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
