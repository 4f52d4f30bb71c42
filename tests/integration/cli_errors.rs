use predicates::prelude::*;
use serial_test::serial;
use test_support::{cmd_bin, fixture_path, tempdir, with_env, BIN};

#[test]
fn missing_input_exits_with_a_named_error() {
  let td = tempdir();
  let absent = td.path().join("absent.json").to_string_lossy().to_string();
  let out_dir = td.path().to_string_lossy().to_string();
  let tool = fixture_path("agent_refminer.json");
  cmd_bin(BIN)
    .args(["--agent-tool-output", tool.as_str(), "--agent-metadata", absent.as_str(), "--out", out_dir.as_str()])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("error: missing input: agent metadata"));
  assert!(!td.path().join("manifest.json").exists());
}

#[test]
fn empty_metadata_is_fatal() {
  let td = tempdir();
  let out_dir = td.path().to_string_lossy().to_string();
  let tool = fixture_path("agent_refminer.json");
  let metadata = fixture_path("agent_metadata_empty.json");
  cmd_bin(BIN)
    .args(["--agent-tool-output", tool.as_str(), "--agent-metadata", metadata.as_str(), "--out", out_dir.as_str()])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("agent metadata"));
}

#[test]
fn half_configured_population_is_rejected() {
  cmd_bin(BIN)
    .args(["--human-tool-output", fixture_path("human_refminer.json").as_str()])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("--human-tool-output and --human-metadata must be given together"));
}

#[test]
fn no_population_is_rejected() {
  cmd_bin(BIN).assert().failure();
}

#[test]
#[serial]
fn rust_log_does_not_leak_onto_stdout() {
  let _env = with_env(&[("RUST_LOG", "debug")]);
  let td = tempdir();
  let out = cmd_bin(BIN).args(test_support::fixture_args(td.path())).output().unwrap();
  assert!(out.status.success());
  let ptr: serde_json::Value = serde_json::from_slice(&out.stdout).expect("stdout stays pure JSON");
  assert_eq!(ptr["manifest"], "manifest.json");
  assert!(!out.stderr.is_empty());
}
