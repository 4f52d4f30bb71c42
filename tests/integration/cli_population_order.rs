use test_support::{cmd_bin, fixture_args, fixture_path, read_output_json, tempdir, BIN};

#[test]
fn population_order_controls_row_and_summary_order() {
  let td = tempdir();
  let out = cmd_bin(BIN)
    .args(fixture_args(td.path()))
    .args(["--population-order", "human,agent", "--no-stats"])
    .output()
    .unwrap();
  assert!(out.status.success(), "cli run failed: {}", String::from_utf8_lossy(&out.stderr));

  let rows = read_output_json(td.path(), "commits_normalized.json");
  let pops: Vec<&str> = rows.as_array().unwrap().iter().map(|r| r["population"].as_str().unwrap()).collect();
  let first_agent = pops.iter().position(|p| *p == "agent").unwrap();
  assert_eq!(first_agent, 7);
  assert!(pops[..first_agent].iter().all(|p| *p == "human"));

  let agg = read_output_json(td.path(), "aggregates.json");
  assert_eq!(agg["populations"], serde_json::json!(["human", "agent"]));
  let summary = std::fs::read_to_string(td.path().join("summary.txt")).unwrap();
  assert!(summary.contains("populations: Human, Agent"));
}

#[test]
fn single_population_run_is_allowed() {
  let td = tempdir();
  let tool = fixture_path("human_refminer.json");
  let metadata = fixture_path("human_metadata.json");
  let out_dir = td.path().to_string_lossy().to_string();
  let out = cmd_bin(BIN)
    .args(["--human-tool-output", tool.as_str(), "--human-metadata", metadata.as_str(), "--out", out_dir.as_str()])
    .output()
    .unwrap();
  assert!(out.status.success(), "cli run failed: {}", String::from_utf8_lossy(&out.stderr));
  let stats = read_output_json(td.path(), "stats.json");
  assert_eq!(stats["status"], "skipped");
  let manifest = read_output_json(td.path(), "manifest.json");
  assert_eq!(manifest["rows"]["normalized"], 7);
}
