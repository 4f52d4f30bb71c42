use std::collections::HashMap;
use std::path::Path;

use test_support::{cmd_bin, fixture_args, read_output_json, tempdir, BIN};

fn run_fixtures(out: &Path, extra: &[&str]) -> serde_json::Value {
  let output = cmd_bin(BIN).args(fixture_args(out)).args(extra).output().unwrap();
  assert!(output.status.success(), "cli run failed: {}", String::from_utf8_lossy(&output.stderr));
  serde_json::from_slice(&output.stdout).expect("pointer JSON on stdout")
}

fn rate<'a>(agg: &'a serde_json::Value, population: &str, denominator: &str) -> &'a serde_json::Value {
  agg["rates_by_population"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["population"] == population && r["denominator"] == denominator)
    .unwrap_or_else(|| panic!("no {population}/{denominator} rate row"))
}

#[test]
fn pointer_names_the_output_dir_and_every_file_exists() {
  let td = tempdir();
  let ptr = run_fixtures(td.path(), &[]);
  assert_eq!(ptr["manifest"], "manifest.json");
  let dir = ptr["dir"].as_str().expect("dir string");
  assert_eq!(Path::new(dir), td.path());

  let manifest = read_output_json(dir, "manifest.json");
  assert_eq!(manifest["tool"], "refactor-census");
  assert_eq!(manifest["generated_at"], "2025-08-15T12:00:00");
  for f in manifest["files"].as_object().unwrap().values() {
    assert!(Path::new(dir).join(f.as_str().unwrap()).exists(), "missing {f}");
  }
  assert_eq!(manifest["rows"]["normalized"], 12);
  assert_eq!(manifest["rows"]["observed"], 7);
  assert_eq!(manifest["rows"]["events"], 7);
}

#[test]
fn every_candidate_commit_is_present_with_zero_result_placeholders() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let rows = read_output_json(td.path(), "commits_normalized.json");
  let rows = rows.as_array().unwrap();
  assert_eq!(rows[0]["population"], "agent");
  assert_eq!(rows.last().unwrap()["population"], "human");

  let agent: Vec<(&str, u64, bool)> = rows
    .iter()
    .filter(|r| r["population"] == "agent")
    .map(|r| (r["commit_id"].as_str().unwrap(), r["transformation_count"].as_u64().unwrap(), r["analyzed"].as_bool().unwrap()))
    .collect();
  assert_eq!(
    agent,
    vec![("aaa1", 3, true), ("aaa2", 0, true), ("aaa3", 1, true), ("aaa4", 0, false), ("aaa5", 0, false)]
  );

  let aaa4 = rows.iter().find(|r| r["commit_id"] == "aaa4").unwrap();
  assert_eq!(aaa4["agent_label"], "Devin");
  assert_eq!(aaa4["project_id"], "acme/gears");
  assert_eq!(aaa4["has_transformations"], false);
  assert_eq!(aaa4["transformation_types"], serde_json::json!([]));

  let human_ids: Vec<&str> =
    rows.iter().filter(|r| r["population"] == "human").map(|r| r["commit_id"].as_str().unwrap()).collect();
  assert_eq!(human_ids, vec!["bbb1", "bbb1", "bbb2", "bbb3", "bbb4", "bbb5", "bbb6"]);
  // zzz9 was analyzed but has no metadata; it never enters the tables
  assert!(rows.iter().all(|r| r["commit_id"] != "zzz9"));
}

#[test]
fn events_are_conserved_against_transformation_counts() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let rows = read_output_json(td.path(), "commits_normalized.json");
  let events = read_output_json(td.path(), "events.json");

  let mut per_commit: HashMap<(String, String), u64> = HashMap::new();
  for e in events.as_array().unwrap() {
    let key = (e["population"].as_str().unwrap().to_string(), e["commit_id"].as_str().unwrap().to_string());
    *per_commit.entry(key).or_default() += 1;
  }
  let mut expected: HashMap<(String, String), u64> = HashMap::new();
  for r in rows.as_array().unwrap() {
    let key = (r["population"].as_str().unwrap().to_string(), r["commit_id"].as_str().unwrap().to_string());
    let n = r["transformation_count"].as_u64().unwrap();
    expected.entry(key).or_insert(n);
  }
  expected.retain(|_, n| *n > 0);
  assert_eq!(per_commit, expected);

  let first = &events[0];
  assert_eq!(first["commit_id"], "aaa1");
  assert_eq!(first["type_label"], "Extract Method");
  assert_eq!(first["agent_label"], "Codex");
  assert_eq!(first["before_elements"], serde_json::json!(["load()"]));
  assert_eq!(first["after_locations"][0]["file_path"], "src/loader.py");
}

#[test]
fn observed_and_normalized_rates_diverge_as_expected() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let agg = read_output_json(td.path(), "aggregates.json");

  let agent_obs = rate(&agg, "agent", "observed");
  assert_eq!(agent_obs["total_commits"], 3);
  assert_eq!(agent_obs["transformed_commits"], 2);
  let agent_norm = rate(&agg, "agent", "normalized");
  assert_eq!(agent_norm["total_commits"], 5);
  assert!((agent_norm["rate_pct"].as_f64().unwrap() - 40.0).abs() < 1e-9);

  // bbb1 sits in two PRs but counts once per aggregate
  let human_norm = rate(&agg, "human", "normalized");
  assert_eq!(human_norm["total_commits"], 6);
  assert_eq!(human_norm["transformed_commits"], 2);

  // pooled across both populations, each commit id once
  let global: Vec<(&str, u64, u64)> = agg["global_rates"]
    .as_array()
    .unwrap()
    .iter()
    .map(|g| (g["denominator"].as_str().unwrap(), g["transformed_commits"].as_u64().unwrap(), g["total_commits"].as_u64().unwrap()))
    .collect();
  assert_eq!(global, vec![("observed", 4, 6), ("normalized", 4, 11)]);

  let shares = agg["type_shares"]["by_population"].as_array().unwrap();
  let agent_total: f64 =
    shares.iter().filter(|r| r["population"] == "agent").map(|r| r["share_pct"].as_f64().unwrap()).sum();
  assert!((agent_total - 100.0).abs() < 1e-6);
}

#[test]
fn distributions_include_agent_by_project_rows() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let agg = read_output_json(td.path(), "aggregates.json");
  let devin = agg["distributions"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["denominator"] == "normalized" && r["agent_label"] == "Devin" && r["project_id"] == "acme/gears")
    .expect("Devin x acme/gears distribution row");
  assert_eq!(devin["population"], "agent");
  // aaa3 carries one transformation, aaa4 is a placeholder
  assert_eq!(devin["count"], 2);
  assert_eq!(devin["total_transformations"], 1);
}

#[test]
fn statistics_complete_against_the_human_reference() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let stats = read_output_json(td.path(), "stats.json");
  assert_eq!(stats["status"], "completed");
  assert_eq!(stats["table"], "observed");
  assert_eq!(stats["reference"], "Human");
  assert_eq!(stats["kruskal_wallis"]["groups"], serde_json::json!(["Codex", "Devin", "Human"]));
  assert_eq!(stats["kruskal_wallis"]["df"], 2);
  let p = stats["kruskal_wallis"]["p_value"].as_f64().unwrap();
  assert!((0.0..=1.0).contains(&p));
  let pairs: Vec<&str> = stats["pairwise"].as_array().unwrap().iter().map(|m| m["group"].as_str().unwrap()).collect();
  assert_eq!(pairs, vec!["Codex", "Devin"]);
}

#[test]
fn no_stats_flag_records_a_skip() {
  let td = tempdir();
  run_fixtures(td.path(), &["--no-stats"]);
  let stats = read_output_json(td.path(), "stats.json");
  assert_eq!(stats["status"], "skipped");
  assert_eq!(stats["reason"], "disabled by --no-stats");
}

#[test]
fn diagnostics_count_skipped_and_synthesized_rows() {
  let td = tempdir();
  run_fixtures(td.path(), &[]);
  let manifest = read_output_json(td.path(), "manifest.json");
  let agent = &manifest["diagnostics"][0];
  assert_eq!(agent["population"], "agent");
  assert_eq!(agent["candidate_source"], "table");
  assert_eq!(agent["skipped_tool_commits"], 1);
  assert_eq!(agent["skipped_events"], 1);
  assert_eq!(agent["unmatched_tool_commits"], 1);
  assert_eq!(agent["duplicates_removed"], 1);
  assert_eq!(agent["synthesized_rows"], 2);
  assert_eq!(agent["dropped_events"], 4);

  let human = &manifest["diagnostics"][1];
  assert_eq!(human["candidate_source"], "metadata_fallback");
  assert_eq!(human["synthesized_rows"], 3);
}
