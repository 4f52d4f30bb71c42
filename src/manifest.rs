// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Persist the run's tables and reports and write manifest.json describing them
// role: persistence/manifest
// inputs: Output directory, EffectiveConfig, RunOutput, generated_at
// outputs: commits_normalized.json, commits_observed.json, events.json, aggregates.json, stats.json, summary.txt, manifest.json
// side_effects: Writes to filesystem
// invariants:
// - file names in the manifest are relative to the output directory
// - generated_at is serialized in %Y-%m-%dT%H:%M:%S (local)
// - manifest.json is written last so its presence means every listed file exists
// errors: IO errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::aggregate::CommitTable;
use crate::cli::EffectiveConfig;
use crate::pipeline::RunOutput;
use crate::report::render_summary;

pub const COMMITS_NORMALIZED_FILE: &str = "commits_normalized.json";
pub const COMMITS_OBSERVED_FILE: &str = "commits_observed.json";
pub const EVENTS_FILE: &str = "events.json";
pub const AGGREGATES_FILE: &str = "aggregates.json";
pub const STATS_FILE: &str = "stats.json";
pub const SUMMARY_FILE: &str = "summary.txt";
pub const MANIFEST_FILE: &str = "manifest.json";

fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
  let path = dir.join(name);
  let buf = serde_json::to_vec_pretty(value).with_context(|| format!("serializing {}", name))?;
  std::fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))
}

/// Build the manifest value.
pub fn build_manifest(cfg: &EffectiveConfig, run: &RunOutput, generated_at: DateTime<Local>) -> Result<serde_json::Value> {
  Ok(serde_json::json!({
    "tool": env!("CARGO_PKG_NAME"),
    "version": env!("CARGO_PKG_VERSION"),
    "generated_at": generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    "config": serde_json::to_value(cfg)?,
    "rows": {
      "normalized": run.normalized.rows().len(),
      "observed": run.observed.rows().len(),
      "events": run.events.len(),
    },
    "diagnostics": serde_json::to_value(&run.diagnostics)?,
    "files": {
      "commits_normalized": COMMITS_NORMALIZED_FILE,
      "commits_observed": COMMITS_OBSERVED_FILE,
      "events": EVENTS_FILE,
      "aggregates": AGGREGATES_FILE,
      "stats": STATS_FILE,
      "summary": SUMMARY_FILE,
    },
  }))
}

/// Write every output file under `base_dir`; returns the manifest path.
pub fn write_outputs(base_dir: &str, cfg: &EffectiveConfig, run: &RunOutput, generated_at: DateTime<Local>) -> Result<PathBuf> {
  let dir = Path::new(base_dir);
  write_json(dir, COMMITS_NORMALIZED_FILE, run.normalized.rows())?;
  write_json(dir, COMMITS_OBSERVED_FILE, run.observed.rows())?;
  write_json(dir, EVENTS_FILE, &run.events)?;
  write_json(dir, AGGREGATES_FILE, &run.aggregates)?;
  write_json(dir, STATS_FILE, &run.stats)?;

  let summary_path = dir.join(SUMMARY_FILE);
  std::fs::write(&summary_path, render_summary(&run.aggregates, &run.stats, &run.diagnostics))
    .with_context(|| format!("writing {}", summary_path.display()))?;

  let manifest = build_manifest(cfg, run, generated_at)?;
  write_json(dir, MANIFEST_FILE, &manifest)?;
  Ok(dir.join(MANIFEST_FILE))
}
