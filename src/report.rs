// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Per-population diagnostics counters and the plain-text headline report
// role: report/rendering
// inputs: Diagnostics per population, Aggregates, StatsOutcome
// outputs: Serializable Diagnostics (manifest), summary.txt text
// invariants:
// - the text report is deterministic for identical inputs (no paths, no timestamps)
// - every skipped or defaulted record surfaces here as a counter
// - summary.txt is informational; aggregates.json and stats.json are authoritative
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt::Write as _;

use serde::Serialize;

use crate::aggregate::{Aggregates, Denominator, RateRow};
use crate::model::Population;
use crate::stats::StatsOutcome;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
  #[default]
  Table,
  /// no candidate table configured; metadata rows stand in
  MetadataFallback,
}

/// Counters for one population branch. Malformed rows and defaulted values land here instead of failing the run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Diagnostics {
  pub population: Population,
  pub candidate_source: CandidateSource,
  pub skipped_tool_commits: usize,
  pub skipped_events: usize,
  pub skipped_metadata_rows: usize,
  pub skipped_candidate_rows: usize,
  pub defaulted_columns: Vec<String>,
  pub defaulted_values: usize,
  pub unmatched_tool_commits: usize,
  pub duplicates_removed: usize,
  pub synthesized_rows: usize,
  pub analyzed_outside_candidates: usize,
  pub dropped_events: usize,
}

impl Diagnostics {
  pub fn new(population: Population) -> Self {
    Diagnostics {
      population,
      candidate_source: CandidateSource::default(),
      skipped_tool_commits: 0,
      skipped_events: 0,
      skipped_metadata_rows: 0,
      skipped_candidate_rows: 0,
      defaulted_columns: Vec::new(),
      defaulted_values: 0,
      unmatched_tool_commits: 0,
      duplicates_removed: 0,
      synthesized_rows: 0,
      analyzed_outside_candidates: 0,
      dropped_events: 0,
    }
  }
}

fn fmt_counts(rate_pct: Option<f64>, transformed: usize, total: usize) -> String {
  match rate_pct {
    Some(r) => format!("{:6.2}% ({}/{})", r, transformed, total),
    None => format!("insufficient_data ({}/{})", transformed, total),
  }
}

fn fmt_rate(row: Option<&RateRow>) -> String {
  match row {
    Some(r) => fmt_counts(r.rate_pct, r.transformed_commits, r.total_commits),
    None => "n/a".to_string(),
  }
}

fn fmt_p(p: f64) -> String {
  if p < 1e-4 {
    format!("{:.2e}", p)
  } else {
    format!("{:.4}", p)
  }
}

/// Render the headline report.
pub fn render_summary(aggregates: &Aggregates, stats: &StatsOutcome, diagnostics: &[Diagnostics]) -> String {
  let mut s = String::new();
  let pops: Vec<&str> = aggregates.populations.iter().map(|p| p.label()).collect();
  let _ = writeln!(s, "refactor-census summary");
  let _ = writeln!(s, "populations: {}", pops.join(", "));

  let _ = writeln!(s);
  let _ = writeln!(s, "Transformation rate by population");
  for &p in &aggregates.populations {
    for d in [Denominator::Observed, Denominator::Normalized] {
      let _ = writeln!(s, "  {:<6} {:<10} {}", p.label(), d.to_string(), fmt_rate(aggregates.population_rate(p, d)));
    }
  }

  let _ = writeln!(s);
  let _ = writeln!(s, "Global rate (all populations)");
  for d in [Denominator::Observed, Denominator::Normalized] {
    let rate = match aggregates.global_rate(d) {
      Some(g) => fmt_counts(g.rate_pct, g.transformed_commits, g.total_commits),
      None => "n/a".to_string(),
    };
    let _ = writeln!(s, "  {:<10} {}", d.to_string(), rate);
  }

  let _ = writeln!(s);
  let _ = writeln!(s, "Normalization check");
  for &p in &aggregates.populations {
    let obs = aggregates.population_rate(p, Denominator::Observed).and_then(|r| r.rate_pct);
    let norm = aggregates.population_rate(p, Denominator::Normalized).and_then(|r| r.rate_pct);
    match (obs, norm) {
      (Some(o), Some(n)) => {
        let _ = writeln!(s, "  {}: observed {:.2}% vs normalized {:.2}% (delta {:+.2} pts)", p.label(), o, n, n - o);
      }
      _ => {
        let _ = writeln!(s, "  {}: insufficient_data", p.label());
      }
    }
  }

  let by_agent: Vec<&RateRow> = aggregates
    .rates_by_agent
    .iter()
    .filter(|r| r.denominator == Denominator::Normalized)
    .collect();
  if !by_agent.is_empty() {
    let _ = writeln!(s);
    let _ = writeln!(s, "Normalized rate by agent");
    for r in by_agent {
      let label = r.agent_label.as_deref().unwrap_or("-");
      let _ = writeln!(s, "  {:<16} {}", label, fmt_rate(Some(r)));
    }
  }

  let _ = writeln!(s);
  let _ = writeln!(s, "Diagnostics");
  for d in diagnostics {
    let source = match d.candidate_source {
      CandidateSource::Table => "candidate table",
      CandidateSource::MetadataFallback => "metadata (no candidate table)",
    };
    let _ = writeln!(s, "  {}: candidates from {}", d.population.label(), source);
    let _ = writeln!(
      s,
      "    skipped: tool commits {}, events {}, metadata rows {}, candidate rows {}",
      d.skipped_tool_commits, d.skipped_events, d.skipped_metadata_rows, d.skipped_candidate_rows
    );
    let _ = writeln!(
      s,
      "    reconciled: unmatched tool commits {}, duplicates removed {}, synthesized rows {}, analyzed outside candidates {}",
      d.unmatched_tool_commits, d.duplicates_removed, d.synthesized_rows, d.analyzed_outside_candidates
    );
    if d.defaulted_values > 0 || !d.defaulted_columns.is_empty() {
      let cols = if d.defaulted_columns.is_empty() { "-".to_string() } else { d.defaulted_columns.join("; ") };
      let _ = writeln!(s, "    defaulted: values {}, columns {}", d.defaulted_values, cols);
    }
    if d.dropped_events > 0 {
      let _ = writeln!(s, "    events dropped (unmatched or duplicate tool entries): {}", d.dropped_events);
    }
  }

  let _ = writeln!(s);
  match stats {
    StatsOutcome::Completed(r) => {
      let _ = writeln!(s, "Statistics ({} table, {})", r.table, r.metric);
      let kw = &r.kruskal_wallis;
      let _ = writeln!(
        s,
        "  Kruskal-Wallis across {}: H={:.4}, df={}, p={}",
        kw.groups.join(", "),
        kw.h,
        kw.df,
        fmt_p(kw.p_value)
      );
      for mw in &r.pairwise {
        let _ = writeln!(
          s,
          "  Mann-Whitney {} vs {}: U={:.1}, p={} (n={}, {})",
          mw.group,
          mw.reference,
          mw.u,
          fmt_p(mw.p_value),
          mw.n,
          mw.n_reference
        );
      }
      for note in &r.skipped_pairs {
        let _ = writeln!(s, "  skipped pair: {}", note);
      }
      if !r.excluded_groups.is_empty() {
        let _ = writeln!(s, "  excluded empty groups: {}", r.excluded_groups.join(", "));
      }
    }
    StatsOutcome::Skipped { reason, excluded_groups } => {
      let _ = writeln!(s, "Statistics skipped: {}", reason);
      if !excluded_groups.is_empty() {
        let _ = writeln!(s, "  excluded empty groups: {}", excluded_groups.join(", "));
      }
    }
  }
  s
}
