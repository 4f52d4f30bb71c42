// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate the per-population branches (normalize, join, reconcile, dedup) and the cross-population summaries
// role: processing/orchestrator
// inputs: EffectiveConfig (populations in output order, top_types, stats flag)
// outputs: RunOutput: normalized/observed commit tables, event table, aggregates, stats outcome, diagnostics
// side_effects: Reads input files; logs
// invariants:
// - population branches are independent and run in parallel; results are concatenated in configured order, never arrival order
// - only the reconciler adds rows and only the deduplicator removes them
// - events survive only for the tool entry that survived dedup, so per-commit event counts equal transformation_count
// errors: InputError from any branch aborts the run; an event/commit mismatch is an internal error
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Result};
use rayon::prelude::*;
use tracing::info;

use crate::aggregate::{aggregate, Aggregates, CommitTable, NormalizedCommits, ObservedCommits};
use crate::cli::{EffectiveConfig, PopulationInputs};
use crate::dedup::dedup;
use crate::error::InputError;
use crate::joiner::join_metadata;
use crate::model::{CandidateRow, CommitRecord, Population, RawEvent, TransformationEvent};
use crate::normalizer::{normalize_document, Normalized};
use crate::reconcile::reconcile;
use crate::report::{CandidateSource, Diagnostics};
use crate::sources::{load_candidates, load_metadata, read_json_input};
use crate::stats::{self, StatsOutcome};

/// Canonical tables of one population.
#[derive(Debug, Clone)]
pub struct PopulationTables {
  pub rows: Vec<CommitRecord>,
  pub events: Vec<TransformationEvent>,
  pub diagnostics: Diagnostics,
}

#[derive(Debug)]
pub struct RunOutput {
  pub normalized: NormalizedCommits,
  pub observed: ObservedCommits,
  pub events: Vec<TransformationEvent>,
  pub aggregates: Aggregates,
  pub stats: StatsOutcome,
  pub diagnostics: Vec<Diagnostics>,
}

pub fn run_population(inputs: &PopulationInputs) -> Result<PopulationTables, InputError> {
  let population = inputs.population;
  let mut diag = Diagnostics::new(population);
  let tool_input = format!("{} tool output", population.label().to_lowercase());

  let doc = read_json_input(Path::new(&inputs.tool_output), &tool_input)?;
  let Normalized { commits, events } = normalize_document(&doc, &tool_input, &mut diag)?;
  let metadata = load_metadata(Path::new(&inputs.metadata), population, &mut diag)?;
  let candidates: Vec<CandidateRow> = match &inputs.candidates {
    Some(path) => load_candidates(Path::new(path), population, &mut diag)?,
    None => {
      info!(population = %population, "no candidate table configured; metadata rows used as the candidate set");
      diag.candidate_source = CandidateSource::MetadataFallback;
      metadata.iter().map(CandidateRow::from).collect()
    }
  };

  let analyzed = join_metadata(&commits, &metadata, population, &mut diag)?;
  let reconciled = reconcile(analyzed, &candidates, &metadata, population, &mut diag);
  let (rows, removed) = dedup(reconciled, population.dedup_key());
  diag.duplicates_removed = removed;

  let events = attach_events(events, &rows, &mut diag);
  info!(population = %population, rows = rows.len(), events = events.len(), duplicates = removed, "population tables built");
  Ok(PopulationTables { rows, events, diagnostics: diag })
}

/// Keep events whose tool entry survived dedup, denormalized from the first row of their commit.
fn attach_events(raw: Vec<RawEvent>, rows: &[CommitRecord], diag: &mut Diagnostics) -> Vec<TransformationEvent> {
  let mut owners: HashMap<&str, &CommitRecord> = HashMap::new();
  let mut kept_origins: HashSet<(&str, usize)> = HashSet::new();
  for r in rows {
    if let Some(origin) = r.origin {
      owners.entry(r.commit_id.as_str()).or_insert(r);
      kept_origins.insert((r.commit_id.as_str(), origin));
    }
  }

  let mut out = Vec::with_capacity(raw.len());
  for ev in raw {
    let owner = if kept_origins.contains(&(ev.commit_id.as_str(), ev.origin)) {
      owners.get(ev.commit_id.as_str()).copied()
    } else {
      None
    };
    match owner {
      Some(o) => out.push(TransformationEvent::from_raw(ev, o)),
      None => diag.dropped_events += 1,
    }
  }
  out
}

/// Every event points at a transformed commit, and per-commit event counts match transformation_count.
pub fn verify_event_integrity(rows: &[CommitRecord], events: &[TransformationEvent]) -> Result<()> {
  let mut expected: HashMap<(Population, &str), usize> = HashMap::new();
  for r in rows {
    expected.entry((r.population, r.commit_id.as_str())).or_insert(r.transformation_count);
  }
  let mut seen: HashMap<(Population, &str), usize> = HashMap::new();
  for e in events {
    *seen.entry((e.population, e.commit_id.as_str())).or_default() += 1;
  }
  for (key, n) in &seen {
    match expected.get(key) {
      Some(want) if want == n => {}
      Some(want) => bail!("commit {} carries {} events but transformation_count {}", key.1, n, want),
      None => bail!("events reference unknown commit {}", key.1),
    }
  }
  for (key, want) in &expected {
    if *want > 0 && !seen.contains_key(key) {
      bail!("commit {} has transformation_count {} but no events", key.1, want);
    }
  }
  Ok(())
}

pub fn run(cfg: &EffectiveConfig) -> Result<RunOutput> {
  let branches: Vec<PopulationTables> = cfg
    .populations
    .par_iter()
    .map(run_population)
    .collect::<Result<Vec<_>, InputError>>()?;

  let mut rows = Vec::new();
  let mut events = Vec::new();
  let mut diagnostics = Vec::new();
  for b in branches {
    rows.extend(b.rows);
    events.extend(b.events);
    diagnostics.push(b.diagnostics);
  }
  verify_event_integrity(&rows, &events)?;

  let populations = cfg.population_order();
  let normalized = NormalizedCommits::new(rows);
  let observed = ObservedCommits::from_normalized(&normalized);
  let aggregates = aggregate(&observed, &normalized, &events, &populations, cfg.top_types);
  let stats = stats::run(&observed, &populations, cfg.stats);
  info!(
    normalized_rows = normalized.rows().len(),
    observed_rows = observed.rows().len(),
    events = events.len(),
    "run complete"
  );

  Ok(RunOutput { normalized, observed, events, aggregates, stats, diagnostics })
}
