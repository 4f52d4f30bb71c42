// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Advisory significance tests on per-commit transformation counts across agent groups and the Human reference
// role: stats/significance
// inputs: ObservedCommits (the analyzed subset), population order, enable flag
// outputs: StatsOutcome::Completed (Kruskal-Wallis omnibus + pairwise Mann-Whitney U vs Human) or StatsOutcome::Skipped with a reason
// invariants:
// - empty groups never reach a test; they are listed in excluded_groups
// - an unavailable test is a logged skip, never a failed run
// - ranks use average ranks for ties; both tests apply the tie correction
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{CommitTable, Denominator, ObservedCommits};
use crate::model::Population;

pub const METRIC: &str = "transformation_count";

/// One group's observations.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSample {
  pub population: Population,
  pub label: String,
  pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KruskalWallis {
  pub groups: Vec<String>,
  pub h: f64,
  pub df: usize,
  pub p_value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MannWhitney {
  pub group: String,
  pub reference: String,
  pub n: usize,
  pub n_reference: usize,
  /// U statistic of `group` (ranks of group minus n(n+1)/2)
  pub u: f64,
  pub z: f64,
  pub p_value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsReport {
  pub table: Denominator,
  pub metric: &'static str,
  pub reference: String,
  pub kruskal_wallis: KruskalWallis,
  pub pairwise: Vec<MannWhitney>,
  pub skipped_pairs: Vec<String>,
  pub excluded_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatsOutcome {
  Completed(StatsReport),
  Skipped { reason: String, excluded_groups: Vec<String> },
}

impl StatsOutcome {
  fn skipped(reason: impl Into<String>, excluded_groups: Vec<String>) -> Self {
    let reason = reason.into();
    warn!(reason = %reason, "statistics skipped");
    StatsOutcome::Skipped { reason, excluded_groups }
  }
}

/// Per-commit counts grouped by agent label (humans form one group), in population order.
///
/// Groups carry their population; the Human reference is selected by population, not by label.
pub fn group_samples(table: &ObservedCommits, populations: &[Population]) -> Vec<GroupSample> {
  let mut out = Vec::new();
  for &p in populations {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut seen = HashSet::new();
    for r in table.rows().iter().filter(|r| r.population == p) {
      let label = r.group_label();
      if seen.insert((label.clone(), r.commit_id.as_str())) {
        groups.entry(label).or_default().push(r.transformation_count as f64);
      }
    }
    if groups.is_empty() {
      // keep the configured population visible so its exclusion is reported
      groups.insert(p.label().to_string(), Vec::new());
    }
    out.extend(groups.into_iter().map(|(label, values)| GroupSample { population: p, label, values }));
  }
  out
}

/// Run the comparison on the Observed table, or explain why it was not run.
pub fn run(table: &ObservedCommits, populations: &[Population], enabled: bool) -> StatsOutcome {
  if !enabled {
    return StatsOutcome::skipped("disabled by --no-stats", Vec::new());
  }
  let samples = group_samples(table, populations);
  compare_groups(samples, Population::Human)
}

#[cfg(not(feature = "significance"))]
pub fn compare_groups(_samples: Vec<GroupSample>, _reference: Population) -> StatsOutcome {
  StatsOutcome::skipped("built without the `significance` feature", Vec::new())
}

#[cfg(feature = "significance")]
pub fn compare_groups(samples: Vec<GroupSample>, reference: Population) -> StatsOutcome {
  let (groups, empty): (Vec<GroupSample>, Vec<GroupSample>) = samples.into_iter().partition(|g| !g.values.is_empty());
  let excluded: Vec<String> = empty.into_iter().map(|g| g.label).collect();

  if groups.len() < 2 {
    return StatsOutcome::skipped(format!("fewer than two non-empty groups ({})", groups.len()), excluded);
  }
  let Some(kruskal_wallis) = significance::kruskal_wallis(&groups) else {
    return StatsOutcome::skipped("all observations are tied", excluded);
  };

  let reference_label = reference.label();
  let mut pairwise = Vec::new();
  let mut skipped_pairs = Vec::new();
  match groups.iter().find(|g| g.population == reference) {
    Some(reference_group) => {
      for g in groups.iter().filter(|g| g.population != reference) {
        match significance::mann_whitney(g, reference_group) {
          Some(mw) => pairwise.push(mw),
          None => skipped_pairs.push(format!("{} vs {}: all observations are tied", g.label, reference_label)),
        }
      }
    }
    None => skipped_pairs.push(format!("reference group {} has no observations", reference_label)),
  }

  info!(groups = groups.len(), h = kruskal_wallis.h, p = kruskal_wallis.p_value, "kruskal-wallis computed");
  StatsOutcome::Completed(StatsReport {
    table: ObservedCommits::DENOMINATOR,
    metric: METRIC,
    reference: reference_label.to_string(),
    kruskal_wallis,
    pairwise,
    skipped_pairs,
    excluded_groups: excluded,
  })
}

#[cfg(feature = "significance")]
mod significance {
  use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

  use super::{GroupSample, KruskalWallis, MannWhitney};

  /// Average ranks (1-based) of the pooled sample plus sum of (t^3 - t) over tie blocks.
  pub(super) fn rank_pooled(values: &[f64]) -> (Vec<f64>, f64) {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut ties = 0.0;
    let mut i = 0;
    while i < idx.len() {
      let mut j = i;
      while j + 1 < idx.len() && values[idx[j + 1]] == values[idx[i]] {
        j += 1;
      }
      let avg = (i + j) as f64 / 2.0 + 1.0;
      for &k in &idx[i..=j] {
        ranks[k] = avg;
      }
      let t = (j - i + 1) as f64;
      ties += t * t * t - t;
      i = j + 1;
    }
    (ranks, ties)
  }

  pub(super) fn kruskal_wallis(groups: &[GroupSample]) -> Option<KruskalWallis> {
    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.values.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, ties) = rank_pooled(&pooled);
    let correction = 1.0 - ties / (n * n * n - n);
    if correction <= 0.0 {
      return None;
    }

    let mut offset = 0;
    let mut sum = 0.0;
    for g in groups {
      let r: f64 = ranks[offset..offset + g.values.len()].iter().sum();
      sum += r * r / g.values.len() as f64;
      offset += g.values.len();
    }
    let h = (12.0 / (n * (n + 1.0)) * sum - 3.0 * (n + 1.0)) / correction;
    let df = groups.len() - 1;
    let p_value = chi2_sf(h, df as f64)?;
    Some(KruskalWallis { groups: groups.iter().map(|g| g.label.clone()).collect(), h, df, p_value })
  }

  /// Two-sided test, normal approximation with tie and continuity correction.
  pub(super) fn mann_whitney(group: &GroupSample, reference: &GroupSample) -> Option<MannWhitney> {
    let n1 = group.values.len() as f64;
    let n2 = reference.values.len() as f64;
    let pooled: Vec<f64> = group.values.iter().chain(reference.values.iter()).copied().collect();
    let n = n1 + n2;
    let (ranks, ties) = rank_pooled(&pooled);
    let r1: f64 = ranks[..group.values.len()].iter().sum();
    let u = r1 - n1 * (n1 + 1.0) / 2.0;
    let mu = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));
    if variance <= 0.0 {
      return None;
    }
    let z = ((u - mu).abs() - 0.5) / variance.sqrt();
    let p_value = (2.0 * normal_sf(z)?).min(1.0);
    Some(MannWhitney {
      group: group.label.clone(),
      reference: reference.label.clone(),
      n: group.values.len(),
      n_reference: reference.values.len(),
      u,
      z,
      p_value,
    })
  }

  fn normal_sf(z: f64) -> Option<f64> {
    Normal::new(0.0, 1.0).ok().map(|n| n.sf(z))
  }

  fn chi2_sf(x: f64, df: f64) -> Option<f64> {
    ChiSquared::new(df).ok().map(|c| c.sf(x.max(0.0)))
  }

}
