// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Derive counts, rates, distributions and type shares from the commit and event tables
// role: aggregate
// inputs: ObservedCommits / NormalizedCommits (denominator policy carried by type), TransformationEvents, population order
// outputs: Aggregates (serializable tables; rate tables tagged with their denominator)
// invariants:
// - a rate cannot be computed without naming a policy: only CommitTable implementors are accepted
// - total_commits == 0 yields rate_pct = None and status insufficient_data, never a division by zero
// - every configured population gets a population-level row, even when empty
// - global rates pool all configured populations and count each commit id once
// - within a group commits are counted once per commit id
// - share_pct values of one group sum to 100
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::model::{CommitRecord, Population, TransformationEvent};

pub const OTHER_TYPE_LABEL: &str = "Other";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Denominator {
  /// analyzed commits only
  Observed,
  /// full candidate set, analyzed plus placeholders
  Normalized,
}

impl std::fmt::Display for Denominator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Denominator::Observed => f.write_str("observed"),
      Denominator::Normalized => f.write_str("normalized"),
    }
  }
}

/// A commit table whose denominator policy is fixed by its type.
pub trait CommitTable {
  const DENOMINATOR: Denominator;
  fn rows(&self) -> &[CommitRecord];
}

/// Analyzed rows plus reconciler placeholders.
#[derive(Debug, Clone, Default)]
pub struct NormalizedCommits {
  rows: Vec<CommitRecord>,
}

impl NormalizedCommits {
  pub fn new(rows: Vec<CommitRecord>) -> Self {
    NormalizedCommits { rows }
  }
}

impl CommitTable for NormalizedCommits {
  const DENOMINATOR: Denominator = Denominator::Normalized;
  fn rows(&self) -> &[CommitRecord] {
    &self.rows
  }
}

/// Only the commits the tool actually analyzed.
#[derive(Debug, Clone, Default)]
pub struct ObservedCommits {
  rows: Vec<CommitRecord>,
}

impl ObservedCommits {
  pub fn from_normalized(table: &NormalizedCommits) -> Self {
    ObservedCommits { rows: table.rows.iter().filter(|r| r.analyzed).cloned().collect() }
  }
}

impl CommitTable for ObservedCommits {
  const DENOMINATOR: Denominator = Denominator::Observed;
  fn rows(&self) -> &[CommitRecord] {
    &self.rows
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
  Ok,
  InsufficientData,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateRow {
  pub denominator: Denominator,
  pub population: Population,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
  pub total_commits: usize,
  pub transformed_commits: usize,
  pub rate_pct: Option<f64>,
  pub status: RateStatus,
}

/// Descriptive statistics of a sample; every figure is None for an empty sample.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Describe {
  pub count: usize,
  pub mean: Option<f64>,
  /// sample standard deviation (n - 1); None below two observations
  pub std: Option<f64>,
  pub min: Option<f64>,
  pub p25: Option<f64>,
  pub median: Option<f64>,
  pub p75: Option<f64>,
  pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DistributionRow {
  pub denominator: Denominator,
  pub population: Population,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
  pub transformed_commits: usize,
  pub total_transformations: usize,
  #[serde(flatten)]
  pub transformation_count: Describe,
  pub transformations_per_commit: Option<f64>,
  pub transformations_per_transformed_commit: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypePrevalenceRow {
  pub denominator: Denominator,
  pub population: Population,
  pub type_label: String,
  pub commits_with_type: usize,
  pub total_commits: usize,
  pub prevalence_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectSpreadRow {
  pub denominator: Denominator,
  pub population: Population,
  pub agent_label: String,
  #[serde(flatten)]
  pub project_rate_pct: Describe,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypeShareRow {
  pub population: Population,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
  pub type_label: String,
  pub count: usize,
  pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TypeTotalRow {
  pub type_label: String,
  pub count: usize,
  pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct TypeShares {
  pub top_types: Option<usize>,
  pub by_population: Vec<TypeShareRow>,
  pub by_agent: Vec<TypeShareRow>,
  pub by_project: Vec<TypeShareRow>,
  pub totals: Vec<TypeTotalRow>,
}

/// Rate over every configured population pooled together.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GlobalRateRow {
  pub denominator: Denominator,
  pub populations: Vec<Population>,
  pub total_commits: usize,
  pub transformed_commits: usize,
  pub rate_pct: Option<f64>,
  pub status: RateStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Aggregates {
  pub populations: Vec<Population>,
  pub global_rates: Vec<GlobalRateRow>,
  pub rates_by_population: Vec<RateRow>,
  pub rates_by_agent: Vec<RateRow>,
  pub rates_by_project: Vec<RateRow>,
  pub distributions: Vec<DistributionRow>,
  pub type_prevalence: Vec<TypePrevalenceRow>,
  pub project_rate_spread: Vec<ProjectSpreadRow>,
  pub type_shares: TypeShares,
}

impl Aggregates {
  pub fn population_rate(&self, population: Population, denominator: Denominator) -> Option<&RateRow> {
    self.rates_by_population.iter().find(|r| r.population == population && r.denominator == denominator)
  }

  pub fn global_rate(&self, denominator: Denominator) -> Option<&GlobalRateRow> {
    self.global_rates.iter().find(|r| r.denominator == denominator)
  }
}

/// Build every aggregate table under both denominator policies.
pub fn aggregate(
  observed: &ObservedCommits,
  normalized: &NormalizedCommits,
  events: &[TransformationEvent],
  populations: &[Population],
  top_types: Option<usize>,
) -> Aggregates {
  let mut out = Aggregates {
    populations: populations.to_vec(),
    global_rates: vec![global_rate(observed, populations), global_rate(normalized, populations)],
    rates_by_population: rates_by_population(observed, populations),
    rates_by_agent: rates_by_agent(observed, populations),
    rates_by_project: rates_by_project(observed, populations),
    distributions: distributions(observed, populations),
    type_prevalence: type_prevalence(observed, populations),
    project_rate_spread: project_rate_spread(observed, populations),
    type_shares: type_shares(events, populations, top_types),
  };
  out.rates_by_population.extend(rates_by_population(normalized, populations));
  out.rates_by_agent.extend(rates_by_agent(normalized, populations));
  out.rates_by_project.extend(rates_by_project(normalized, populations));
  out.distributions.extend(distributions(normalized, populations));
  out.type_prevalence.extend(type_prevalence(normalized, populations));
  out.project_rate_spread.extend(project_rate_spread(normalized, populations));
  out
}

pub fn pct(numerator: usize, denominator: usize) -> Option<f64> {
  if denominator == 0 {
    None
  } else {
    Some(numerator as f64 / denominator as f64 * 100.0)
  }
}

/// First row per commit id, in table order.
fn distinct<'a>(rows: impl IntoIterator<Item = &'a CommitRecord>) -> Vec<&'a CommitRecord> {
  let mut seen = HashSet::new();
  rows.into_iter().filter(|r| seen.insert(r.commit_id.as_str())).collect()
}

fn of_population<T: CommitTable>(table: &T, population: Population) -> impl Iterator<Item = &CommitRecord> {
  table.rows().iter().filter(move |r| r.population == population)
}

fn rate_row(
  denominator: Denominator,
  population: Population,
  agent_label: Option<String>,
  project_id: Option<String>,
  rows: &[&CommitRecord],
) -> RateRow {
  let total = rows.len();
  let transformed = rows.iter().filter(|r| r.has_transformations).count();
  let rate_pct = pct(transformed, total);
  RateRow {
    denominator,
    population,
    agent_label,
    project_id,
    total_commits: total,
    transformed_commits: transformed,
    status: if rate_pct.is_some() { RateStatus::Ok } else { RateStatus::InsufficientData },
    rate_pct,
  }
}

pub fn rates_by_population<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<RateRow> {
  populations
    .iter()
    .map(|&p| rate_row(T::DENOMINATOR, p, None, None, &distinct(of_population(table, p))))
    .collect()
}

/// Pooled rate across the configured populations, one row per distinct commit id.
pub fn global_rate<T: CommitTable>(table: &T, populations: &[Population]) -> GlobalRateRow {
  let rows = distinct(table.rows().iter().filter(|r| populations.contains(&r.population)));
  let total = rows.len();
  let transformed = rows.iter().filter(|r| r.has_transformations).count();
  let rate_pct = pct(transformed, total);
  GlobalRateRow {
    denominator: T::DENOMINATOR,
    populations: populations.to_vec(),
    total_commits: total,
    transformed_commits: transformed,
    status: if rate_pct.is_some() { RateStatus::Ok } else { RateStatus::InsufficientData },
    rate_pct,
  }
}

pub fn rates_by_agent<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<RateRow> {
  let mut out = Vec::new();
  for &p in populations {
    let mut groups: BTreeMap<String, Vec<&CommitRecord>> = BTreeMap::new();
    for r in of_population(table, p) {
      groups.entry(r.group_label()).or_default().push(r);
    }
    for (label, rows) in groups {
      out.push(rate_row(T::DENOMINATOR, p, Some(label), None, &distinct(rows)));
    }
  }
  out
}

pub fn rates_by_project<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<RateRow> {
  let mut out = Vec::new();
  for &p in populations {
    let mut groups: BTreeMap<(String, String), Vec<&CommitRecord>> = BTreeMap::new();
    for r in of_population(table, p) {
      groups.entry((r.group_label(), r.project_id.clone())).or_default().push(r);
    }
    for ((label, project), rows) in groups {
      out.push(rate_row(T::DENOMINATOR, p, Some(label), Some(project), &distinct(rows)));
    }
  }
  out
}

/// Count, mean, sample std and quartiles (statrs order statistics, R-8 quantiles).
pub fn describe(values: &[f64]) -> Describe {
  let n = values.len();
  if n == 0 {
    return Describe::default();
  }
  let mut data = Data::new(values.to_vec());
  Describe {
    count: n,
    mean: Some(values.iter().mean()),
    std: if n > 1 { Some(values.iter().std_dev()) } else { None },
    min: values.iter().copied().reduce(f64::min),
    p25: Some(data.lower_quartile()),
    median: Some(data.median()),
    p75: Some(data.upper_quartile()),
    max: values.iter().copied().reduce(f64::max),
  }
}

fn distribution_row(
  denominator: Denominator,
  population: Population,
  agent_label: Option<String>,
  project_id: Option<String>,
  rows: &[&CommitRecord],
) -> DistributionRow {
  let counts: Vec<f64> = rows.iter().map(|r| r.transformation_count as f64).collect();
  let total: usize = rows.iter().map(|r| r.transformation_count).sum();
  let transformed = rows.iter().filter(|r| r.has_transformations).count();
  let ratio = |den: usize| if den == 0 { None } else { Some(total as f64 / den as f64) };
  DistributionRow {
    denominator,
    population,
    agent_label,
    project_id,
    transformed_commits: transformed,
    total_transformations: total,
    transformation_count: describe(&counts),
    transformations_per_commit: ratio(rows.len()),
    transformations_per_transformed_commit: ratio(transformed),
  }
}

pub fn distributions<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<DistributionRow> {
  let mut out = Vec::new();
  for &p in populations {
    out.push(distribution_row(T::DENOMINATOR, p, None, None, &distinct(of_population(table, p))));
    let mut groups: BTreeMap<String, Vec<&CommitRecord>> = BTreeMap::new();
    let mut projects: BTreeMap<(String, String), Vec<&CommitRecord>> = BTreeMap::new();
    for r in of_population(table, p) {
      groups.entry(r.group_label()).or_default().push(r);
      projects.entry((r.group_label(), r.project_id.clone())).or_default().push(r);
    }
    for (label, rows) in groups {
      out.push(distribution_row(T::DENOMINATOR, p, Some(label), None, &distinct(rows)));
    }
    for ((label, project), rows) in projects {
      out.push(distribution_row(T::DENOMINATOR, p, Some(label), Some(project), &distinct(rows)));
    }
  }
  out
}

pub fn type_prevalence<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<TypePrevalenceRow> {
  let mut out = Vec::new();
  for &p in populations {
    let rows = distinct(of_population(table, p));
    let mut with_type: BTreeMap<&str, usize> = BTreeMap::new();
    for r in &rows {
      for t in &r.transformation_types {
        *with_type.entry(t.as_str()).or_default() += 1;
      }
    }
    for (label, n) in with_type {
      out.push(TypePrevalenceRow {
        denominator: T::DENOMINATOR,
        population: p,
        type_label: label.to_string(),
        commits_with_type: n,
        total_commits: rows.len(),
        prevalence_pct: pct(n, rows.len()),
      });
    }
  }
  out
}

pub fn project_rate_spread<T: CommitTable>(table: &T, populations: &[Population]) -> Vec<ProjectSpreadRow> {
  let per_project = rates_by_project(table, populations);
  let mut out = Vec::new();
  for &p in populations {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in per_project.iter().filter(|r| r.population == p) {
      if let (Some(label), Some(rate)) = (r.agent_label.as_deref(), r.rate_pct) {
        groups.entry(label).or_default().push(rate);
      }
    }
    for (label, rates) in groups {
      out.push(ProjectSpreadRow {
        denominator: T::DENOMINATOR,
        population: p,
        agent_label: label.to_string(),
        project_rate_pct: describe(&rates),
      });
    }
  }
  out
}

/// Count labels, order by count (desc) then label, and fold the tail into `Other` when `top` is set.
pub fn share_counts<'a>(labels: impl IntoIterator<Item = &'a str>, top: Option<usize>) -> Vec<(String, usize, f64)> {
  let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
  for l in labels {
    *counts.entry(l).or_default() += 1;
  }
  let total: usize = counts.values().sum();
  let mut ordered: Vec<(String, usize)> = counts.into_iter().map(|(l, n)| (l.to_string(), n)).collect();
  ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

  if let Some(n) = top {
    if ordered.len() > n {
      let folded: usize = ordered.drain(n..).map(|(_, c)| c).sum();
      match ordered.iter_mut().find(|(l, _)| l == OTHER_TYPE_LABEL) {
        Some(existing) => existing.1 += folded,
        None => ordered.push((OTHER_TYPE_LABEL.to_string(), folded)),
      }
    }
  }

  ordered
    .into_iter()
    .map(|(l, c)| {
      let share = pct(c, total).unwrap_or(0.0);
      (l, c, share)
    })
    .collect()
}

pub fn type_shares(events: &[TransformationEvent], populations: &[Population], top: Option<usize>) -> TypeShares {
  let mut out = TypeShares { top_types: top, ..Default::default() };

  for &p in populations {
    let pop_events: Vec<&TransformationEvent> = events.iter().filter(|e| e.population == p).collect();

    for (type_label, count, share_pct) in share_counts(pop_events.iter().map(|e| e.type_label.as_str()), top) {
      out.by_population.push(TypeShareRow { population: p, agent_label: None, project_id: None, type_label, count, share_pct });
    }

    let mut by_agent: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    let mut by_project: BTreeMap<(String, String), Vec<&str>> = BTreeMap::new();
    for e in &pop_events {
      by_agent.entry(e.group_label()).or_default().push(&e.type_label);
      by_project.entry((e.group_label(), e.project_id.clone())).or_default().push(&e.type_label);
    }
    for (agent, labels) in by_agent {
      for (type_label, count, share_pct) in share_counts(labels, top) {
        out.by_agent.push(TypeShareRow {
          population: p,
          agent_label: Some(agent.clone()),
          project_id: None,
          type_label,
          count,
          share_pct,
        });
      }
    }
    for ((agent, project), labels) in by_project {
      for (type_label, count, share_pct) in share_counts(labels, top) {
        out.by_project.push(TypeShareRow {
          population: p,
          agent_label: Some(agent.clone()),
          project_id: Some(project.clone()),
          type_label,
          count,
          share_pct,
        });
      }
    }
  }

  out.totals = share_counts(events.iter().map(|e| e.type_label.as_str()), None)
    .into_iter()
    .map(|(type_label, count, share_pct)| TypeTotalRow { type_label, count, share_pct })
    .collect();
  out
}
