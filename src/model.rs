// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the row model (commit records, transformation events, source rows) shared by every pipeline stage
// role: model/types
// outputs: Serializable structs with stable field names; the single default table for synthesized values
// invariants: has_transformations == (transformation_count > 0); transformation_types sorted and unique; defaults declared once in CommitDefaults
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Population {
  Agent,
  Human,
}

impl Population {
  pub fn label(&self) -> &'static str {
    match self {
      Population::Agent => "Agent",
      Population::Human => "Human",
    }
  }

  /// Agent commits collapse on the hash alone; a human commit may legitimately sit in several PRs.
  pub fn dedup_key(&self) -> crate::dedup::DedupKey {
    match self {
      Population::Agent => crate::dedup::DedupKey::Commit,
      Population::Human => crate::dedup::DedupKey::CommitAndPr,
    }
  }
}

impl std::fmt::Display for Population {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// One side of a transformation (before or after), as reported by the detection tool.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Location {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_path: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_line: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_line: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code_element: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Commit as seen by the tool, before any metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitPartial {
  pub commit_id: String,
  pub repository: Option<String>,
  pub commit_url: Option<String>,
  pub transformation_count: usize,
  pub transformation_types: Vec<String>,
  /// Index of the commit entry inside the tool document.
  pub origin: usize,
}

/// Transformation as seen by the tool; population fields are attached once the owning commit survives.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
  pub commit_id: String,
  pub origin: usize,
  pub type_label: String,
  pub description: String,
  pub before_locations: Vec<Location>,
  pub after_locations: Vec<Location>,
  pub commit_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommitRecord {
  pub commit_id: String,
  pub project_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub repo: Option<String>,
  pub population: Population,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_label: Option<String>,
  pub pr_id: Option<String>,
  pub pr_number: Option<i64>,
  pub transformation_count: usize,
  pub has_transformations: bool,
  pub transformation_types: Vec<String>,
  /// false for placeholder rows added by the completeness reconciler
  pub analyzed: bool,
  #[serde(skip)]
  pub origin: Option<usize>,
}

impl CommitRecord {
  /// Grouping label used in per-agent tables: the agent name, or the population for humans.
  pub fn group_label(&self) -> String {
    group_label(self.population, self.agent_label.as_deref())
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TransformationEvent {
  pub commit_id: String,
  pub type_label: String,
  pub description: String,
  pub before_locations: Vec<Location>,
  pub after_locations: Vec<Location>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub before_elements: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub after_elements: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commit_url: Option<String>,
  pub population: Population,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub agent_label: Option<String>,
  pub project_id: String,
}

impl TransformationEvent {
  pub fn from_raw(raw: RawEvent, owner: &CommitRecord) -> Self {
    let before_elements = code_elements(&raw.before_locations);
    let after_elements = code_elements(&raw.after_locations);
    TransformationEvent {
      commit_id: raw.commit_id,
      type_label: raw.type_label,
      description: raw.description,
      before_locations: raw.before_locations,
      after_locations: raw.after_locations,
      before_elements,
      after_elements,
      commit_url: raw.commit_url,
      population: owner.population,
      agent_label: owner.agent_label.clone(),
      project_id: owner.project_id.clone(),
    }
  }

  pub fn group_label(&self) -> String {
    group_label(self.population, self.agent_label.as_deref())
  }
}

/// Grouping label of a row. Humans form one group; an agent named like a population is
/// suffixed with its own population so it never lands in that population's group.
fn group_label(population: Population, agent_label: Option<&str>) -> String {
  match (population, agent_label) {
    (Population::Agent, Some(a)) if [Population::Agent, Population::Human].iter().any(|p| a.eq_ignore_ascii_case(p.label())) => {
      format!("{} ({})", a, Population::Agent.label())
    }
    (Population::Agent, Some(a)) => a.to_string(),
    (Population::Agent, None) => CommitDefaults::AGENT_LABEL.to_string(),
    (Population::Human, _) => Population::Human.label().to_string(),
  }
}

fn code_elements(locations: &[Location]) -> Vec<String> {
  locations
    .iter()
    .filter_map(|l| l.code_element.as_deref())
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}

/// Population metadata row, keyed by commit.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetadataRow {
  pub commit_id: String,
  pub project_id: String,
  pub agent_label: Option<String>,
  pub pr_id: Option<String>,
  pub pr_number: Option<i64>,
}

/// Candidate-set row: a commit that was in scope for analysis.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CandidateRow {
  pub commit_id: String,
  pub project_id: Option<String>,
  pub agent_label: Option<String>,
  pub pr_id: Option<String>,
  pub pr_number: Option<i64>,
}

impl From<&MetadataRow> for CandidateRow {
  fn from(m: &MetadataRow) -> Self {
    CandidateRow {
      commit_id: m.commit_id.clone(),
      project_id: Some(m.project_id.clone()),
      agent_label: m.agent_label.clone(),
      pr_id: m.pr_id.clone(),
      pr_number: m.pr_number,
    }
  }
}

/// The one place default values for synthesized or under-specified rows are declared.
pub struct CommitDefaults;

impl CommitDefaults {
  pub const TRANSFORMATION_COUNT: usize = 0;
  pub const HAS_TRANSFORMATIONS: bool = false;
  pub const PROJECT_ID: &'static str = "unknown";
  pub const AGENT_LABEL: &'static str = "unknown";
  pub const PR_ID: Option<String> = None;
  pub const PR_NUMBER: Option<i64> = None;

  pub fn transformation_types() -> Vec<String> {
    Vec::new()
  }

  /// A zero-result row for a commit that was in scope but never analyzed.
  pub fn placeholder(candidate: &CandidateRow, population: Population, project_id: String, agent_label: Option<String>) -> CommitRecord {
    let (owner, repo) = split_project(&project_id);
    CommitRecord {
      commit_id: candidate.commit_id.clone(),
      project_id,
      owner,
      repo,
      population,
      agent_label,
      pr_id: candidate.pr_id.clone(),
      pr_number: candidate.pr_number,
      transformation_count: Self::TRANSFORMATION_COUNT,
      has_transformations: Self::HAS_TRANSFORMATIONS,
      transformation_types: Self::transformation_types(),
      analyzed: false,
      origin: None,
    }
  }
}

/// Split `owner/repo` into its halves; anything without a slash yields (None, None).
pub fn split_project(project_id: &str) -> (Option<String>, Option<String>) {
  match project_id.split_once('/') {
    Some((o, r)) if !o.is_empty() && !r.is_empty() => (Some(o.to_string()), Some(r.to_string())),
    _ => (None, None),
  }
}
