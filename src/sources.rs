// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Load tool-output documents, metadata tables and candidate tables from disk into typed rows
// role: io/loading
// inputs: File paths from EffectiveConfig; population of the table being read
// outputs: serde_json document for the normalizer; Vec<MetadataRow>; Vec<CandidateRow>
// side_effects: Reads files; logs skipped rows and defaulted columns
// invariants:
// - a configured path that does not exist is fatal (InputError::Missing), never an empty table
// - every commit id leaves this module normalized
// - rows without a commit id are skipped and counted; absent optional columns are defaulted and logged
// errors: InputError for missing/unreadable/invalid inputs, empty metadata, missing required columns
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::InputError;
use crate::ext::serde_json::JsonFetch;
use crate::identity::{canonical_project, normalize_commit_id};
use crate::model::{CandidateRow, CommitDefaults, MetadataRow, Population};
use crate::report::Diagnostics;

pub const COMMIT_ID_COLUMNS: &[&str] = &["sha", "commit_id", "commit", "commit_sha", "sha1"];
pub const PROJECT_COLUMNS: &[&str] = &["full_name", "project_id", "repo_full_name", "repository"];
pub const AGENT_COLUMNS: &[&str] = &["agent", "agent_label"];
pub const PR_ID_COLUMNS: &[&str] = &["pr_id"];
pub const PR_NUMBER_COLUMNS: &[&str] = &["number", "pr_number"];

/// Read a JSON document, falling back to JSON Lines (one value per line, collected into an array).
pub fn read_json_input(path: &Path, input: &str) -> Result<Value, InputError> {
  if !path.exists() {
    return Err(InputError::Missing { input: input.to_string(), path: path.to_path_buf() });
  }
  let text = std::fs::read_to_string(path).map_err(|source| InputError::Unreadable {
    input: input.to_string(),
    path: path.to_path_buf(),
    source,
  })?;

  if let Ok(v) = serde_json::from_str::<Value>(&text) {
    return Ok(v);
  }

  let mut rows = Vec::new();
  for (i, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let v = serde_json::from_str::<Value>(line).map_err(|e| InputError::Invalid {
      input: input.to_string(),
      reason: format!("line {}: {}", i + 1, e),
    })?;
    rows.push(v);
  }
  Ok(Value::Array(rows))
}

/// Read a table: a JSON array of row objects (or JSON Lines of row objects).
/// A lone object, as a one-line JSON Lines file parses, is a one-row table.
pub fn read_table(path: &Path, input: &str) -> Result<Vec<Value>, InputError> {
  match read_json_input(path, input)? {
    row @ Value::Object(_) => Ok(vec![row]),
    Value::Array(rows) => {
      if let Some(pos) = rows.iter().position(|r| !r.is_object()) {
        return Err(InputError::Invalid { input: input.to_string(), reason: format!("row {} is not an object", pos) });
      }
      Ok(rows)
    }
    _ => Err(InputError::Invalid { input: input.to_string(), reason: "expected an array of row objects".into() }),
  }
}

/// True when any row carries any of the aliases, even as null.
fn has_column(rows: &[Value], aliases: &[&str]) -> bool {
  rows.iter().any(|r| aliases.iter().any(|a| r.get(*a).is_some()))
}

fn require_column(rows: &[Value], aliases: &[&str], input: &str) -> Result<(), InputError> {
  if has_column(rows, aliases) {
    Ok(())
  } else {
    Err(InputError::MissingColumn { input: input.to_string(), column: aliases[0].to_string() })
  }
}

fn note_optional_column(rows: &[Value], aliases: &[&str], input: &str, diag: &mut Diagnostics) {
  if !rows.is_empty() && !has_column(rows, aliases) {
    warn!(input, column = aliases[0], "column absent; default applied");
    diag.defaulted_columns.push(format!("{}: {}", input, aliases[0]));
  }
}

fn commit_id_of(row: &Value) -> Option<String> {
  row
    .fetch_any(COMMIT_ID_COLUMNS)
    .text()
    .map(|s| normalize_commit_id(&s))
    .filter(|s| !s.is_empty())
}

fn project_of(row: &Value) -> Option<String> {
  let raw = row.fetch_any(PROJECT_COLUMNS).text()?;
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  Some(canonical_project(trimmed).unwrap_or_else(|| trimmed.to_string()))
}

fn non_empty_text(row: &Value, aliases: &[&str]) -> Option<String> {
  row.fetch_any(aliases).text().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Load a population metadata table.
///
/// Fails fast on an empty table or a missing required column: commit id and project,
/// plus the agent label for the Agent population.
pub fn load_metadata(path: &Path, population: Population, diag: &mut Diagnostics) -> Result<Vec<MetadataRow>, InputError> {
  let input = format!("{} metadata", population.label().to_lowercase());
  let rows = read_table(path, &input)?;
  if rows.is_empty() {
    return Err(InputError::EmptyMetadata { input });
  }

  require_column(&rows, COMMIT_ID_COLUMNS, &input)?;
  require_column(&rows, PROJECT_COLUMNS, &input)?;
  if population == Population::Agent {
    require_column(&rows, AGENT_COLUMNS, &input)?;
  }
  note_optional_column(&rows, PR_ID_COLUMNS, &input, diag);
  note_optional_column(&rows, PR_NUMBER_COLUMNS, &input, diag);

  let mut out = Vec::with_capacity(rows.len());
  for (i, row) in rows.iter().enumerate() {
    let Some(commit_id) = commit_id_of(row) else {
      debug!(input = %input, row = i, "metadata row without commit id skipped");
      diag.skipped_metadata_rows += 1;
      continue;
    };
    let project_id = project_of(row).unwrap_or_else(|| {
      diag.defaulted_values += 1;
      CommitDefaults::PROJECT_ID.to_string()
    });
    let agent_label = match population {
      Population::Agent => Some(non_empty_text(row, AGENT_COLUMNS).unwrap_or_else(|| {
        diag.defaulted_values += 1;
        CommitDefaults::AGENT_LABEL.to_string()
      })),
      Population::Human => None,
    };
    out.push(MetadataRow {
      commit_id,
      project_id,
      agent_label,
      pr_id: non_empty_text(row, PR_ID_COLUMNS).or(CommitDefaults::PR_ID),
      pr_number: row.fetch_any(PR_NUMBER_COLUMNS).int().or(CommitDefaults::PR_NUMBER),
    });
  }

  if diag.skipped_metadata_rows > 0 {
    warn!(input = %input, skipped = diag.skipped_metadata_rows, "metadata rows without commit id skipped");
  }
  if out.is_empty() {
    return Err(InputError::EmptyMetadata { input });
  }
  Ok(out)
}

/// Load a candidate-set table. Only the commit id column is required.
pub fn load_candidates(path: &Path, population: Population, diag: &mut Diagnostics) -> Result<Vec<CandidateRow>, InputError> {
  let input = format!("{} candidates", population.label().to_lowercase());
  let rows = read_table(path, &input)?;
  if rows.is_empty() {
    warn!(input = %input, "candidate table is empty");
    return Ok(Vec::new());
  }
  require_column(&rows, COMMIT_ID_COLUMNS, &input)?;
  note_optional_column(&rows, PROJECT_COLUMNS, &input, diag);
  note_optional_column(&rows, PR_ID_COLUMNS, &input, diag);
  note_optional_column(&rows, PR_NUMBER_COLUMNS, &input, diag);

  let mut out = Vec::with_capacity(rows.len());
  for row in &rows {
    let Some(commit_id) = commit_id_of(row) else {
      diag.skipped_candidate_rows += 1;
      continue;
    };
    out.push(CandidateRow {
      commit_id,
      project_id: project_of(row),
      agent_label: match population {
        Population::Agent => non_empty_text(row, AGENT_COLUMNS),
        Population::Human => None,
      },
      pr_id: non_empty_text(row, PR_ID_COLUMNS),
      pr_number: row.fetch_any(PR_NUMBER_COLUMNS).int(),
    });
  }
  if diag.skipped_candidate_rows > 0 {
    warn!(input = %input, skipped = diag.skipped_candidate_rows, "candidate rows without commit id skipped");
  }
  Ok(out)
}
