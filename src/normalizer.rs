// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Flatten one tool-output document into commit partials and raw transformation events
// role: normalization/records
// inputs: serde_json document (nested per-commit results or legacy flat event rows)
// outputs: Normalized { commits: Vec<CommitPartial>, events: Vec<RawEvent> }
// side_effects: None beyond logging skipped entries
// invariants:
// - a commit entry with no transformations still yields exactly one partial with count 0
// - entries without a commit id are skipped and counted, never fatal
// - transformation_types is sorted and duplicate-free; count equals the number of kept events
// errors: InputError::Invalid when the document shape is not recognized
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::InputError;
use crate::ext::serde_json::JsonFetch;
use crate::identity::{canonical_project, normalize_commit_id};
use crate::model::{CommitPartial, Location, RawEvent};
use crate::report::Diagnostics;

const TOOL_COMMIT_ID: &[&str] = &["sha1", "sha", "commit", "commit_sha"];
const TOOL_REPOSITORY: &[&str] = &["repository", "repo_url", "full_name", "repo_name"];
const TOOL_TRANSFORMATIONS: &[&str] = &["refactorings", "transformations"];
const TOOL_TYPE: &[&str] = &["type", "refactoring_type", "type_label"];
const TOOL_BEFORE: &[&str] = &["leftSideLocations", "before_locations", "entities_before"];
const TOOL_AFTER: &[&str] = &["rightSideLocations", "after_locations", "entities_after"];

/// Known shapes of tool output, one variant per historical format.
#[derive(Debug)]
pub enum ToolDocument<'a> {
  /// `{"commits": [{"sha1", "repository", "url", "refactorings": [...]}]}`
  Nested(&'a [Value]),
  /// `[{"commit_sha", "refactoring_type", "description", "entities_before", ...}]`
  FlatEvents(&'a [Value]),
}

impl<'a> ToolDocument<'a> {
  pub fn detect(doc: &'a Value, input: &str) -> Result<Self, InputError> {
    if let Some(commits) = doc.fetch("commits").array() {
      return Ok(ToolDocument::Nested(commits));
    }
    let rows: &'a [Value] = match doc {
      Value::Array(rows) => rows,
      // a one-line JSON Lines file reads back as a lone entry
      Value::Object(_) => std::slice::from_ref(doc),
      _ => {
        return Err(InputError::Invalid {
          input: input.to_string(),
          reason: "expected an object with a `commits` array or an array of entries".into(),
        })
      }
    };
    // the whole array decides: any typed row and no nested transformation list means flat rows
    let nested = rows.iter().any(|r| r.fetch_any(TOOL_TRANSFORMATIONS).array().is_some());
    let typed = rows.iter().any(|r| TOOL_TYPE.iter().any(|k| r.get(k).is_some()));
    if typed && !nested {
      Ok(ToolDocument::FlatEvents(rows))
    } else {
      Ok(ToolDocument::Nested(rows))
    }
  }
}

#[derive(Debug, Default)]
pub struct Normalized {
  pub commits: Vec<CommitPartial>,
  pub events: Vec<RawEvent>,
}

/// Normalize a tool-output document.
pub fn normalize_document(doc: &Value, input: &str, diag: &mut Diagnostics) -> Result<Normalized, InputError> {
  let out = match ToolDocument::detect(doc, input)? {
    ToolDocument::Nested(entries) => normalize_nested(entries, diag),
    ToolDocument::FlatEvents(rows) => normalize_flat(rows, diag),
  };
  if diag.skipped_tool_commits > 0 || diag.skipped_events > 0 {
    warn!(
      input,
      skipped_commits = diag.skipped_tool_commits,
      skipped_events = diag.skipped_events,
      "malformed tool entries skipped"
    );
  }
  debug!(input, commits = out.commits.len(), events = out.events.len(), "tool document normalized");
  Ok(out)
}

fn normalize_nested(entries: &[Value], diag: &mut Diagnostics) -> Normalized {
  let mut out = Normalized::default();

  for (origin, entry) in entries.iter().enumerate() {
    let Some(commit_id) = tool_commit_id(entry) else {
      debug!(entry = origin, "tool entry without commit id skipped");
      diag.skipped_tool_commits += 1;
      continue;
    };
    let repository = entry.fetch_any(TOOL_REPOSITORY).text().and_then(|r| canonical_project(&r));
    let commit_url = entry.fetch("url").text();

    let mut types = BTreeSet::new();
    let mut kept = 0usize;
    let transformations = entry.fetch_any(TOOL_TRANSFORMATIONS).array().map(|a| a.as_slice()).unwrap_or(&[]);
    for t in transformations {
      let Some(event) = raw_event(t, &commit_id, origin, commit_url.clone()) else {
        diag.skipped_events += 1;
        continue;
      };
      types.insert(event.type_label.clone());
      out.events.push(event);
      kept += 1;
    }

    out.commits.push(CommitPartial {
      commit_id,
      repository,
      commit_url,
      transformation_count: kept,
      transformation_types: types.into_iter().collect(),
      origin,
    });
  }
  out
}

/// Flat rows carry no zero-result commits; each distinct commit becomes one partial.
fn normalize_flat(rows: &[Value], diag: &mut Diagnostics) -> Normalized {
  let mut out = Normalized::default();
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut types: Vec<BTreeSet<String>> = Vec::new();

  for row in rows {
    let Some(commit_id) = tool_commit_id(row) else {
      diag.skipped_tool_commits += 1;
      continue;
    };
    let slot = match index.get(&commit_id) {
      Some(&i) => i,
      None => {
        let i = out.commits.len();
        index.insert(commit_id.clone(), i);
        out.commits.push(CommitPartial {
          commit_id: commit_id.clone(),
          repository: row.fetch_any(TOOL_REPOSITORY).text().and_then(|r| canonical_project(&r)),
          commit_url: row.fetch_any(&["commit_url", "url"]).text(),
          transformation_count: 0,
          transformation_types: Vec::new(),
          origin: i,
        });
        types.push(BTreeSet::new());
        i
      }
    };
    let commit_url = out.commits[slot].commit_url.clone();
    let Some(event) = raw_event(row, &commit_id, slot, commit_url) else {
      diag.skipped_events += 1;
      continue;
    };
    types[slot].insert(event.type_label.clone());
    out.commits[slot].transformation_count += 1;
    out.events.push(event);
  }

  for (commit, set) in out.commits.iter_mut().zip(types) {
    commit.transformation_types = set.into_iter().collect();
  }
  out
}

fn tool_commit_id(entry: &Value) -> Option<String> {
  entry
    .fetch_any(TOOL_COMMIT_ID)
    .text()
    .map(|s| normalize_commit_id(&s))
    .filter(|s| !s.is_empty())
}

fn raw_event(t: &Value, commit_id: &str, origin: usize, commit_url: Option<String>) -> Option<RawEvent> {
  let type_label = t.fetch_any(TOOL_TYPE).text().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
  Some(RawEvent {
    commit_id: commit_id.to_string(),
    origin,
    type_label,
    description: t.fetch("description").text().unwrap_or_default(),
    before_locations: locations(t, TOOL_BEFORE),
    after_locations: locations(t, TOOL_AFTER),
    commit_url,
  })
}

fn locations(t: &Value, aliases: &[&str]) -> Vec<Location> {
  let Some(items) = t.fetch_any(aliases).array() else {
    return Vec::new();
  };
  items.iter().filter_map(location).collect()
}

fn location(v: &Value) -> Option<Location> {
  match v {
    Value::String(s) => Some(Location { code_element: Some(s.clone()), ..Default::default() }),
    Value::Object(_) => Some(Location {
      file_path: v.fetch_any(&["filePath", "file_path"]).text(),
      start_line: v.fetch_any(&["startLine", "start_line"]).int(),
      end_line: v.fetch_any(&["endLine", "end_line"]).int(),
      code_element: v.fetch_any(&["codeElement", "code_element", "name"]).text(),
      description: v.fetch("description").text(),
    }),
    _ => None,
  }
}
