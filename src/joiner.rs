// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Inner-join tool commit partials with population metadata into analyzed CommitRecords
// role: join/metadata
// inputs: Vec<CommitPartial> (normalized ids), Vec<MetadataRow> (normalized ids), Population
// outputs: Analyzed CommitRecords in metadata order, one per (metadata row, matching tool entry)
// invariants:
// - only commits present in both inputs survive; unanalyzed metadata commits are left to the reconciler
// - repeated tool entries produce repeated rows; removal belongs to the deduplicator
// errors: InputError::EmptyMetadata when there is nothing to join against
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::error::InputError;
use crate::model::{split_project, CommitDefaults, CommitPartial, CommitRecord, MetadataRow, Population};
use crate::report::Diagnostics;

pub fn join_metadata(
  partials: &[CommitPartial],
  metadata: &[MetadataRow],
  population: Population,
  diag: &mut Diagnostics,
) -> Result<Vec<CommitRecord>, InputError> {
  if metadata.is_empty() {
    return Err(InputError::EmptyMetadata { input: format!("{} metadata", population.label().to_lowercase()) });
  }

  let mut by_id: HashMap<&str, Vec<&CommitPartial>> = HashMap::new();
  for p in partials {
    by_id.entry(p.commit_id.as_str()).or_default().push(p);
  }

  let mut joined = Vec::new();
  let mut matched: HashSet<&str> = HashSet::new();

  for meta in metadata {
    let Some(hits) = by_id.get(meta.commit_id.as_str()) else {
      continue;
    };
    matched.insert(meta.commit_id.as_str());
    for p in hits {
      // the tool's repository only fills in for a project the metadata could not name
      let project_id = match (&p.repository, meta.project_id.as_str()) {
        (Some(repo), CommitDefaults::PROJECT_ID) => repo.clone(),
        _ => meta.project_id.clone(),
      };
      let (owner, repo) = split_project(&project_id);
      joined.push(CommitRecord {
        commit_id: meta.commit_id.clone(),
        project_id,
        owner,
        repo,
        population,
        agent_label: meta.agent_label.clone(),
        pr_id: meta.pr_id.clone(),
        pr_number: meta.pr_number,
        transformation_count: p.transformation_count,
        has_transformations: p.transformation_count > 0,
        transformation_types: p.transformation_types.clone(),
        analyzed: true,
        origin: Some(p.origin),
      });
    }
  }

  diag.unmatched_tool_commits = by_id.keys().filter(|id| !matched.contains(*id)).count();
  info!(
    population = %population,
    analyzed_rows = joined.len(),
    unmatched_tool_commits = diag.unmatched_tool_commits,
    "metadata joined"
  );
  Ok(joined)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn partial(id: &str, count: usize, origin: usize) -> CommitPartial {
    CommitPartial {
      commit_id: id.into(),
      repository: Some("tool/repo".into()),
      commit_url: None,
      transformation_count: count,
      transformation_types: if count > 0 { vec!["X".into()] } else { vec![] },
      origin,
    }
  }

  fn meta(id: &str, project: &str, pr: &str) -> MetadataRow {
    MetadataRow {
      commit_id: id.into(),
      project_id: project.into(),
      agent_label: Some("Codex".into()),
      pr_id: Some(pr.into()),
      pr_number: Some(1),
    }
  }

  #[test]
  fn inner_join_keeps_only_commits_in_both_inputs() {
    let partials = vec![partial("a", 2, 0), partial("b", 0, 1), partial("z", 1, 2)];
    let metadata = vec![meta("a", "o/r", "1"), meta("b", "o/r", "1"), meta("c", "o/r", "1")];
    let mut diag = Diagnostics::new(Population::Agent);
    let rows = join_metadata(&partials, &metadata, Population::Agent, &mut diag).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.commit_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(rows[0].has_transformations);
    assert!(!rows[1].has_transformations);
    assert!(rows.iter().all(|r| r.analyzed && r.owner.as_deref() == Some("o")));
    assert_eq!(diag.unmatched_tool_commits, 1);
  }

  #[test]
  fn repeated_tool_entries_and_multi_pr_metadata_multiply_rows() {
    let partials = vec![partial("a", 1, 0), partial("a", 1, 1)];
    let metadata = vec![meta("a", "o/r", "1"), meta("a", "o/r", "2")];
    let mut diag = Diagnostics::new(Population::Human);
    let rows = join_metadata(&partials, &metadata, Population::Human, &mut diag).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].origin, Some(0));
    assert_eq!(rows[1].origin, Some(1));
    assert_eq!(rows[2].pr_id.as_deref(), Some("2"));
  }

  #[test]
  fn unknown_metadata_project_falls_back_to_tool_repository() {
    let partials = vec![partial("a", 0, 0)];
    let metadata = vec![meta("a", CommitDefaults::PROJECT_ID, "1")];
    let mut diag = Diagnostics::new(Population::Agent);
    let rows = join_metadata(&partials, &metadata, Population::Agent, &mut diag).unwrap();
    assert_eq!(rows[0].project_id, "tool/repo");
  }

  #[test]
  fn empty_metadata_fails_fast() {
    let mut diag = Diagnostics::new(Population::Agent);
    let err = join_metadata(&[partial("a", 0, 0)], &[], Population::Agent, &mut diag).unwrap_err();
    assert!(matches!(err, InputError::EmptyMetadata { .. }));
  }
}
