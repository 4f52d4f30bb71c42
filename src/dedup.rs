// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Collapse repeated commit rows to one canonical row per population key
// role: dedup
// inputs: Vec<CommitRecord> of a single population, DedupKey for that population
// outputs: Deduplicated rows (first occurrence kept, order preserved) and the removed count
// invariants: idempotent; never reorders survivors; runs per population before concatenation
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use serde::Serialize;

use crate::model::CommitRecord;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
  /// commit hash alone
  Commit,
  /// commit hash plus PR id
  CommitAndPr,
}

impl DedupKey {
  pub fn key<'a>(&self, commit_id: &'a str, pr_id: Option<&'a str>) -> (&'a str, Option<&'a str>) {
    match self {
      DedupKey::Commit => (commit_id, None),
      DedupKey::CommitAndPr => (commit_id, pr_id),
    }
  }

  pub fn of<'a>(&self, row: &'a CommitRecord) -> (&'a str, Option<&'a str>) {
    self.key(&row.commit_id, row.pr_id.as_deref())
  }
}

/// Keep the first row per key. Returns the survivors and how many rows were dropped.
pub fn dedup(rows: Vec<CommitRecord>, key: DedupKey) -> (Vec<CommitRecord>, usize) {
  let before = rows.len();
  let mut seen: HashSet<(String, Option<String>)> = HashSet::with_capacity(rows.len());
  let kept: Vec<CommitRecord> = rows
    .into_iter()
    .filter(|r| {
      let (c, p) = key.of(r);
      seen.insert((c.to_string(), p.map(String::from)))
    })
    .collect();
  let removed = before - kept.len();
  (kept, removed)
}
