// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Canonicalize commit and project identifiers so joins and dedup compare like with like
// role: identity/normalization
// inputs: Raw hash strings and repository identifiers (web URL, API URL, owner/repo)
// outputs: Lower-case trimmed hashes; owner/repo project ids
// invariants:
// - both normalizers are idempotent
// - every commit id column passes through normalize_commit_id before any join or dedup
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;

static REPO_URL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?:https?://(?:www\.)?(?:api\.)?github\.com/(?:repos/)?|git@github\.com:)?([^/\s]+)/([^/\s]+?)(?:\.git)?/?$")
    .expect("valid repository regex")
});

/// Lower-case and trim a commit hash.
pub fn normalize_commit_id(raw: &str) -> String {
  raw.trim().to_lowercase()
}

/// Map a repository identifier to `owner/repo`.
///
/// Accepts `https://github.com/o/r(.git)`, `https://api.github.com/repos/o/r`,
/// `git@github.com:o/r.git` and plain `o/r`. Returns `None` for anything else.
pub fn canonical_project(raw: &str) -> Option<String> {
  let s = raw.trim().trim_end_matches('/');
  if s.is_empty() {
    return None;
  }
  let caps = REPO_URL.captures(s)?;
  let owner = caps.get(1)?.as_str();
  let repo = caps.get(2)?.as_str();
  if owner.contains(':') || repo.is_empty() {
    return None;
  }
  Some(format!("{}/{}", owner, repo))
}
