// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed fatal errors for misconfigured or absent inputs
// role: errors
// outputs: InputError variants rendered as one-line diagnoses naming the input
// invariants: only fatal conditions live here; malformed rows and absent optional columns are counted, not raised
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
  #[error("missing input: {input} not found at {}", path.display())]
  Missing { input: String, path: PathBuf },

  #[error("unreadable input: {input} at {}: {source}", path.display())]
  Unreadable {
    input: String,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid document: {input}: {reason}")]
  Invalid { input: String, reason: String },

  #[error("empty metadata table: {input} has no usable rows")]
  EmptyMetadata { input: String },

  #[error("input table {input} lacks required column `{column}`")]
  MissingColumn { input: String, column: String },
}
