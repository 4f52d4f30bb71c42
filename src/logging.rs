// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Configure the global tracing subscriber for the binary
// role: logging
// inputs: verbose flag; RUST_LOG
// outputs: fmt subscriber writing to stderr (stdout carries only the output pointer)
// invariants: RUST_LOG wins over the flag; repeated init is a no-op
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use tracing_subscriber::EnvFilter;

pub fn default_directive(verbose: bool) -> &'static str {
  if verbose {
    "info"
  } else {
    "warn"
  }
}

pub fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}
