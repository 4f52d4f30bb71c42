//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust
//! use test_support::{init_tracing, fixtures_dir};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let _root = fixtures_dir();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::{
    env,
    path::{Path, PathBuf},
};

/// Name of the binary under test.
pub const BIN: &str = "refactor-census";

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Insta settings shared by snapshot tests.
///
/// - Snapshots live in `snapshots/` next to the test source file
/// - Snapshot files are named after the snapshot only (no module prefix)
/// - Omits `Expression:` in snapshot headers for cleaner diffs
///
/// Use with `insta_settings().bind(|| ...)`; settings are scoped to the closure.
pub fn insta_settings() -> insta::Settings {
    let mut settings = insta::Settings::clone_current();
    settings.set_snapshot_path("snapshots");
    settings.set_prepend_module_to_snapshot(false);
    settings.set_omit_expression(true);
    settings
}

/// Return the path to the repository's `tests/fixtures` directory.
///
/// This crate lives in `tests/support`, so the fixtures sit one level up.
pub fn fixtures_dir() -> PathBuf {
    let support = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    support
        .parent()
        .map(|tests| tests.join("fixtures"))
        .unwrap_or_else(|| support.join("fixtures"))
}

/// Absolute path of a fixture, as a string suitable for CLI arguments.
pub fn fixture_path<P: AsRef<Path>>(rel_path: P) -> String {
    fixtures_dir().join(rel_path).to_string_lossy().to_string()
}

/// Read a JSON output file written by the binary (enable `serde` feature).
#[cfg(feature = "serde")]
pub fn read_output_json<P: AsRef<Path>>(dir: P, name: &str) -> serde_json::Value {
    let path = dir.as_ref().join(name);
    let data = std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read output {}: {e}", path.display()));
    serde_json::from_slice(&data)
        .unwrap_or_else(|e| panic!("failed to parse output {}: {e}", path.display()))
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Example:
/// ```no_run
/// use test_support::cmd_bin;
/// use predicates::prelude::*;
///
/// let mut cmd = cmd_bin("my-cli");
/// cmd.arg("--help").assert().success().stdout(predicate::str::contains("USAGE"));
/// ```
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    assert_cmd::Command::cargo_bin(bin).expect("binary target not found")
}

/// Arguments wiring both populations to the bundled fixtures, writing to `out`.
///
/// Agent: tool output, metadata and an explicit candidate table.
/// Human: tool output and metadata only (metadata doubles as the candidate set).
pub fn fixture_args(out: &Path) -> Vec<String> {
    vec![
        "--agent-tool-output".into(),
        fixture_path("agent_refminer.json"),
        "--agent-metadata".into(),
        fixture_path("agent_metadata.json"),
        "--agent-candidates".into(),
        fixture_path("agent_candidates.json"),
        "--human-tool-output".into(),
        fixture_path("human_refminer.json"),
        "--human-metadata".into(),
        fixture_path("human_metadata.json"),
        "--out".into(),
        out.to_string_lossy().to_string(),
        "--now-override".into(),
        "2025-08-15T12:00:00".into(),
    ]
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            let k_owned = k.to_string();
            prev.push((k_owned.clone(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
