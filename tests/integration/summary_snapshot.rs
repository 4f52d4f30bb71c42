use test_support::{cmd_bin, fixture_args, insta_settings, tempdir, BIN};

#[test]
fn summary_text_snapshot() {
  let td = tempdir();
  let out = cmd_bin(BIN).args(fixture_args(td.path())).arg("--no-stats").output().unwrap();
  assert!(out.status.success(), "cli run failed: {}", String::from_utf8_lossy(&out.stderr));

  let text = std::fs::read_to_string(td.path().join("summary.txt")).unwrap();
  insta_settings().bind(|| {
    insta::assert_snapshot!("summary_no_stats", text);
  });
}
