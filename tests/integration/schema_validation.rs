use jsonschema::validator_for;
use test_support::{cmd_bin, fixture_args, read_output_json, tempdir, BIN};

fn compile_schema(name: &str) -> jsonschema::Validator {
  let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
  let path = manifest_dir.join("tests").join("schemas").join(name);
  let data = std::fs::read(&path).expect("schema file");
  let v: serde_json::Value = serde_json::from_slice(&data).expect("schema json");
  validator_for(&v).expect("compile schema")
}

#[test]
fn outputs_conform_to_schemas() {
  let td = tempdir();
  let out = cmd_bin(BIN).args(fixture_args(td.path())).output().unwrap();
  assert!(out.status.success(), "cli run failed: {}", String::from_utf8_lossy(&out.stderr));

  let commits = compile_schema("refactor-census.commits.schema.json");
  for file in ["commits_normalized.json", "commits_observed.json"] {
    let v = read_output_json(td.path(), file);
    commits.validate(&v).unwrap_or_else(|e| panic!("{file} schema: {e}"));
  }

  let events = compile_schema("refactor-census.events.schema.json");
  events.validate(&read_output_json(td.path(), "events.json")).expect("events schema");

  let aggregates = compile_schema("refactor-census.aggregates.schema.json");
  aggregates.validate(&read_output_json(td.path(), "aggregates.json")).expect("aggregates schema");

  let manifest = compile_schema("refactor-census.manifest.schema.json");
  manifest.validate(&read_output_json(td.path(), "manifest.json")).expect("manifest schema");
}
