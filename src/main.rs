use anyhow::Result;
use clap::Parser;

mod aggregate;
mod cli;
mod dedup;
mod error;
mod ext;
mod identity;
mod joiner;
mod logging;
mod manifest;
mod model;
mod normalizer;
mod pipeline;
mod reconcile;
mod report;
mod sources;
mod stats;
mod util;

use crate::cli::{normalize, Cli};

fn main() {
  let cli = Cli::parse();
  if let Err(e) = run(cli) {
    eprintln!("error: {:#}", e);
    std::process::exit(2);
  }
}

fn run(cli: Cli) -> Result<()> {
  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  logging::init_tracing(cli.verbose);

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;
  let now_opt = util::parse_now_override(cfg.now_override.as_deref());

  // Phase 2: build the tables and summaries
  let output = pipeline::run(&cfg)?;

  // Phase 3: persist and point at the manifest
  let base_dir = util::prepare_out_dir(&cfg.out, now_opt)?;
  manifest::write_outputs(&base_dir, &cfg, &output, util::effective_now(now_opt))?;
  println!(
    "{}",
    serde_json::to_string_pretty(&serde_json::json!({"dir": base_dir, "manifest": manifest::MANIFEST_FILE}))?
  );
  Ok(())
}
