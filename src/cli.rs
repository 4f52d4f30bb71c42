// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Parse command-line flags and normalize them into a serializable EffectiveConfig
// role: cli/config
// inputs: Process arguments (clap derive)
// outputs: EffectiveConfig with populations already in the configured output order
// invariants:
// - a population is configured only when both its tool output and its metadata are given
// - at least one population is configured
// - population order lists each population at most once; configured populations missing from it are appended
// errors: anyhow bail! with a one-line hint for every invalid combination
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::Population;
use crate::util;

#[derive(Parser, Debug)]
#[command(
    name = "refactor-census",
    version,
    about = "Reconcile refactoring detections with PR metadata and compare agent and human commit populations",
    long_about = None
)]
pub struct Cli {
  /// Tool output document for agent-authored commits (JSON or JSON Lines)
  #[arg(long)]
  pub agent_tool_output: Option<PathBuf>,

  /// Agent PR-commit metadata table (sha, full_name, agent, pr_id, number)
  #[arg(long)]
  pub agent_metadata: Option<PathBuf>,

  /// Agent candidate set; defaults to the metadata table
  #[arg(long)]
  pub agent_candidates: Option<PathBuf>,

  /// Tool output document for human-authored commits
  #[arg(long)]
  pub human_tool_output: Option<PathBuf>,

  /// Human PR-commit metadata table (sha, full_name, pr_id, number)
  #[arg(long)]
  pub human_metadata: Option<PathBuf>,

  /// Human candidate set; defaults to the metadata table
  #[arg(long)]
  pub human_candidates: Option<PathBuf>,

  /// Output directory ("-" = auto-named temp dir)
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Concatenation order of populations in every output table, e.g. "human,agent" (default: agent,human)
  #[arg(long, value_enum, value_delimiter = ',')]
  pub population_order: Vec<Population>,

  /// Keep the N most frequent transformation types per group and fold the rest into "Other"
  #[arg(long)]
  pub top_types: Option<usize>,

  /// Skip the significance tests
  #[arg(long)]
  pub no_stats: bool,

  /// Log progress at info level (RUST_LOG overrides)
  #[arg(long, short = 'v')]
  pub verbose: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant used for generated_at and temp dir names (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

/// The three inputs of one population branch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PopulationInputs {
  pub population: Population,
  pub tool_output: String,
  pub metadata: String,
  pub candidates: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EffectiveConfig {
  /// configured populations, in output order
  pub populations: Vec<PopulationInputs>,
  pub out: String,
  pub top_types: Option<usize>,
  pub stats: bool,
  pub verbose: bool,
  pub now_override: Option<String>,
}

impl EffectiveConfig {
  pub fn population_order(&self) -> Vec<Population> {
    self.populations.iter().map(|p| p.population).collect()
  }
}

fn population_inputs(
  population: Population,
  tool_output: Option<&PathBuf>,
  metadata: Option<&PathBuf>,
  candidates: Option<&PathBuf>,
) -> Result<Option<PopulationInputs>> {
  let flag = population.label().to_lowercase();
  match (tool_output, metadata) {
    (Some(t), Some(m)) => Ok(Some(PopulationInputs {
      population,
      tool_output: util::canonicalize_lossy(t),
      metadata: util::canonicalize_lossy(m),
      candidates: candidates.map(util::canonicalize_lossy),
    })),
    (None, None) if candidates.is_none() => Ok(None),
    (None, None) => bail!("--{flag}-candidates requires --{flag}-tool-output and --{flag}-metadata"),
    _ => bail!("--{flag}-tool-output and --{flag}-metadata must be given together"),
  }
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let agent = population_inputs(
    Population::Agent,
    cli.agent_tool_output.as_ref(),
    cli.agent_metadata.as_ref(),
    cli.agent_candidates.as_ref(),
  )?;
  let human = population_inputs(
    Population::Human,
    cli.human_tool_output.as_ref(),
    cli.human_metadata.as_ref(),
    cli.human_candidates.as_ref(),
  )?;

  let mut order = cli.population_order.clone();
  for (i, p) in order.iter().enumerate() {
    if order[..i].contains(p) {
      bail!("--population-order lists {} twice", p.label().to_lowercase());
    }
  }
  for p in [Population::Agent, Population::Human] {
    if !order.contains(&p) {
      order.push(p);
    }
  }

  let mut configured: Vec<PopulationInputs> = [agent, human].into_iter().flatten().collect();
  if configured.is_empty() {
    bail!("Provide at least one population: --agent-tool-output/--agent-metadata and/or --human-tool-output/--human-metadata");
  }
  configured.sort_by_key(|p| order.iter().position(|o| *o == p.population));

  if cli.top_types == Some(0) {
    bail!("--top-types must be at least 1");
  }

  Ok(EffectiveConfig {
    populations: configured,
    out: cli.out,
    top_types: cli.top_types,
    stats: !cli.no_stats,
    verbose: cli.verbose,
    now_override: cli.now_override.clone(),
  })
}
