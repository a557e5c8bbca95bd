// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Empirical time and memory growth of algorithm units")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Load a unit artifact and list its measurable operations.
  List {
    /// Path to a `*.algo` unit artifact.
    locator: PathBuf,
  },

  /// Measure one operation across increasing input sizes, printing JSON lines.
  Sweep(SweepArgs),
}

#[derive(Debug, Args)]
pub struct SweepArgs {
  /// Path to a `*.algo` unit artifact.
  pub locator: PathBuf,

  /// Name of the operation to measure.
  #[arg(long, short)]
  pub operation: String,

  /// JSON file with configuration defaults.
  #[arg(long, env = "CXLAB_CONFIG")]
  pub config: Option<PathBuf>,

  /// First input size.
  #[arg(long)]
  pub start: Option<usize>,

  /// Last input size (inclusive when reached by the step).
  #[arg(long)]
  pub stop: Option<usize>,

  /// Input size increment.
  #[arg(long)]
  pub step: Option<usize>,

  /// Stop growing N once one measurement is slower than this.
  #[arg(long)]
  pub slow_threshold_ms: Option<u64>,

  /// Hard limit for a single invocation.
  #[arg(long)]
  pub timeout_ms: Option<u64>,

  /// Untimed invocations before each probe.
  #[arg(long)]
  pub warmup_runs: Option<u32>,

  /// Seed for the input generator.
  #[arg(long)]
  pub seed: Option<u64>,

  /// Report zero memory instead of sampling resident memory.
  #[arg(long)]
  pub no_memory: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;

  #[test]
  fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_parse_sweep() {
    let cli = Cli::parse_from([
      "cxlab",
      "sweep",
      "units/X.algo",
      "--operation",
      "bubble_sort",
      "--stop",
      "5000",
      "--seed",
      "42",
    ]);
    let Commands::Sweep(args) = cli.command else {
      panic!("expected sweep");
    };
    assert_eq!(args.operation, "bubble_sort");
    assert_eq!(args.stop, Some(5000));
    assert_eq!(args.start, None);
    assert_eq!(args.seed, Some(42));
    assert!(!args.no_memory);
  }
}
