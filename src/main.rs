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
use Commands::List;
use Commands::Sweep;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use complexity_lab::catalog::Catalog;
use complexity_lab::cli::Cli;
use complexity_lab::cli::Commands;
use complexity_lab::cli::SweepArgs;
use complexity_lab::config::Config;
use complexity_lab::generator::InputGenerator;
use complexity_lab::loader::AlgorithmProvider;
use complexity_lab::loader::UnitLoader;
use complexity_lab::logging::setup_tracing;
use complexity_lab::sweep::SweepController;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
  let _guard = setup_tracing()?;

  let Cli { command } = Cli::parse();
  let main_span = tracing::info_span!("cxlab");
  let _enter = main_span.enter();

  let loader = UnitLoader::new(Catalog::with_samples());

  match command {
    List { locator } => list_operations(&loader, &locator)?,
    Sweep(sweep_args) => run_sweep(&loader, sweep_args).await?,
  }

  Ok(())
}

fn list_operations(loader: &UnitLoader, locator: &Path) -> Result<()> {
  let handle = loader.load(locator)?;
  println!("{}", handle.name());
  for operation in handle.operations() {
    match InputGenerator::supports(operation.signature()) {
      Ok(()) => println!("  {operation}"),
      Err(unsupported) => println!("  {operation}  [{unsupported}]"),
    }
  }
  Ok(())
}

async fn run_sweep(loader: &UnitLoader, args: SweepArgs) -> Result<()> {
  let config = Config::try_from(&args)?;
  let plan = config.plan()?;

  let handle = loader.load(&args.locator)?;
  let operation = handle.select(&args.operation)?;
  tracing::info!(unit = %handle.name(), %operation, "Initializing sweep...");

  let mut sweep = SweepController::new(config.engine()).sweep(handle, operation, plan)?;
  let canceller = sweep.canceller();

  let mut interrupted = false;
  loop {
    tokio::select! {
      item = sweep.recv() => match item {
        Some(Ok(metric)) => println!("{}", serde_json::to_string(&metric)?),
        // Reported from the final report below.
        Some(Err(_)) => {}
        None => break,
      },
      signal = tokio::signal::ctrl_c(), if !interrupted => {
        signal.context("Failed to listen for Ctrl-C")?;
        tracing::warn!("Interrupted; finishing the current input size");
        interrupted = true;
        canceller.cancel();
      }
    }
  }

  let report = tokio::task::spawn_blocking(move || sweep.finish()).await?;
  tracing::info!(stop = ?report.stop, points = report.result.metrics.len(), "Sweep finished");

  if let Some(fault) = report.result.fault {
    return Err(fault).context(format!("Sweep of '{}' aborted", args.operation));
  }
  Ok(())
}
