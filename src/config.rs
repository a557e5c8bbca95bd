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
use crate::cli::SweepArgs;
use crate::engine::BenchmarkEngine;
use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::error::PlanError;
use crate::generator::InputGenerator;
use crate::memory::NoMemory;
use crate::sweep::SweepPlan;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Serialized;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

const ENV_PREFIX: &str = "CXLAB_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
  pub start: usize,
  pub stop: usize,
  pub step: usize,
  pub slow_threshold_ms: u64,
}

impl Default for SweepSettings {
  fn default() -> Self {
    Self {
      start: 1000,
      stop: 100_000,
      step: 2000,
      slow_threshold_ms: 100,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
  pub warmup_runs: u32,
  pub timeout_ms: u64,
  pub track_memory: bool,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      warmup_runs: 5,
      timeout_ms: 2000,
      track_memory: true,
    }
  }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub sweep: SweepSettings,
  pub engine: EngineSettings,
  pub seed: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
struct SweepOverrides {
  #[serde(skip_serializing_if = "Option::is_none")]
  start: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  stop: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  step: Option<usize>,
  #[serde(skip_serializing_if = "Option::is_none")]
  slow_threshold_ms: Option<u64>,
}

#[derive(Debug, Default, Serialize)]
struct EngineOverrides {
  #[serde(skip_serializing_if = "Option::is_none")]
  warmup_runs: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  timeout_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  track_memory: Option<bool>,
}

/// Only the flags the user actually passed.
#[derive(Debug, Default, Serialize)]
struct Overrides {
  sweep: SweepOverrides,
  engine: EngineOverrides,
  #[serde(skip_serializing_if = "Option::is_none")]
  seed: Option<u64>,
}

impl From<&SweepArgs> for Overrides {
  fn from(args: &SweepArgs) -> Self {
    Self {
      sweep: SweepOverrides {
        start: args.start,
        stop: args.stop,
        step: args.step,
        slow_threshold_ms: args.slow_threshold_ms,
      },
      engine: EngineOverrides {
        warmup_runs: args.warmup_runs,
        timeout_ms: args.timeout_ms,
        track_memory: args.no_memory.then_some(false),
      },
      seed: args.seed,
    }
  }
}

/// Precedence, lowest first: defaults, the `--config` JSON file, `CXLAB_`
/// env vars (`__` nests, e.g. `CXLAB_SWEEP__STOP=5000`), then flags.
impl TryFrom<&SweepArgs> for Config {
  type Error = ConfigError;

  fn try_from(args: &SweepArgs) -> Result<Self, Self::Error> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = &args.config {
      if !path.is_file() {
        return Err(ConfigError::MissingFile(path.clone()));
      }
      figment = figment.merge(Json::file(path));
    }

    let config: Config = figment
      .merge(Env::prefixed(ENV_PREFIX).split("__"))
      .merge(Serialized::defaults(Overrides::from(args)))
      .extract()?;

    tracing::debug!(?config, "Resolved configuration");
    config.plan()?;
    Ok(config)
  }
}

impl Config {
  pub fn plan(&self) -> Result<SweepPlan, PlanError> {
    SweepPlan::new(
      self.sweep.start,
      self.sweep.stop,
      self.sweep.step,
      Duration::from_millis(self.sweep.slow_threshold_ms),
    )
  }

  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      warmup_runs: self.engine.warmup_runs,
      timeout: Duration::from_millis(self.engine.timeout_ms),
      ..EngineConfig::default()
    }
  }

  /// Builds the engine, seeding the generator when a seed is configured.
  pub fn engine(&self) -> BenchmarkEngine {
    let generator = self
      .seed
      .map(InputGenerator::seeded)
      .unwrap_or_default();
    let engine = BenchmarkEngine::new(self.engine_config()).with_generator(generator);
    if self.engine.track_memory {
      engine
    } else {
      engine.with_memory_probe(NoMemory)
    }
  }
}
