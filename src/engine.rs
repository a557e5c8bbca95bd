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

//! Calibrated measurement of one operation at one input size.
//!
//! For each `N` the engine runs, in order:
//!
//! 1. warm-up: a few untimed invocations to absorb first-call effects;
//! 2. probe: one timed invocation that picks a cost tier;
//! 3. a repetition budget chosen from the tier by [`IterationPolicy`];
//! 4. a resident memory baseline;
//! 5. the timed repetitions, keeping the minimum duration;
//! 6. a second memory reading.
//!
//! Every invocation gets its own deep copy of a master argument tuple
//! generated once for `N`, so in-place mutation never carries over and
//! generation cost stays outside the timed interval. Each invocation is
//! bounded by [`EngineConfig::timeout`].
//!
//! The minimum is reported rather than the mean: scheduling, interrupts and
//! cache misses only ever add time to a sample, so the smallest observation
//! is the closest to the true cost.

use crate::error::MeasureError;
use crate::generator::GeneratedArgs;
use crate::generator::InputGenerator;
use crate::handle::AlgorithmHandle;
use crate::handle::Operation;
use crate::memory::MemoryProbe;
use crate::memory::ResidentMemory;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// One measurement point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
  pub input_size: usize,
  pub time_ns: u64,
  pub memory_bytes: u64,
}

impl fmt::Display for Metric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "N={} time={}ns memory={}B",
      self.input_size, self.time_ns, self.memory_bytes
    )
  }
}

/// Repetition budget tiers, keyed on the probe duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationPolicy {
  /// Probes above this are slow.
  pub slow_above: Duration,
  /// Probes above this (and not slow) are medium.
  pub medium_above: Duration,
  pub slow_repetitions: u32,
  pub medium_repetitions: u32,
  pub fast_repetitions: u32,
}

impl Default for IterationPolicy {
  fn default() -> Self {
    Self {
      slow_above: Duration::from_millis(10),
      medium_above: Duration::from_millis(1),
      slow_repetitions: 5,
      medium_repetitions: 50,
      fast_repetitions: 500,
    }
  }
}

impl IterationPolicy {
  /// Cheap operations need many samples to find a stable minimum; expensive
  /// ones are resampled sparingly so a sweep stays practical.
  pub fn repetitions(&self, probe: Duration) -> u32 {
    let reps = if probe > self.slow_above {
      self.slow_repetitions
    } else if probe > self.medium_above {
      self.medium_repetitions
    } else {
      self.fast_repetitions
    };
    reps.max(1)
  }
}

/// Tunables of the measurement methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
  pub warmup_runs: u32,
  /// Hard limit for any single invocation.
  pub timeout: Duration,
  pub policy: IterationPolicy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      warmup_runs: 5,
      timeout: Duration::from_secs(2),
      policy: IterationPolicy::default(),
    }
  }
}

/// Measures `(handle, operation, N)` triples.
pub struct BenchmarkEngine {
  config: EngineConfig,
  generator: InputGenerator,
  memory: Box<dyn MemoryProbe>,
}

impl fmt::Debug for BenchmarkEngine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BenchmarkEngine")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl Default for BenchmarkEngine {
  fn default() -> Self {
    Self::new(EngineConfig::default())
  }
}

impl BenchmarkEngine {
  pub fn new(config: EngineConfig) -> Self {
    Self {
      config,
      generator: InputGenerator::new(),
      memory: Box::new(ResidentMemory::new()),
    }
  }

  pub fn with_generator(mut self, generator: InputGenerator) -> Self {
    self.generator = generator;
    self
  }

  pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
    self.memory = Box::new(probe);
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  /// Runs the full warm-up, probe and repetition cycle at size `n`.
  pub fn measure(
    &mut self,
    handle: &mut AlgorithmHandle,
    operation: &Operation,
    n: usize,
  ) -> Result<Metric, MeasureError> {
    let span = tracing::debug_span!("measure", operation = %operation.name(), n);
    let _enter = span.enter();

    let master = self.generator.generate(operation.signature(), n)?;
    let timeout = self.config.timeout;

    for _ in 0..self.config.warmup_runs {
      handle.invoke(operation, master.clone(), timeout)?;
    }

    let probe = handle.invoke(operation, master.clone(), timeout)?.elapsed;
    let repetitions = self.config.policy.repetitions(probe);
    tracing::debug!(?probe, repetitions, "Probe classified cost tier");

    self.memory.reclaim();
    let before = self.memory.resident_bytes()?;

    let mut fastest = Duration::MAX;
    for _ in 0..repetitions {
      let args: GeneratedArgs = master.clone();
      let elapsed = handle.invoke(operation, args, timeout)?.elapsed;
      fastest = fastest.min(elapsed);
    }

    let after = self.memory.resident_bytes()?;

    let metric = Metric {
      input_size: n,
      // Clock granularity can report zero for trivial calls.
      time_ns: u64::try_from(fastest.as_nanos()).unwrap_or(u64::MAX).max(1),
      memory_bytes: after.saturating_sub(before),
    };
    tracing::debug!(%metric, "Measured");
    Ok(metric)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_policy_tiers() {
    let policy = IterationPolicy::default();
    assert_eq!(policy.repetitions(Duration::from_micros(3)), 500);
    assert_eq!(policy.repetitions(Duration::from_millis(1)), 500);
    assert_eq!(policy.repetitions(Duration::from_micros(1001)), 50);
    assert_eq!(policy.repetitions(Duration::from_millis(10)), 50);
    assert_eq!(policy.repetitions(Duration::from_micros(10_001)), 5);
    assert_eq!(policy.repetitions(Duration::from_secs(1)), 5);
  }

  #[test]
  fn test_policy_never_zero() {
    let policy = IterationPolicy {
      fast_repetitions: 0,
      ..IterationPolicy::default()
    };
    assert_eq!(policy.repetitions(Duration::ZERO), 1);
  }

  #[test]
  fn test_metric_serializes_as_flat_record() {
    let metric = Metric {
      input_size: 1000,
      time_ns: 1234,
      memory_bytes: 0,
    };
    assert_eq!(
      serde_json::to_string(&metric).unwrap(),
      r#"{"input_size":1000,"time_ns":1234,"memory_bytes":0}"#
    );
  }
}
