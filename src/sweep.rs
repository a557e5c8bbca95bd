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

//! Size sweeps.
//!
//! A sweep moves its handle and engine onto one dedicated worker thread and
//! measures `N = start, start + step, ...` up to `stop`, handing each
//! [`Metric`] to the consumer as soon as it exists. The channel holds a single
//! item, so metrics arrive strictly in production order.
//!
//! The sweep ends early when a metric is slower than the plan's threshold,
//! when a measurement faults, or when cancellation is requested. Cancellation
//! is checked only between sizes; the per-invocation timeout is the only thing
//! that interrupts a measurement in flight.

use crate::engine::BenchmarkEngine;
use crate::engine::Metric;
use crate::error::MeasureError;
use crate::error::PlanError;
use crate::error::SelectError;
use crate::generator::InputGenerator;
use crate::handle::AlgorithmHandle;
use crate::handle::Operation;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Range and early-stop threshold of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPlan {
  start: usize,
  stop: usize,
  step: usize,
  slow_threshold: Duration,
}

impl SweepPlan {
  pub fn new(
    start: usize,
    stop: usize,
    step: usize,
    slow_threshold: Duration,
  ) -> Result<Self, PlanError> {
    if step == 0 {
      return Err(PlanError::ZeroStep);
    }
    Ok(Self {
      start,
      stop,
      step,
      slow_threshold,
    })
  }

  /// Input sizes in sweep order; empty when `start > stop`.
  pub fn sizes(&self) -> impl Iterator<Item = usize> + use<> {
    (self.start..=self.stop).step_by(self.step)
  }

  pub fn slow_threshold(&self) -> Duration {
    self.slow_threshold
  }
}

/// A fault that ended a sweep, tagged with the size it happened at.
#[derive(Error, Debug, Clone)]
#[error("Measurement failed at N={input_size}")]
pub struct SweepFault {
  pub input_size: usize,
  #[source]
  pub error: MeasureError,
}

/// Metrics collected so far plus the fault that ended the sweep, if any.
#[derive(Debug, Clone, Default)]
pub struct SweepResult {
  pub metrics: Vec<Metric>,
  pub fault: Option<SweepFault>,
}

/// Why a sweep stopped producing metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
  /// Every size in the plan was measured.
  Completed,
  /// A metric exceeded the slow threshold.
  SlowThreshold { input_size: usize, time_ns: u64 },
  Cancelled,
  Faulted,
  /// The consumer dropped the stream.
  Detached,
}

/// Everything a finished sweep hands back.
#[derive(Debug)]
pub struct SweepReport {
  pub result: SweepResult,
  pub stop: StopReason,
  /// The handle, ready for another sweep unless it is poisoned.
  pub handle: AlgorithmHandle,
  pub engine: BenchmarkEngine,
}

/// Requests cancellation of a running sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepCanceller(Arc<AtomicBool>);

impl SweepCanceller {
  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

/// Starts sweeps on dedicated worker threads.
#[derive(Debug, Default)]
pub struct SweepController {
  engine: BenchmarkEngine,
}

impl SweepController {
  pub fn new(engine: BenchmarkEngine) -> Self {
    Self { engine }
  }

  /// Spawns the worker once the operation's signature is known to be
  /// generatable; nothing is measured otherwise.
  pub fn sweep(
    self,
    handle: AlgorithmHandle,
    operation: Operation,
    plan: SweepPlan,
  ) -> Result<Sweep, SelectError> {
    InputGenerator::supports(operation.signature()).map_err(|source| SelectError::Unsupported {
      operation: operation.name().to_string(),
      source,
    })?;

    let (tx, rx) = mpsc::channel(1);
    let canceller = SweepCanceller::default();
    let worker_canceller = canceller.clone();
    let span = tracing::info_span!("sweep", unit = %handle.name(), operation = %operation.name());
    let engine = self.engine;

    let worker = std::thread::spawn(move || {
      let _enter = span.enter();
      run(engine, handle, operation, plan, worker_canceller, tx)
    });

    Ok(Sweep {
      rx,
      canceller,
      worker,
      exhausted: false,
    })
  }
}

fn run(
  mut engine: BenchmarkEngine,
  mut handle: AlgorithmHandle,
  operation: Operation,
  plan: SweepPlan,
  canceller: SweepCanceller,
  tx: mpsc::Sender<Result<Metric, SweepFault>>,
) -> SweepReport {
  let threshold_ns = u64::try_from(plan.slow_threshold().as_nanos()).unwrap_or(u64::MAX);
  let mut result = SweepResult::default();
  let mut stop = StopReason::Completed;

  tracing::info!("--- Starting sweep ---");
  for n in plan.sizes() {
    if canceller.is_cancelled() {
      tracing::info!(n, "Sweep cancelled");
      stop = StopReason::Cancelled;
      break;
    }

    match engine.measure(&mut handle, &operation, n) {
      Ok(metric) => {
        result.metrics.push(metric);
        if tx.blocking_send(Ok(metric)).is_err() {
          tracing::debug!("Consumer went away; stopping sweep");
          stop = StopReason::Detached;
          break;
        }
        if metric.time_ns > threshold_ns {
          tracing::info!(n, time_ns = metric.time_ns, "Stopping early: algorithm is getting slow");
          stop = StopReason::SlowThreshold {
            input_size: n,
            time_ns: metric.time_ns,
          };
          break;
        }
      }
      Err(error) => {
        tracing::error!(n, error = %error, "Measurement failed");
        let fault = SweepFault {
          input_size: n,
          error,
        };
        result.fault = Some(fault.clone());
        let _ = tx.blocking_send(Err(fault));
        stop = StopReason::Faulted;
        break;
      }
    }
  }
  tracing::info!(points = result.metrics.len(), ?stop, "--- Sweep complete ---");

  SweepReport {
    result,
    stop,
    handle,
    engine,
  }
}

/// Progressive, non-restartable stream of one sweep's metrics.
///
/// Yields `Ok(metric)` per size, then at most one `Err(fault)`, then ends.
/// Consume it with [`Sweep::recv`] from async code or as an [`Iterator`] from
/// synchronous code, never both from inside a runtime.
#[derive(Debug)]
pub struct Sweep {
  rx: mpsc::Receiver<Result<Metric, SweepFault>>,
  canceller: SweepCanceller,
  worker: JoinHandle<SweepReport>,
  exhausted: bool,
}

impl Sweep {
  pub async fn recv(&mut self) -> Option<Result<Metric, SweepFault>> {
    if self.exhausted {
      return None;
    }
    let item = self.rx.recv().await;
    self.exhausted = item.is_none();
    item
  }

  pub fn canceller(&self) -> SweepCanceller {
    self.canceller.clone()
  }

  pub fn cancel(&self) {
    self.canceller.cancel();
  }

  /// Waits for the worker and returns the full report.
  ///
  /// Metrics not yet consumed are still part of the report. Call from
  /// synchronous code, or after [`Sweep::recv`] has returned `None`.
  pub fn finish(mut self) -> SweepReport {
    if !self.exhausted {
      while self.rx.blocking_recv().is_some() {}
    }
    match self.worker.join() {
      Ok(report) => report,
      Err(payload) => std::panic::resume_unwind(payload),
    }
  }
}

impl Iterator for Sweep {
  type Item = Result<Metric, SweepFault>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.exhausted {
      return None;
    }
    let item = self.rx.blocking_recv();
    self.exhausted = item.is_none();
    item
  }
}
