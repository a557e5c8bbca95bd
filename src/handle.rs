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

//! Loaded algorithm handles and their executor threads.
//!
//! Every handle owns one dedicated thread holding the constructed instance.
//! Invocations are shipped to that thread and timed there, around the call
//! alone. The caller waits with a deadline; when it passes, the interrupt flag
//! is raised and the thread is abandoned. Rust offers no way to kill a thread,
//! so a unit that ignores the interrupt keeps its thread, its instance and
//! whatever it allocated until the call returns, possibly forever. The handle
//! is poisoned from then on and must be reloaded.

use crate::catalog::AlgorithmUnit;
use crate::catalog::Interrupt;
use crate::catalog::OperationDef;
use crate::catalog::Origin;
use crate::error::AlgorithmFault;
use crate::error::InvokeError;
use crate::error::LoadError;
use crate::error::Panicked;
use crate::error::SelectError;
use crate::error::TimeoutFault;
use crate::generator::GeneratedArgs;
use crate::generator::InputGenerator;
use crate::generator::Signature;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use std::time::Instant;

/// A callable operation of a loaded unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
  name: Arc<str>,
  signature: Signature,
  returns: String,
}

impl Operation {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn signature(&self) -> &Signature {
    &self.signature
  }

  pub fn returns(&self) -> &str {
    &self.returns
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({}) -> {}", self.name, self.signature, self.returns)
  }
}

/// Outcome of one successful invocation.
#[derive(Debug)]
pub struct Invocation {
  /// Wall-clock duration of the call itself.
  pub elapsed: Duration,
  /// The arguments after the call, including any in-place mutation.
  pub args: GeneratedArgs,
}

struct Job {
  operation: Arc<str>,
  args: GeneratedArgs,
}

struct Done {
  elapsed: Duration,
  outcome: Result<(), AlgorithmFault>,
  args: GeneratedArgs,
}

struct Executor {
  jobs: mpsc::Sender<Job>,
  done: mpsc::Receiver<Done>,
  interrupt: Interrupt,
}

impl Executor {
  fn spawn(unit: &str, mut instance: Box<dyn AlgorithmUnit>) -> std::io::Result<Self> {
    let (jobs, job_rx) = mpsc::channel::<Job>();
    let (done_tx, done) = mpsc::channel::<Done>();
    let interrupt = Interrupt::default();
    let worker_interrupt = interrupt.clone();

    std::thread::Builder::new()
      .name(format!("unit:{unit}"))
      .spawn(move || {
        while let Ok(Job {
          operation,
          mut args,
        }) = job_rx.recv()
        {
          let started = Instant::now();
          let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            instance.invoke(&operation, &mut args, &worker_interrupt)
          }));
          let elapsed = started.elapsed();

          let outcome = match result {
            Ok(Ok(value)) => {
              std::hint::black_box(value);
              Ok(())
            }
            Ok(Err(cause)) => Err(AlgorithmFault {
              operation: operation.to_string(),
              cause: Arc::from(cause),
            }),
            Err(payload) => Err(AlgorithmFault {
              operation: operation.to_string(),
              cause: Arc::new(Panicked(panic_message(payload.as_ref()))),
            }),
          };

          if done_tx
            .send(Done {
              elapsed,
              outcome,
              args,
            })
            .is_err()
          {
            break;
          }
        }
      })?;

    Ok(Self {
      jobs,
      done,
      interrupt,
    })
  }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}

/// An exclusively owned, loaded and constructed algorithm unit.
pub struct AlgorithmHandle {
  name: String,
  source: PathBuf,
  operations: Vec<Operation>,
  executor: Option<Executor>,
}

impl fmt::Debug for AlgorithmHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AlgorithmHandle")
      .field("name", &self.name)
      .field("source", &self.source)
      .field("operations", &self.operations)
      .field("poisoned", &self.is_poisoned())
      .finish()
  }
}

impl AlgorithmHandle {
  pub(crate) fn start(
    name: String,
    source: PathBuf,
    table: &[OperationDef],
    instance: Box<dyn AlgorithmUnit>,
  ) -> Result<Self, LoadError> {
    let operations = table
      .iter()
      .filter(|op| op.origin == Origin::Declared && !op.name.contains('$'))
      .map(|op| Operation {
        name: Arc::from(op.name.as_str()),
        signature: op.signature.clone(),
        returns: op.returns.clone(),
      })
      .collect();

    let executor = Executor::spawn(&name, instance).map_err(|source| LoadError::Executor {
      unit: name.clone(),
      source,
    })?;

    Ok(Self {
      name,
      source,
      operations,
      executor: Some(executor),
    })
  }

  /// Fully qualified unit name, e.g. `com.sorting.BubbleSort`.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The artifact this handle was loaded from.
  pub fn source(&self) -> &Path {
    &self.source
  }

  /// Operations declared directly on the unit, in declaration order.
  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  pub fn is_poisoned(&self) -> bool {
    self.executor.is_none()
  }

  /// Picks an operation by name, rejecting signatures that cannot be generated.
  pub fn select(&self, name: &str) -> Result<Operation, SelectError> {
    let operation = self
      .operations
      .iter()
      .find(|op| op.name() == name)
      .ok_or_else(|| SelectError::NoSuchOperation {
        unit: self.name.clone(),
        operation: name.to_string(),
        available: self.operations.iter().map(|op| op.name().to_string()).collect(),
      })?;

    InputGenerator::supports(operation.signature()).map_err(|source| SelectError::Unsupported {
      operation: name.to_string(),
      source,
    })?;

    Ok(operation.clone())
  }

  /// Runs `operation` on the handle's instance, waiting at most `limit`.
  pub fn invoke(
    &mut self,
    operation: &Operation,
    args: GeneratedArgs,
    limit: Duration,
  ) -> Result<Invocation, InvokeError> {
    let Some(executor) = self.executor.as_ref() else {
      return Err(InvokeError::Poisoned {
        unit: self.name.clone(),
      });
    };

    let job = Job {
      operation: operation.name.clone(),
      args,
    };
    if executor.jobs.send(job).is_err() {
      // The executor thread only exits early if it died outside the unit call.
      self.executor = None;
      return Err(InvokeError::Poisoned {
        unit: self.name.clone(),
      });
    }

    match executor.done.recv_timeout(limit) {
      Ok(Done {
        elapsed,
        outcome,
        args,
      }) => {
        outcome?;
        Ok(Invocation { elapsed, args })
      }
      Err(mpsc::RecvTimeoutError::Timeout) => {
        executor.interrupt.raise();
        tracing::warn!(
          unit = %self.name,
          operation = %operation.name(),
          ?limit,
          "Invocation timed out; abandoning executor thread"
        );
        self.executor = None;
        Err(
          TimeoutFault {
            operation: operation.name().to_string(),
            limit,
          }
          .into(),
        )
      }
      Err(mpsc::RecvTimeoutError::Disconnected) => {
        self.executor = None;
        Err(InvokeError::Poisoned {
          unit: self.name.clone(),
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::UnitError;
  use crate::generator::ParamKind;
  use crate::generator::Value;

  struct Echo;

  impl AlgorithmUnit for Echo {
    fn invoke(
      &mut self,
      operation: &str,
      args: &mut GeneratedArgs,
      interrupt: &Interrupt,
    ) -> Result<Value, UnitError> {
      match operation {
        "double" => {
          let v = args.int(0)?;
          *v *= 2;
          Ok(Value::Int(*v))
        }
        "fail" => Err("bad input".into()),
        "boom" => panic!("exploded"),
        "spin" => {
          while !interrupt.is_raised() {
            std::thread::sleep(Duration::from_millis(5));
          }
          Ok(Value::Unit)
        }
        other => Err(format!("unknown operation {other}").into()),
      }
    }
  }

  fn handle() -> AlgorithmHandle {
    let table = vec![
      OperationDef::declared("double", [ParamKind::Int], "i64"),
      OperationDef::declared("fail", [], "()"),
      OperationDef::declared("boom", [], "()"),
      OperationDef::declared("spin", [], "()"),
      OperationDef::declared("to_string", [], "String").with_origin(Origin::Inherited),
      OperationDef::declared("lambda$0", [], "()"),
      OperationDef::declared("access", [], "()").with_origin(Origin::Synthesized),
      OperationDef::declared("lookup", [ParamKind::Other("Graph".into())], "()"),
    ];
    AlgorithmHandle::start("test.Echo".into(), PathBuf::from("Echo.algo"), &table, Box::new(Echo)).unwrap()
  }

  #[test]
  fn test_only_declared_operations_are_listed() {
    let names: Vec<_> = handle().operations().iter().map(|op| op.name().to_string()).collect();
    assert_eq!(names, ["double", "fail", "boom", "spin", "lookup"]);
  }

  #[test]
  fn test_operation_display() {
    let op = handle().select("double").unwrap();
    assert_eq!(op.to_string(), "double(i64) -> i64");
  }

  #[test]
  fn test_select_rejects_unknown_and_unsupported() {
    let h = handle();
    assert!(matches!(
      h.select("to_string"),
      Err(SelectError::NoSuchOperation { .. })
    ));
    assert!(matches!(
      h.select("lookup"),
      Err(SelectError::Unsupported { .. })
    ));
  }

  #[test]
  fn test_invoke_returns_mutated_args() {
    let mut h = handle();
    let op = h.select("double").unwrap();
    let out = h
      .invoke(&op, GeneratedArgs::new(vec![Value::Int(21)]), Duration::from_secs(1))
      .unwrap();
    assert_eq!(out.args.values(), &[Value::Int(42)]);
  }

  #[test]
  fn test_returned_error_becomes_fault() {
    let mut h = handle();
    let op = h.select("fail").unwrap();
    let err = h.invoke(&op, GeneratedArgs::default(), Duration::from_secs(1)).unwrap_err();
    let InvokeError::Fault(fault) = err else {
      panic!("expected fault, got {err:?}");
    };
    assert_eq!(fault.cause.to_string(), "bad input");
    assert!(!h.is_poisoned());
  }

  #[test]
  fn test_panic_becomes_fault_and_handle_survives() {
    let mut h = handle();
    let boom = h.select("boom").unwrap();
    let err = h.invoke(&boom, GeneratedArgs::default(), Duration::from_secs(1)).unwrap_err();
    assert!(err.to_string().contains("boom"));
    let InvokeError::Fault(fault) = err else {
      panic!("expected fault");
    };
    assert_eq!(fault.cause.to_string(), "panicked: exploded");

    let double = h.select("double").unwrap();
    assert!(
      h.invoke(&double, GeneratedArgs::new(vec![Value::Int(1)]), Duration::from_secs(1))
        .is_ok()
    );
  }

  #[test]
  fn test_timeout_raises_interrupt_and_poisons() {
    let mut h = handle();
    let spin = h.select("spin").unwrap();
    let started = Instant::now();
    let err = h
      .invoke(&spin, GeneratedArgs::default(), Duration::from_millis(100))
      .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(err, InvokeError::Timeout(_)));
    assert!(h.is_poisoned());

    let double = h.select("double").unwrap();
    assert!(matches!(
      h.invoke(&double, GeneratedArgs::new(vec![Value::Int(1)]), Duration::from_secs(1)),
      Err(InvokeError::Poisoned { .. })
    ));
  }
}
