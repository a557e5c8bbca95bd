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
use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors related to loading a unit artifact (src/loader.rs).
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("Unit artifact not found: {0}")]
  NotFound(PathBuf),

  #[error("Not a unit artifact (expected a `.algo` file): {0}")]
  NotAnArtifact(PathBuf),

  #[error(
    "Could not determine the namespace of {path} (declares '{declared}') within {depth} enclosing directories. Load the unit from inside its namespace root."
  )]
  AmbiguousNamespace {
    path: PathBuf,
    declared: String,
    depth: usize,
  },

  #[error("Unit '{unit}' has no zero-argument constructor")]
  NoDefaultConstructor { unit: String },

  #[error("Failed to parse unit artifact: {path}")]
  Malformed {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("Unit '{unit}' binds to entry '{entry}', which is not in the catalog")]
  UnknownEntry { unit: String, entry: String },

  #[error("Constructor of unit '{unit}' panicked: {message}")]
  Initializer { unit: String, message: String },

  #[error("Failed to read unit artifact: {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to start executor thread for unit '{unit}'")]
  Executor {
    unit: String,
    #[source]
    source: std::io::Error,
  },
}

/// A parameter kind the input generator cannot produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported parameter #{position} of type '{kind}'")]
pub struct UnsupportedParameterError {
  pub position: usize,
  pub kind: String,
}

/// A fault raised by loaded code, with the original cause preserved.
#[derive(Error, Debug, Clone)]
#[error("Operation '{operation}' faulted")]
pub struct AlgorithmFault {
  pub operation: String,
  #[source]
  pub cause: Arc<dyn StdError + Send + Sync>,
}

/// Cause recorded when loaded code panics instead of returning an error.
#[derive(Error, Debug, Clone)]
#[error("panicked: {0}")]
pub struct Panicked(pub String);

/// An invocation ran past the cancellation bound and was abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Operation '{operation}' exceeded the {limit:?} invocation limit and was cancelled")]
pub struct TimeoutFault {
  pub operation: String,
  pub limit: Duration,
}

/// The measurement subsystem could not provide a reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{resource} unavailable: {reason}")]
pub struct ResourceError {
  pub resource: &'static str,
  pub reason: String,
}

/// Errors from a single invocation on a handle (src/handle.rs).
#[derive(Error, Debug, Clone)]
pub enum InvokeError {
  #[error(transparent)]
  Fault(#[from] AlgorithmFault),

  #[error(transparent)]
  Timeout(#[from] TimeoutFault),

  #[error("Handle for unit '{unit}' was poisoned by an earlier timeout; reload it")]
  Poisoned { unit: String },
}

/// Errors when picking an operation to measure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
  #[error("Unit '{unit}' declares no operation named '{operation}'. Available: {available:?}")]
  NoSuchOperation {
    unit: String,
    operation: String,
    available: Vec<String>,
  },

  #[error("Operation '{operation}' cannot be measured")]
  Unsupported {
    operation: String,
    #[source]
    source: UnsupportedParameterError,
  },
}

/// Everything that can abandon the measurement at one input size (src/engine.rs).
#[derive(Error, Debug, Clone)]
pub enum MeasureError {
  #[error(transparent)]
  Algorithm(#[from] AlgorithmFault),

  #[error(transparent)]
  Timeout(#[from] TimeoutFault),

  #[error(transparent)]
  Unsupported(#[from] UnsupportedParameterError),

  #[error(transparent)]
  Resource(#[from] ResourceError),

  #[error("Handle for unit '{unit}' was poisoned by an earlier timeout; reload it")]
  Poisoned { unit: String },
}

impl From<InvokeError> for MeasureError {
  fn from(err: InvokeError) -> Self {
    match err {
      InvokeError::Fault(fault) => MeasureError::Algorithm(fault),
      InvokeError::Timeout(fault) => MeasureError::Timeout(fault),
      InvokeError::Poisoned { unit } => MeasureError::Poisoned { unit },
    }
  }
}

/// Invalid sweep range (src/sweep.rs).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
  #[error("Sweep step must be greater than zero")]
  ZeroStep,
}

/// Errors related to configuration resolution (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config file not found: {0}")]
  MissingFile(PathBuf),

  #[error("Failed to resolve configuration")]
  Extract(#[from] figment::Error),

  #[error("Invalid sweep range")]
  Plan(#[from] PlanError),
}
