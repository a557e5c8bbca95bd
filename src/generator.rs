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
use crate::error::UnsupportedParameterError;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

const INT_ARRAY_BOUND: i64 = 100_000;
const INT_LIST_BOUND: i64 = 10_000;

/// Parameter kinds an operation may declare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
  IntArray,
  FloatArray,
  StringArray,
  /// Ordered integer container, generated as a `VecDeque<i64>`.
  IntList,
  Int,
  Float,
  Bool,
  Str,
  /// Any type outside the supported set, kept by name for diagnostics.
  Other(String),
}

impl ParamKind {
  /// Whether values of this kind are sized by `N`.
  pub fn is_sized(&self) -> bool {
    matches!(
      self,
      ParamKind::IntArray | ParamKind::FloatArray | ParamKind::StringArray | ParamKind::IntList
    )
  }
}

impl fmt::Display for ParamKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ParamKind::IntArray => f.write_str("[i64]"),
      ParamKind::FloatArray => f.write_str("[f64]"),
      ParamKind::StringArray => f.write_str("[String]"),
      ParamKind::IntList => f.write_str("VecDeque<i64>"),
      ParamKind::Int => f.write_str("i64"),
      ParamKind::Float => f.write_str("f64"),
      ParamKind::Bool => f.write_str("bool"),
      ParamKind::Str => f.write_str("String"),
      ParamKind::Other(name) => f.write_str(name),
    }
  }
}

/// Ordered parameter kinds of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(Vec<ParamKind>);

impl Signature {
  pub fn new(kinds: impl IntoIterator<Item = ParamKind>) -> Self {
    Self(kinds.into_iter().collect())
  }

  pub fn kinds(&self) -> &[ParamKind] {
    &self.0
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl fmt::Display for Signature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, kind) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{kind}")?;
    }
    Ok(())
  }
}

/// A concrete argument or return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  IntArray(Vec<i64>),
  FloatArray(Vec<f64>),
  StringArray(Vec<String>),
  IntList(VecDeque<i64>),
  Int(i64),
  Float(f64),
  Bool(bool),
  Str(String),
  Unit,
}

impl Value {
  /// Element count for sized values, `None` for scalars.
  pub fn len(&self) -> Option<usize> {
    match self {
      Value::IntArray(v) => Some(v.len()),
      Value::FloatArray(v) => Some(v.len()),
      Value::StringArray(v) => Some(v.len()),
      Value::IntList(v) => Some(v.len()),
      _ => None,
    }
  }

  fn kind_name(&self) -> &'static str {
    match self {
      Value::IntArray(_) => "[i64]",
      Value::FloatArray(_) => "[f64]",
      Value::StringArray(_) => "[String]",
      Value::IntList(_) => "VecDeque<i64>",
      Value::Int(_) => "i64",
      Value::Float(_) => "f64",
      Value::Bool(_) => "bool",
      Value::Str(_) => "String",
      Value::Unit => "()",
    }
  }
}

/// Returned by the typed accessors of [`GeneratedArgs`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
  #[error("Missing argument #{0}")]
  Missing(usize),

  #[error("Argument #{position} is {actual}, expected {expected}")]
  Mismatch {
    position: usize,
    expected: &'static str,
    actual: &'static str,
  },
}

/// One argument tuple matching a [`Signature`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedArgs(Vec<Value>);

macro_rules! accessor {
  ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
    pub fn $name(&mut self, position: usize) -> Result<&mut $ty, ArgumentError> {
      match self.0.get_mut(position) {
        Some(Value::$variant(v)) => Ok(v),
        Some(other) => Err(ArgumentError::Mismatch {
          position,
          expected: $expected,
          actual: other.kind_name(),
        }),
        None => Err(ArgumentError::Missing(position)),
      }
    }
  };
}

impl GeneratedArgs {
  pub fn new(values: Vec<Value>) -> Self {
    Self(values)
  }

  pub fn values(&self) -> &[Value] {
    &self.0
  }

  pub fn into_values(self) -> Vec<Value> {
    self.0
  }

  accessor!(int_array, IntArray, Vec<i64>, "[i64]");
  accessor!(float_array, FloatArray, Vec<f64>, "[f64]");
  accessor!(string_array, StringArray, Vec<String>, "[String]");
  accessor!(int_list, IntList, VecDeque<i64>, "VecDeque<i64>");
  accessor!(int, Int, i64, "i64");
  accessor!(float, Float, f64, "f64");
  accessor!(boolean, Bool, bool, "bool");
  accessor!(string, Str, String, "String");
}

/// Produces synthetic arguments for an operation signature, scaled by `N`.
#[derive(Debug)]
pub struct InputGenerator {
  rng: StdRng,
}

impl Default for InputGenerator {
  fn default() -> Self {
    Self::new()
  }
}

impl InputGenerator {
  /// Generator seeded from the thread-local entropy source.
  pub fn new() -> Self {
    Self {
      rng: StdRng::from_rng(&mut rand::rng()),
    }
  }

  /// Reproducible generator.
  pub fn seeded(seed: u64) -> Self {
    Self {
      rng: StdRng::seed_from_u64(seed),
    }
  }

  /// Checks that every parameter kind can be generated.
  pub fn supports(signature: &Signature) -> Result<(), UnsupportedParameterError> {
    match signature
      .kinds()
      .iter()
      .enumerate()
      .find(|(_, kind)| matches!(kind, ParamKind::Other(_)))
    {
      Some((position, kind)) => Err(UnsupportedParameterError {
        position,
        kind: kind.to_string(),
      }),
      None => Ok(()),
    }
  }

  /// Generates one fresh argument tuple for `signature` at size `n`.
  ///
  /// Arrays and collections get exactly `n` elements and the string scalar
  /// has length `n`; other scalars are auxiliary.
  pub fn generate(
    &mut self,
    signature: &Signature,
    n: usize,
  ) -> Result<GeneratedArgs, UnsupportedParameterError> {
    signature
      .kinds()
      .iter()
      .enumerate()
      .map(|(position, kind)| self.value(position, kind, n))
      .collect::<Result<Vec<_>, _>>()
      .map(GeneratedArgs)
  }

  fn value(
    &mut self,
    position: usize,
    kind: &ParamKind,
    n: usize,
  ) -> Result<Value, UnsupportedParameterError> {
    let value = match kind {
      ParamKind::IntArray => {
        let mut values: Vec<i64> = (0..n)
          .map(|_| self.rng.random_range(0..INT_ARRAY_BOUND))
          .collect();
        // Sorted so search algorithms can find targets; scans are unaffected.
        values.sort_unstable();
        Value::IntArray(values)
      }
      ParamKind::FloatArray => Value::FloatArray((0..n).map(|_| self.rng.random::<f64>()).collect()),
      ParamKind::StringArray => Value::StringArray((0..n).map(|i| format!("Str{i}")).collect()),
      ParamKind::IntList => Value::IntList(
        (0..n)
          .map(|_| self.rng.random_range(0..INT_LIST_BOUND))
          .collect(),
      ),
      ParamKind::Int => Value::Int(if n == 0 {
        0
      } else {
        self.rng.random_range(0..n as i64)
      }),
      ParamKind::Float => Value::Float(self.rng.random::<f64>()),
      ParamKind::Bool => Value::Bool(false),
      ParamKind::Str => Value::Str(
        (0..n)
          .map(|_| char::from(b'a' + self.rng.random_range(0..26u8)))
          .collect(),
      ),
      ParamKind::Other(name) => {
        return Err(UnsupportedParameterError {
          position,
          kind: name.clone(),
        });
      }
    };
    Ok(value)
  }
}
