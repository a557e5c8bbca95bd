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
use crate::generator::GeneratedArgs;
use crate::generator::ParamKind;
use crate::generator::Signature;
use crate::generator::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// Error type returned by loaded code.
pub type UnitError = Box<dyn std::error::Error + Send + Sync>;

/// Cooperative cancellation flag handed to every invocation.
///
/// Raised when the invocation outlives its time limit. Long-running units
/// should poll it and bail out; units that never do are abandoned instead.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
  pub fn is_raised(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }

  pub(crate) fn raise(&self) {
    self.0.store(true, Ordering::Relaxed);
  }
}

/// A constructed algorithm instance.
///
/// `invoke` dispatches by operation name. Instances may keep internal state
/// between calls; they are never invoked concurrently.
pub trait AlgorithmUnit: Send {
  fn invoke(
    &mut self,
    operation: &str,
    args: &mut GeneratedArgs,
    interrupt: &Interrupt,
  ) -> Result<Value, UnitError>;
}

/// Where an operation in a unit's table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  /// Declared directly on the unit.
  Declared,
  /// Provided by a base capability the unit builds on.
  Inherited,
  /// Generated by tooling rather than written by the author.
  Synthesized,
}

/// One row of a unit's operation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDef {
  pub name: String,
  pub signature: Signature,
  pub returns: String,
  pub origin: Origin,
}

impl OperationDef {
  pub fn declared(
    name: impl Into<String>,
    params: impl IntoIterator<Item = ParamKind>,
    returns: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      signature: Signature::new(params),
      returns: returns.into(),
      origin: Origin::Declared,
    }
  }

  pub fn with_origin(mut self, origin: Origin) -> Self {
    self.origin = origin;
    self
  }
}

type Constructor = Arc<dyn Fn() -> Box<dyn AlgorithmUnit> + Send + Sync>;

/// A compiled algorithm unit registered under an entry symbol.
#[derive(Clone)]
pub struct UnitDef {
  entry: String,
  constructor: Option<Constructor>,
  operations: Vec<OperationDef>,
}

impl fmt::Debug for UnitDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UnitDef")
      .field("entry", &self.entry)
      .field("has_constructor", &self.constructor.is_some())
      .field("operations", &self.operations)
      .finish()
  }
}

impl UnitDef {
  pub fn new(entry: impl Into<String>) -> Self {
    Self {
      entry: entry.into(),
      constructor: None,
      operations: Vec::new(),
    }
  }

  /// Registers the zero-argument constructor.
  pub fn constructor<U, F>(mut self, init: F) -> Self
  where
    U: AlgorithmUnit + 'static,
    F: Fn() -> U + Send + Sync + 'static,
  {
    self.constructor = Some(Arc::new(move || Box::new(init()) as Box<dyn AlgorithmUnit>));
    self
  }

  /// Appends an operation; table order is declaration order.
  pub fn operation(mut self, operation: OperationDef) -> Self {
    self.operations.push(operation);
    self
  }

  pub fn entry(&self) -> &str {
    &self.entry
  }

  pub fn operations(&self) -> &[OperationDef] {
    &self.operations
  }

  pub(crate) fn construct(&self) -> Option<Box<dyn AlgorithmUnit>> {
    self.constructor.as_ref().map(|init| init())
  }
}

/// Registry of compiled units, keyed by entry symbol.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
  units: HashMap<String, UnitDef>,
}

impl Catalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Catalog preloaded with the bundled sample units.
  pub fn with_samples() -> Self {
    let mut catalog = Self::new();
    crate::samples::register(&mut catalog);
    catalog
  }

  /// Adds a unit, replacing any previous unit with the same entry.
  pub fn register(&mut self, unit: UnitDef) -> &mut Self {
    if self.units.contains_key(unit.entry()) {
      tracing::warn!(entry = %unit.entry(), "Replacing previously registered unit");
    }
    self.units.insert(unit.entry.clone(), unit);
    self
  }

  pub fn get(&self, entry: &str) -> Option<&UnitDef> {
    self.units.get(entry)
  }

  pub fn entries(&self) -> impl Iterator<Item = &str> {
    self.units.keys().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Counter(i64);

  impl AlgorithmUnit for Counter {
    fn invoke(
      &mut self,
      _operation: &str,
      _args: &mut GeneratedArgs,
      _interrupt: &Interrupt,
    ) -> Result<Value, UnitError> {
      self.0 += 1;
      Ok(Value::Int(self.0))
    }
  }

  #[test]
  fn test_constructor_builds_fresh_instances() {
    let def = UnitDef::new("counter").constructor(|| Counter(10));
    let mut a = def.construct().unwrap();
    let mut b = def.construct().unwrap();
    let mut args = GeneratedArgs::default();
    let interrupt = Interrupt::default();
    assert_eq!(a.invoke("tick", &mut args, &interrupt).unwrap(), Value::Int(11));
    assert_eq!(a.invoke("tick", &mut args, &interrupt).unwrap(), Value::Int(12));
    assert_eq!(b.invoke("tick", &mut args, &interrupt).unwrap(), Value::Int(11));
  }

  #[test]
  fn test_missing_constructor() {
    assert!(UnitDef::new("bare").construct().is_none());
  }

  #[test]
  fn test_register_replaces_same_entry() {
    let mut catalog = Catalog::new();
    catalog
      .register(UnitDef::new("x").operation(OperationDef::declared("a", [], "()")))
      .register(UnitDef::new("x").operation(OperationDef::declared("b", [], "()")));
    assert_eq!(catalog.entries().count(), 1);
    assert_eq!(catalog.get("x").unwrap().operations()[0].name, "b");
  }

  #[test]
  fn test_interrupt_is_shared_between_clones() {
    let interrupt = Interrupt::default();
    let observer = interrupt.clone();
    assert!(!observer.is_raised());
    interrupt.raise();
    assert!(observer.is_raised());
  }
}
