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
use crate::catalog::AlgorithmUnit;
use crate::catalog::Catalog;
use crate::catalog::Interrupt;
use crate::catalog::OperationDef;
use crate::catalog::UnitDef;
use crate::catalog::UnitError;
use crate::generator::GeneratedArgs;
use crate::generator::ParamKind;
use crate::generator::Value;

/// Registers `searching`, `sorting` and `strings`, whose artifacts live under
/// `units/com/complexity/samples/`.
pub fn register(catalog: &mut Catalog) {
  catalog
    .register(
      UnitDef::new("searching")
        .constructor(|| Searching)
        .operation(OperationDef::declared(
          "linear_search",
          [ParamKind::IntArray, ParamKind::Int],
          "i64",
        ))
        .operation(OperationDef::declared(
          "binary_search",
          [ParamKind::IntArray, ParamKind::Int],
          "i64",
        ))
        .operation(OperationDef::declared("sum", [ParamKind::FloatArray], "f64")),
    )
    .register(
      UnitDef::new("sorting")
        .constructor(|| Sorting)
        .operation(OperationDef::declared("bubble_sort", [ParamKind::IntArray], "()"))
        .operation(OperationDef::declared("insertion_sort", [ParamKind::FloatArray], "()"))
        .operation(OperationDef::declared("sort_list", [ParamKind::IntList], "()")),
    )
    .register(
      UnitDef::new("strings")
        .constructor(|| Strings)
        .operation(OperationDef::declared("reverse", [ParamKind::Str], "String"))
        .operation(OperationDef::declared("count_vowels", [ParamKind::Str], "i64"))
        .operation(OperationDef::declared("join", [ParamKind::StringArray, ParamKind::Bool], "String")),
    );
}

struct Searching;

impl AlgorithmUnit for Searching {
  fn invoke(
    &mut self,
    operation: &str,
    args: &mut GeneratedArgs,
    _interrupt: &Interrupt,
  ) -> Result<Value, UnitError> {
    match operation {
      "linear_search" => {
        let target = *args.int(1)?;
        let values = args.int_array(0)?;
        let found = values.iter().position(|&v| v == target);
        Ok(Value::Int(found.map_or(-1, |i| i as i64)))
      }
      "binary_search" => {
        let target = *args.int(1)?;
        let values = args.int_array(0)?;
        let (mut lo, mut hi) = (0usize, values.len());
        while lo < hi {
          let mid = lo + (hi - lo) / 2;
          if values[mid] < target {
            lo = mid + 1;
          } else {
            hi = mid;
          }
        }
        let found = lo < values.len() && values[lo] == target;
        Ok(Value::Int(if found { lo as i64 } else { -1 }))
      }
      "sum" => Ok(Value::Float(args.float_array(0)?.iter().sum())),
      other => Err(format!("unknown operation '{other}'").into()),
    }
  }
}

struct Sorting;

impl AlgorithmUnit for Sorting {
  fn invoke(
    &mut self,
    operation: &str,
    args: &mut GeneratedArgs,
    interrupt: &Interrupt,
  ) -> Result<Value, UnitError> {
    match operation {
      "bubble_sort" => {
        let values = args.int_array(0)?;
        let n = values.len();
        for i in 0..n {
          if interrupt.is_raised() {
            return Err("interrupted".into());
          }
          for j in 0..n - 1 - i {
            if values[j] > values[j + 1] {
              values.swap(j, j + 1);
            }
          }
        }
        Ok(Value::Unit)
      }
      "insertion_sort" => {
        let values = args.float_array(0)?;
        for i in 1..values.len() {
          let mut j = i;
          while j > 0 && values[j - 1] > values[j] {
            values.swap(j - 1, j);
            j -= 1;
          }
        }
        Ok(Value::Unit)
      }
      "sort_list" => {
        args.int_list(0)?.make_contiguous().sort_unstable();
        Ok(Value::Unit)
      }
      other => Err(format!("unknown operation '{other}'").into()),
    }
  }
}

struct Strings;

impl AlgorithmUnit for Strings {
  fn invoke(
    &mut self,
    operation: &str,
    args: &mut GeneratedArgs,
    _interrupt: &Interrupt,
  ) -> Result<Value, UnitError> {
    match operation {
      "reverse" => Ok(Value::Str(args.string(0)?.chars().rev().collect())),
      "count_vowels" => {
        let count = args
          .string(0)?
          .chars()
          .filter(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
          .count();
        Ok(Value::Int(count as i64))
      }
      "join" => {
        let compact = *args.boolean(1)?;
        let separator = if compact { "" } else { "," };
        Ok(Value::Str(args.string_array(0)?.join(separator)))
      }
      other => Err(format!("unknown operation '{other}'").into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn call(entry: &str, operation: &str, values: Vec<Value>) -> (Value, GeneratedArgs) {
    let catalog = Catalog::with_samples();
    let mut unit = catalog.get(entry).unwrap().construct().unwrap();
    let mut args = GeneratedArgs::new(values);
    let out = unit.invoke(operation, &mut args, &Interrupt::default()).unwrap();
    (out, args)
  }

  #[test]
  fn test_searches_agree() {
    let array = Value::IntArray(vec![1, 3, 5, 7, 9, 11]);
    for target in [1, 7, 11] {
      let (linear, _) = call("searching", "linear_search", vec![array.clone(), Value::Int(target)]);
      let (binary, _) = call("searching", "binary_search", vec![array.clone(), Value::Int(target)]);
      assert_eq!(linear, binary);
    }
    let (missing, _) = call("searching", "binary_search", vec![array, Value::Int(4)]);
    assert_eq!(missing, Value::Int(-1));
  }

  #[test]
  fn test_sorts_in_place() {
    let (_, mut args) = call("sorting", "bubble_sort", vec![Value::IntArray(vec![5, 1, 4, 2])]);
    assert_eq!(*args.int_array(0).unwrap(), vec![1, 2, 4, 5]);

    let (_, mut args) = call("sorting", "insertion_sort", vec![Value::FloatArray(vec![0.5, 0.1, 0.3])]);
    assert_eq!(*args.float_array(0).unwrap(), vec![0.1, 0.3, 0.5]);

    let (_, mut args) = call("sorting", "sort_list", vec![Value::IntList([3, 1, 2].into())]);
    assert!(args.int_list(0).unwrap().iter().eq([1, 2, 3].iter()));
  }

  #[test]
  fn test_strings() {
    let (out, _) = call("strings", "reverse", vec![Value::Str("abc".into())]);
    assert_eq!(out, Value::Str("cba".into()));
    let (out, _) = call("strings", "count_vowels", vec![Value::Str("banana".into())]);
    assert_eq!(out, Value::Int(3));
    let words = Value::StringArray(vec!["a".into(), "b".into()]);
    let (out, _) = call("strings", "join", vec![words, Value::Bool(false)]);
    assert_eq!(out, Value::Str("a,b".into()));
  }

  #[test]
  fn test_empty_bubble_sort() {
    let (_, mut args) = call("sorting", "bubble_sort", vec![Value::IntArray(vec![])]);
    assert!(args.int_array(0).unwrap().is_empty());
  }
}
