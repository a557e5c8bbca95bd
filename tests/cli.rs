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
use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

use serde_json::Value;

const SORTING: &str = "units/com/complexity/samples/Sorting.algo";
const SEARCHING: &str = "units/com/complexity/samples/Searching.algo";

fn cxlab() -> Command {
  let mut cmd = Command::new(cargo::cargo_bin!("cxlab"));
  cmd.env("CLICOLOR", "0").env_remove("CXLAB_LOG_FILE");
  cmd
}

fn metric_lines(stdout: &[u8]) -> Vec<Value> {
  String::from_utf8_lossy(stdout)
    .lines()
    .map(|line| serde_json::from_str(line).unwrap())
    .collect()
}

#[test]
fn test_list_operations() {
  cxlab()
    .arg("list")
    .arg(SORTING)
    .assert()
    .success()
    .stdout(predicate::str::contains("com.complexity.samples.Sorting"))
    .stdout(predicate::str::contains("bubble_sort([i64]) -> ()"))
    .stdout(predicate::str::contains("sort_list(VecDeque<i64>) -> ()"));
}

#[test]
fn test_list_missing_artifact() {
  cxlab()
    .arg("list")
    .arg("units/does/not/Exist.algo")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Unit artifact not found"));
}

#[test]
fn test_list_outside_namespace_root() {
  let temp = tempdir().unwrap();
  let deep = temp.path().join("a/b/c/d/e/f/g");
  fs::create_dir_all(&deep).unwrap();
  let artifact = deep.join("Deep.algo");
  fs::write(&artifact, "name = \"a.b.c.d.e.f.g.Deep\"\nentry = \"sorting\"\n").unwrap();

  cxlab()
    .arg("list")
    .arg(&artifact)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Could not determine the namespace"));
}

#[test]
fn test_sweep_prints_json_lines() {
  let assert = cxlab()
    .args(["sweep", SEARCHING, "--operation", "binary_search"])
    .args(["--start", "100", "--stop", "500", "--step", "200"])
    .args(["--seed", "7", "--warmup-runs", "1", "--no-memory"])
    .assert()
    .success()
    .stderr(predicate::str::contains("--- Sweep complete ---"));

  let metrics = metric_lines(&assert.get_output().stdout);
  let sizes: Vec<u64> = metrics
    .iter()
    .map(|m| m["input_size"].as_u64().unwrap())
    .collect();
  assert_eq!(sizes, [100, 300, 500]);
  for metric in &metrics {
    assert!(metric["time_ns"].as_u64().unwrap() > 0);
    assert_eq!(metric["memory_bytes"], 0);
  }
}

#[test]
fn test_sweep_stops_when_slow() {
  let assert = cxlab()
    .args(["sweep", SORTING, "--operation", "bubble_sort"])
    .args(["--start", "50", "--stop", "5000", "--step", "50"])
    .args(["--slow-threshold-ms", "0", "--warmup-runs", "0"])
    .assert()
    .success()
    .stderr(predicate::str::contains("Stopping early"));

  let metrics = metric_lines(&assert.get_output().stdout);
  assert_eq!(metrics.len(), 1);
  assert_eq!(metrics[0]["input_size"], 50);
}

#[test]
fn test_sweep_unknown_operation() {
  cxlab()
    .args(["sweep", SORTING, "--operation", "quick_sort"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no operation named 'quick_sort'"));
}

#[test]
fn test_sweep_timeout_exits_with_failure() {
  cxlab()
    .args(["sweep", SORTING, "--operation", "bubble_sort"])
    .args(["--start", "30000", "--stop", "30000", "--timeout-ms", "1"])
    .assert()
    .failure()
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("invocation limit"));
}

#[test]
fn test_sweep_reads_config_file() {
  let temp = tempdir().unwrap();
  let config = temp.path().join("cx.json");
  fs::write(
    &config,
    r#"{ "sweep": { "start": 10, "stop": 30, "step": 10 }, "engine": { "warmup_runs": 1, "track_memory": false } }"#,
  )
  .unwrap();

  let assert = cxlab()
    .args(["sweep", SEARCHING, "--operation", "sum"])
    .arg("--config")
    .arg(&config)
    .assert()
    .success();

  let metrics = metric_lines(&assert.get_output().stdout);
  assert_eq!(metrics.len(), 3);
  assert_eq!(metrics[2]["input_size"], 30);
}

#[test]
fn test_sweep_rejects_zero_step() {
  cxlab()
    .args(["sweep", SORTING, "--operation", "bubble_sort", "--step", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid sweep range"));
}
