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
use crate::error::ResourceError;
use sysinfo::Pid;
use sysinfo::ProcessesToUpdate;
use sysinfo::System;

/// Source of process memory readings.
///
/// The engine reports `max(0, after - before)` around a whole repetition
/// batch. Readings are process-wide, so the delta is approximate.
pub trait MemoryProbe: Send {
  /// Asks the runtime to give back whatever it can before a baseline reading.
  fn reclaim(&mut self) {}

  /// Current in-use memory, in bytes.
  fn resident_bytes(&mut self) -> Result<u64, ResourceError>;
}

/// Resident set size of the current process, as reported by the OS.
///
/// Rust returns memory to the allocator as soon as values drop, so there is
/// no collector to trigger and [`MemoryProbe::reclaim`] is a no-op.
#[derive(Debug)]
pub struct ResidentMemory {
  system: System,
  pid: Option<Pid>,
}

impl Default for ResidentMemory {
  fn default() -> Self {
    Self::new()
  }
}

impl ResidentMemory {
  pub fn new() -> Self {
    let pid = sysinfo::get_current_pid()
      .inspect_err(|e| tracing::warn!(error = %e, "Cannot determine own process id"))
      .ok();
    Self {
      system: System::new(),
      pid,
    }
  }
}

impl MemoryProbe for ResidentMemory {
  fn resident_bytes(&mut self) -> Result<u64, ResourceError> {
    let unavailable = |reason: &str| ResourceError {
      resource: "resident memory",
      reason: reason.to_string(),
    };

    let pid = self.pid.ok_or_else(|| unavailable("process id unknown on this platform"))?;
    self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    self
      .system
      .process(pid)
      .map(|process| process.memory())
      .ok_or_else(|| unavailable("process entry could not be queried"))
  }
}

/// Probe that always reports zero, for hosts without a memory source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemory;

impl MemoryProbe for NoMemory {
  fn resident_bytes(&mut self) -> Result<u64, ResourceError> {
    Ok(0)
  }
}
