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

//! # Complexity Lab
//!
//! `complexity_lab` measures how the running time and memory use of an
//! algorithm grow with input size. It loads an algorithm unit, generates
//! synthetic inputs of size `N`, measures one operation across a range of
//! sizes and streams a `(N, time, memory)` point per size.
//!
//! This crate contains the library behind the `cxlab` CLI, but every stage can
//! be driven on its own.
//!
//! ## Core Modules
//!
//! * [`loader`]: Resolves `*.algo` unit artifacts, inferring their namespace,
//!   and binds them to compiled units from a [`catalog`].
//! * [`handle`]: Loaded units. Each runs on its own executor thread so an
//!   invocation can be bounded by a timeout.
//! * [`generator`]: Builds argument tuples of size `N` for operation signatures.
//! * [`engine`]: Warm-up, probe and repetition cycle producing one [`engine::Metric`].
//! * [`sweep`]: Runs the engine across increasing sizes as a progressive stream.
//! * [`memory`]: Resident memory probes.
//! * [`samples`]: Bundled sample units.
//! * [`config`]: Layered configuration (defaults, JSON file, env, flags).
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod handle;
pub mod loader;
pub mod logging;
pub mod memory;
pub mod samples;
pub mod sweep;
