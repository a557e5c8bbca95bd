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

//! Unit artifact resolution and namespace inference.
//!
//! A unit artifact is a TOML file (`*.algo`) that declares the unit's fully
//! qualified name and the catalog entry it binds to:
//!
//! ```toml
//! name = "com.sorting.BubbleSort"
//! entry = "bubble_sort"
//! ```
//!
//! The declared namespace does not have to match where the file is loaded
//! from. Resolving `a.b.C` against a search root `R` reads `R/a/b/C.algo` and
//! only succeeds if it declares exactly `a.b.C`. [`UnitLoader`] first assumes
//! no namespace, then walks up one directory at a time, prepending each
//! directory name as a namespace segment, for at most
//! [`MAX_NAMESPACE_DEPTH`] levels. Innermost candidates are tried first and
//! the first match wins.

use crate::catalog::Catalog;
use crate::error::LoadError;
use crate::handle::AlgorithmHandle;
use crate::handle::panic_message;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

/// File extension of unit artifacts.
pub const ARTIFACT_EXTENSION: &str = "algo";

/// How many enclosing directories namespace inference may climb.
pub const MAX_NAMESPACE_DEPTH: usize = 5;

/// Resolves a locator into a loaded, constructed [`AlgorithmHandle`].
pub trait AlgorithmProvider {
  fn load(&self, locator: &Path) -> Result<AlgorithmHandle, LoadError>;
}

/// Contents of a `*.algo` artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitManifest {
  /// Fully qualified, dot-separated unit name.
  pub name: String,
  /// Catalog entry implementing the unit.
  pub entry: String,
}

#[derive(Debug)]
enum Resolution {
  Found(UnitManifest),
  Missing,
  WrongName { declared: String },
}

/// Loads unit artifacts from disk and binds them to a [`Catalog`].
#[derive(Debug, Clone)]
pub struct UnitLoader {
  catalog: Arc<Catalog>,
  max_depth: usize,
}

impl UnitLoader {
  pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
    Self {
      catalog: catalog.into(),
      max_depth: MAX_NAMESPACE_DEPTH,
    }
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  /// Finds the search root and qualified name for the artifact at `path`.
  fn infer_namespace(&self, path: &Path) -> Result<UnitManifest, LoadError> {
    let not_found = || LoadError::NotFound(path.to_path_buf());
    let stem = path
      .file_stem()
      .and_then(|s| s.to_str())
      .ok_or_else(not_found)?;
    let mut root = path.parent().ok_or_else(not_found)?;

    let declared = match resolve(root, stem)? {
      Resolution::Found(manifest) => return Ok(manifest),
      Resolution::Missing => return Err(not_found()),
      Resolution::WrongName { declared } => declared,
    };
    tracing::debug!(%declared, path = %path.display(), "Unit declares a namespace; walking up");

    let mut package: Vec<&str> = Vec::new();
    for _ in 0..self.max_depth {
      let (Some(parent), Some(segment)) = (root.parent(), root.file_name().and_then(|s| s.to_str()))
      else {
        break;
      };
      package.insert(0, segment);
      root = parent;

      let candidate = format!("{}.{stem}", package.join("."));
      match resolve(root, &candidate) {
        Ok(Resolution::Found(manifest)) => {
          tracing::debug!(root = %root.display(), name = %candidate, "Resolved unit namespace");
          return Ok(manifest);
        }
        Ok(_) => continue,
        Err(e) => tracing::debug!(error = %e, name = %candidate, "Candidate failed"),
      }
    }

    Err(LoadError::AmbiguousNamespace {
      path: path.to_path_buf(),
      declared,
      depth: self.max_depth,
    })
  }
}

impl AlgorithmProvider for UnitLoader {
  fn load(&self, locator: &Path) -> Result<AlgorithmHandle, LoadError> {
    if !locator.is_file() {
      return Err(LoadError::NotFound(locator.to_path_buf()));
    }
    if locator.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
      return Err(LoadError::NotAnArtifact(locator.to_path_buf()));
    }
    let path = locator.canonicalize().map_err(|source| LoadError::Io {
      path: locator.to_path_buf(),
      source,
    })?;

    let UnitManifest { name, entry } = self.infer_namespace(&path)?;

    let unit = self
      .catalog
      .get(&entry)
      .ok_or_else(|| LoadError::UnknownEntry {
        unit: name.clone(),
        entry: entry.clone(),
      })?;

    let instance = match std::panic::catch_unwind(AssertUnwindSafe(|| unit.construct())) {
      Ok(Some(instance)) => instance,
      Ok(None) => return Err(LoadError::NoDefaultConstructor { unit: name }),
      Err(payload) => {
        return Err(LoadError::Initializer {
          unit: name,
          message: panic_message(payload.as_ref()),
        });
      }
    };

    tracing::info!(unit = %name, %entry, path = %path.display(), "Loaded unit");
    AlgorithmHandle::start(name, path, unit.operations(), instance)
  }
}

/// Looks for `qualified` under `root` and checks the identity it declares.
fn resolve(root: &Path, qualified: &str) -> Result<Resolution, LoadError> {
  let path = artifact_path(root, qualified);
  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Resolution::Missing),
    Err(source) => return Err(LoadError::Io { path, source }),
  };

  let manifest: UnitManifest =
    toml::from_str(&content).map_err(|source| LoadError::Malformed { path, source })?;

  if manifest.name == qualified {
    Ok(Resolution::Found(manifest))
  } else {
    Ok(Resolution::WrongName {
      declared: manifest.name,
    })
  }
}

/// `a.b.C` under `root` lives at `root/a/b/C.algo`.
fn artifact_path(root: &Path, qualified: &str) -> PathBuf {
  let mut path = root.to_path_buf();
  path.extend(qualified.split('.'));
  path.set_extension(ARTIFACT_EXTENSION);
  path
}
