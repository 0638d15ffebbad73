//! Resolution of prerequisites into targets.
//!
//! The [`Search`] trait is how a prerequisite asks the outside world for its
//! target. [`GraphSearch`] is a straightforward implementation over a single
//! [`TargetGraph`]: it does not walk a scope tree or load buildfiles, it only
//! places things relative to the prerequisite's own scope.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::prerequisite::PrerequisiteKey;
use crate::target::{Target, TargetGraph, TargetKey, file_name};
use crate::util::path::complete;

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("unable to find {key}: {kind} targets cannot be created implicitly")]
  NotFound { key: String, kind: String },

  #[error("searching for an existing file requires a relative directory: {key}")]
  RelativeDirectoryRequired { key: String },
}

/// The three strategies a prerequisite may use to find its target.
pub trait Search: Sync {
  /// An already-registered target equivalent to `key`. Never touches the
  /// filesystem.
  fn search_existing_target(&self, key: &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError>;

  /// A target for a file that exists on disk under the scope's source
  /// directory. `key.dir` must be relative.
  fn search_existing_file(&self, key: &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError>;

  /// A new target for `key`, created unconditionally.
  fn create_new_target(&self, key: &PrerequisiteKey<'_>) -> Result<Arc<Target>, ResolveError>;
}

/// Search used by all path kinds: an existing target first, then an existing
/// file, but the latter only for relative directories.
pub fn search_file(search: &dyn Search, key: &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError> {
  if let Some(target) = search.search_existing_target(key)? {
    return Ok(Some(target));
  }

  if key.dir.is_relative() {
    search.search_existing_file(key)
  } else {
    Ok(None)
  }
}

/// [`Search`] over one graph, placing new targets in the scope's out tree.
#[derive(Debug, Clone, Copy)]
pub struct GraphSearch<'a> {
  graph: &'a TargetGraph,
}

impl<'a> GraphSearch<'a> {
  pub fn new(graph: &'a TargetGraph) -> Self {
    Self { graph }
  }

  pub fn graph(&self) -> &'a TargetGraph {
    self.graph
  }

  /// Out directory of `key`: the explicit out directory if one was given,
  /// the key's directory under the scope's out tree otherwise.
  fn out_dir(key: &PrerequisiteKey<'_>) -> PathBuf {
    if key.out.as_os_str().is_empty() {
      complete(key.scope.out_path(), key.dir)
    } else {
      complete(key.scope.out_path(), key.out)
    }
  }

  fn src_dir(key: &PrerequisiteKey<'_>) -> PathBuf {
    complete(key.scope.src_path(), key.dir)
  }

  fn target_key(key: &PrerequisiteKey<'_>, dir: PathBuf, out: PathBuf) -> TargetKey {
    TargetKey {
      kind: key.kind.clone(),
      dir,
      out,
      name: key.name.to_string(),
      ext: key.ext.map(str::to_string),
    }
  }
}

impl Search for GraphSearch<'_> {
  fn search_existing_target(&self, key: &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError> {
    let out = Self::out_dir(key);

    // Out tree first, then the src tree for targets of existing files.
    let in_out = Self::target_key(key, out.clone(), out.clone());
    if let Some(target) = self.graph.find(&in_out) {
      trace!(key = %target, "found existing target in out tree");
      return Ok(Some(target));
    }

    let src = Self::src_dir(key);
    if src != out {
      let in_src = Self::target_key(key, src, out);
      if let Some(target) = self.graph.find(&in_src) {
        trace!(key = %target, "found existing target in src tree");
        return Ok(Some(target));
      }
    }

    Ok(None)
  }

  fn search_existing_file(&self, key: &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError> {
    if !key.dir.is_relative() {
      return Err(ResolveError::RelativeDirectoryRequired { key: key.to_string() });
    }

    let src = Self::src_dir(key);
    let ext = key.ext.or(key.kind.default_extension());
    let path = src.join(file_name(key.name, ext));

    if !path.is_file() {
      trace!(path = ?path, "no existing file");
      return Ok(None);
    }

    let (target, created) = self.graph.find_or_create(Self::target_key(key, src, Self::out_dir(key)));
    debug!(key = %target, path = ?path, created, "found existing file");
    Ok(Some(target))
  }

  fn create_new_target(&self, key: &PrerequisiteKey<'_>) -> Result<Arc<Target>, ResolveError> {
    let out = Self::out_dir(key);
    let (target, created) = self.graph.find_or_create(Self::target_key(key, out.clone(), out));
    if !created {
      trace!(key = %target, "target created concurrently");
    }
    Ok(target)
  }
}
