//! Minimal directory scope.
//!
//! The real scope (variables, buildfile loading, the scope tree) lives outside
//! this crate. Resolution only needs to know which src and out directories a
//! prerequisite was written in, and which project it belongs to.

use std::path::{Path, PathBuf};

use crate::util::path::normalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
  out_path: PathBuf,
  src_path: PathBuf,
  project: Option<String>,
}

impl Scope {
  /// Scope for an out-of-tree build. Both paths are normalized.
  pub fn new(out_path: impl AsRef<Path>, src_path: impl AsRef<Path>) -> Self {
    Self {
      out_path: normalize(out_path.as_ref()),
      src_path: normalize(src_path.as_ref()),
      project: None,
    }
  }

  /// Scope for an in-tree build, where src and out are the same directory.
  pub fn in_tree(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    Self::new(path, path)
  }

  pub fn with_project(mut self, project: impl Into<String>) -> Self {
    self.project = Some(project.into());
    self
  }

  pub fn out_path(&self) -> &Path {
    &self.out_path
  }

  pub fn src_path(&self) -> &Path {
    &self.src_path
  }

  pub fn project(&self) -> Option<&str> {
    self.project.as_deref()
  }

  pub fn is_in_tree(&self) -> bool {
    self.out_path == self.src_path
  }
}
