//! Shared test helpers for library integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use buildcore::binary::{self, BinKinds};
use buildcore::cxx::{self, CxxKinds};
use buildcore::kind::{Builtins, KindRegistry};
use buildcore::scope::Scope;
use buildcore::target::TargetGraph;
use tempfile::TempDir;

/// Isolated build environment.
///
/// Each test gets its own src and out directories, a registry with every
/// kind the crate ships, and an empty graph.
pub struct TestBuild {
  pub src: TempDir,
  pub out: TempDir,
  pub registry: KindRegistry,
  pub builtins: Builtins,
  pub cxx: CxxKinds,
  pub bin: BinKinds,
  pub scope: Arc<Scope>,
  pub graph: TargetGraph,
}

impl TestBuild {
  pub fn new() -> Self {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let (mut registry, builtins) = KindRegistry::with_builtins().unwrap();
    let cxx = cxx::register(&mut registry, &builtins).unwrap();
    let bin = binary::register(&mut registry, &builtins).unwrap();
    let scope = Arc::new(Scope::new(out.path(), src.path()));

    Self {
      src,
      out,
      registry,
      builtins,
      cxx,
      bin,
      scope,
      graph: TargetGraph::new(),
    }
  }

  /// Write a file relative to the src directory.
  pub fn write_src(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.src.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  /// Path relative to the out directory, creating its parent.
  pub fn out_file(&self, relative_path: &str) -> PathBuf {
    let path = self.out.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    path
  }
}
