//! Built-in kinds and the stock factories.
//!
//! - `target{}`: abstract root of every chain; never created implicitly
//! - `file{}`: a path target, resolved against existing files
//! - `alias{}`: a named collection of prerequisites
//! - `dir{}`: alias for a directory's default targets
//! - `fsdir{}`: a directory to be created in the out tree

use super::{KindRef, KindSpec, KindRegistry, RegistryError};
use crate::search::search_file;
use crate::target::{FileState, Group, Target, TargetData, TargetId, TargetKey};

#[derive(Debug, Clone)]
pub struct Builtins {
  pub target: KindRef,
  pub file: KindRef,
  pub alias: KindRef,
  pub dir: KindRef,
  pub fsdir: KindRef,
}

pub fn register(registry: &mut KindRegistry) -> Result<Builtins, RegistryError> {
  let target = registry.register(KindSpec::new("target", target_factory).no_synthesis())?;
  let file = registry.register(KindSpec::new("file", file_factory).base(&target).search(search_file))?;
  let alias = registry.register(KindSpec::new("alias", target_factory).base(&target))?;
  let dir = registry.derive("dir", &alias)?;
  let fsdir = registry.register(KindSpec::new("fsdir", target_factory).base(&target))?;

  Ok(Builtins {
    target,
    file,
    alias,
    dir,
    fsdir,
  })
}

/// Factory for kinds without kind-specific state.
pub fn target_factory(id: TargetId, key: TargetKey) -> Target {
  Target::new(id, key, TargetData::Plain)
}

/// Factory for path targets.
pub fn file_factory(id: TargetId, key: TargetKey) -> Target {
  Target::new(id, key, TargetData::File(FileState::default()))
}

/// Factory for group kinds. The number of member slots comes from the kind.
pub fn group_factory(id: TargetId, key: TargetKey) -> Target {
  let arity = key.kind.members().len();
  Target::new(id, key, TargetData::Group(Group::new(arity)))
}
