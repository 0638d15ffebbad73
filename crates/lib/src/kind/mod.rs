//! Target kinds.
//!
//! Every target carries a reference to an immutable kind descriptor. Kinds
//! form single-inheritance chains (`hxx` is-a `file` is-a `target`) that are
//! used for capability queries; behavior is attached to a kind as plain
//! function pointers (factory and search), not inherited through a type
//! hierarchy.

pub mod builtin;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use crate::prerequisite::PrerequisiteKey;
use crate::search::{ResolveError, Search};
use crate::target::{Target, TargetId, TargetKey};

pub use builtin::Builtins;
pub use registry::{KindRegistry, RegistryError};

/// Shared handle to a registered kind.
pub type KindRef = Arc<TargetKind>;

/// Constructs a new target of a kind. Called by the target graph, once per key,
/// while the graph holds the lock for that key: a factory must not call back
/// into the graph or it deadlocks.
pub type TargetFactory = fn(TargetId, TargetKey) -> Target;

/// Kind-specific search. Returns `None` if nothing suitable exists, in which
/// case a new target may be created.
pub type SearchFn = fn(&dyn Search, &PrerequisiteKey<'_>) -> Result<Option<Arc<Target>>, ResolveError>;

/// Identity of a kind within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(pub(crate) u32);

pub struct TargetKind {
  id: KindId,
  name: String,
  base: Option<KindRef>,
  factory: TargetFactory,
  search: Option<SearchFn>,
  default_extension: Option<String>,
  synthesize: bool,
  members: Vec<KindRef>,
}

impl TargetKind {
  pub fn id(&self) -> KindId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn base(&self) -> Option<&KindRef> {
    self.base.as_ref()
  }

  pub fn factory(&self) -> TargetFactory {
    self.factory
  }

  pub fn search(&self) -> Option<SearchFn> {
    self.search
  }

  /// Extension assumed when a name is given without one.
  pub fn default_extension(&self) -> Option<&str> {
    self.default_extension.as_deref()
  }

  /// Whether resolution may create a target of this kind when none exists.
  pub fn synthesize(&self) -> bool {
    self.synthesize
  }

  /// Member kinds, in order, if this is a group kind.
  pub fn members(&self) -> &[KindRef] {
    &self.members
  }

  pub fn is_group(&self) -> bool {
    !self.members.is_empty()
  }

  /// This kind followed by its bases, most derived first.
  pub fn ancestry(&self) -> impl Iterator<Item = &TargetKind> {
    std::iter::successors(Some(self), |kind| kind.base.as_deref())
  }

  /// True if this kind is `kind` or derives from it.
  pub fn is_a(&self, kind: &TargetKind) -> bool {
    self.ancestry().any(|k| k.id == kind.id)
  }
}

impl PartialEq for TargetKind {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TargetKind {}

impl fmt::Debug for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TargetKind")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("base", &self.base.as_ref().map(|b| b.name()))
      .finish_non_exhaustive()
  }
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

/// Description of a kind to register.
///
/// ```ignore
/// let hxx = registry.register(
///   KindSpec::new("hxx", builtin::file_factory)
///     .base(&builtins.file)
///     .search(search::search_file)
///     .default_extension("hxx"),
/// )?;
/// ```
pub struct KindSpec {
  name: String,
  base: Option<KindRef>,
  factory: TargetFactory,
  search: Option<SearchFn>,
  default_extension: Option<String>,
  synthesize: bool,
  members: Vec<KindRef>,
}

impl KindSpec {
  pub fn new(name: impl Into<String>, factory: TargetFactory) -> Self {
    Self {
      name: name.into(),
      base: None,
      factory,
      search: None,
      default_extension: None,
      synthesize: true,
      members: Vec::new(),
    }
  }

  /// A kind deriving from `base` that behaves exactly like it: same factory,
  /// search, default extension and synthesis. Group membership is not
  /// inherited.
  pub fn derived(name: impl Into<String>, base: &KindRef) -> Self {
    Self {
      name: name.into(),
      base: Some(base.clone()),
      factory: base.factory,
      search: base.search,
      default_extension: base.default_extension.clone(),
      synthesize: base.synthesize,
      members: Vec::new(),
    }
  }

  pub fn base(mut self, base: &KindRef) -> Self {
    self.base = Some(base.clone());
    self
  }

  pub fn search(mut self, search: SearchFn) -> Self {
    self.search = Some(search);
    self
  }

  pub fn default_extension(mut self, ext: impl Into<String>) -> Self {
    self.default_extension = Some(ext.into());
    self
  }

  /// Resolution fails instead of creating a target of this kind.
  pub fn no_synthesis(mut self) -> Self {
    self.synthesize = false;
    self
  }

  /// Make this a group kind with the given members, in order.
  pub fn group(mut self, members: &[KindRef]) -> Self {
    self.members = members.to_vec();
    self
  }

  pub(crate) fn build(self, id: KindId) -> TargetKind {
    TargetKind {
      id,
      name: self.name,
      base: self.base,
      factory: self.factory,
      search: self.search,
      default_extension: self.default_extension,
      synthesize: self.synthesize,
      members: self.members,
    }
  }

  pub(crate) fn name(&self) -> &str {
    &self.name
  }

  pub(crate) fn base_kind(&self) -> Option<&KindRef> {
    self.base.as_ref()
  }

  pub(crate) fn member_kinds(&self) -> &[KindRef] {
    &self.members
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ancestry_walks_the_whole_chain() {
    let (mut registry, builtins) = KindRegistry::with_builtins().unwrap();
    let hxx = registry.derive("hxx", &builtins.file).unwrap();
    let gen_hxx = registry.derive("gen_hxx", &hxx).unwrap();

    let names: Vec<_> = gen_hxx.ancestry().map(|k| k.name().to_string()).collect();
    assert_eq!(names, vec!["gen_hxx", "hxx", "file", "target"]);

    assert!(gen_hxx.is_a(&builtins.file));
    assert!(gen_hxx.is_a(&builtins.target));
    assert!(gen_hxx.is_a(&gen_hxx));
    assert!(!hxx.is_a(&gen_hxx));
    assert!(!gen_hxx.is_a(&builtins.alias));
  }

  #[test]
  fn derived_inherits_behavior() {
    let (mut registry, builtins) = KindRegistry::with_builtins().unwrap();
    let h = registry
      .register(KindSpec::derived("h", &builtins.file).default_extension("h"))
      .unwrap();
    let pdb = registry.derive("pdb", &h).unwrap();

    assert!(pdb.search().is_some());
    assert_eq!(pdb.default_extension(), Some("h"));
    assert!(pdb.synthesize());
    assert!(!pdb.is_group());
  }

  #[test]
  fn display_is_the_name() {
    let (_, builtins) = KindRegistry::with_builtins().unwrap();
    assert_eq!(builtins.fsdir.to_string(), "fsdir");
  }
}
