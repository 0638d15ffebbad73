//! Prerequisites: unresolved references from one target to another.
//!
//! A prerequisite names its target by kind, directory, name and extension,
//! relative to the scope it was written in. Resolution turns it into a target
//! of the graph and caches the result; the cache is set at most once and
//! concurrent resolutions agree on the first one installed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::trace;

use crate::kind::{KindRef, TargetKind};
use crate::scope::Scope;
use crate::search::{ResolveError, Search};
use crate::target::{Target, TargetId, write_key};

/// Position of a prerequisite in the list of the target that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Origin {
  pub owner: TargetId,
  pub index: usize,
}

pub struct Prerequisite {
  project: Option<String>,
  kind: KindRef,
  dir: PathBuf,
  out: PathBuf,
  name: String,
  ext: Option<String>,
  scope: Arc<Scope>,
  target: OnceLock<Arc<Target>>,
  origin: Option<Origin>,
}

impl Prerequisite {
  /// An unresolved prerequisite. An empty `out` means the out directory is
  /// derived from `dir` during resolution.
  pub fn new(
    project: Option<String>,
    kind: &KindRef,
    dir: impl Into<PathBuf>,
    out: impl Into<PathBuf>,
    name: impl Into<String>,
    ext: Option<String>,
    scope: &Arc<Scope>,
  ) -> Self {
    Self {
      project,
      kind: kind.clone(),
      dir: dir.into(),
      out: out.into(),
      name: name.into(),
      ext,
      scope: scope.clone(),
      target: OnceLock::new(),
      origin: None,
    }
  }

  /// A prerequisite for a target that is already known. Already resolved.
  pub fn from_target(target: &Arc<Target>, scope: &Arc<Scope>) -> Self {
    let key = target.key();
    let prerequisite = Self {
      project: None,
      kind: key.kind.clone(),
      dir: key.dir.clone(),
      out: key.out.clone(),
      name: key.name.clone(),
      ext: key.ext.clone(),
      scope: scope.clone(),
      target: OnceLock::new(),
      origin: None,
    };
    let _ = prerequisite.target.set(target.clone());
    prerequisite
  }

  pub fn project(&self) -> Option<&str> {
    self.project.as_deref()
  }

  pub fn kind(&self) -> &KindRef {
    &self.kind
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn out(&self) -> &Path {
    &self.out
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn ext(&self) -> Option<&str> {
    self.ext.as_deref()
  }

  pub fn scope(&self) -> &Arc<Scope> {
    &self.scope
  }

  pub fn key(&self) -> PrerequisiteKey<'_> {
    PrerequisiteKey {
      project: self.project.as_deref(),
      kind: &self.kind,
      dir: &self.dir,
      out: &self.out,
      name: &self.name,
      ext: self.ext.as_deref(),
      scope: &self.scope,
    }
  }

  /// The resolved target, if resolution already happened.
  pub fn target(&self) -> Option<&Arc<Target>> {
    self.target.get()
  }

  pub fn origin(&self) -> Option<Origin> {
    self.origin
  }

  pub(crate) fn set_origin(&mut self, origin: Origin) {
    self.origin = Some(origin);
  }

  /// True if this prerequisite sits in `target`'s own prerequisite list.
  ///
  /// This is an identity check: a prerequisite with an equal key that was
  /// built separately, or cloned out of the list, does not belong.
  pub fn belongs(&self, target: &Target) -> bool {
    self.origin.is_some_and(|origin| {
      origin.owner == target.id() && target.prerequisites().get(origin.index).is_some_and(|p| std::ptr::eq(p, self))
    })
  }

  pub fn is_a(&self, kind: &TargetKind) -> bool {
    self.kind.is_a(kind)
  }

  /// Resolve to a target, searching on first use.
  ///
  /// Uses the kind's own search if it has one and the plain existing-target
  /// search otherwise. If nothing is found a new target is created, unless the
  /// kind forbids that. When several threads resolve at once, all of them get
  /// whichever target was installed first.
  pub fn resolve(&self, search: &dyn Search) -> Result<Arc<Target>, ResolveError> {
    if let Some(target) = self.target.get() {
      trace!(prerequisite = %self, "prerequisite already resolved");
      return Ok(target.clone());
    }

    let key = self.key();
    let found = match self.kind.search() {
      Some(search_fn) => search_fn(search, &key)?,
      None => search.search_existing_target(&key)?,
    };

    let target = match found {
      Some(target) => target,
      None if self.kind.synthesize() => search.create_new_target(&key)?,
      None => {
        return Err(ResolveError::NotFound {
          key: key.to_string(),
          kind: self.kind.name().to_string(),
        });
      }
    };

    let installed = self.target.get_or_init(|| target.clone());
    if !Arc::ptr_eq(installed, &target) {
      trace!(prerequisite = %self, "lost resolution race, using installed target");
    }
    Ok(installed.clone())
  }
}

/// Copies are freestanding: they keep the resolved target but not the origin.
impl Clone for Prerequisite {
  fn clone(&self) -> Self {
    let target = OnceLock::new();
    if let Some(t) = self.target.get() {
      let _ = target.set(t.clone());
    }

    Self {
      project: self.project.clone(),
      kind: self.kind.clone(),
      dir: self.dir.clone(),
      out: self.out.clone(),
      name: self.name.clone(),
      ext: self.ext.clone(),
      scope: self.scope.clone(),
      target,
      origin: None,
    }
  }
}

impl fmt::Display for Prerequisite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.key(), f)
  }
}

impl fmt::Debug for Prerequisite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Prerequisite")
      .field("key", &format_args!("{}", self))
      .field("resolved", &self.target.get().is_some())
      .field("origin", &self.origin)
      .finish()
  }
}

/// Borrowed view of a prerequisite's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrerequisiteKey<'a> {
  pub project: Option<&'a str>,
  pub kind: &'a KindRef,
  pub dir: &'a Path,
  pub out: &'a Path,
  pub name: &'a str,
  pub ext: Option<&'a str>,
  pub scope: &'a Scope,
}

impl PrerequisiteKey<'_> {
  pub fn is_a(&self, kind: &TargetKind) -> bool {
    self.kind.is_a(kind)
  }
}

impl fmt::Display for PrerequisiteKey<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(project) = self.project {
      write!(f, "{}%", project)?;
    }
    write_key(f, self.kind, self.dir, self.out, self.name, self.ext)
  }
}
