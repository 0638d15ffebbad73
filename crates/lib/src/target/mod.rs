//! Targets: the buildable entities of a build.
//!
//! A target is identified by its kind, directory, out directory, name and
//! optional extension. Targets are owned by the [`TargetGraph`] and handed out
//! as `Arc<Target>`; they live until the graph is dropped at the end of a run.

pub mod graph;
pub mod group;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};

use thiserror::Error;

use crate::kind::{KindRef, TargetKind};
use crate::prerequisite::{Origin, Prerequisite};

pub use graph::TargetGraph;
pub use group::{AllMembers, Group, GroupContext, GroupView};

#[derive(Debug, Error)]
pub enum TargetError {
  #[error("prerequisites of {0} are already set")]
  PrerequisitesAlreadySet(String),
}

/// Stable handle of a target, assigned by the graph on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u64);

impl fmt::Display for TargetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Identity of a target.
///
/// Compared structurally, with the kind compared by id. Directories are
/// compared as given: callers are expected to have normalized them.
#[derive(Debug, Clone)]
pub struct TargetKey {
  pub kind: KindRef,
  /// Directory the target lives in: the src directory for existing source
  /// files, the out directory otherwise.
  pub dir: PathBuf,
  /// Out directory the target belongs to. Equal to `dir` for out-tree targets.
  pub out: PathBuf,
  pub name: String,
  pub ext: Option<String>,
}

impl TargetKey {
  /// Key for a target in the out tree (`out == dir`).
  pub fn new(kind: &KindRef, dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
    let dir = dir.into();
    Self {
      kind: kind.clone(),
      out: dir.clone(),
      dir,
      name: name.into(),
      ext: None,
    }
  }

  pub fn with_out(mut self, out: impl Into<PathBuf>) -> Self {
    self.out = out.into();
    self
  }

  pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
    self.ext = Some(ext.into());
    self
  }
}

impl PartialEq for TargetKey {
  fn eq(&self, other: &Self) -> bool {
    self.kind.id() == other.kind.id()
      && self.name == other.name
      && self.dir == other.dir
      && self.out == other.out
      && self.ext == other.ext
  }
}

impl Eq for TargetKey {}

impl Hash for TargetKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.kind.id().hash(state);
    self.dir.hash(state);
    self.out.hash(state);
    self.name.hash(state);
    self.ext.hash(state);
  }
}

impl fmt::Display for TargetKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_key(f, &self.kind, &self.dir, &self.out, &self.name, self.ext.as_deref())
  }
}

/// Write a key in `dir/kind{name.ext}[@out]` notation.
pub(crate) fn write_key(
  f: &mut fmt::Formatter<'_>,
  kind: &TargetKind,
  dir: &Path,
  out: &Path,
  name: &str,
  ext: Option<&str>,
) -> fmt::Result {
  if !dir.as_os_str().is_empty() {
    let dir = dir.display().to_string();
    f.write_str(&dir)?;
    if !dir.ends_with(std::path::MAIN_SEPARATOR) {
      write!(f, "{}", std::path::MAIN_SEPARATOR)?;
    }
  }

  write!(f, "{}{{{}", kind.name(), name)?;
  if let Some(ext) = ext {
    write!(f, ".{}", ext)?;
  }
  f.write_str("}")?;

  if !out.as_os_str().is_empty() && out != dir {
    write!(f, "@{}", out.display())?;
  }
  Ok(())
}

/// `name` with `ext` appended, unless `ext` is absent or empty.
pub(crate) fn file_name(name: &str, ext: Option<&str>) -> String {
  match ext {
    Some(ext) if !ext.is_empty() => format!("{}.{}", name, ext),
    _ => name.to_string(),
  }
}

/// Kind-specific state of a target.
#[derive(Debug)]
pub enum TargetData {
  Plain,
  File(FileState),
  Group(Group),
}

#[derive(Debug, Default)]
pub struct FileState {
  path: OnceLock<PathBuf>,
}

pub struct Target {
  id: TargetId,
  key: TargetKey,
  data: TargetData,
  group: OnceLock<Weak<Target>>,
  prerequisites: OnceLock<Box<[Prerequisite]>>,
}

impl Target {
  pub fn new(id: TargetId, key: TargetKey, data: TargetData) -> Self {
    Self {
      id,
      key,
      data,
      group: OnceLock::new(),
      prerequisites: OnceLock::new(),
    }
  }

  pub fn id(&self) -> TargetId {
    self.id
  }

  pub fn key(&self) -> &TargetKey {
    &self.key
  }

  pub fn kind(&self) -> &KindRef {
    &self.key.kind
  }

  pub fn dir(&self) -> &Path {
    &self.key.dir
  }

  pub fn out(&self) -> &Path {
    &self.key.out
  }

  pub fn name(&self) -> &str {
    &self.key.name
  }

  pub fn ext(&self) -> Option<&str> {
    self.key.ext.as_deref()
  }

  pub fn data(&self) -> &TargetData {
    &self.data
  }

  pub fn is_a(&self, kind: &TargetKind) -> bool {
    self.key.kind.is_a(kind)
  }

  /// Filesystem path of a path target: `dir/name.ext`, using the kind's
  /// default extension if the key has none. `None` for other targets.
  pub fn path(&self) -> Option<&Path> {
    let TargetData::File(state) = &self.data else {
      return None;
    };
    let path = state.path.get_or_init(|| {
      let ext = self.ext().or(self.kind().default_extension());
      self.dir().join(file_name(self.name(), ext))
    });
    Some(path)
  }

  /// The group this target is a member of, if any.
  pub fn group(&self) -> Option<Arc<Target>> {
    self.group.get().and_then(Weak::upgrade)
  }

  /// Link this target to its group. Returns false if it already has one.
  pub(crate) fn set_group(&self, group: &Arc<Target>) -> bool {
    self.group.set(Arc::downgrade(group)).is_ok()
  }

  /// This target's own prerequisites; empty until set.
  pub fn prerequisites(&self) -> &[Prerequisite] {
    self.prerequisites.get().map(|p| &p[..]).unwrap_or(&[])
  }

  /// Set the prerequisite list. Can only be done once.
  ///
  /// Each prerequisite is stamped with its position in this target's list so
  /// that [`Prerequisite::belongs`] can later tell it apart from an equal
  /// prerequisite that came from elsewhere.
  pub fn set_prerequisites(&self, mut prerequisites: Vec<Prerequisite>) -> Result<(), TargetError> {
    for (index, prerequisite) in prerequisites.iter_mut().enumerate() {
      prerequisite.set_origin(Origin {
        owner: self.id,
        index,
      });
    }

    self
      .prerequisites
      .set(prerequisites.into_boxed_slice())
      .map_err(|_| TargetError::PrerequisitesAlreadySet(self.key.to_string()))
  }

  /// The group's prerequisites followed by this target's own.
  pub fn group_prerequisites(&self) -> GroupPrerequisites<'_> {
    GroupPrerequisites {
      group: self.group(),
      target: self,
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.key, f)
  }
}

impl fmt::Debug for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Target")
      .field("id", &self.id)
      .field("key", &format_args!("{}", self.key))
      .finish_non_exhaustive()
  }
}

/// Prerequisites of a target including those inherited from its group.
pub struct GroupPrerequisites<'a> {
  group: Option<Arc<Target>>,
  target: &'a Target,
}

impl GroupPrerequisites<'_> {
  pub fn iter(&self) -> impl Iterator<Item = &Prerequisite> {
    self
      .group
      .iter()
      .flat_map(|group| group.prerequisites().iter())
      .chain(self.target.prerequisites().iter())
  }

  pub fn len(&self) -> usize {
    self.group.as_ref().map_or(0, |g| g.prerequisites().len()) + self.target.prerequisites().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
