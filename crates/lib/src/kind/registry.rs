//! Catalog of target kinds.
//!
//! The registry is built once while the engine starts up and then shared
//! read-only. Registration takes `&mut self`, so once the registry is behind a
//! shared reference no more kinds can be added.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{KindId, KindRef, KindSpec, builtin};

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("target type {0} is already registered")]
  DuplicateKind(String),

  #[error("target type {kind} refers to {other} which is not registered in this registry")]
  ForeignKind { kind: String, other: String },

  #[error("target type {group} cannot have group {member} as a member")]
  NestedGroup { group: String, member: String },
}

#[derive(Debug, Default)]
pub struct KindRegistry {
  kinds: Vec<KindRef>,
  by_name: HashMap<String, KindId>,
}

impl KindRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in kinds already registered.
  pub fn with_builtins() -> Result<(Self, builtin::Builtins), RegistryError> {
    let mut registry = Self::new();
    let builtins = builtin::register(&mut registry)?;
    Ok((registry, builtins))
  }

  /// Register a new kind.
  ///
  /// The base and member kinds must come from this registry, and the name
  /// must not be taken.
  pub fn register(&mut self, spec: KindSpec) -> Result<KindRef, RegistryError> {
    if self.by_name.contains_key(spec.name()) {
      return Err(RegistryError::DuplicateKind(spec.name().to_string()));
    }

    for other in spec.base_kind().into_iter().chain(spec.member_kinds()) {
      if !self.owns(other) {
        return Err(RegistryError::ForeignKind {
          kind: spec.name().to_string(),
          other: other.name().to_string(),
        });
      }
    }

    if let Some(member) = spec.member_kinds().iter().find(|m| m.is_group()) {
      return Err(RegistryError::NestedGroup {
        group: spec.name().to_string(),
        member: member.name().to_string(),
      });
    }

    let id = KindId(self.kinds.len() as u32);
    let kind = Arc::new(spec.build(id));

    debug!(
      kind = %kind,
      base = ?kind.base().map(|b| b.name()),
      members = kind.members().len(),
      "registered target type"
    );

    self.by_name.insert(kind.name().to_string(), id);
    self.kinds.push(kind.clone());
    Ok(kind)
  }

  /// Register a kind that behaves exactly like `base`.
  pub fn derive(&mut self, name: &str, base: &KindRef) -> Result<KindRef, RegistryError> {
    self.register(KindSpec::derived(name, base))
  }

  pub fn lookup(&self, name: &str) -> Option<&KindRef> {
    self.by_name.get(name).and_then(|id| self.get(*id))
  }

  pub fn get(&self, id: KindId) -> Option<&KindRef> {
    self.kinds.get(id.0 as usize)
  }

  /// True if `kind` is `base` or derives from it.
  pub fn is_a(&self, kind: &KindRef, base: &KindRef) -> bool {
    kind.is_a(base)
  }

  pub fn len(&self) -> usize {
    self.kinds.len()
  }

  pub fn is_empty(&self) -> bool {
    self.kinds.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &KindRef> {
    self.kinds.iter()
  }

  fn owns(&self, kind: &KindRef) -> bool {
    self.get(kind.id()).is_some_and(|k| Arc::ptr_eq(k, kind))
  }
}
