//! Member selection for binary groups.

use std::sync::Arc;

use tracing::trace;

use super::config::{BinConfig, LibVariant};
use super::target::BinKinds;
use crate::kind::TargetKind;
use crate::target::{GroupContext, GroupView, Target, TargetGraph};

/// Realized members of a `lib{}` group.
#[derive(Debug, Clone, Default)]
pub struct LibMembers {
  a: Option<Arc<Target>>,
  s: Option<Arc<Target>>,
}

impl LibMembers {
  pub fn new(a: Option<Arc<Target>>, s: Option<Arc<Target>>) -> Self {
    Self { a, s }
  }

  pub fn from_view(view: &GroupView, kinds: &BinKinds) -> Self {
    Self {
      a: view.find(&kinds.liba).cloned(),
      s: view.find(&kinds.libs).cloned(),
    }
  }

  /// The static library, if it is being built.
  pub fn liba(&self) -> Option<&Arc<Target>> {
    self.a.as_ref()
  }

  /// The shared library, if it is being built.
  pub fn libs(&self) -> Option<&Arc<Target>> {
    self.s.as_ref()
  }

  pub fn get(&self, variant: LibVariant) -> Option<&Arc<Target>> {
    match variant {
      LibVariant::Static => self.liba(),
      LibVariant::Shared => self.libs(),
    }
  }

  /// The first member present in `order`.
  pub fn pick(&self, order: &[LibVariant]) -> Option<(LibVariant, &Arc<Target>)> {
    order.iter().find_map(|&v| self.get(v).map(|t| (v, t)))
  }
}

/// Group context for binary targets: realizes only the `lib{}` members the
/// configuration asks for. Other groups get all their members.
pub struct BinContext<'a> {
  graph: &'a TargetGraph,
  kinds: &'a BinKinds,
  config: &'a BinConfig,
}

impl<'a> BinContext<'a> {
  pub fn new(graph: &'a TargetGraph, kinds: &'a BinKinds, config: &'a BinConfig) -> Self {
    Self { graph, kinds, config }
  }

  /// Members of a `lib{}` target. `None` if `lib` is not one.
  pub fn lib_members(&self, lib: &Arc<Target>) -> Option<LibMembers> {
    if !lib.is_a(&self.kinds.lib) {
      return None;
    }
    lib.members(self).map(|view| LibMembers::from_view(&view, self.kinds))
  }

  /// Preference order for linking a `lib{}` into a target of kind `kind`.
  pub fn link_order(&self, kind: &TargetKind) -> &'a [LibVariant] {
    if kind.is_a(&self.kinds.liba) {
      &self.config.liba_lib
    } else if kind.is_a(&self.kinds.libs) {
      &self.config.libs_lib
    } else {
      &self.config.exe_lib
    }
  }

  /// The member of `lib` that `target` should link against.
  pub fn link_member(&self, lib: &Arc<Target>, target: &Target) -> Option<Arc<Target>> {
    let members = self.lib_members(lib)?;
    let (variant, member) = members.pick(self.link_order(target.kind()))?;
    trace!(lib = %lib, linking = %target, variant = %variant, "picked library member");
    Some(member.clone())
  }
}

impl GroupContext for BinContext<'_> {
  fn graph(&self) -> &TargetGraph {
    self.graph
  }

  fn wants(&self, group: &Target, member: &TargetKind) -> bool {
    if !group.is_a(&self.kinds.lib) {
      return true;
    }
    if member.is_a(&self.kinds.liba) {
      self.config.lib.builds(LibVariant::Static)
    } else if member.is_a(&self.kinds.libs) {
      self.config.lib.builds(LibVariant::Shared)
    } else {
      true
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::binary::config::LibVariants;
  use crate::binary::target;
  use crate::kind::KindRegistry;
  use crate::target::TargetKey;

  fn kinds() -> (KindRegistry, BinKinds) {
    let (mut registry, builtins) = KindRegistry::with_builtins().unwrap();
    let bin = target::register(&mut registry, &builtins).unwrap();
    (registry, bin)
  }

  #[test]
  fn both_variants_by_default() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let config = BinConfig::default();
    let ctx = BinContext::new(&graph, &bin, &config);

    let (lib, _) = graph.find_or_create(TargetKey::new(&bin.lib, "/out", "hello"));
    let members = ctx.lib_members(&lib).unwrap();

    let a = members.liba().unwrap();
    let s = members.libs().unwrap();
    assert!(a.is_a(&bin.liba));
    assert!(s.is_a(&bin.libs));
    assert_eq!(a.name(), "hello");
    assert!(Arc::ptr_eq(&a.group().unwrap(), &lib));
  }

  #[test]
  fn static_only_leaves_shared_unrealized() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let config = BinConfig {
      lib: LibVariants::Static,
      ..Default::default()
    };
    let ctx = BinContext::new(&graph, &bin, &config);

    let (lib, _) = graph.find_or_create(TargetKey::new(&bin.lib, "/out", "hello"));
    let members = ctx.lib_members(&lib).unwrap();

    assert!(members.liba().is_some());
    assert!(members.libs().is_none());
    assert_eq!(graph.len(), 2);
  }

  #[test]
  fn link_member_follows_preference() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let config = BinConfig::default();
    let ctx = BinContext::new(&graph, &bin, &config);

    let (lib, _) = graph.find_or_create(TargetKey::new(&bin.lib, "/out", "hello"));
    let (exe, _) = graph.find_or_create(TargetKey::new(&bin.exe, "/out", "app"));
    let (liba, _) = graph.find_or_create(TargetKey::new(&bin.liba, "/out", "other"));

    let for_exe = ctx.link_member(&lib, &exe).unwrap();
    assert!(for_exe.is_a(&bin.libs));

    let for_liba = ctx.link_member(&lib, &liba).unwrap();
    assert!(for_liba.is_a(&bin.liba));
  }

  #[test]
  fn link_member_falls_back_to_available_variant() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let config = BinConfig {
      lib: LibVariants::Static,
      ..Default::default()
    };
    let ctx = BinContext::new(&graph, &bin, &config);

    let (lib, _) = graph.find_or_create(TargetKey::new(&bin.lib, "/out", "hello"));
    let (exe, _) = graph.find_or_create(TargetKey::new(&bin.exe, "/out", "app"));
    let (libs, _) = graph.find_or_create(TargetKey::new(&bin.libs, "/out", "other"));

    assert!(ctx.link_member(&lib, &exe).unwrap().is_a(&bin.liba));
    // A shared library only links shared libraries by default.
    assert!(ctx.link_member(&lib, &libs).is_none());
  }

  #[test]
  fn other_groups_realize_everything() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let config = BinConfig {
      lib: LibVariants::Shared,
      ..Default::default()
    };
    let ctx = BinContext::new(&graph, &bin, &config);

    let (obj, _) = graph.find_or_create(TargetKey::new(&bin.obj, "/out", "main"));
    let view = obj.members(&ctx).unwrap();
    assert_eq!(view.iter().count(), 3);
    assert!(ctx.lib_members(&obj).is_none());
  }

  #[test]
  fn pick_respects_order() {
    let (_registry, bin) = kinds();
    let graph = TargetGraph::new();
    let (a, _) = graph.find_or_create(TargetKey::new(&bin.liba, "/out", "x"));
    let (s, _) = graph.find_or_create(TargetKey::new(&bin.libs, "/out", "x"));
    let members = LibMembers::new(Some(a.clone()), Some(s.clone()));

    let (v, t) = members.pick(&[LibVariant::Static, LibVariant::Shared]).unwrap();
    assert_eq!(v, LibVariant::Static);
    assert!(Arc::ptr_eq(t, &a));

    let (v, t) = members.pick(&[LibVariant::Shared]).unwrap();
    assert_eq!(v, LibVariant::Shared);
    assert!(Arc::ptr_eq(t, &s));

    assert!(LibMembers::default().pick(&[LibVariant::Shared, LibVariant::Static]).is_none());
  }
}
