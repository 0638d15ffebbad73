//! Ad hoc groups: a target standing for a fixed set of member targets, such
//! as `lib{foo}` standing for `liba{foo}` and `libs{foo}`.
//!
//! Members are realized lazily, at most once per group. A member slot may stay
//! empty if the context says that member is not wanted (for example a static
//! library when only shared libraries are built).

use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use super::{Target, TargetData, TargetGraph, TargetKey};
use crate::kind::{KindRef, TargetKind};

/// Decides which members of a group get realized.
pub trait GroupContext {
  fn graph(&self) -> &TargetGraph;

  fn wants(&self, _group: &Target, _member: &TargetKind) -> bool {
    true
  }
}

/// Context that realizes every member.
pub struct AllMembers<'a>(pub &'a TargetGraph);

impl GroupContext for AllMembers<'_> {
  fn graph(&self) -> &TargetGraph {
    self.0
  }
}

#[derive(Debug)]
pub struct Group {
  slots: Box<[OnceLock<Weak<Target>>]>,
  realized: OnceLock<()>,
}

impl Group {
  pub fn new(arity: usize) -> Self {
    Self {
      slots: (0..arity).map(|_| OnceLock::new()).collect(),
      realized: OnceLock::new(),
    }
  }

  pub fn arity(&self) -> usize {
    self.slots.len()
  }

  pub fn is_realized(&self) -> bool {
    self.realized.get().is_some()
  }
}

/// Realized members of a group, one slot per member kind.
#[derive(Debug)]
pub struct GroupView {
  members: Vec<Option<Arc<Target>>>,
}

impl GroupView {
  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  /// Member at `index`, or `None` if that member was not realized.
  pub fn get(&self, index: usize) -> Option<&Arc<Target>> {
    self.members.get(index).and_then(Option::as_ref)
  }

  /// The realized member of kind `kind`, if any.
  pub fn find(&self, kind: &TargetKind) -> Option<&Arc<Target>> {
    self.iter().find(|m| m.kind().id() == kind.id())
  }

  /// Realized members, in member order.
  pub fn iter(&self) -> impl Iterator<Item = &Arc<Target>> {
    self.members.iter().flatten()
  }
}

impl Target {
  /// Members of this group, realizing them on first call.
  ///
  /// Returns `None` if this is not a group. Every member shares the group's
  /// directory, out directory and name, and is linked back to the group.
  pub fn members(self: &Arc<Self>, ctx: &dyn GroupContext) -> Option<GroupView> {
    let TargetData::Group(group) = self.data() else {
      return None;
    };

    group.realized.get_or_init(|| self.realize(group, ctx));

    let members = group.slots.iter().map(|s| s.get().and_then(Weak::upgrade)).collect();
    Some(GroupView { members })
  }

  fn realize(self: &Arc<Self>, group: &Group, ctx: &dyn GroupContext) {
    let kinds: &[KindRef] = self.kind().members();

    for (slot, kind) in group.slots.iter().zip(kinds) {
      if !ctx.wants(self, kind) {
        debug!(group = %self, member = %kind, "skipping group member");
        continue;
      }

      let key = TargetKey {
        kind: kind.clone(),
        dir: self.dir().to_path_buf(),
        out: self.out().to_path_buf(),
        name: self.name().to_string(),
        ext: None,
      };
      let (member, _) = ctx.graph().find_or_create(key);

      if !member.set_group(self) && !member.group().is_some_and(|g| Arc::ptr_eq(&g, self)) {
        debug!(member = %member, group = %self, "member already belongs to another group");
      }

      let _ = slot.set(Arc::downgrade(&member));
    }
  }
}
