use std::sync::{Arc, Barrier};
use std::thread;

use buildcore::binary::{BinConfig, BinContext, LibVariants};
use buildcore::prerequisite::Prerequisite;
use buildcore::search::GraphSearch;
use buildcore::target::{TargetGraph, TargetKey};

use super::common::TestBuild;

const THREADS: usize = 16;

#[test]
fn concurrent_resolution_yields_one_target() {
  let build = TestBuild::new();
  let search = GraphSearch::new(&build.graph);
  let hxx = build.registry.lookup("hxx").unwrap();
  let prerequisite = Prerequisite::new(None, hxx, "inc", "", "config", None, &build.scope);
  let barrier = Barrier::new(THREADS);

  let targets: Vec<_> = thread::scope(|s| {
    let handles: Vec<_> = (0..THREADS)
      .map(|_| {
        s.spawn(|| {
          barrier.wait();
          prerequisite.resolve(&search).unwrap()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert_eq!(targets.len(), THREADS);
  for target in &targets {
    assert!(Arc::ptr_eq(target, &targets[0]));
  }
  assert!(Arc::ptr_eq(prerequisite.target().unwrap(), &targets[0]));
  assert_eq!(build.graph.len(), 1);
}

#[test]
fn concurrent_resolution_of_equal_prerequisites() {
  let build = TestBuild::new();
  build.write_src("inc/config.hxx", "#pragma once\n");
  let search = GraphSearch::new(&build.graph);

  // Each thread holds its own prerequisite; they must still agree.
  let prerequisites: Vec<_> = (0..THREADS)
    .map(|_| Prerequisite::new(None, &build.cxx.hxx, "inc", "", "config", None, &build.scope))
    .collect();
  let barrier = Barrier::new(THREADS);

  let targets: Vec<_> = thread::scope(|s| {
    let handles: Vec<_> = prerequisites
      .iter()
      .map(|p| {
        let barrier = &barrier;
        let search = &search;
        s.spawn(move || {
          barrier.wait();
          p.resolve(search).unwrap()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  for target in &targets {
    assert!(Arc::ptr_eq(target, &targets[0]));
  }
  assert_eq!(targets[0].dir(), build.src.path().join("inc"));
  assert_eq!(build.graph.len(), 1);
}

#[test]
fn concurrent_group_realization() {
  let build = TestBuild::new();
  let config = BinConfig {
    lib: LibVariants::Both,
    ..Default::default()
  };
  let ctx = BinContext::new(&build.graph, &build.bin, &config);
  let (lib, _) = build.graph.find_or_create(TargetKey::new(&build.bin.lib, build.out.path(), "hello"));
  let barrier = Barrier::new(THREADS);

  let members: Vec<_> = thread::scope(|s| {
    let handles: Vec<_> = (0..THREADS)
      .map(|_| {
        s.spawn(|| {
          barrier.wait();
          ctx.lib_members(&lib).unwrap()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  let first = &members[0];
  for m in &members {
    assert!(Arc::ptr_eq(m.liba().unwrap(), first.liba().unwrap()));
    assert!(Arc::ptr_eq(m.libs().unwrap(), first.libs().unwrap()));
  }
  assert_eq!(build.graph.len(), 3);
}

#[test]
fn library_prerequisite_links_preferred_member() {
  let build = TestBuild::new();
  let search = GraphSearch::new(&build.graph);
  let config = BinConfig::default();
  let ctx = BinContext::new(&build.graph, &build.bin, &config);

  let exe = Prerequisite::new(None, &build.bin.exe, "", "", "hello", None, &build.scope)
    .resolve(&search)
    .unwrap();
  let lib = Prerequisite::new(Some("libhello".into()), &build.bin.lib, "", "", "hello", None, &build.scope)
    .resolve(&search)
    .unwrap();

  let member = ctx.link_member(&lib, &exe).unwrap();
  assert!(member.is_a(&build.bin.libs));
  assert!(Arc::ptr_eq(&member.group().unwrap(), &lib));
}

#[test]
fn separate_graphs_do_not_share_targets() {
  let build = TestBuild::new();
  let other = TargetGraph::new();
  let prerequisite = Prerequisite::new(None, &build.builtins.alias, "", "", "all", None, &build.scope);

  let a = prerequisite.resolve(&GraphSearch::new(&build.graph)).unwrap();
  // Resolution is cached on the prerequisite, not looked up again.
  let b = prerequisite.resolve(&GraphSearch::new(&other)).unwrap();

  assert!(Arc::ptr_eq(&a, &b));
  assert!(other.is_empty());
}
