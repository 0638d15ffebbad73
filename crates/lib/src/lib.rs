//! buildcore: target graph and dependency database of a build engine
//!
//! This crate provides the in-memory model of a build and its persisted state:
//! - `kind`: target kinds and the registry they are declared in
//! - `target`: targets, the graph that owns them, and ad hoc groups
//! - `prerequisite` / `search`: references between targets and their resolution
//! - `depdb`: the per-target database of inputs used to detect staleness

pub mod binary;
pub mod consts;
pub mod cxx;
pub mod depdb;
pub mod kind;
pub mod prerequisite;
pub mod scope;
pub mod search;
pub mod target;
pub mod util;
