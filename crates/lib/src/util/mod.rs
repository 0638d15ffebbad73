//! Shared utilities.
//!
//! Checksums for depdb lines and lexical path handling for target keys.

pub mod hash;
pub mod path;
