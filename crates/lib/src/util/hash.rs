//! Checksums for dependency database lines.
//!
//! Rules rarely store raw option lists in a depdb. Instead they fold everything
//! that affects the output (compiler path, options, environment) into one
//! checksum and store that as a single line, so a change anywhere shows up as
//! a mismatch on that line.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 hash
//! - `Checksum`: An incremental hasher over a sequence of strings

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash.
///
/// # Format
///
/// The hash is a lowercase hexadecimal string (64 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Incremental SHA-256 over a sequence of values.
///
/// Every appended value is followed by a `\0` separator so that `["ab", "c"]`
/// and `["a", "bc"]` hash differently.
///
/// ```ignore
/// let mut cs = Checksum::new();
/// cs.append("g++").append_all(&options);
/// db.expect(cs.finish().as_str())?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Checksum {
  hasher: Sha256,
}

impl Checksum {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append one value.
  pub fn append(&mut self, value: impl AsRef<[u8]>) -> &mut Self {
    self.hasher.update(value.as_ref());
    self.hasher.update([0u8]);
    self
  }

  /// Append every value of an iterator, in order.
  pub fn append_all<I>(&mut self, values: I) -> &mut Self
  where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
  {
    for value in values {
      self.append(value);
    }
    self
  }

  pub fn finish(self) -> ContentHash {
    ContentHash(format!("{:x}", self.hasher.finalize()))
  }
}

impl ContentHash {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}
