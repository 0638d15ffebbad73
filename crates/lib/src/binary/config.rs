//! Which library variants get built, and which one is linked.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("unknown library variant '{0}', expected 'static', 'shared' or 'both'")]
  UnknownVariant(String),

  #[error("{0} must list at least one library variant")]
  EmptyLinkOrder(&'static str),
}

/// Library variants a build produces for `lib{}` targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibVariants {
  Static,
  Shared,
  #[default]
  Both,
}

impl LibVariants {
  pub const fn as_str(&self) -> &'static str {
    match self {
      LibVariants::Static => "static",
      LibVariants::Shared => "shared",
      LibVariants::Both => "both",
    }
  }

  pub fn builds_static(&self) -> bool {
    matches!(self, LibVariants::Static | LibVariants::Both)
  }

  pub fn builds_shared(&self) -> bool {
    matches!(self, LibVariants::Shared | LibVariants::Both)
  }

  pub fn builds(&self, variant: LibVariant) -> bool {
    match variant {
      LibVariant::Static => self.builds_static(),
      LibVariant::Shared => self.builds_shared(),
    }
  }
}

impl fmt::Display for LibVariants {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LibVariants {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "static" => Ok(LibVariants::Static),
      "shared" => Ok(LibVariants::Shared),
      "both" => Ok(LibVariants::Both),
      _ => Err(ConfigError::UnknownVariant(s.to_string())),
    }
  }
}

/// A single library variant: `liba{}` or `libs{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibVariant {
  Static,
  Shared,
}

impl LibVariant {
  pub const fn as_str(&self) -> &'static str {
    match self {
      LibVariant::Static => "static",
      LibVariant::Shared => "shared",
    }
  }
}

impl fmt::Display for LibVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LibVariant {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "static" => Ok(LibVariant::Static),
      "shared" => Ok(LibVariant::Shared),
      _ => Err(ConfigError::UnknownVariant(s.to_string())),
    }
  }
}

/// Binary configuration.
///
/// `lib` decides which members of a `lib{}` group are realized. The `*_lib`
/// lists are the order in which members are preferred when an executable, a
/// static library or a shared library links against a `lib{}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
  pub lib: LibVariants,
  pub exe_lib: Vec<LibVariant>,
  pub liba_lib: Vec<LibVariant>,
  pub libs_lib: Vec<LibVariant>,
}

impl Default for BinConfig {
  fn default() -> Self {
    Self {
      lib: LibVariants::Both,
      exe_lib: vec![LibVariant::Shared, LibVariant::Static],
      liba_lib: vec![LibVariant::Static],
      libs_lib: vec![LibVariant::Shared],
    }
  }
}

impl BinConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, order) in [("exe_lib", &self.exe_lib), ("liba_lib", &self.liba_lib), ("libs_lib", &self.libs_lib)] {
      if order.is_empty() {
        return Err(ConfigError::EmptyLinkOrder(name));
      }
    }
    Ok(())
  }
}
