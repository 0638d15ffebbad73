//! C and C++ source kinds.
//!
//! All of them are path targets found through the file search; they only
//! differ in name and the extension assumed when none is spelled out.

use crate::kind::{Builtins, KindRef, KindRegistry, KindSpec, RegistryError};

#[derive(Debug, Clone)]
pub struct CxxKinds {
  pub h: KindRef,
  pub c: KindRef,
  pub hxx: KindRef,
  pub ixx: KindRef,
  pub txx: KindRef,
  pub cxx: KindRef,
}

pub fn register(registry: &mut KindRegistry, builtins: &Builtins) -> Result<CxxKinds, RegistryError> {
  let mut source = |name: &str, ext: &str| {
    registry.register(KindSpec::derived(name, &builtins.file).default_extension(ext))
  };

  Ok(CxxKinds {
    h: source("h", "h")?,
    c: source("c", "c")?,
    hxx: source("hxx", "hxx")?,
    ixx: source("ixx", "ixx")?,
    txx: source("txx", "txx")?,
    cxx: source("cxx", "cxx")?,
  })
}

impl CxxKinds {
  /// The header kinds, for rules that scan or install headers.
  pub fn headers(&self) -> [&KindRef; 4] {
    [&self.h, &self.hxx, &self.ixx, &self.txx]
  }
}
