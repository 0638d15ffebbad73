use crate::kind::builtin::group_factory;
use crate::kind::{Builtins, KindRef, KindRegistry, KindSpec, RegistryError};

/// Object files, module interfaces, libraries and executables.
///
/// `obj{}`, `bmi{}` and `lib{}` are groups. Their members are, in order, the
/// executable, static and shared flavors (`obje`, `obja`, `objs`); `lib{}` has
/// only the static and shared ones. Extensions are left to the rules since
/// they depend on the target platform.
#[derive(Debug, Clone)]
pub struct BinKinds {
  pub obj: KindRef,
  pub obje: KindRef,
  pub obja: KindRef,
  pub objs: KindRef,
  pub bmi: KindRef,
  pub bmie: KindRef,
  pub bmia: KindRef,
  pub bmis: KindRef,
  pub lib: KindRef,
  pub liba: KindRef,
  pub libs: KindRef,
  pub libi: KindRef,
  pub exe: KindRef,
}

pub fn register(registry: &mut KindRegistry, builtins: &Builtins) -> Result<BinKinds, RegistryError> {
  let obje = registry.derive("obje", &builtins.file)?;
  let obja = registry.derive("obja", &builtins.file)?;
  let objs = registry.derive("objs", &builtins.file)?;
  let obj = registry.register(group("obj", builtins, &[obje.clone(), obja.clone(), objs.clone()]))?;

  let bmie = registry.derive("bmie", &builtins.file)?;
  let bmia = registry.derive("bmia", &builtins.file)?;
  let bmis = registry.derive("bmis", &builtins.file)?;
  let bmi = registry.register(group("bmi", builtins, &[bmie.clone(), bmia.clone(), bmis.clone()]))?;

  let liba = registry.derive("liba", &builtins.file)?;
  let libs = registry.derive("libs", &builtins.file)?;
  let lib = registry.register(group("lib", builtins, &[liba.clone(), libs.clone()]))?;

  // Import library for a DLL; not a member of lib{}.
  let libi = registry.derive("libi", &builtins.file)?;
  let exe = registry.derive("exe", &builtins.file)?;

  Ok(BinKinds {
    obj,
    obje,
    obja,
    objs,
    bmi,
    bmie,
    bmia,
    bmis,
    lib,
    liba,
    libs,
    libi,
    exe,
  })
}

fn group(name: &str, builtins: &Builtins, members: &[KindRef]) -> KindSpec {
  KindSpec::new(name, group_factory).base(&builtins.target).group(members)
}
