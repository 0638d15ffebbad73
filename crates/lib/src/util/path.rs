//! Lexical path normalization.
//!
//! Target keys compare directories structurally, so every directory that ends
//! up in a key must be spelled the same way. Normalization here is purely
//! lexical: it never touches the filesystem and never resolves symlinks.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by removing `.` components and folding `..` into the
/// preceding normal component.
///
/// Leading `..` components of a relative path are kept. `..` directly under
/// the root is dropped (`/..` is `/`).
pub fn normalize(path: &Path) -> PathBuf {
  let mut out: Vec<Component<'_>> = Vec::new();

  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match out.last() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
        _ => out.push(component),
      },
      _ => out.push(component),
    }
  }

  out.iter().map(|c| c.as_os_str()).collect()
}

/// Resolve `path` against `base` (if relative) and normalize the result.
pub fn complete(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    normalize(path)
  } else {
    normalize(&base.join(path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_removes_current_dir() {
    assert_eq!(normalize(Path::new("./foo/./bar")), PathBuf::from("foo/bar"));
  }

  #[test]
  fn normalize_folds_parent_dir() {
    assert_eq!(normalize(Path::new("foo/baz/../bar")), PathBuf::from("foo/bar"));
    assert_eq!(normalize(Path::new("foo/..")), PathBuf::new());
  }

  #[test]
  fn normalize_keeps_leading_parent_dir() {
    assert_eq!(normalize(Path::new("../../foo")), PathBuf::from("../../foo"));
  }

  #[cfg(unix)]
  #[test]
  fn normalize_drops_parent_of_root() {
    assert_eq!(normalize(Path::new("/../foo")), PathBuf::from("/foo"));
  }

  #[cfg(unix)]
  #[test]
  fn complete_joins_relative() {
    assert_eq!(
      complete(Path::new("/out/proj"), Path::new("libfoo/../libbar")),
      PathBuf::from("/out/proj/libbar")
    );
    assert_eq!(complete(Path::new("/out"), Path::new("/abs/./x")), PathBuf::from("/abs/x"));
  }
}
