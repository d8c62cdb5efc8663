//! Source patching.
//!
//! Patches live under `<patch-dir>/<platform>/`, applied in filename order.
//! Patches that only make sense with RTTI enabled live one level deeper in
//! `<patch-dir>/<platform>/rtti/`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::consts::SOURCE_DIR;
use crate::platform::Os;
use crate::tool::{ToolError, Toolchain};

/// Applies the fixed patch set to a checked-out tree.
#[allow(async_fn_in_trait)]
pub trait Patcher {
  async fn apply(&self, host: Os, out_dir: &Path, enable_rtti: bool) -> Result<(), ToolError>;
}

/// `.patch` files directly inside `dir`, sorted by name. A missing directory yields none.
pub fn list_patches(dir: &Path) -> Result<Vec<PathBuf>, ToolError> {
  if !dir.is_dir() {
    return Ok(Vec::new());
  }

  let mut patches = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == "patch") {
      patches.push(path);
    }
  }
  patches.sort();
  Ok(patches)
}

/// The patches to apply for `host`, in application order.
pub fn patch_set(patch_dir: &Path, host: Os, enable_rtti: bool) -> Result<Vec<PathBuf>, ToolError> {
  let platform_dir = patch_dir.join(host.as_str());
  let mut patches = list_patches(&platform_dir)?;
  if enable_rtti {
    patches.extend(list_patches(&platform_dir.join("rtti"))?);
  }
  Ok(patches)
}

/// [`Patcher`] that feeds patch files to `git apply`.
#[derive(Debug, Clone)]
pub struct GitPatcher {
  patch_dir: PathBuf,
  toolchain: Toolchain,
}

impl GitPatcher {
  pub fn new(patch_dir: impl Into<PathBuf>, toolchain: Toolchain) -> Self {
    Self {
      patch_dir: patch_dir.into(),
      toolchain,
    }
  }
}

impl Patcher for GitPatcher {
  async fn apply(&self, host: Os, out_dir: &Path, enable_rtti: bool) -> Result<(), ToolError> {
    let patches = patch_set(&self.patch_dir, host, enable_rtti)?;
    if patches.is_empty() {
      debug!(dir = %self.patch_dir.display(), %host, "no patches to apply");
      return Ok(());
    }

    let src = out_dir.join(SOURCE_DIR);
    info!(count = patches.len(), enable_rtti, "applying patches");
    for patch in &patches {
      // git apply resolves relative patch paths against its own cwd
      let patch = std::path::absolute(patch)?;
      self
        .toolchain
        .tool("git")
        .args(["apply", "--whitespace=nowarn"])
        .arg(&patch)
        .current_dir(&src)
        .run()
        .await?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_file;
  use tempfile::TempDir;

  fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
      .collect()
  }

  #[test]
  fn missing_directory_means_no_patches() {
    let temp = TempDir::new().unwrap();
    assert!(list_patches(&temp.path().join("absent")).unwrap().is_empty());
  }

  #[test]
  fn patches_are_sorted_and_filtered() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "linux/020-rtti.patch", "");
    write_file(temp.path(), "linux/010-h264.patch", "");
    write_file(temp.path(), "linux/README.md", "");

    let patches = list_patches(&temp.path().join("linux")).unwrap();
    assert_eq!(names(&patches), vec!["010-h264.patch", "020-rtti.patch"]);
  }

  #[test]
  fn rtti_patches_follow_platform_patches_when_enabled() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "mac/001-base.patch", "");
    write_file(temp.path(), "mac/rtti/001-enable-rtti.patch", "");
    write_file(temp.path(), "linux/001-other.patch", "");

    let with_rtti = patch_set(temp.path(), Os::Mac, true).unwrap();
    assert_eq!(names(&with_rtti), vec!["001-base.patch", "001-enable-rtti.patch"]);

    let without_rtti = patch_set(temp.path(), Os::Mac, false).unwrap();
    assert_eq!(names(&without_rtti), vec!["001-base.patch"]);
  }

  #[tokio::test]
  async fn apply_without_patches_does_nothing() {
    let temp = TempDir::new().unwrap();
    let patcher = GitPatcher::new(temp.path().join("patches"), Toolchain::new(temp.path()));
    // No source tree exists; succeeding proves nothing was spawned
    patcher.apply(Os::Linux, &temp.path().join("out"), true).await.unwrap();
  }
}
