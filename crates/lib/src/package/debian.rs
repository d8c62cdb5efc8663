//! Debian package generation.
//!
//! The staged layout is copied into a `dpkg-deb` build root:
//!
//! ```text
//! <out>/<name>_<version>_<arch>/
//!   DEBIAN/control
//!   usr/local/include/<name>/...
//!   usr/local/lib/<name>/<config>/...
//! ```
//!
//! and packed into `<out>/<name>_<version>_<arch>.deb`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use super::{PackageError, PackageLayout};
use crate::tool::Toolchain;

pub const MAINTAINER: &str = "rtcbuild <rtcbuild@localhost>";

/// Fields of `DEBIAN/control`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
  pub package: String,
  pub version: String,
  pub architecture: String,
}

impl Control {
  /// Base name shared by the build root and the `.deb`.
  pub fn basename(&self) -> String {
    format!("{}_{}_{}", self.package, self.version, self.architecture)
  }
}

impl fmt::Display for Control {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Package: {}", self.package)?;
    writeln!(f, "Version: {}", self.version)?;
    writeln!(f, "Architecture: {}", self.architecture)?;
    writeln!(f, "Maintainer: {MAINTAINER}")?;
    writeln!(f, "Section: libdevel")?;
    writeln!(f, "Priority: optional")?;
    writeln!(f, "Description: WebRTC static libraries and headers")
  }
}

/// Lay out the `dpkg-deb` build root for a staged package. Returns its path.
pub fn assemble(layout: &PackageLayout, control: &Control) -> Result<PathBuf, PackageError> {
  let root = layout.out_dir.join(control.basename());
  if root.exists() {
    fs::remove_dir_all(&root)?;
  }

  let staging = layout.staging_dir();
  let prefix = root.join("usr").join("local");
  copy_dir(&staging.join("include"), &prefix.join("include").join(&control.package))?;
  copy_dir(&staging.join("lib"), &prefix.join("lib").join(&control.package))?;

  let debian_dir = root.join("DEBIAN");
  fs::create_dir_all(&debian_dir)?;
  fs::write(debian_dir.join("control"), control.to_string())?;
  Ok(root)
}

/// Assemble the build root and run `dpkg-deb --build` on it.
pub async fn build(toolchain: &Toolchain, layout: &PackageLayout, control: &Control) -> Result<PathBuf, PackageError> {
  let root = {
    let layout = layout.clone();
    let control = control.clone();
    tokio::task::spawn_blocking(move || assemble(&layout, &control)).await??
  };
  let deb = layout.out_dir.join(format!("{}.deb", control.basename()));

  toolchain
    .tool("dpkg-deb")
    .args(["--root-owner-group", "--build"])
    .arg(&root)
    .arg(&deb)
    .run()
    .await?;

  info!(package = %deb.display(), "debian package written");
  Ok(deb)
}

fn copy_dir(src: &Path, dest: &Path) -> Result<(), PackageError> {
  fs::create_dir_all(dest)?;
  if !src.is_dir() {
    return Ok(());
  }
  for entry in WalkDir::new(src).min_depth(1) {
    let entry = entry?;
    let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dest.join(relative);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}
