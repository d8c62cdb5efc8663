//! Staging of build output into a package-ready layout.
//!
//! ```text
//! <out>/<filename>/
//!   include/...        headers from the source tree
//!   lib/<config>/...   combined library per configuration
//!   VERSION            revision number
//!   <resource files>
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use super::{PackageError, PackageLayout, validate_filename};
use crate::compile::{combined_library_name, config_dir};
use crate::consts::{SOURCE_DIR, VERSION_FILE};
use crate::request::ConfigSet;

/// Directories under the source tree never searched for headers.
const SKIPPED_DIRS: &[&str] = &["out", ".git"];

/// Stage `configs` and the resource directory into the layout's staging directory.
///
/// Any previous staging directory is replaced.
pub fn stage(layout: &PackageLayout, configs: &ConfigSet, resource_dir: &Path) -> Result<(), PackageError> {
  validate_filename(&layout.filename)?;
  let staging = layout.staging_dir();
  if staging.exists() {
    fs::remove_dir_all(&staging)?;
  }
  fs::create_dir_all(&staging)?;

  let headers = copy_headers(&layout.out_dir.join(SOURCE_DIR), &staging.join("include"))?;
  debug!(headers, "staged headers");

  let library = combined_library_name(layout.platform);
  for config in configs.iter() {
    let built = config_dir(&layout.out_dir, config).join(library);
    if !built.is_file() {
      return Err(PackageError::MissingArtifact {
        config: config.to_string(),
        path: built,
      });
    }
    let dest = staging.join("lib").join(config);
    fs::create_dir_all(&dest)?;
    fs::copy(&built, dest.join(library))?;
  }

  if resource_dir.is_dir() {
    copy_tree(resource_dir, &staging)?;
  } else {
    debug!(dir = %resource_dir.display(), "no resource directory");
  }

  fs::write(staging.join(VERSION_FILE), format!("{}\n", layout.revision_number))?;
  Ok(())
}

/// Copy every `.h` file under `src` into `dest`, keeping relative paths.
///
/// Returns the number of headers copied.
pub fn copy_headers(src: &Path, dest: &Path) -> Result<usize, PackageError> {
  let mut count = 0;
  let walker = WalkDir::new(src).into_iter().filter_entry(|entry| {
    entry.depth() != 1 || !SKIPPED_DIRS.iter().any(|d| entry.file_name() == *d)
  });

  for entry in walker {
    let entry = entry?;
    let path = entry.path();
    if !entry.file_type().is_file() || !path.extension().is_some_and(|ext| ext == "h") {
      continue;
    }
    let relative = path.strip_prefix(src).unwrap_or(path);
    let target = dest.join(relative);
    if let Some(parent) = target.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::copy(path, &target)?;
    count += 1;
  }
  Ok(count)
}

/// Recursively copy the contents of `src` into `dest`.
fn copy_tree(src: &Path, dest: &Path) -> Result<(), PackageError> {
  for entry in WalkDir::new(src).min_depth(1) {
    let entry = entry?;
    let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dest.join(relative);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&target)?;
    } else {
      if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::copy(entry.path(), &target)?;
    }
  }
  Ok(())
}
