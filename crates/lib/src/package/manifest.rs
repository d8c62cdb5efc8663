//! Package manifests.
//!
//! A manifest is written next to the archive as `<filename>.json` and lists
//! every staged file with its size and SHA-256, sorted by path.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use super::{PackageError, PackageLayout};
use crate::platform::Os;
use crate::util::hash::hash_file;

#[derive(Debug, Serialize)]
pub struct Manifest {
  pub filename: String,
  pub platform: Os,
  pub revision_number: u64,
  pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ManifestEntry {
  /// Path relative to the staging directory, `/`-separated.
  pub path: String,
  pub size: u64,
  pub sha256: String,
}

/// Path of the manifest for a layout.
pub fn manifest_path(layout: &PackageLayout) -> PathBuf {
  layout.out_dir.join(format!("{}.json", layout.filename))
}

/// Build the manifest for the staged files of a layout.
pub fn collect(layout: &PackageLayout) -> Result<Manifest, PackageError> {
  let staging = layout.staging_dir();
  let mut files = Vec::new();

  for entry in WalkDir::new(&staging).min_depth(1) {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    let relative = entry.path().strip_prefix(&staging).unwrap_or(entry.path());
    files.push(ManifestEntry {
      path: relative.to_string_lossy().replace('\\', "/"),
      size: entry.metadata()?.len(),
      sha256: hash_file(entry.path())?,
    });
  }
  files.sort_by(|a, b| a.path.cmp(&b.path));

  Ok(Manifest {
    filename: layout.filename.clone(),
    platform: layout.platform,
    revision_number: layout.revision_number,
    files,
  })
}

/// Write the manifest for a layout, returning its path.
pub fn write(layout: &PackageLayout) -> Result<PathBuf, PackageError> {
  let manifest = collect(layout)?;
  let dest = manifest_path(layout);
  let json = serde_json::to_string_pretty(&manifest)?;
  fs::write(&dest, json)?;
  info!(manifest = %dest.display(), files = manifest.files.len(), "manifest written");
  Ok(dest)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::write_file;
  use std::path::Path;
  use tempfile::TempDir;

  fn layout(out_dir: &Path) -> PackageLayout {
    PackageLayout {
      out_dir: out_dir.to_path_buf(),
      filename: "webrtc-9".to_string(),
      platform: Os::Mac,
      revision_number: 9,
    }
  }

  #[test]
  fn lists_files_sorted_with_hashes() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "webrtc-9/lib/Debug/libwebrtc_full.a", "debug");
    write_file(temp.path(), "webrtc-9/VERSION", "9\n");
    write_file(temp.path(), "webrtc-9/include/api/a.h", "hello");

    let manifest = collect(&layout(temp.path())).unwrap();

    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["VERSION", "include/api/a.h", "lib/Debug/libwebrtc_full.a"]);
    assert_eq!(manifest.files[1].size, 5);
    assert_eq!(
      manifest.files[1].sha256,
      "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
  }

  #[test]
  fn write_produces_json_next_to_archive() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "webrtc-9/VERSION", "9\n");

    let path = write(&layout(temp.path())).unwrap();

    assert_eq!(path, temp.path().join("webrtc-9.json"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["filename"], "webrtc-9");
    assert_eq!(json["platform"], "mac");
    assert_eq!(json["revision_number"], 9);
    assert_eq!(json["files"][0]["path"], "VERSION");
  }
}
