//! Archive creation for staged packages.
//!
//! Linux and Mac hosts produce `<filename>.tar.gz`, Windows hosts
//! `<filename>.zip`. The archive holds a single top-level directory named
//! after the package filename.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use super::{PackageError, PackageLayout};
use crate::platform::Os;

/// Path of the archive for a layout.
pub fn archive_path(layout: &PackageLayout) -> PathBuf {
  let extension = match layout.platform {
    Os::Win => "zip",
    Os::Linux | Os::Mac => "tar.gz",
  };
  layout.out_dir.join(format!("{}.{}", layout.filename, extension))
}

/// Compress the staging directory into the platform's archive format.
pub fn write(layout: &PackageLayout) -> Result<PathBuf, PackageError> {
  let staging = layout.staging_dir();
  let dest = archive_path(layout);

  match layout.platform {
    Os::Win => write_zip(&staging, &layout.filename, &dest)?,
    Os::Linux | Os::Mac => write_tar_gz(&staging, &layout.filename, &dest)?,
  }

  info!(archive = %dest.display(), "archive written");
  Ok(dest)
}

fn write_tar_gz(staging: &Path, root: &str, dest: &Path) -> Result<(), PackageError> {
  let file = File::create(dest)?;
  let encoder = GzEncoder::new(file, Compression::default());
  let mut builder = tar::Builder::new(encoder);
  builder.follow_symlinks(false);
  builder.append_dir_all(root, staging)?;
  builder.into_inner()?.finish()?;
  Ok(())
}

fn write_zip(staging: &Path, root: &str, dest: &Path) -> Result<(), PackageError> {
  let file = File::create(dest)?;
  let mut zip = zip::ZipWriter::new(file);
  let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

  let mut entries: Vec<_> = WalkDir::new(staging)
    .min_depth(1)
    .into_iter()
    .collect::<Result<_, _>>()?;
  entries.sort_by(|a, b| a.path().cmp(b.path()));

  for entry in entries {
    let relative = entry.path().strip_prefix(staging).unwrap_or(entry.path());
    let name = format!("{}/{}", root, relative.to_string_lossy().replace('\\', "/"));
    if entry.file_type().is_dir() {
      zip.add_directory(name, options)?;
    } else {
      zip.start_file(name, options)?;
      let mut source = File::open(entry.path())?;
      io::copy(&mut source, &mut zip)?;
    }
  }

  zip.finish()?;
  Ok(())
}
