//! Packaging of compiled artifacts.
//!
//! Packaging always stages the build into `<out>/<filename>/` first, then
//! produces exactly one of:
//! - a Debian package (`-D`)
//! - an archive plus a JSON manifest, both named after the package filename

pub mod archive;
pub mod debian;
pub mod manifest;
pub mod prepare;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::pattern::PackageDescriptor;
use crate::platform::{Os, debian_arch};
use crate::request::{ConfigSet, check_filename};
use crate::tool::{ToolError, Toolchain};

/// Errors that can occur while packaging.
#[derive(Debug, Error)]
pub enum PackageError {
  /// The target CPU has no Debian architecture.
  #[error("no debian architecture for target cpu '{0}'")]
  UnsupportedArch(String),

  /// The interpreted filename would not name a directory of its own under
  /// the output directory.
  #[error("invalid package filename '{0}'")]
  InvalidFilename(String),

  /// A configuration has no combined library to package.
  #[error("missing build output for configuration '{config}': {path}")]
  MissingArtifact { config: String, path: PathBuf },

  #[error(transparent)]
  Tool(#[from] ToolError),

  #[error("archive error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("manifest error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("walk error: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("packaging task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Where a package is staged and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
  pub out_dir: PathBuf,
  pub filename: String,
  pub platform: Os,
  pub revision_number: u64,
}

impl PackageLayout {
  /// Directory the build is staged into.
  pub fn staging_dir(&self) -> PathBuf {
    self.out_dir.join(&self.filename)
  }
}

/// Produces package files from a build output directory.
#[allow(async_fn_in_trait)]
pub trait Packager {
  /// Stage every configuration's artifacts plus resource files.
  async fn prepare(&self, layout: &PackageLayout, configs: &ConfigSet) -> Result<(), PackageError>;

  /// Build a Debian package from the staged layout.
  async fn native(&self, layout: &PackageLayout, name: &str, version: &str, arch: &str)
  -> Result<PathBuf, PackageError>;

  /// Compress the staged layout.
  async fn archive(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError>;

  /// Write the listing of staged files.
  async fn manifest(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError>;
}

/// Inputs of the packaging stage.
#[derive(Debug, Clone, Copy)]
pub struct PackageJob<'a> {
  pub descriptor: &'a PackageDescriptor,
  pub platform: Os,
  pub out_dir: &'a Path,
  pub configs: &'a ConfigSet,
  pub revision_number: u64,
  pub debian: bool,
  pub target_cpu: &'a str,
}

/// Stage the build, then run exactly one packaging strategy.
///
/// Returns the package files produced.
pub async fn package(packager: &impl Packager, job: &PackageJob<'_>) -> Result<Vec<PathBuf>, PackageError> {
  validate_filename(&job.descriptor.filename)?;
  let layout = PackageLayout {
    out_dir: job.out_dir.to_path_buf(),
    filename: job.descriptor.filename.clone(),
    platform: job.platform,
    revision_number: job.revision_number,
  };

  info!(staging = %layout.staging_dir().display(), "preparing package");
  packager.prepare(&layout, job.configs).await?;

  if job.debian {
    let arch = debian_arch(job.target_cpu).ok_or_else(|| PackageError::UnsupportedArch(job.target_cpu.to_string()))?;
    info!(name = %job.descriptor.name, version = %job.descriptor.version, arch, "building debian package");
    let deb = packager
      .native(&layout, &job.descriptor.name, &job.descriptor.version, arch)
      .await?;
    Ok(vec![deb])
  } else {
    info!(filename = %layout.filename, "archiving package");
    let archive = packager.archive(&layout).await?;
    let manifest = packager.manifest(&layout).await?;
    Ok(vec![archive, manifest])
  }
}

/// Fail unless `filename` stages into its own directory.
pub fn validate_filename(filename: &str) -> Result<(), PackageError> {
  check_filename(filename).map_err(|_| PackageError::InvalidFilename(filename.to_string()))
}

/// [`Packager`] that writes packages to the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalPackager {
  resource_dir: PathBuf,
  toolchain: Toolchain,
}

impl LocalPackager {
  pub fn new(resource_dir: impl Into<PathBuf>, toolchain: Toolchain) -> Self {
    Self {
      resource_dir: resource_dir.into(),
      toolchain,
    }
  }
}

impl Packager for LocalPackager {
  async fn prepare(&self, layout: &PackageLayout, configs: &ConfigSet) -> Result<(), PackageError> {
    let layout = layout.clone();
    let configs = configs.clone();
    let resource_dir = self.resource_dir.clone();
    tokio::task::spawn_blocking(move || prepare::stage(&layout, &configs, &resource_dir)).await?
  }

  async fn native(
    &self,
    layout: &PackageLayout,
    name: &str,
    version: &str,
    arch: &str,
  ) -> Result<PathBuf, PackageError> {
    let control = debian::Control {
      package: name.to_string(),
      version: version.to_string(),
      architecture: arch.to_string(),
    };
    debian::build(&self.toolchain, layout, &control).await
  }

  async fn archive(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError> {
    let layout = layout.clone();
    tokio::task::spawn_blocking(move || archive::write(&layout)).await?
  }

  async fn manifest(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError> {
    let layout = layout.clone();
    tokio::task::spawn_blocking(move || manifest::write(&layout)).await?
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  // ==========================================================================
  // Recording Packager
  // ==========================================================================

  #[derive(Default)]
  struct RecordingPackager {
    calls: RefCell<Vec<String>>,
  }

  impl Packager for RecordingPackager {
    async fn prepare(&self, layout: &PackageLayout, configs: &ConfigSet) -> Result<(), PackageError> {
      self
        .calls
        .borrow_mut()
        .push(format!("prepare:{}:{}:{}", layout.filename, configs, layout.revision_number));
      Ok(())
    }

    async fn native(
      &self,
      layout: &PackageLayout,
      name: &str,
      version: &str,
      arch: &str,
    ) -> Result<PathBuf, PackageError> {
      self.calls.borrow_mut().push(format!("native:{name}:{version}:{arch}"));
      Ok(layout.out_dir.join(format!("{name}_{version}_{arch}.deb")))
    }

    async fn archive(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError> {
      self.calls.borrow_mut().push(format!("archive:{}", layout.filename));
      Ok(layout.out_dir.join(format!("{}.tar.gz", layout.filename)))
    }

    async fn manifest(&self, layout: &PackageLayout) -> Result<PathBuf, PackageError> {
      self.calls.borrow_mut().push(format!("manifest:{}", layout.filename));
      Ok(layout.out_dir.join(format!("{}.json", layout.filename)))
    }
  }

  fn descriptor() -> PackageDescriptor {
    PackageDescriptor {
      filename: "webrtc-100-abcdef0-linux-x64".to_string(),
      name: "webrtc".to_string(),
      version: "100".to_string(),
    }
  }

  fn job<'a>(descriptor: &'a PackageDescriptor, configs: &'a ConfigSet, debian: bool, cpu: &'a str) -> PackageJob<'a> {
    PackageJob {
      descriptor,
      platform: Os::Linux,
      out_dir: Path::new("out"),
      configs,
      revision_number: 100,
      debian,
      target_cpu: cpu,
    }
  }

  #[tokio::test]
  async fn archive_and_manifest_without_debian() {
    let packager = RecordingPackager::default();
    let (descriptor, configs) = (descriptor(), ConfigSet::default());

    let files = package(&packager, &job(&descriptor, &configs, false, "x64")).await.unwrap();

    assert_eq!(
      *packager.calls.borrow(),
      vec![
        "prepare:webrtc-100-abcdef0-linux-x64:Debug Release:100",
        "archive:webrtc-100-abcdef0-linux-x64",
        "manifest:webrtc-100-abcdef0-linux-x64",
      ]
    );
    assert_eq!(files.len(), 2);
  }

  #[tokio::test]
  async fn native_only_with_debian() {
    let packager = RecordingPackager::default();
    let (descriptor, configs) = (descriptor(), ConfigSet::default());

    let files = package(&packager, &job(&descriptor, &configs, true, "arm")).await.unwrap();

    assert_eq!(
      *packager.calls.borrow(),
      vec![
        "prepare:webrtc-100-abcdef0-linux-x64:Debug Release:100",
        "native:webrtc:100:armhf",
      ]
    );
    assert_eq!(files, vec![PathBuf::from("out").join("webrtc_100_armhf.deb")]);
  }

  #[tokio::test]
  async fn unmapped_cpu_fails_closed() {
    let packager = RecordingPackager::default();
    let (descriptor, configs) = (descriptor(), ConfigSet::default());

    let result = package(&packager, &job(&descriptor, &configs, true, "mips64el")).await;

    assert!(matches!(result, Err(PackageError::UnsupportedArch(ref cpu)) if cpu == "mips64el"));
    let calls = packager.calls.borrow();
    assert!(!calls.iter().any(|c| c.starts_with("native") || c.starts_with("archive")));
  }

  #[tokio::test]
  async fn unsafe_filename_never_reaches_staging() {
    for filename in ["", ".", "src", "../elsewhere"] {
      let packager = RecordingPackager::default();
      let descriptor = PackageDescriptor {
        filename: filename.to_string(),
        ..descriptor()
      };
      let configs = ConfigSet::default();

      let result = package(&packager, &job(&descriptor, &configs, false, "x64")).await;

      assert!(matches!(result, Err(PackageError::InvalidFilename(ref f)) if f == filename));
      assert!(packager.calls.borrow().is_empty());
    }
  }

  #[test]
  fn staging_dir_is_named_after_filename() {
    let layout = PackageLayout {
      out_dir: PathBuf::from("out"),
      filename: "webrtc-1".to_string(),
      platform: Os::Linux,
      revision_number: 1,
    };
    assert_eq!(layout.staging_dir(), PathBuf::from("out").join("webrtc-1"));
  }
}
