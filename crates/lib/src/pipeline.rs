//! The build pipeline.
//!
//! Stages run strictly in order and the first failure ends the run:
//!
//! 1. Detect the host and normalize the target
//! 2. Validate the host environment (skipped in express mode)
//! 3. Resolve the revision
//! 4. Check out, validate project dependencies and patch (skipped in express mode)
//! 5. Compile the configuration matrix
//! 6. Name and build the package
//!
//! Every external effect goes through one of the injected collaborators, so
//! the whole sequence can be exercised without touching the network or a
//! compiler.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::compile::{CompileJob, Compiler};
use crate::package::{self, PackageError, PackageJob, Packager};
use crate::pattern::{PackageContext, PackageDescriptor};
use crate::platform::{self, PlatformError, Target};
use crate::request::{BuildRequest, RequestError};
use crate::revision::{self, Revision, VersionControl};
use crate::source::Patcher;
use crate::tool::ToolError;
use crate::validate::DependencyChecker;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Usage,
  Resolution,
  Dependency,
  Acquisition,
  Compile,
  Packaging,
}

impl Stage {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Usage => "usage",
      Self::Resolution => "revision resolution",
      Self::Dependency => "dependency check",
      Self::Acquisition => "source acquisition",
      Self::Compile => "compile",
      Self::Packaging => "packaging",
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("invalid request")]
  Usage(#[from] RequestError),

  #[error("revision resolution failed")]
  Resolution(#[source] ToolError),

  #[error("dependency check failed")]
  Dependency(#[source] DependencyFailure),

  #[error("source acquisition failed")]
  Acquisition(#[source] ToolError),

  #[error("compile failed")]
  Compile(#[source] ToolError),

  #[error("packaging failed")]
  Packaging(#[source] PackageError),
}

/// Why the environment was rejected.
#[derive(Debug, Error)]
pub enum DependencyFailure {
  #[error(transparent)]
  Platform(#[from] PlatformError),

  #[error(transparent)]
  Tool(#[from] ToolError),
}

impl PipelineError {
  pub fn stage(&self) -> Stage {
    match self {
      Self::Usage(_) => Stage::Usage,
      Self::Resolution(_) => Stage::Resolution,
      Self::Dependency(_) => Stage::Dependency,
      Self::Acquisition(_) => Stage::Acquisition,
      Self::Compile(_) => Stage::Compile,
      Self::Packaging(_) => Stage::Packaging,
    }
  }

  fn dependency(err: impl Into<DependencyFailure>) -> Self {
    Self::Dependency(err.into())
  }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
  pub target: Target,
  pub revision: Revision,
  pub descriptor: PackageDescriptor,
  /// Package files written to the output directory.
  pub packages: Vec<PathBuf>,
}

/// The build pipeline and its collaborators.
pub struct Pipeline<V, D, P, C, K> {
  vcs: V,
  deps: D,
  patcher: P,
  compiler: C,
  packager: K,
}

impl<V, D, P, C, K> Pipeline<V, D, P, C, K>
where
  V: VersionControl,
  D: DependencyChecker,
  P: Patcher,
  C: Compiler,
  K: Packager,
{
  pub fn new(vcs: V, deps: D, patcher: P, compiler: C, packager: K) -> Self {
    Self {
      vcs,
      deps,
      patcher,
      compiler,
      packager,
    }
  }

  /// Run every stage for `request`, stopping at the first failure.
  pub async fn run(&self, request: &BuildRequest) -> Result<BuildOutcome, PipelineError> {
    let target = platform::detect_and_normalize(request.target_os.as_deref(), request.target_cpu.as_deref())
      .map_err(PipelineError::dependency)?;
    self.run_for(target, request).await
  }

  /// Run every stage for an already-normalized target.
  pub async fn run_for(&self, target: Target, request: &BuildRequest) -> Result<BuildOutcome, PipelineError> {
    info!(host = %target.host, target_os = %target.os, target_cpu = %target.cpu, "target");

    if request.express {
      info!("express mode: skipping environment checks, checkout and patches");
    } else {
      self
        .deps
        .check_host(target.host, &target.cpu)
        .await
        .map_err(PipelineError::dependency)?;
    }

    let revision = revision::resolve(&self.vcs, request.branch.as_deref(), request.revision.as_deref())
      .await
      .map_err(PipelineError::Resolution)?;

    if !request.express {
      self.acquire(&target, &revision, request).await?;
    }

    let job = CompileJob {
      host: target.host,
      out_dir: &request.out_dir,
      target_os: &target.os,
      target_cpu: &target.cpu,
      configs: &request.configs,
      blacklist: &request.blacklist,
    };
    self.compiler.compile(&job).await.map_err(PipelineError::Compile)?;

    let descriptor = describe(&target, &revision, request);
    info!(
      filename = %descriptor.filename,
      name = %descriptor.name,
      version = %descriptor.version,
      "package identifiers"
    );

    let job = PackageJob {
      descriptor: &descriptor,
      platform: target.host,
      out_dir: &request.out_dir,
      configs: &request.configs,
      revision_number: revision.number,
      debian: request.debian,
      target_cpu: &target.cpu,
    };
    let packages = package::package(&self.packager, &job)
      .await
      .map_err(PipelineError::Packaging)?;

    Ok(BuildOutcome {
      target,
      revision,
      descriptor,
      packages,
    })
  }

  async fn acquire(&self, target: &Target, revision: &Revision, request: &BuildRequest) -> Result<(), PipelineError> {
    self
      .vcs
      .checkout(&request.out_dir, &target.os, &revision.sha)
      .await
      .map_err(PipelineError::Acquisition)?;

    self
      .deps
      .check_project(target.host, &request.out_dir, &target.os, &target.cpu)
      .await
      .map_err(PipelineError::dependency)?;

    self
      .patcher
      .apply(target.host, &request.out_dir, request.enable_rtti)
      .await
      .map_err(PipelineError::Acquisition)
  }
}

/// Compute the package identifiers for a resolved build.
pub fn describe(target: &Target, revision: &Revision, request: &BuildRequest) -> PackageDescriptor {
  let ctx = PackageContext {
    platform: target.host,
    out_dir: request.out_dir.clone(),
    target_os: target.os.clone(),
    target_cpu: target.cpu.clone(),
    branch: request.branch.clone().unwrap_or_default(),
    revision: revision.clone(),
  };
  request.patterns.describe(&ctx)
}
