//! Host and project prerequisite checks.

use std::path::Path;

use tracing::{debug, info};

use crate::consts::SOURCE_DIR;
use crate::git;
use crate::platform::Os;
use crate::tool::{ToolError, Toolchain};

/// Programs that must be runnable on every host before a build starts.
pub const REQUIRED_HOST_TOOLS: &[&str] = &["git", "python3"];

/// Checks that the machine can build the requested target.
#[allow(async_fn_in_trait)]
pub trait DependencyChecker {
  /// Host prerequisites, including the bundled toolchain.
  async fn check_host(&self, host: Os, target_cpu: &str) -> Result<(), ToolError>;

  /// Prerequisites declared by the checked-out source tree.
  async fn check_project(&self, host: Os, out_dir: &Path, target_os: &str, target_cpu: &str) -> Result<(), ToolError>;
}

/// [`DependencyChecker`] that bootstraps depot_tools and runs the tree's own installers.
#[derive(Debug, Clone)]
pub struct HostDependencyChecker {
  toolchain: Toolchain,
  toolchain_url: String,
}

impl HostDependencyChecker {
  pub fn new(toolchain: Toolchain, toolchain_url: impl Into<String>) -> Self {
    Self {
      toolchain,
      toolchain_url: toolchain_url.into(),
    }
  }

  async fn ensure_toolchain(&self) -> Result<(), ToolError> {
    let dir = self.toolchain.dir();
    if dir.is_dir() {
      debug!(dir = %dir.display(), "toolchain present");
      return Ok(());
    }

    info!(url = %self.toolchain_url, dir = %dir.display(), "fetching toolchain");
    git::clone_shallow_async(&self.toolchain_url, dir).await
  }

  async fn require_tool(&self, program: &str) -> Result<(), ToolError> {
    match self.toolchain.tool(program).arg("--version").output().await {
      Ok(version) => {
        debug!(program, version = %version.lines().next().unwrap_or_default(), "found");
        Ok(())
      }
      Err(ToolError::Spawn { .. }) => Err(ToolError::NotFound(format!("required program '{program}'"))),
      Err(e) => Err(e),
    }
  }
}

/// Whether a Linux cross build for `target_cpu` needs a downloaded sysroot.
pub fn needs_sysroot(host: Os, target_os: &str, target_cpu: &str) -> bool {
  host == Os::Linux && target_os == "linux" && matches!(target_cpu, "arm" | "arm64")
}

impl DependencyChecker for HostDependencyChecker {
  async fn check_host(&self, host: Os, target_cpu: &str) -> Result<(), ToolError> {
    info!(%host, target_cpu, "checking build environment");
    self.ensure_toolchain().await?;
    for program in REQUIRED_HOST_TOOLS {
      self.require_tool(program).await?;
    }
    Ok(())
  }

  async fn check_project(&self, host: Os, out_dir: &Path, target_os: &str, target_cpu: &str) -> Result<(), ToolError> {
    // Installers run from inside the tree and are passed by path
    let src = std::path::absolute(out_dir.join(SOURCE_DIR))?;

    if host == Os::Linux {
      let script = src.join("build").join("install-build-deps.sh");
      if !script.is_file() {
        return Err(ToolError::NotFound(format!("dependency installer {}", script.display())));
      }
      info!(script = %script.display(), "installing build dependencies");
      self
        .toolchain
        .tool("bash")
        .arg(&script)
        .args(["--no-prompt", "--no-chromeos-fonts"])
        .current_dir(&src)
        .run()
        .await?;
    }

    if needs_sysroot(host, target_os, target_cpu) {
      let installer = src
        .join("build")
        .join("linux")
        .join("sysroot_scripts")
        .join("install-sysroot.py");
      if !installer.is_file() {
        return Err(ToolError::NotFound(format!("sysroot installer {}", installer.display())));
      }
      info!(target_cpu, "installing sysroot");
      self
        .toolchain
        .tool("python3")
        .arg(&installer)
        .arg(format!("--arch={target_cpu}"))
        .current_dir(&src)
        .run()
        .await?;
    }

    Ok(())
  }
}
