//! External tool invocation.
//!
//! Every collaborator that shells out (git, gclient, gn, ninja, ar, dpkg-deb)
//! goes through [`Toolchain`], which puts the bundled toolchain directory at
//! the front of the child's `PATH`. The parent process environment is never
//! modified.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Errors reported by external tools and remote lookups.
#[derive(Debug, Error)]
pub enum ToolError {
  /// The program could not be started at all.
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  Failed { cmd: String, code: Option<i32> },

  /// An HTTP lookup failed.
  #[error("request to {url} failed: {message}")]
  Http { url: String, message: String },

  /// A clone or remote ref listing failed.
  #[error("git transfer from {url} failed")]
  Git {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// A tool or remote answered with something we could not interpret.
  #[error("unexpected response from {what}: {message}")]
  Malformed { what: String, message: String },

  /// A remote ref, revision or local prerequisite does not exist.
  #[error("{0} not found")]
  NotFound(String),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// The bundled toolchain directory and the search path built from it.
#[derive(Debug, Clone)]
pub struct Toolchain {
  dir: PathBuf,
}

impl Toolchain {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// `PATH` for spawned tools: the toolchain directory, then the inherited entries.
  pub fn search_path(&self) -> OsString {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let entries = std::iter::once(self.dir.clone()).chain(std::env::split_paths(&inherited));
    // join_paths only fails on entries containing the separator; the
    // inherited PATH already went through split_paths
    std::env::join_paths(entries).unwrap_or(inherited)
  }

  /// Start describing an invocation of `program`.
  pub fn tool(&self, program: &str) -> Tool<'_> {
    Tool {
      toolchain: self,
      program: program.to_string(),
      args: Vec::new(),
      cwd: None,
    }
  }
}

/// A single pending tool invocation.
#[derive(Debug)]
pub struct Tool<'a> {
  toolchain: &'a Toolchain,
  program: String,
  args: Vec<OsString>,
  cwd: Option<PathBuf>,
}

impl Tool<'_> {
  pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
    self.args.push(arg.as_ref().to_os_string());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  /// Human-readable command line, used in logs and errors.
  pub fn display(&self) -> String {
    let mut line = self.program.clone();
    for arg in &self.args {
      line.push(' ');
      line.push_str(&arg.to_string_lossy());
    }
    line
  }

  /// Run the tool with inherited stdio, failing on a non-zero exit.
  pub async fn run(self) -> Result<(), ToolError> {
    let cmd = self.display();
    info!(cmd = %cmd, "running");

    let status = self
      .command()
      .stdin(Stdio::null())
      .status()
      .await
      .map_err(|source| ToolError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(ToolError::Failed {
        cmd,
        code: status.code(),
      });
    }
    Ok(())
  }

  /// Run the tool and return its trimmed stdout.
  pub async fn output(self) -> Result<String, ToolError> {
    let cmd = self.display();
    debug!(cmd = %cmd, "running");

    let output = self
      .command()
      .stdin(Stdio::null())
      .output()
      .await
      .map_err(|source| ToolError::Spawn {
        program: self.program.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
      }
      return Err(ToolError::Failed {
        cmd,
        code: output.status.code(),
      });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  #[cfg(not(windows))]
  fn command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command.args(&self.args);
    self.configure(&mut command);
    command
  }

  /// depot_tools ships `.bat` wrappers on Windows, which only cmd.exe can launch.
  #[cfg(windows)]
  fn command(&self) -> Command {
    let mut command = Command::new("cmd.exe");
    command.arg("/C").arg(&self.program).args(&self.args);
    self.configure(&mut command);
    command
  }

  fn configure(&self, command: &mut Command) {
    command.env("PATH", self.toolchain.search_path());
    // depot_tools must not try to update itself mid-build
    command.env("DEPOT_TOOLS_UPDATE", "0");
    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }
  }
}
