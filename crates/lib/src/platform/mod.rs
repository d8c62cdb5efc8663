//! Host detection and target normalization.

pub mod arch;
pub mod os;

use std::fmt;

use thiserror::Error;

use crate::consts::DEFAULT_TARGET_CPU;
pub use arch::{Cpu, debian_arch};
pub use os::Os;

#[derive(Debug, Error)]
pub enum PlatformError {
  #[error("unsupported host platform: {0}")]
  UnsupportedHost(String),
}

/// Host platform plus the OS/CPU pair being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub host: Os,
  pub os: String,
  pub cpu: String,
}

impl Target {
  /// Fill in defaults for an unset target OS or CPU.
  ///
  /// The OS defaults to the host platform and the CPU to `x64`. Empty strings
  /// count as unset. No attempt is made to validate the combination; the
  /// toolchain rejects pairs it cannot build.
  pub fn normalize(host: Os, os: Option<&str>, cpu: Option<&str>) -> Self {
    let os = os.filter(|s| !s.is_empty()).unwrap_or(host.as_str());
    let cpu = cpu.filter(|s| !s.is_empty()).unwrap_or(DEFAULT_TARGET_CPU);
    Self {
      host,
      os: os.to_string(),
      cpu: cpu.to_string(),
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{} (host {})", self.os, self.cpu, self.host)
  }
}

/// Detect the host platform and normalize the requested target.
pub fn detect_and_normalize(os: Option<&str>, cpu: Option<&str>) -> Result<Target, PlatformError> {
  let host = Os::current().ok_or_else(|| PlatformError::UnsupportedHost(std::env::consts::OS.to_string()))?;
  Ok(Target::normalize(host, os, cpu))
}
