use std::fmt;

/// Host platforms a build can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  Mac,
  Win,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    Self::from_rust_os(std::env::consts::OS)
  }

  /// Map a `std::env::consts::OS` value onto a supported platform
  pub fn from_rust_os(os: &str) -> Option<Self> {
    match os {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Mac),
      "windows" => Some(Self::Win),
      _ => None,
    }
  }

  /// Returns the identifier used by the WebRTC build files (`target_os`)
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Mac => "mac",
      Self::Win => "win",
    }
  }

  pub fn is_windows(&self) -> bool {
    matches!(self, Self::Win)
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
