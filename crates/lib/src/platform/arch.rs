use std::fmt;

/// Target CPUs with a known Debian architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cpu {
  X86,
  X64,
  Arm,
  Arm64,
}

impl Cpu {
  pub const ALL: [Cpu; 4] = [Cpu::X86, Cpu::X64, Cpu::Arm, Cpu::Arm64];

  /// Parse a gn `target_cpu` value
  pub fn parse(cpu: &str) -> Option<Self> {
    match cpu {
      "x86" => Some(Self::X86),
      "x64" => Some(Self::X64),
      "arm" => Some(Self::Arm),
      "arm64" => Some(Self::Arm64),
      _ => None,
    }
  }

  /// Returns the gn `target_cpu` identifier
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X64 => "x64",
      Self::Arm => "arm",
      Self::Arm64 => "arm64",
    }
  }

  /// Returns the Debian architecture name for this CPU
  pub fn debian_arch(&self) -> &'static str {
    match self {
      Self::X86 => "i386",
      Self::X64 => "amd64",
      Self::Arm => "armhf",
      Self::Arm64 => "arm64",
    }
  }
}

impl fmt::Display for Cpu {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Returns the Debian architecture for a `target_cpu` value
///
/// Returns `None` if the CPU has no Debian equivalent
pub fn debian_arch(cpu: &str) -> Option<&'static str> {
  Cpu::parse(cpu).map(|c| c.debian_arch())
}
