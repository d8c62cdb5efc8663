//! The immutable description of a single build run.
//!
//! A [`BuildRequest`] is assembled once from command-line input and then only
//! ever borrowed by the pipeline stages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{DEFAULT_CONFIGS, DEFAULT_OUT_DIR, SOURCE_DIR};
use crate::pattern::Patterns;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
  #[error("at least one build configuration is required")]
  NoConfigs,

  #[error("output directory must not be empty")]
  EmptyOutDir,

  #[error("cannot resolve output directory {path}: {message}")]
  UnresolvedOutDir { path: PathBuf, message: String },

  #[error("package filename '{0}' would not stay inside the output directory")]
  InvalidFilename(String),
}

/// Ordered set of build configuration names (`Debug`, `Release`, ...).
///
/// Duplicates collapse onto the first occurrence; building a configuration
/// twice produces the same artifacts, so there is nothing to gain from
/// keeping them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSet(Vec<String>);

impl ConfigSet {
  /// Parse a space-separated list of configuration names.
  pub fn parse(input: &str) -> Result<Self, RequestError> {
    let mut names: Vec<String> = Vec::new();
    for name in input.split_whitespace() {
      if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
      }
    }
    if names.is_empty() {
      return Err(RequestError::NoConfigs);
    }
    Ok(Self(names))
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Always false: a `ConfigSet` cannot be constructed empty.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.iter().any(|n| n == name)
  }
}

impl Default for ConfigSet {
  fn default() -> Self {
    Self(DEFAULT_CONFIGS.split_whitespace().map(str::to_string).collect())
  }
}

impl fmt::Display for ConfigSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.join(" "))
  }
}

/// Object identifiers left out of the combined library, for every configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist(Vec<String>);

impl Blacklist {
  /// Parse identifiers separated by whitespace, commas or `|`.
  pub fn parse(input: &str) -> Self {
    let mut ids: Vec<String> = Vec::new();
    for id in input.split(|c: char| c.is_whitespace() || c == ',' || c == '|') {
      if !id.is_empty() && !ids.iter().any(|i| i == id) {
        ids.push(id.to_string());
      }
    }
    Self(ids)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Whether an object path (relative to the object directory) is excluded.
  pub fn excludes(&self, object_path: &str) -> bool {
    let normalized = object_path.replace('\\', "/");
    self.0.iter().any(|id| normalized.contains(id.as_str()))
  }
}

/// Everything one build run needs to know, resolved up front.
#[derive(Debug, Clone)]
pub struct BuildRequest {
  pub out_dir: PathBuf,
  /// Branch to build; overrides `revision` when set.
  pub branch: Option<String>,
  pub revision: Option<String>,
  pub target_os: Option<String>,
  pub target_cpu: Option<String>,
  pub configs: ConfigSet,
  pub blacklist: Blacklist,
  pub enable_rtti: bool,
  /// Skip environment validation, checkout and patching.
  pub express: bool,
  /// Produce a `.deb` instead of an archive and manifest.
  pub debian: bool,
  pub patterns: Patterns,
}

impl BuildRequest {
  /// Check the invariants clap cannot express.
  ///
  /// The output directory is made absolute against the current directory:
  /// tools later run from inside it and must not resolve it a second time.
  pub fn validate(mut self) -> Result<Self, RequestError> {
    if self.out_dir.as_os_str().is_empty() {
      return Err(RequestError::EmptyOutDir);
    }
    if self.configs.is_empty() {
      return Err(RequestError::NoConfigs);
    }
    // Patterns with tokens are checked once interpreted
    if !self.patterns.filename.contains('%') {
      check_filename(&self.patterns.filename)?;
    }
    self.out_dir = std::path::absolute(&self.out_dir).map_err(|e| RequestError::UnresolvedOutDir {
      path: self.out_dir.clone(),
      message: e.to_string(),
    })?;
    Ok(self)
  }
}

/// Reject package filenames that would stage outside `<out>/<filename>` or
/// on top of the source tree.
///
/// Staging removes the directory first, so this must hold before anything
/// is written.
pub fn check_filename(filename: &str) -> Result<(), RequestError> {
  let invalid = filename.is_empty()
    || filename == "."
    || filename == ".."
    || filename == SOURCE_DIR
    || filename.contains(['/', '\\']);
  if invalid {
    return Err(RequestError::InvalidFilename(filename.to_string()));
  }
  Ok(())
}

impl Default for BuildRequest {
  fn default() -> Self {
    Self {
      out_dir: PathBuf::from(DEFAULT_OUT_DIR),
      branch: None,
      revision: None,
      target_os: None,
      target_cpu: None,
      configs: ConfigSet::default(),
      blacklist: Blacklist::default(),
      enable_rtti: true,
      express: false,
      debian: false,
      patterns: Patterns::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use std::path::Path;

  #[test]
  fn default_configs_are_debug_and_release() {
    let configs = ConfigSet::default();
    assert_eq!(configs.iter().collect::<Vec<_>>(), vec!["Debug", "Release"]);
  }

  #[test]
  fn parse_configs_keeps_order_and_drops_duplicates() {
    let configs = ConfigSet::parse("Release  Debug Release").unwrap();
    assert_eq!(configs.iter().collect::<Vec<_>>(), vec!["Release", "Debug"]);
    assert_eq!(configs.len(), 2);
  }

  #[test]
  fn parse_configs_rejects_blank_input() {
    assert_eq!(ConfigSet::parse("   "), Err(RequestError::NoConfigs));
    assert_eq!(ConfigSet::parse(""), Err(RequestError::NoConfigs));
  }

  #[test]
  fn blacklist_accepts_mixed_separators() {
    let blacklist = Blacklist::parse("audio_device|video_capture, sqlite  audio_device");
    assert_eq!(
      blacklist.iter().collect::<Vec<_>>(),
      vec!["audio_device", "video_capture", "sqlite"]
    );
  }

  #[test]
  fn empty_blacklist_excludes_nothing() {
    let blacklist = Blacklist::parse("");
    assert!(blacklist.is_empty());
    assert!(!blacklist.excludes("modules/audio_device/audio_device_impl.o"));
  }

  #[test]
  fn blacklist_matches_path_fragments() {
    let blacklist = Blacklist::parse("audio_device");
    assert!(blacklist.excludes("modules/audio_device/audio_device_impl.o"));
    assert!(blacklist.excludes("modules\\audio_device\\dummy.obj"));
    assert!(!blacklist.excludes("modules/video_coding/codec.o"));
  }

  #[test]
  fn request_defaults_match_cli_defaults() {
    let request = BuildRequest::default();
    assert_eq!(request.out_dir, PathBuf::from("out"));
    assert!(request.enable_rtti);
    assert!(!request.express);
    assert!(!request.debian);
    assert!(request.branch.is_none());
  }

  #[test]
  fn validate_rejects_empty_out_dir() {
    let request = BuildRequest {
      out_dir: PathBuf::new(),
      ..Default::default()
    };
    assert_eq!(request.validate().unwrap_err(), RequestError::EmptyOutDir);
  }

  #[test]
  #[serial]
  fn validate_makes_relative_out_dir_absolute() {
    let request = BuildRequest {
      out_dir: PathBuf::from("build").join("out"),
      ..Default::default()
    }
    .validate()
    .unwrap();

    assert!(request.out_dir.is_absolute());
    assert!(request.out_dir.ends_with(Path::new("build").join("out")));
    assert!(request.out_dir.starts_with(std::env::current_dir().unwrap()));
  }

  #[test]
  fn validate_keeps_absolute_out_dir() {
    let out = std::env::temp_dir().join("rtcbuild-out");
    let request = BuildRequest {
      out_dir: out.clone(),
      ..Default::default()
    }
    .validate()
    .unwrap();
    assert_eq!(request.out_dir, out);
  }

  #[test]
  fn filenames_that_escape_staging_are_rejected() {
    for name in ["", ".", "..", "src", "a/b", "..\\src", "../out"] {
      assert_eq!(
        check_filename(name),
        Err(RequestError::InvalidFilename(name.to_string())),
        "{name:?} should be rejected"
      );
    }
    assert!(check_filename("webrtc-100-abcdef0-linux-x64").is_ok());
    assert!(check_filename("src-package").is_ok());
  }

  #[test]
  fn validate_rejects_literal_filename_pattern() {
    let request = BuildRequest {
      patterns: Patterns {
        filename: "src".to_string(),
        ..Default::default()
      },
      ..Default::default()
    };
    assert_eq!(
      request.validate().unwrap_err(),
      RequestError::InvalidFilename("src".to_string())
    );
  }

  #[test]
  fn validate_defers_filename_patterns_with_tokens() {
    let request = BuildRequest {
      patterns: Patterns {
        filename: "%rn%".to_string(),
        ..Default::default()
      },
      ..Default::default()
    };
    assert!(request.validate().is_ok());
  }
}
