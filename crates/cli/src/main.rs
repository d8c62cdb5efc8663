mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rtcbuild_lib::consts::{
  APP_NAME, DEFAULT_CONFIGS, DEFAULT_FILENAME_PATTERN, DEFAULT_NAME_PATTERN, DEFAULT_OUT_DIR, DEFAULT_PATCH_DIR,
  DEFAULT_REPO_URL, DEFAULT_RESOURCE_DIR, DEFAULT_TOOLCHAIN_DIR, DEFAULT_TOOLCHAIN_URL, DEFAULT_VERSION_PATTERN,
};

use crate::cmd::cmd_build;
use crate::output::{OutputFormat, print_error};

/// Fetch, patch, compile and package WebRTC.
#[derive(Parser)]
#[command(name = APP_NAME, version, about, long_about = None, disable_version_flag = true)]
pub(crate) struct Cli {
  /// Output directory for the source tree, build outputs and packages
  #[arg(short = 'o', value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
  out_dir: PathBuf,

  /// Branch to build; takes precedence over -r
  #[arg(short = 'b', value_name = "BRANCH")]
  branch: Option<String>,

  /// Revision SHA to build (default: latest)
  #[arg(short = 'r', value_name = "SHA")]
  revision: Option<String>,

  /// Target OS (default: host platform)
  #[arg(short = 't', value_name = "OS")]
  target_os: Option<String>,

  /// Target CPU (default: x64)
  #[arg(short = 'c', value_name = "CPU")]
  target_cpu: Option<String>,

  /// Object identifiers to leave out of the combined library
  #[arg(short = 'l', value_name = "LIST", default_value = "")]
  blacklist: String,

  /// Build with RTTI (1) or without (0)
  #[arg(short = 'e', value_name = "0|1", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
  rtti: u8,

  /// Space-separated build configurations
  #[arg(short = 'n', value_name = "CONFIGS", default_value = DEFAULT_CONFIGS)]
  configs: String,

  /// Express mode: skip environment checks, checkout and patches
  #[arg(short = 'x')]
  express: bool,

  /// Package as a Debian package instead of an archive
  #[arg(short = 'D')]
  debian: bool,

  /// Enable debug logging
  #[arg(short = 'd')]
  debug: bool,

  /// Package filename pattern
  #[arg(short = 'F', value_name = "PATTERN", default_value = DEFAULT_FILENAME_PATTERN)]
  filename_pattern: String,

  /// Package name pattern
  #[arg(short = 'P', value_name = "PATTERN", default_value = DEFAULT_NAME_PATTERN)]
  name_pattern: String,

  /// Package version pattern
  #[arg(short = 'V', value_name = "PATTERN", default_value = DEFAULT_VERSION_PATTERN)]
  version_pattern: String,

  /// Source repository URL
  #[arg(long, env = "RTCBUILD_REPO_URL", default_value = DEFAULT_REPO_URL)]
  repo_url: String,

  /// Bundled toolchain directory, prepended to PATH for every spawned tool
  #[arg(long, env = "RTCBUILD_TOOLCHAIN_DIR", default_value = DEFAULT_TOOLCHAIN_DIR)]
  toolchain_dir: PathBuf,

  /// Where the toolchain is cloned from when missing
  #[arg(long, env = "RTCBUILD_TOOLCHAIN_URL", default_value = DEFAULT_TOOLCHAIN_URL)]
  toolchain_url: String,

  /// Files copied into every package
  #[arg(long, env = "RTCBUILD_RESOURCE_DIR", default_value = DEFAULT_RESOURCE_DIR)]
  resource_dir: PathBuf,

  /// Patch set root
  #[arg(long, env = "RTCBUILD_PATCH_DIR", default_value = DEFAULT_PATCH_DIR)]
  patch_dir: PathBuf,

  /// Format of the build summary
  #[arg(long, value_enum, default_value = "text")]
  output: OutputFormat,

  /// Print version
  #[arg(long = "version", action = clap::ArgAction::Version)]
  version: Option<bool>,
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.debug { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cmd_build(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::FAILURE
    }
  }
}
