//! CLI output formatting utilities.
//!
//! Status lines go to stdout, errors to stderr. Colors are applied only when
//! the stream supports them.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const INFO: &str = "•";
}

/// Human-readable elapsed time, rounded down to whole seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
  humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_elapsed() {
    assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
    assert_eq!(format_elapsed(Duration::from_millis(1500)), "1s");
    assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h 2m 5s");
  }

  #[test]
  fn output_format_defaults_to_text() {
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
    assert!(!OutputFormat::Text.is_json());
    assert!(OutputFormat::Json.is_json());
    assert_eq!(OutputFormat::from_str("json", true), Ok(OutputFormat::Json));
  }
}
