//! Package naming patterns.
//!
//! Package filenames, names and versions are derived from user-supplied
//! templates. A template is literal text with `%token%` placeholders that are
//! replaced from a [`PackageContext`].
//!
//! # Tokens
//!
//! - `%rn%` - revision number
//! - `%sr%` - short revision SHA (first 7 characters)
//! - `%r%` - full revision SHA
//! - `%to%` - target OS
//! - `%tc%` - target CPU
//! - `%p%` - host platform
//! - `%b%` - branch (empty when building a revision)
//! - `%da%` - Debian architecture for the target CPU
//!
//! Unknown tokens, and `%da%` for a CPU without a Debian architecture, are
//! left in the output untouched. Interpretation never fails.
//!
//! # Example
//!
//! ```
//! use rtcbuild_lib::pattern::{PackageContext, interpret};
//! use rtcbuild_lib::platform::Os;
//! use rtcbuild_lib::revision::Revision;
//!
//! let ctx = PackageContext {
//!   platform: Os::Linux,
//!   out_dir: "out".into(),
//!   target_os: "linux".to_string(),
//!   target_cpu: "x64".to_string(),
//!   branch: String::new(),
//!   revision: Revision::new("abcdef0123456789", 12345),
//! };
//! assert_eq!(interpret("webrtc-%rn%-%sr%-%to%-%tc%", &ctx), "webrtc-12345-abcdef0-linux-x64");
//! ```

use std::borrow::Cow;
use std::path::PathBuf;

use crate::consts::{DEFAULT_FILENAME_PATTERN, DEFAULT_NAME_PATTERN, DEFAULT_VERSION_PATTERN};
use crate::platform::{Os, debian_arch};
use crate::revision::Revision;

/// Values available to naming patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageContext {
  pub platform: Os,
  pub out_dir: PathBuf,
  pub target_os: String,
  pub target_cpu: String,
  pub branch: String,
  pub revision: Revision,
}

type TokenFn = for<'a> fn(&'a PackageContext) -> Option<Cow<'a, str>>;

/// Token name (without the surrounding `%`) to value lookup.
const TOKENS: &[(&str, TokenFn)] = &[
  ("rn", revision_number),
  ("sr", short_revision),
  ("r", revision),
  ("to", target_os),
  ("tc", target_cpu),
  ("p", platform),
  ("b", branch),
  ("da", debian_architecture),
];

fn revision_number(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Owned(ctx.revision.number.to_string()))
}

fn short_revision(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(ctx.revision.short_sha()))
}

fn revision(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(&ctx.revision.sha))
}

fn target_os(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(&ctx.target_os))
}

fn target_cpu(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(&ctx.target_cpu))
}

fn platform(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(ctx.platform.as_str()))
}

fn branch(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  Some(Cow::Borrowed(&ctx.branch))
}

fn debian_architecture(ctx: &PackageContext) -> Option<Cow<'_, str>> {
  debian_arch(&ctx.target_cpu).map(Cow::Borrowed)
}

fn resolve_token<'a>(name: &str, ctx: &'a PackageContext) -> Option<Cow<'a, str>> {
  TOKENS
    .iter()
    .find(|(token, _)| *token == name)
    .and_then(|(_, resolve)| resolve(ctx))
}

/// Expand every known `%token%` in `pattern`.
///
/// A `%` that does not open a known token is copied through and scanning
/// resumes right after it, so `%%rn%` yields `%` followed by the revision
/// number.
pub fn interpret(pattern: &str, ctx: &PackageContext) -> String {
  let mut result = String::with_capacity(pattern.len());
  let mut rest = pattern;

  while let Some(start) = rest.find('%') {
    result.push_str(&rest[..start]);
    let after = &rest[start + 1..];

    let resolved = after
      .find('%')
      .and_then(|end| resolve_token(&after[..end], ctx).map(|value| (end, value)));

    match resolved {
      Some((end, value)) => {
        result.push_str(&value);
        rest = &after[end + 1..];
      }
      None => {
        result.push('%');
        rest = after;
      }
    }
  }

  result.push_str(rest);
  result
}

/// The three naming templates of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patterns {
  pub filename: String,
  pub name: String,
  pub version: String,
}

impl Default for Patterns {
  fn default() -> Self {
    Self {
      filename: DEFAULT_FILENAME_PATTERN.to_string(),
      name: DEFAULT_NAME_PATTERN.to_string(),
      version: DEFAULT_VERSION_PATTERN.to_string(),
    }
  }
}

impl Patterns {
  /// Interpret all three patterns against one context.
  pub fn describe(&self, ctx: &PackageContext) -> PackageDescriptor {
    PackageDescriptor {
      filename: interpret(&self.filename, ctx),
      name: interpret(&self.name, ctx),
      version: interpret(&self.version, ctx),
    }
  }
}

/// Resolved package identifiers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PackageDescriptor {
  pub filename: String,
  pub name: String,
  pub version: String,
}
