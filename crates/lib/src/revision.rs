//! Revision resolution and source checkout.
//!
//! This module handles:
//! - Picking the commit to build (branch head, explicit SHA, or latest)
//! - Looking up the revision number of that commit
//! - Fetching and syncing the source tree at that commit
//!
//! # Revision numbers
//!
//! WebRTC commits carry a `Cr-Commit-Position: refs/heads/main@{#NNNNN}`
//! footer. The number in braces counts the commits on the branch up to and
//! including that commit, which makes it a monotonic, human-readable version.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::consts::{SHORT_SHA_LEN, SOURCE_DIR};
use crate::git;
use crate::tool::{ToolError, Toolchain};

/// A resolved commit and its revision number.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Revision {
  pub sha: String,
  pub number: u64,
}

impl Revision {
  pub fn new(sha: impl Into<String>, number: u64) -> Self {
    Self { sha: sha.into(), number }
  }

  /// The first seven characters of the SHA (the whole SHA if shorter).
  pub fn short_sha(&self) -> &str {
    self.sha.get(..SHORT_SHA_LEN).unwrap_or(&self.sha)
  }
}

/// Access to the project's version control.
#[allow(async_fn_in_trait)]
pub trait VersionControl {
  /// SHA of the current head of `branch` on the remote.
  async fn branch_head(&self, branch: &str) -> Result<String, ToolError>;

  /// SHA of the current head of the default branch.
  async fn latest_revision(&self) -> Result<String, ToolError>;

  /// Revision number of `sha`.
  async fn revision_number(&self, sha: &str) -> Result<u64, ToolError>;

  /// Fetch the source into `out_dir` (if needed) and sync it to `sha`.
  async fn checkout(&self, out_dir: &Path, target_os: &str, sha: &str) -> Result<(), ToolError>;
}

/// Resolve the commit to build.
///
/// A branch always wins over an explicit revision. With neither, the latest
/// commit of the default branch is used. The revision number is looked up for
/// whichever SHA was chosen.
pub async fn resolve(
  vcs: &impl VersionControl,
  branch: Option<&str>,
  revision: Option<&str>,
) -> Result<Revision, ToolError> {
  let branch = branch.filter(|b| !b.is_empty());
  let revision = revision.filter(|r| !r.is_empty());

  let sha = match (branch, revision) {
    (Some(branch), explicit) => {
      if let Some(explicit) = explicit {
        debug!(branch, ignored = explicit, "branch overrides explicit revision");
      }
      info!(branch, "resolving branch head");
      vcs.branch_head(branch).await?
    }
    (None, Some(explicit)) => explicit.to_string(),
    (None, None) => {
      info!("resolving latest revision");
      vcs.latest_revision().await?
    }
  };

  let number = vcs.revision_number(&sha).await?;
  info!(sha = %sha, number, "resolved revision");
  Ok(Revision { sha, number })
}

/// Extract the number from the last `Cr-Commit-Position` footer of a commit message.
pub fn parse_commit_position(commit: &str) -> Option<u64> {
  commit
    .lines()
    .rev()
    .find_map(|line| line.trim().strip_prefix("Cr-Commit-Position:"))
    .and_then(|footer| {
      let start = footer.find("{#")? + 2;
      let end = start + footer[start..].find('}')?;
      footer[start..end].parse().ok()
    })
}

/// [`VersionControl`] backed by git, the gitiles web interface and gclient.
#[derive(Debug, Clone)]
pub struct GitVersionControl {
  repo_url: String,
  toolchain: Toolchain,
  http: reqwest::Client,
}

impl GitVersionControl {
  pub fn new(repo_url: impl Into<String>, toolchain: Toolchain) -> Self {
    Self {
      repo_url: repo_url.into().trim_end_matches('/').to_string(),
      toolchain,
      http: reqwest::Client::new(),
    }
  }

  async fn lookup_ref(&self, reference: &str) -> Result<String, ToolError> {
    git::remote_ref_async(&self.repo_url, reference)
      .await?
      .ok_or_else(|| ToolError::NotFound(format!("ref '{reference}' in {}", self.repo_url)))
  }
}

impl VersionControl for GitVersionControl {
  async fn branch_head(&self, branch: &str) -> Result<String, ToolError> {
    self.lookup_ref(&format!("refs/heads/{branch}")).await
  }

  async fn latest_revision(&self) -> Result<String, ToolError> {
    self.lookup_ref("HEAD").await
  }

  async fn revision_number(&self, sha: &str) -> Result<u64, ToolError> {
    // gitiles serves the raw commit object base64-encoded with ?format=TEXT
    let url = format!("{}/+/{}?format=TEXT", self.repo_url, sha);
    debug!(url = %url, "fetching commit");

    let http_err = |e: reqwest::Error| ToolError::Http {
      url: url.clone(),
      message: e.to_string(),
    };

    let response = self.http.get(&url).send().await.map_err(http_err)?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
      return Err(ToolError::NotFound(format!("revision '{sha}'")));
    }
    if !response.status().is_success() {
      return Err(ToolError::Http {
        url: url.clone(),
        message: format!("HTTP {}", response.status()),
      });
    }
    let body = response.text().await.map_err(http_err)?;

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = STANDARD.decode(compact.as_bytes()).map_err(|e| ToolError::Malformed {
      what: url.clone(),
      message: e.to_string(),
    })?;
    let commit = String::from_utf8_lossy(&decoded);

    parse_commit_position(&commit).ok_or_else(|| ToolError::Malformed {
      what: url.clone(),
      message: "commit has no Cr-Commit-Position footer".to_string(),
    })
  }

  async fn checkout(&self, out_dir: &Path, target_os: &str, sha: &str) -> Result<(), ToolError> {
    tokio::fs::create_dir_all(out_dir).await?;

    let gclient_file = out_dir.join(".gclient");
    if !gclient_file.exists() {
      info!(out_dir = %out_dir.display(), "fetching source");
      self
        .toolchain
        .tool("fetch")
        .args(["--nohooks", "webrtc"])
        .current_dir(out_dir)
        .run()
        .await?;

      if matches!(target_os, "android" | "ios") {
        let mut config = tokio::fs::read_to_string(&gclient_file).await?;
        config.push_str(&format!("target_os = ['{target_os}']\n"));
        tokio::fs::write(&gclient_file, config).await?;
      }
    }

    info!(sha, "syncing source");
    self
      .toolchain
      .tool("gclient")
      .args(["sync", "--force", "--revision", sha])
      .current_dir(out_dir)
      .run()
      .await?;

    if !out_dir.join(SOURCE_DIR).is_dir() {
      return Err(ToolError::NotFound(format!(
        "source tree at {}",
        out_dir.join(SOURCE_DIR).display()
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::collections::HashMap;

  // ==========================================================================
  // Test VersionControl
  // ==========================================================================

  #[derive(Default)]
  struct FakeRemote {
    branches: HashMap<String, String>,
    head: Option<String>,
    numbers: HashMap<String, u64>,
    lookups: RefCell<Vec<String>>,
  }

  impl FakeRemote {
    fn with_branch(mut self, branch: &str, sha: &str) -> Self {
      self.branches.insert(branch.to_string(), sha.to_string());
      self
    }

    fn with_head(mut self, sha: &str) -> Self {
      self.head = Some(sha.to_string());
      self
    }

    fn with_number(mut self, sha: &str, number: u64) -> Self {
      self.numbers.insert(sha.to_string(), number);
      self
    }
  }

  impl VersionControl for FakeRemote {
    async fn branch_head(&self, branch: &str) -> Result<String, ToolError> {
      self.lookups.borrow_mut().push(format!("branch:{branch}"));
      self
        .branches
        .get(branch)
        .cloned()
        .ok_or_else(|| ToolError::NotFound(branch.to_string()))
    }

    async fn latest_revision(&self) -> Result<String, ToolError> {
      self.lookups.borrow_mut().push("latest".to_string());
      self.head.clone().ok_or_else(|| ToolError::NotFound("HEAD".to_string()))
    }

    async fn revision_number(&self, sha: &str) -> Result<u64, ToolError> {
      self.lookups.borrow_mut().push(format!("number:{sha}"));
      self
        .numbers
        .get(sha)
        .copied()
        .ok_or_else(|| ToolError::NotFound(sha.to_string()))
    }

    async fn checkout(&self, _out_dir: &Path, _target_os: &str, _sha: &str) -> Result<(), ToolError> {
      unreachable!("resolution never checks out")
    }
  }

  #[tokio::test]
  async fn branch_overrides_explicit_revision() {
    let remote = FakeRemote::default()
      .with_branch("branch-heads/m79", "b1b1b1b1b1")
      .with_number("b1b1b1b1b1", 29500);

    let revision = resolve(&remote, Some("branch-heads/m79"), Some("ffffffffff")).await.unwrap();

    assert_eq!(revision, Revision::new("b1b1b1b1b1", 29500));
    assert_eq!(
      *remote.lookups.borrow(),
      vec!["branch:branch-heads/m79", "number:b1b1b1b1b1"]
    );
  }

  #[tokio::test]
  async fn explicit_revision_used_verbatim() {
    let remote = FakeRemote::default().with_number("abc123", 100);

    let revision = resolve(&remote, None, Some("abc123")).await.unwrap();

    assert_eq!(revision.sha, "abc123");
    assert_eq!(revision.number, 100);
    assert_eq!(*remote.lookups.borrow(), vec!["number:abc123"]);
  }

  #[tokio::test]
  async fn neither_resolves_latest() {
    let remote = FakeRemote::default().with_head("dddd").with_number("dddd", 31000);

    let revision = resolve(&remote, None, None).await.unwrap();

    assert_eq!(revision, Revision::new("dddd", 31000));
  }

  #[tokio::test]
  async fn empty_strings_count_as_unset() {
    let remote = FakeRemote::default().with_head("dddd").with_number("dddd", 1);

    let revision = resolve(&remote, Some(""), Some("")).await.unwrap();

    assert_eq!(revision.sha, "dddd");
  }

  #[tokio::test]
  async fn missing_branch_is_fatal() {
    let remote = FakeRemote::default();

    let result = resolve(&remote, Some("nope"), None).await;

    assert!(matches!(result, Err(ToolError::NotFound(_))));
    assert_eq!(*remote.lookups.borrow(), vec!["branch:nope"]);
  }

  #[tokio::test]
  async fn missing_revision_number_is_fatal() {
    let remote = FakeRemote::default().with_head("dddd");

    let result = resolve(&remote, None, None).await;

    assert!(matches!(result, Err(ToolError::NotFound(_))));
  }

  #[test]
  fn short_sha_is_seven_characters() {
    let revision = Revision::new("0123456789abcdef", 1);
    assert_eq!(revision.short_sha(), "0123456");
    assert_eq!(Revision::new("abc", 1).short_sha(), "abc");
  }

  #[test]
  fn parse_commit_position_from_commit_object() {
    let commit = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                  parent 5c1f0a0e\n\
                  author Someone <someone@example.org> 1600000000 +0000\n\
                  committer Commit Bot <commit-bot@chromium.org> 1600000000 +0000\n\
                  \n\
                  Fix audio glitch\n\
                  \n\
                  Bug: webrtc:1234\n\
                  Cr-Commit-Position: refs/heads/master@{#32001}\n";
    assert_eq!(parse_commit_position(commit), Some(32001));
  }

  #[test]
  fn parse_commit_position_uses_last_footer() {
    let commit = "Revert \"x\"\n\nCr-Commit-Position: refs/heads/master@{#100}\n\nCr-Commit-Position: refs/heads/master@{#105}";
    assert_eq!(parse_commit_position(commit), Some(105));
  }

  #[test]
  fn parse_commit_position_missing_or_malformed() {
    assert_eq!(parse_commit_position("no footer here"), None);
    assert_eq!(parse_commit_position("Cr-Commit-Position: refs/heads/master@{#abc}"), None);
    assert_eq!(parse_commit_position("Cr-Commit-Position: refs/heads/master"), None);
  }

  #[test]
  fn repo_url_trailing_slash_is_trimmed() {
    let vcs = GitVersionControl::new("https://example.org/webrtc/", Toolchain::new("tools"));
    assert_eq!(vcs.repo_url, "https://example.org/webrtc");
  }
}
