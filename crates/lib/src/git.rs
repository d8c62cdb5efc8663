//! In-process git transfers.
//!
//! Cloning the toolchain and looking up remote refs go through gix. Both are
//! blocking, so the async entry points hand them to the blocking pool.
//! Source checkout and patching still spawn depot_tools and `git apply`.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use gix::remote::fetch::Shallow;
use tracing::{debug, info};

use crate::tool::ToolError;

fn git_error(url: &str, source: impl std::error::Error + Send + Sync + 'static) -> ToolError {
  ToolError::Git {
    url: url.to_string(),
    source: Box::new(source),
  }
}

/// Clone the tip of `url` into `dest` with a depth of one and check it out.
///
/// `dest` must not exist or be empty. A failed clone leaves nothing behind.
pub fn clone_shallow(url: &str, dest: &Path) -> Result<(), ToolError> {
  info!(url, dest = %dest.display(), "cloning");
  let mut prepared = gix::prepare_clone(url, dest)
    .map_err(|e| git_error(url, e))?
    .with_shallow(Shallow::DepthAtRemote(NonZeroU32::MIN));

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| git_error(url, e))?;

  checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| git_error(url, e))?;
  Ok(())
}

/// Object id that `reference` points to on the remote at `url`.
///
/// `reference` is a full ref name such as `refs/heads/main`, or `HEAD`.
/// Returns `None` when the remote does not advertise it.
pub fn remote_ref(url: &str, reference: &str) -> Result<Option<String>, ToolError> {
  // Listing refs needs a repository to hang the remote on; nothing is fetched into it
  let scratch = tempfile::TempDir::new()?;
  let repo = gix::init_bare(scratch.path()).map_err(|e| git_error(url, e))?;

  let remote = repo
    .remote_at(url)
    .map_err(|e| git_error(url, e))?
    .with_refspecs([reference], Direction::Fetch)
    .map_err(|e| git_error(url, e))?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| git_error(url, e))?;
  let prepared = connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| git_error(url, e))?;

  let id = prepared.ref_map().remote_refs.iter().find_map(|advertised| {
    let (name, target, peeled) = advertised.unpack();
    if name != reference {
      return None;
    }
    peeled.or(target).map(|id| id.to_string())
  });
  debug!(url, reference, id = ?id, "remote ref");
  Ok(id)
}

/// [`clone_shallow`] on the blocking pool.
pub async fn clone_shallow_async(url: &str, dest: &Path) -> Result<(), ToolError> {
  let (url, dest): (String, PathBuf) = (url.to_string(), dest.to_path_buf());
  tokio::task::spawn_blocking(move || clone_shallow(&url, &dest)).await?
}

/// [`remote_ref`] on the blocking pool.
pub async fn remote_ref_async(url: &str, reference: &str) -> Result<Option<String>, ToolError> {
  let (url, reference) = (url.to_string(), reference.to_string());
  tokio::task::spawn_blocking(move || remote_ref(&url, &reference)).await?
}
