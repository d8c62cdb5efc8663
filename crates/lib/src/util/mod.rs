//! Shared utilities.
//!
//! File hashing for package manifests and cross-platform test helpers.

pub mod hash;

#[cfg(test)]
pub mod testutil;
