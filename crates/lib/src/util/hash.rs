//! SHA-256 helpers for package manifests.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hash a file's contents, returning the lowercase hex digest.
pub fn hash_file(path: &Path) -> io::Result<String> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buf = [0u8; 64 * 1024];
  loop {
    let n = file.read(&mut buf)?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }
  Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn hash_file_matches_known_digest() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hello.txt");
    std::fs::write(&path, "hello").unwrap();
    assert_eq!(
      hash_file(&path).unwrap(),
      "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
  }

  #[test]
  fn hash_file_missing_is_io_error() {
    let temp = TempDir::new().unwrap();
    assert!(hash_file(&temp.path().join("absent")).is_err());
  }
}
