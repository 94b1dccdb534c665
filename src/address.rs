//! Container addresses: random tokens sharded into nested directories.
//!
//! A fresh upload gets a container directory named by a random token,
//! URL-safe base64 encoded and split into `fan_out` single-character levels
//! plus a remainder:
//!
//! ```text
//! token  q3Zk9Xv0cBmLr_2N8aYtWe1H
//! path   q/3/Z/k9Xv0cBmLr_2N8aYtWe1H/source.jpeg
//! ```
//!
//! Each level holds at most 64 entries (the base64 alphabet), so directory
//! listings stay small however large the store grows.
//!
//! The source file is created with `create_new`, so two allocations that draw
//! the same token cannot both succeed; the loser retries with a new token.

use crate::naming::SOURCE_FILENAME;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("no free address after {0} attempts")]
    Exhausted(u32),
}

/// A freshly claimed container: its directory and the exclusively created,
/// still empty source file.
#[derive(Debug)]
pub struct Allocation {
    pub dir: PathBuf,
    pub source_path: PathBuf,
    pub file: File,
}

/// Allocator parameters (see [`StorageConfig`](crate::config::StorageConfig)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressAllocator {
    pub fan_out: usize,
    pub token_bytes: usize,
    pub attempts: u32,
}

impl Default for AddressAllocator {
    fn default() -> Self {
        Self {
            fan_out: 3,
            token_bytes: 18,
            attempts: 10,
        }
    }
}

impl AddressAllocator {
    /// Claim a new container under `root`.
    pub fn allocate(&self, root: &Path) -> Result<Allocation, AllocationError> {
        self.allocate_with(root, || random_token(self.token_bytes))
    }

    /// Claim a new container, drawing tokens from `next_token`.
    pub fn allocate_with(
        &self,
        root: &Path,
        mut next_token: impl FnMut() -> String,
    ) -> Result<Allocation, AllocationError> {
        for _ in 0..self.attempts {
            let dir = root.join(shard_path(&next_token(), self.fan_out));
            fs::create_dir_all(&dir)?;

            let source_path = dir.join(SOURCE_FILENAME);
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&source_path)
            {
                Ok(file) => {
                    return Ok(Allocation {
                        dir,
                        source_path,
                        file,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %source_path.display(), "address collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AllocationError::Exhausted(self.attempts))
    }

    /// Length in characters of an encoded token.
    pub fn token_len(&self) -> usize {
        (self.token_bytes * 4).div_ceil(3)
    }
}

/// `bytes` bytes from the OS random source, URL-safe base64 without padding.
pub fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Split a token into `fan_out` single-character directories plus the rest.
///
/// ```
/// # use simple_img::address::shard_path;
/// assert_eq!(shard_path("abcdef", 3), std::path::PathBuf::from("a/b/c/def"));
/// ```
pub fn shard_path(token: &str, fan_out: usize) -> PathBuf {
    let mut path = PathBuf::new();
    let mut chars = token.char_indices();
    for _ in 0..fan_out {
        match chars.next() {
            Some((i, c)) => path.push(&token[i..i + c.len_utf8()]),
            None => return path,
        }
    }
    if let Some((i, _)) = chars.next() {
        path.push(&token[i..]);
    }
    path
}
