//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the opaque pixel primitives the rest of
//! the crate is built on: decode bytes, load a file, resample to a rectangle,
//! and encode to an [`OutputFormat`]. Cropping and window math live in
//! [`operations`](super::operations) and [`calculations`](super::calculations),
//! so a backend only ever does pixel work.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use crate::types::OutputFormat;
use image::DynamicImage;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Resample failed: {0}")]
    Resample(String),
    #[error("Encode failed: {0}")]
    Encode(String),
}

/// Trait for image processing backends.
///
/// Implementations must be deterministic: the same input image and parameters
/// always produce the same pixels and the same encoded bytes. Lazily rendered
/// variants rely on this to make a repeated render indistinguishable from the
/// first.
pub trait ImageBackend: Send + Sync {
    /// Decode an in-memory image of any supported format.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Load and decode an image from disk.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Resample `image` into exactly `width`×`height`, ignoring aspect ratio.
    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode `image` in `format` into `sink`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        sink: &mut dyn Write,
    ) -> Result<(), BackendError>;
}
