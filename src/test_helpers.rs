//! Shared test utilities for the simple-img test suite.
//!
//! Provides synthetic images with predictable pixels, encoded uploads, and
//! stores rooted in temporary directories.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, store) = temp_store();
//! let source = store.put(&encoded_jpeg(200, 100)).unwrap();
//! let variant = store.reserve(&source, "scale-100x50").unwrap();
//! assert_eq!(store.read(&variant).unwrap().content_type, "image/jpeg");
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;

use crate::imaging::ImageBackend;
use crate::store::Store;

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image whose red channel grows left to right (0 at x=0, 255 at the
/// right edge) and whose green channel grows top to bottom.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let ramp = |pos: u32, len: u32| -> u8 {
        if len <= 1 {
            0
        } else {
            (pos * 255 / (len - 1)) as u8
        }
    };
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([ramp(x, width), ramp(y, height), 96])
    });
    DynamicImage::ImageRgb8(img)
}

/// A gradient encoded as JPEG, as a client would upload it.
pub fn encoded_jpeg(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Jpeg)
}

/// A gradient encoded as PNG.
pub fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    encoded(width, height, ImageFormat::Png)
}

fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    gradient(width, height)
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

// =========================================================================
// Stores
// =========================================================================

/// A store with the real backend rooted in a fresh temp directory.
///
/// Keep the `TempDir` alive for the duration of the test.
pub fn temp_store() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let store = Store::from_config(
        &crate::config::StorageConfig {
            root: tmp.path().to_path_buf(),
            ..Default::default()
        },
        &Default::default(),
    );
    (tmp, store)
}

/// A store over any backend (usually `MockBackend`) in a fresh temp directory.
pub fn mock_store<B: ImageBackend>(backend: B) -> (TempDir, Store<B>) {
    let tmp = TempDir::new().unwrap();
    let store = Store::with_backend(tmp.path(), backend);
    (tmp, store)
}
