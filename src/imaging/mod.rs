//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory`, `ImageReader` |
//! | **Resample** | `resize_exact` with Lanczos3 |
//! | **Crop / cut windows** | `crop_imm` + `imageops::replace` |
//! | **Encode** | `JpegEncoder` (quality 0–100), `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`Quality`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The transformation engine and format codec

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{clip_dimensions, cover_dimensions, crop_origin};
pub use operations::{DEFAULT_MAX_PIXELS, apply, encode, render};
pub use params::Quality;
pub use rust_backend::RustBackend;
