//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image` crate (pure Rust decoders) |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the recipe's quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless, default settings) |

use super::backend::{BackendError, ImageBackend};
use crate::types::OutputFormat;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Write;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
    }

    fn resample(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, BackendError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BackendError::Resample(format!(
                "empty source {}x{}",
                image.width(),
                image.height()
            )));
        }
        if width == 0 || height == 0 {
            return Err(BackendError::Resample(format!(
                "empty target {width}x{height}"
            )));
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        sink: &mut dyn Write,
    ) -> Result<(), BackendError> {
        let result = match format {
            OutputFormat::Jpeg { quality } => {
                // JPEG has no alpha channel and the encoder's floor is 1
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(sink, quality.value().max(1));
                rgb.write_with_encoder(encoder)
            }
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(sink)),
        };
        result.map_err(|e| BackendError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Quality;
    use crate::test_helpers::gradient;

    fn encode(image: &DynamicImage, format: OutputFormat) -> Vec<u8> {
        let mut out = Vec::new();
        RustBackend::new().encode(image, format, &mut out).unwrap();
        out
    }

    #[test]
    fn resample_produces_exact_size() {
        let out = RustBackend::new()
            .resample(&gradient(200, 100), 37, 91)
            .unwrap();
        assert_eq!((out.width(), out.height()), (37, 91));
    }

    #[test]
    fn resample_rejects_empty_target() {
        let result = RustBackend::new().resample(&gradient(10, 10), 0, 5);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    #[test]
    fn resample_rejects_empty_source() {
        let result = RustBackend::new().resample(&DynamicImage::new_rgb8(0, 0), 5, 5);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    #[test]
    fn jpeg_roundtrip_keeps_dimensions() {
        let bytes = encode(&gradient(64, 32), OutputFormat::default());
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = RustBackend::new().decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 32));
    }

    #[test]
    fn jpeg_accepts_rgba_input() {
        let rgba = DynamicImage::ImageRgba8(gradient(16, 16).to_rgba8());
        let bytes = encode(&rgba, OutputFormat::default());
        assert!(!bytes.is_empty());
    }

    #[test]
    fn jpeg_quality_zero_still_encodes() {
        let format = OutputFormat::Jpeg {
            quality: Quality::new(0),
        };
        assert!(!encode(&gradient(16, 16), format).is_empty());
    }

    #[test]
    fn png_is_lossless() {
        let source = gradient(20, 10);
        let bytes = encode(&source, OutputFormat::Png);
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = RustBackend::new().decode(&bytes).unwrap();
        assert_eq!(decoded.to_rgb8(), source.to_rgb8());
    }

    #[test]
    fn encoding_is_deterministic() {
        let source = gradient(50, 40);
        let format = OutputFormat::Jpeg {
            quality: Quality::new(65),
        };
        assert_eq!(encode(&source, format), encode(&source, format));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = RustBackend::new().decode(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }
}
