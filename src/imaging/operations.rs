//! High-level image operations: the transformation engine and format codec.
//!
//! These functions combine [`calculations`](super::calculations) with backend
//! primitives. The backend only resamples and encodes; every crop window and
//! fitted size is decided here.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{clip_dimensions, cover_dimensions, crop_origin};
use crate::types::{OutputFormat, Recipe, Transformation};
use image::{DynamicImage, RgbaImage};
use std::io::Write;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Default cap on any buffer the engine allocates: 8192×8192 pixels.
pub const DEFAULT_MAX_PIXELS: u64 = 8192 * 8192;

/// Apply a transformation to a decoded image.
///
/// Output is exactly the requested size, except `Clip` (fitted inside the
/// box) and `Cut` with a target scale (exactly the scale size).
///
/// Every intermediate and output size is checked against `max_pixels`
/// before anything is allocated.
pub fn apply(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    transformation: &Transformation,
    max_pixels: u64,
) -> Result<DynamicImage> {
    let source = non_empty(image)?;

    match *transformation {
        Transformation::Scale { width, height } => {
            ensure_within(width, height, max_pixels)?;
            backend.resample(image, width, height)
        }
        Transformation::Clip { width, height } => {
            let (w, h) = clip_dimensions(source, (width, height));
            ensure_within(w, h, max_pixels)?;
            backend.resample(image, w, h)
        }
        Transformation::Crop {
            width,
            height,
            center_x,
            center_y,
        } => {
            ensure_area(width, height)?;
            ensure_within(width, height, max_pixels)?;
            let (scaled_w, scaled_h) = cover_dimensions(source, (width, height));
            ensure_within(scaled_w, scaled_h, max_pixels)?;
            let scaled = backend.resample(image, scaled_w, scaled_h)?;
            let (left, top) = crop_origin(
                (scaled.width(), scaled.height()),
                (width, height),
                (center_x, center_y),
            );
            Ok(scaled.crop_imm(left, top, width, height))
        }
        Transformation::Cut {
            width,
            height,
            top,
            left,
            scale_width,
            scale_height,
        } => {
            ensure_area(width, height)?;
            ensure_within(width, height, max_pixels)?;
            ensure_within(scale_width, scale_height, max_pixels)?;
            let window = cut_window(image, left, top, width, height);
            if (scale_width, scale_height) == (width, height) {
                Ok(window)
            } else {
                backend.resample(&window, scale_width, scale_height)
            }
        }
    }
}

/// Encode an image in the given format into `sink`.
pub fn encode(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    format: OutputFormat,
    sink: &mut dyn Write,
) -> Result<()> {
    backend.encode(image, format, sink)
}

/// Render a recipe against a source image into encoded bytes.
pub fn render(
    backend: &impl ImageBackend,
    source: &DynamicImage,
    recipe: &Recipe,
    max_pixels: u64,
) -> Result<Vec<u8>> {
    let transformed = apply(backend, source, &recipe.transformation, max_pixels)?;
    let mut bytes = Vec::new();
    encode(backend, &transformed, recipe.format, &mut bytes)?;
    Ok(bytes)
}

/// Literal `width`×`height` pixel window with its top-left at (`left`, `top`).
///
/// Parts of the window outside the source stay transparent.
fn cut_window(image: &DynamicImage, left: u32, top: u32, width: u32, height: u32) -> DynamicImage {
    let visible = image.crop_imm(left, top, width, height).to_rgba8();
    let mut canvas = RgbaImage::new(width, height);
    image::imageops::replace(&mut canvas, &visible, 0, 0);
    DynamicImage::ImageRgba8(canvas)
}

fn non_empty(image: &DynamicImage) -> Result<(u32, u32)> {
    ensure_area(image.width(), image.height())?;
    Ok((image.width(), image.height()))
}

fn ensure_area(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(BackendError::Resample(format!(
            "zero-area rectangle {width}x{height}"
        )));
    }
    Ok(())
}

fn ensure_within(width: u32, height: u32, max_pixels: u64) -> Result<()> {
    let area = u64::from(width) * u64::from(height);
    if area > max_pixels {
        return Err(BackendError::Resample(format!(
            "{width}x{height} exceeds the {max_pixels} pixel limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::gradient;
    use image::GenericImageView;

    fn dims(image: &DynamicImage) -> (u32, u32) {
        (image.width(), image.height())
    }

    // =========================================================================
    // Engine with mock backend (dimension planning)
    // =========================================================================

    #[test]
    fn scale_ignores_aspect_ratio() {
        let backend = MockBackend::new();
        let t = Transformation::Scale {
            width: 100,
            height: 50,
        };
        let out = apply(&backend, &gradient(30, 90), &t, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(dims(&out), (100, 50));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resample {
                width: 100,
                height: 50
            }]
        );
    }

    #[test]
    fn clip_fits_inside_box() {
        let backend = MockBackend::new();
        let t = Transformation::Clip {
            width: 50,
            height: 50,
        };
        let out = apply(&backend, &gradient(200, 100), &t, DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!(dims(&out), (50, 25));
    }

    #[test]
    fn clip_collapsing_axis_is_resample_error() {
        let t = Transformation::Clip {
            width: 10,
            height: 10,
        };
        let result = apply(&RustBackend::new(), &gradient(1000, 1), &t, DEFAULT_MAX_PIXELS);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    #[test]
    fn crop_scales_to_cover_then_cuts() {
        let backend = MockBackend::new();
        let t = Transformation::Crop {
            width: 50,
            height: 50,
            center_x: 50,
            center_y: 50,
        };
        let out = apply(&backend, &gradient(200, 100), &t, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(dims(&out), (50, 50));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resample {
                width: 100,
                height: 50
            }]
        );
    }

    #[test]
    fn cut_without_rescale_skips_backend() {
        let backend = MockBackend::new();
        let t = Transformation::Cut {
            width: 10,
            height: 5,
            top: 0,
            left: 0,
            scale_width: 10,
            scale_height: 5,
        };
        let out = apply(&backend, &gradient(40, 40), &t, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(dims(&out), (10, 5));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn cut_with_rescale_resamples_window() {
        let backend = MockBackend::new();
        let t = Transformation::Cut {
            width: 10,
            height: 5,
            top: 3,
            left: 4,
            scale_width: 40,
            scale_height: 20,
        };
        let out = apply(&backend, &gradient(40, 40), &t, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(dims(&out), (40, 20));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resample {
                width: 40,
                height: 20
            }]
        );
    }

    #[test]
    fn empty_source_is_resample_error() {
        let t = Transformation::Scale {
            width: 10,
            height: 10,
        };
        let result = apply(&MockBackend::new(), &DynamicImage::new_rgb8(0, 4), &t, DEFAULT_MAX_PIXELS);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    #[test]
    fn backend_failure_propagates() {
        let t = Transformation::Scale {
            width: 10,
            height: 10,
        };
        let result = apply(&MockBackend::failing_resample(), &gradient(4, 4), &t, DEFAULT_MAX_PIXELS);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    // =========================================================================
    // Size limit
    // =========================================================================

    #[test]
    fn scale_beyond_limit_is_rejected_before_resampling() {
        let backend = MockBackend::new();
        let t = Transformation::Scale {
            width: 11,
            height: 10,
        };
        let result = apply(&backend, &gradient(4, 4), &t, 100);

        assert!(matches!(result, Err(BackendError::Resample(_))));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn crop_checks_the_cover_size() {
        // 5x5 fits in 100 pixels, but covering it from 200x10 needs 100x5
        let backend = MockBackend::new();
        let t = Transformation::Crop {
            width: 5,
            height: 5,
            center_x: 50,
            center_y: 50,
        };
        let result = apply(&backend, &gradient(200, 10), &t, 100);

        assert!(matches!(result, Err(BackendError::Resample(_))));
        assert!(backend.get_operations().is_empty());
        apply(&backend, &gradient(200, 10), &t, 500).unwrap();
    }

    #[test]
    fn cut_with_overflowing_window_is_rejected() {
        let t = Transformation::Cut {
            width: u32::MAX,
            height: u32::MAX,
            top: 0,
            left: 0,
            scale_width: u32::MAX,
            scale_height: u32::MAX,
        };
        let result = apply(&RustBackend::new(), &gradient(4, 4), &t, DEFAULT_MAX_PIXELS);
        assert!(matches!(result, Err(BackendError::Resample(_))));
    }

    #[test]
    fn cut_checks_the_scale_size() {
        let backend = MockBackend::new();
        let t = Transformation::Cut {
            width: 4,
            height: 4,
            top: 0,
            left: 0,
            scale_width: 60000,
            scale_height: 60000,
        };
        let result = apply(&backend, &gradient(8, 8), &t, DEFAULT_MAX_PIXELS);

        assert!(matches!(result, Err(BackendError::Resample(_))));
        assert!(backend.get_operations().is_empty());
    }

    // =========================================================================
    // Engine with the real backend (pixel placement)
    // =========================================================================

    #[test]
    fn cut_copies_literal_pixels_at_left_top() {
        let source = gradient(40, 30);
        let t = Transformation::Cut {
            width: 5,
            height: 4,
            top: 7,
            left: 11,
            scale_width: 5,
            scale_height: 4,
        };
        let out = apply(&RustBackend::new(), &source, &t, DEFAULT_MAX_PIXELS).unwrap();

        for y in 0..4 {
            for x in 0..5 {
                let expected = source.get_pixel(11 + x, 7 + y);
                assert_eq!(out.get_pixel(x, y), expected, "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn cut_past_the_edge_is_transparent() {
        let t = Transformation::Cut {
            width: 10,
            height: 10,
            top: 5,
            left: 5,
            scale_width: 10,
            scale_height: 10,
        };
        let out = apply(&RustBackend::new(), &gradient(10, 10), &t, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(dims(&out), (10, 10));
        assert_eq!(out.get_pixel(9, 9).0[3], 0);
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn crop_top_left_takes_top_left_region() {
        // 200x100: covering 50x50 scales to 100x50; center 0,0 picks x in 0..50
        let source = gradient(200, 100);
        let t = Transformation::Crop {
            width: 50,
            height: 50,
            center_x: 0,
            center_y: 0,
        };
        let out = apply(&RustBackend::new(), &source, &t, DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!(dims(&out), (50, 50));

        // The gradient's red channel grows left to right; the left half of
        // the scaled image never reaches the source's right half.
        let right_edge_red = out.get_pixel(49, 25).0[0];
        assert!(right_edge_red < 140, "red {right_edge_red}");
    }

    #[test]
    fn crop_bottom_right_takes_right_region() {
        let source = gradient(200, 100);
        let t = Transformation::Crop {
            width: 50,
            height: 50,
            center_x: 100,
            center_y: 100,
        };
        let out = apply(&RustBackend::new(), &source, &t, DEFAULT_MAX_PIXELS).unwrap();
        let left_edge_red = out.get_pixel(0, 25).0[0];
        assert!(left_edge_red > 115, "red {left_edge_red}");
    }

    #[test]
    fn render_is_deterministic() {
        let recipe = Recipe {
            transformation: Transformation::Crop {
                width: 31,
                height: 17,
                center_x: 30,
                center_y: 70,
            },
            format: OutputFormat::default(),
        };
        let source = gradient(120, 80);
        let backend = RustBackend::new();

        let first = render(&backend, &source, &recipe, DEFAULT_MAX_PIXELS).unwrap();
        let second = render(&backend, &source, &recipe, DEFAULT_MAX_PIXELS).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn render_encodes_with_recipe_format() {
        let backend = MockBackend::new();
        let recipe = Recipe {
            transformation: Transformation::Scale {
                width: 3,
                height: 2,
            },
            format: OutputFormat::Png,
        };
        let bytes = render(&backend, &gradient(9, 9), &recipe, DEFAULT_MAX_PIXELS).unwrap();

        assert_eq!(bytes, b"mock 3x2");
        assert_eq!(
            backend.get_operations().last(),
            Some(&RecordedOp::Encode(OutputFormat::Png))
        );
    }
}
