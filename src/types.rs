//! Shared recipe types used by the grammar, the imaging engine, and the store.
//!
//! A derived variant is fully described by a [`Recipe`]: what to do to the
//! pixels ([`Transformation`]) and how to serialize the result
//! ([`OutputFormat`]). Both are closed enums so the engine and codec match
//! them exhaustively.

use crate::imaging::Quality;
use serde::Serialize;

/// A geometric transformation applied to a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transformation {
    /// Resample into exactly `width`×`height`, ignoring aspect ratio.
    Scale { width: u32, height: u32 },
    /// Fit inside `width`×`height`, keeping aspect ratio. No padding, no cropping.
    Clip { width: u32, height: u32 },
    /// Cover `width`×`height`, then cut a window centered at
    /// (`center_x`%, `center_y`%) of the scaled image.
    Crop {
        width: u32,
        height: u32,
        center_x: u32,
        center_y: u32,
    },
    /// Copy a raw `width`×`height` pixel window at (`left`, `top`), then
    /// resample it to `scale_width`×`scale_height` if that differs.
    Cut {
        width: u32,
        height: u32,
        top: u32,
        left: u32,
        scale_width: u32,
        scale_height: u32,
    },
}

impl Transformation {
    /// The final output size this transformation asks for.
    ///
    /// For `Clip` this is the bounding box; the rendered image may be smaller
    /// on one axis.
    pub fn target_size(&self) -> (u32, u32) {
        match *self {
            Self::Scale { width, height }
            | Self::Clip { width, height }
            | Self::Crop { width, height, .. } => (width, height),
            Self::Cut {
                scale_width,
                scale_height,
                ..
            } => (scale_width, scale_height),
        }
    }
}

/// Encoding of a rendered variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg { quality: Quality },
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg {
            quality: Quality::default(),
        }
    }
}

impl OutputFormat {
    /// MIME type of the encoded bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A complete variant recipe: the pair a placeholder filename encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Recipe {
    pub transformation: Transformation,
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_target_is_scale_size() {
        let t = Transformation::Cut {
            width: 20,
            height: 10,
            top: 0,
            left: 0,
            scale_width: 40,
            scale_height: 30,
        };
        assert_eq!(t.target_size(), (40, 30));
    }

    #[test]
    fn crop_target_is_window_size() {
        let t = Transformation::Crop {
            width: 50,
            height: 60,
            center_x: 0,
            center_y: 100,
        };
        assert_eq!(t.target_size(), (50, 60));
    }

    #[test]
    fn default_format_is_jpeg_80() {
        assert_eq!(
            OutputFormat::default(),
            OutputFormat::Jpeg {
                quality: Quality::new(80)
            }
        );
        assert_eq!(OutputFormat::default().content_type(), "image/jpeg");
    }
}
