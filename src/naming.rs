//! Variant-name grammar: parsing a path segment into a [`Recipe`] and back.
//!
//! Every derived variant lives next to its source under a filename that *is*
//! its recipe. A client asks for `crop-200x200.png`; the store reserves a
//! placeholder under the canonical spelling `crop-200x200-x50y50.png`, and on
//! first read re-parses that filename to learn what to render. Parsing and
//! canonicalization must therefore be exact inverses.
//!
//! ## Grammar
//!
//! A segment is an optional format suffix preceded by one of four shapes,
//! each anchored at both ends and tried in this order:
//!
//! | Shape | Example | Recipe |
//! |---|---|---|
//! | `(scale-)?WxH` | `400x300` | Scale |
//! | `clip-WxH` | `clip-400x300` | Clip |
//! | `crop-WxH(-xCXyCY)?` | `crop-50x50-x0y0` | Crop, center defaults to 50,50 |
//! | `cut-WxH-tTlL(-sSWxSH)?` | `cut-20x20-t5l10-s40x40` | Cut, scale defaults to W,H |
//!
//! Suffixes: `.png`, `.jpeg`, `.jpg`, or `.q<N>.jpeg`. No suffix means JPEG at
//! quality 80. Numbers are ASCII decimal only.
//!
//! ## Canonical names
//!
//! - `scale-WxH`, `clip-WxH`, `crop-WxH-xCXyCY`, `cut-WxH-tTlL-sSWxSH`
//! - `.png`, `.jpeg` for quality 80, `.q<N>.jpeg` otherwise

use crate::imaging::Quality;
use crate::types::{OutputFormat, Recipe, Transformation};
use regex::{Captures, Regex};
use thiserror::Error;

/// Reserved filename of the source image inside every container directory.
pub const SOURCE_FILENAME: &str = "source.jpeg";

/// Reserved filename of the metadata sidecar inside every container directory.
pub const METADATA_FILENAME: &str = "metadata.txt";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unparseable format: {0:?}")]
    Unparseable(String),
}

/// Compiled variant-name grammar.
///
/// Built once at startup and shared by reference; holds no mutable state.
#[derive(Debug, Clone)]
pub struct Grammar {
    suffix: Regex,
    scale: Regex,
    clip: Regex,
    crop: Regex,
    cut: Regex,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("grammar pattern must compile");
        Self {
            suffix: compile(r"\.(?:(?:q(-?[0-9]+)\.)?(jpe?g)|(png))$"),
            scale: compile(r"^(?:scale-)?([0-9]+)x([0-9]+)$"),
            clip: compile(r"^clip-([0-9]+)x([0-9]+)$"),
            crop: compile(r"^crop-([0-9]+)x([0-9]+)(?:-x([0-9]+)y([0-9]+))?$"),
            cut: compile(r"^cut-([0-9]+)x([0-9]+)-t([0-9]+)l([0-9]+)(?:-s([0-9]+)x([0-9]+))?$"),
        }
    }

    /// Parse a path segment into a recipe.
    ///
    /// The format suffix is stripped first; what remains must match one of
    /// the four transformation shapes exactly.
    pub fn parse(&self, segment: &str) -> Result<Recipe, ParseError> {
        let unparseable = || ParseError::Unparseable(segment.to_string());

        let (body, format) = match self.suffix.captures(segment) {
            Some(caps) => {
                let whole = caps.get(0).ok_or_else(unparseable)?;
                let format = if caps.get(3).is_some() {
                    OutputFormat::Png
                } else {
                    let quality = caps
                        .get(1)
                        .map(|q| parse_quality(q.as_str()))
                        .unwrap_or_default();
                    OutputFormat::Jpeg { quality }
                };
                (&segment[..whole.start()], format)
            }
            None => (segment, OutputFormat::default()),
        };

        let transformation = self.parse_transformation(body).ok_or_else(unparseable)?;
        Ok(Recipe {
            transformation,
            format,
        })
    }

    fn parse_transformation(&self, body: &str) -> Option<Transformation> {
        if let Some(caps) = self.scale.captures(body) {
            return Some(Transformation::Scale {
                width: field(&caps, 1)?,
                height: field(&caps, 2)?,
            });
        }
        if let Some(caps) = self.clip.captures(body) {
            return Some(Transformation::Clip {
                width: field(&caps, 1)?,
                height: field(&caps, 2)?,
            });
        }
        if let Some(caps) = self.crop.captures(body) {
            let (center_x, center_y) = match caps.get(3) {
                Some(_) => (field(&caps, 3)?, field(&caps, 4)?),
                None => (50, 50),
            };
            return Some(Transformation::Crop {
                width: field(&caps, 1)?,
                height: field(&caps, 2)?,
                center_x,
                center_y,
            });
        }
        if let Some(caps) = self.cut.captures(body) {
            let width = field(&caps, 1)?;
            let height = field(&caps, 2)?;
            let (scale_width, scale_height) = match caps.get(5) {
                Some(_) => (field(&caps, 5)?, field(&caps, 6)?),
                None => (width, height),
            };
            return Some(Transformation::Cut {
                width,
                height,
                top: field(&caps, 3)?,
                left: field(&caps, 4)?,
                scale_width,
                scale_height,
            });
        }
        None
    }
}

/// Numeric capture group. `None` if absent or too large for `u32`.
fn field(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

/// Quality digits clamp into range; values too long to parse saturate.
fn parse_quality(digits: &str) -> Quality {
    match digits.parse::<i64>() {
        Ok(v) => Quality::from_signed(v),
        Err(_) if digits.starts_with('-') => Quality::from_signed(i64::MIN),
        Err(_) => Quality::from_signed(i64::MAX),
    }
}

/// Canonical name of a transformation, without suffix.
pub fn transformation_name(t: &Transformation) -> String {
    match *t {
        Transformation::Scale { width, height } => format!("scale-{width}x{height}"),
        Transformation::Clip { width, height } => format!("clip-{width}x{height}"),
        Transformation::Crop {
            width,
            height,
            center_x,
            center_y,
        } => format!("crop-{width}x{height}-x{center_x}y{center_y}"),
        Transformation::Cut {
            width,
            height,
            top,
            left,
            scale_width,
            scale_height,
        } => format!("cut-{width}x{height}-t{top}l{left}-s{scale_width}x{scale_height}"),
    }
}

/// Canonical filename suffix of an output format.
pub fn format_suffix(format: &OutputFormat) -> String {
    match format {
        OutputFormat::Png => ".png".to_string(),
        OutputFormat::Jpeg { quality } if *quality == Quality::default() => ".jpeg".to_string(),
        OutputFormat::Jpeg { quality } => format!(".q{}.jpeg", quality.value()),
    }
}

/// Canonical filename of a recipe: the name a placeholder is reserved under.
pub fn canonical_name(recipe: &Recipe) -> String {
    format!(
        "{}{}",
        transformation_name(&recipe.transformation),
        format_suffix(&recipe.format)
    )
}

/// Whether `name` is one of the container's reserved (non-variant) files.
pub fn is_reserved(name: &str) -> bool {
    name == SOURCE_FILENAME || name == METADATA_FILENAME
}
