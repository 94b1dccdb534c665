//! Parameter types for image operations.
//!
//! - [`Quality`]: JPEG encoding quality (0-100, default 80). Clamped on construction.

use serde::Serialize;

/// Quality setting for lossy image encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 100;

    pub fn new(value: u32) -> Self {
        Self(value.min(u32::from(Self::MAX)) as u8)
    }

    /// Clamp a signed value (e.g. a `q-5` suffix) into range.
    pub fn from_signed(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_from_signed_clamps_negative() {
        assert_eq!(Quality::from_signed(-5).value(), 0);
        assert_eq!(Quality::from_signed(i64::MAX).value(), 100);
        assert_eq!(Quality::from_signed(42).value(), 42);
    }

    #[test]
    fn quality_default_is_80() {
        assert_eq!(Quality::default().value(), 80);
    }
}
