//! Physical-unit and DPI conversion for the layout stage.
//!
//! A scanned page has both a pixel size and a physical size; the two
//! are related through the scan resolution (dots per inch). Page and
//! margin dimensions are stored internally in pixels and converted for
//! display, so changing the DPI re-interprets the same pixel size as a
//! different physical size.

use serde::{Deserialize, Serialize};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Minimum accepted scan resolution. Setters reject anything below.
pub const MIN_DPI: f64 = 10.0;

/// Default scan resolution when none is configured.
pub const DEFAULT_DPI: f64 = 300.0;

/// A display unit for physical dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Raw pixels; conversion is the identity regardless of DPI.
    #[default]
    Pixel,
    /// Millimeters.
    Millimeter,
    /// Inches.
    Inch,
}

impl Unit {
    /// Parse a unit from its settings-file name.
    ///
    /// Returns `None` for unrecognized names so the caller can keep its
    /// previous value (invalid input is rejected, not defaulted).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pixel" => Some(Self::Pixel),
            "millimeter" => Some(Self::Millimeter),
            "inch" => Some(Self::Inch),
            _ => None,
        }
    }

    /// The settings-file name of this unit.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pixel => "pixel",
            Self::Millimeter => "millimeter",
            Self::Inch => "inch",
        }
    }

    /// Convert a physical dimension in this unit to pixels at `dpi`.
    #[must_use]
    pub fn to_pixels(self, value: f64, dpi: f64) -> f64 {
        match self {
            Self::Pixel => value,
            Self::Millimeter => value / MM_PER_INCH * dpi,
            Self::Inch => value * dpi,
        }
    }

    /// Convert a pixel dimension to this unit at `dpi`.
    #[must_use]
    pub fn from_pixels(self, pixels: f64, dpi: f64) -> f64 {
        match self {
            Self::Pixel => pixels,
            Self::Millimeter => pixels / dpi * MM_PER_INCH,
            Self::Inch => pixels / dpi,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn pixel_conversion_is_identity() {
        assert_relative_eq!(Unit::Pixel.to_pixels(123.0, 300.0), 123.0);
        assert_relative_eq!(Unit::Pixel.from_pixels(123.0, 72.0), 123.0);
    }

    #[test]
    fn one_inch_is_dpi_pixels() {
        assert_relative_eq!(Unit::Inch.to_pixels(1.0, 300.0), 300.0);
        assert_relative_eq!(Unit::Inch.from_pixels(300.0, 300.0), 1.0);
    }

    #[test]
    fn a4_width_in_millimeters() {
        // 210 mm at 300 dpi is just under 2480 pixels.
        let px = Unit::Millimeter.to_pixels(210.0, 300.0);
        assert_relative_eq!(px, 210.0 / MM_PER_INCH * 300.0);
        assert!((px - 2480.3).abs() < 0.1);
    }

    #[test]
    fn millimeter_round_trip() {
        let px = Unit::Millimeter.to_pixels(297.0, 150.0);
        assert_relative_eq!(Unit::Millimeter.from_pixels(px, 150.0), 297.0, epsilon = 1e-9);
    }

    #[test]
    fn from_name_accepts_known_units() {
        assert_eq!(Unit::from_name("pixel"), Some(Unit::Pixel));
        assert_eq!(Unit::from_name("millimeter"), Some(Unit::Millimeter));
        assert_eq!(Unit::from_name("inch"), Some(Unit::Inch));
    }

    #[test]
    fn from_name_rejects_unknown_units() {
        assert_eq!(Unit::from_name("furlong"), None);
        assert_eq!(Unit::from_name(""), None);
        assert_eq!(Unit::from_name("Pixel"), None);
    }

    #[test]
    fn name_round_trips_through_from_name() {
        for unit in [Unit::Pixel, Unit::Millimeter, Unit::Inch] {
            assert_eq!(Unit::from_name(unit.name()), Some(unit));
        }
    }
}
