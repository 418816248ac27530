//! Rotation stage: rotate the page about its center.
//!
//! The output canvas grows to the bounding box of the rotated content,
//! so nothing is clipped; uncovered corners are transparent. Angles are
//! whole degrees (the typical correction is a multiple of 90 plus a
//! small skew), and 0° is the bit-exact identity.

use crate::stage::Filter;
use crate::types::{Point, RgbaImage, SettingsMap, SettingsValue};
use crate::warp;

/// Settings key for the rotation angle in degrees.
const ROTATION_KEY: &str = "rotation";

/// Rotates the image clockwise by a whole number of degrees.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rotation {
    degrees: i64,
}

impl Rotation {
    /// Create a rotation stage with the given angle in degrees.
    #[must_use]
    pub const fn new(degrees: i64) -> Self {
        Self { degrees }
    }

    /// The configured angle, normalized to `0..360`.
    #[must_use]
    pub const fn degrees(&self) -> i64 {
        self.degrees.rem_euclid(360)
    }
}

impl Filter for Rotation {
    fn identifier(&self) -> &'static str {
        "Rotation"
    }

    fn display_name(&self) -> &'static str {
        "Rotation"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        let degrees = self.degrees();
        if degrees == 0 || input.width() == 0 || input.height() == 0 {
            return input.clone();
        }

        #[allow(clippy::cast_precision_loss)]
        let theta = (degrees as f64).to_radians();
        let (sin, cos) = theta.sin_cos();

        let w = f64::from(input.width());
        let h = f64::from(input.height());

        // Bounding box of the rotated w×h rectangle. Rounding (rather
        // than ceiling) keeps right-angle rotations at exactly the
        // swapped dimensions despite floating-point residue in cos/sin.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_w = (w.mul_add(cos.abs(), h * sin.abs())).round().max(1.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_h = (w.mul_add(sin.abs(), h * cos.abs())).round().max(1.0) as u32;

        // Pixel centers sit at integer coordinates, so the rotation
        // centers are at (n - 1) / 2.
        let src_cx = (w - 1.0) / 2.0;
        let src_cy = (h - 1.0) / 2.0;
        let dst_cx = (f64::from(out_w) - 1.0) / 2.0;
        let dst_cy = (f64::from(out_h) - 1.0) / 2.0;

        // Inverse map: rotate each destination pixel back by -theta.
        warp::warp_inverse(input, out_w, out_h, |p| {
            let dx = p.x - dst_cx;
            let dy = p.y - dst_cy;
            Point::new(
                dx.mul_add(cos, dy * sin) + src_cx,
                dy.mul_add(cos, -(dx * sin)) + src_cy,
            )
        })
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(ROTATION_KEY.into(), SettingsValue::Integer(self.degrees()));
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        // Missing resets to the default; a present non-integer value
        // is invalid and keeps the previous angle.
        self.degrees = settings
            .get(ROTATION_KEY)
            .map_or(0, |value| value.as_integer().unwrap_or(self.degrees));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Rgba;

    use super::*;

    fn test_image() -> RgbaImage {
        #[allow(clippy::cast_possible_truncation)]
        RgbaImage::from_fn(6, 4, |x, y| {
            Rgba([(x * 40) as u8, (y * 60) as u8, 128, 255])
        })
    }

    #[test]
    fn zero_degrees_is_exact_identity() {
        let img = test_image();
        assert_eq!(Rotation::new(0).apply(&img), img);
    }

    #[test]
    fn full_turn_equals_identity() {
        let img = test_image();
        assert_eq!(Rotation::new(360).apply(&img), img);
        assert_eq!(Rotation::new(-360).apply(&img), img);
    }

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let img = test_image();
        let out = Rotation::new(90).apply(&img);
        assert_eq!(out.dimensions(), (4, 6));
    }

    #[test]
    fn quarter_turn_moves_pixels_exactly() {
        let img = test_image();
        let out = Rotation::new(90).apply(&img);
        // Clockwise 90°: source (x, y) lands at (h - 1 - y, x).
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(
                    out.get_pixel(4 - 1 - y, x),
                    img.get_pixel(x, y),
                    "source pixel ({x},{y}) misplaced",
                );
            }
        }
    }

    #[test]
    fn half_turn_twice_is_identity() {
        let img = test_image();
        let once = Rotation::new(180).apply(&img);
        assert_eq!(once.dimensions(), (6, 4));
        assert_eq!(Rotation::new(180).apply(&once), img);
    }

    #[test]
    fn diagonal_rotation_grows_canvas() {
        let img = test_image();
        let out = Rotation::new(45).apply(&img);
        assert!(out.width() > img.width());
        assert!(out.height() > img.height());
        // Canvas corners are uncovered and must be transparent.
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let empty = RgbaImage::new(0, 0);
        assert_eq!(Rotation::new(45).apply(&empty).dimensions(), (0, 0));
    }

    #[test]
    fn settings_round_trip() {
        let mut filter = Rotation::default();
        let mut map = SettingsMap::new();
        map.insert("rotation".into(), SettingsValue::Integer(90));
        filter.apply_settings(&map);
        assert_eq!(filter.settings().get("rotation"), map.get("rotation"));
    }

    #[test]
    fn wrong_typed_angle_keeps_previous() {
        let mut filter = Rotation::new(90);
        let mut map = SettingsMap::new();
        map.insert("rotation".into(), SettingsValue::Text("ninety".into()));
        filter.apply_settings(&map);
        assert_eq!(filter.degrees(), 90);
    }

    #[test]
    fn missing_key_resets_to_default() {
        let mut filter = Rotation::new(90);
        filter.apply_settings(&SettingsMap::new());
        assert_eq!(filter.degrees(), 0);
    }

    #[test]
    fn negative_angles_normalize() {
        let mut filter = Rotation::default();
        let mut map = SettingsMap::new();
        map.insert("rotation".into(), SettingsValue::Integer(-90));
        filter.apply_settings(&map);
        assert_eq!(filter.degrees(), 270);
    }
}
