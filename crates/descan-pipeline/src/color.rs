//! Color-correction stage.
//!
//! Remaps each channel with a linear stretch: the value is scaled by
//! 255 over the white−black span, then the black point is subtracted.
//! A scanned page whose paper reads as gray and whose ink reads as
//! dark brown is pushed back toward clean white and black: the white
//! point saturates to 255, dark values clamp to 0.
//!
//! With the default points (white 255, black 0 on every channel) the
//! mapping is exactly the identity.

use crate::stage::Filter;
use crate::types::{RgbaImage, SettingsMap, SettingsValue};

const WHITE_RED_KEY: &str = "whiteRedValue";
const WHITE_GREEN_KEY: &str = "whiteGreenValue";
const WHITE_BLUE_KEY: &str = "whiteBlueValue";
const BLACK_RED_KEY: &str = "blackRedValue";
const BLACK_GREEN_KEY: &str = "blackGreenValue";
const BLACK_BLUE_KEY: &str = "blackBlueValue";

/// Stretches each channel between a configurable black and white point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCorrection {
    white: [i64; 3],
    black: [i64; 3],
}

impl Default for ColorCorrection {
    fn default() -> Self {
        Self {
            white: [255; 3],
            black: [0; 3],
        }
    }
}

impl ColorCorrection {
    /// The configured white point, `[red, green, blue]`.
    #[must_use]
    pub const fn white_point(&self) -> [i64; 3] {
        self.white
    }

    /// The configured black point, `[red, green, blue]`.
    #[must_use]
    pub const fn black_point(&self) -> [i64; 3] {
        self.black
    }

    /// Remap one channel value: scale by 255 over the white−black
    /// span, then subtract the black point. The span is clamped to at
    /// least 1 so a white point at or below the black point cannot
    /// divide by zero.
    fn remap(value: u8, white: i64, black: i64) -> u8 {
        let span = (white - black).max(1);
        let stretched = i64::from(value) * 255 / span - black;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out = stretched.clamp(0, 255) as u8;
        out
    }

    /// Read one channel setting; values outside `0..=255` are invalid
    /// and the previous value is kept.
    fn read_channel(settings: &SettingsMap, key: &str, previous: i64, default: i64) -> i64 {
        settings.get(key).map_or(default, |value| {
            match value.as_integer() {
                Some(v) if (0..=255).contains(&v) => v,
                _ => previous,
            }
        })
    }
}

impl Filter for ColorCorrection {
    fn identifier(&self) -> &'static str {
        "colorcorrection"
    }

    fn display_name(&self) -> &'static str {
        "Color Correction"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        if *self == Self::default() {
            return input.clone();
        }
        let mut output = input.clone();
        for pixel in output.pixels_mut() {
            for channel in 0..3 {
                pixel.0[channel] = Self::remap(
                    pixel.0[channel],
                    self.white[channel],
                    self.black[channel],
                );
            }
            // Alpha is untouched.
        }
        output
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(WHITE_RED_KEY.into(), SettingsValue::Integer(self.white[0]));
        map.insert(WHITE_GREEN_KEY.into(), SettingsValue::Integer(self.white[1]));
        map.insert(WHITE_BLUE_KEY.into(), SettingsValue::Integer(self.white[2]));
        map.insert(BLACK_RED_KEY.into(), SettingsValue::Integer(self.black[0]));
        map.insert(BLACK_GREEN_KEY.into(), SettingsValue::Integer(self.black[1]));
        map.insert(BLACK_BLUE_KEY.into(), SettingsValue::Integer(self.black[2]));
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        let white_keys = [WHITE_RED_KEY, WHITE_GREEN_KEY, WHITE_BLUE_KEY];
        let black_keys = [BLACK_RED_KEY, BLACK_GREEN_KEY, BLACK_BLUE_KEY];
        for channel in 0..3 {
            self.white[channel] = Self::read_channel(
                settings,
                white_keys[channel],
                self.white[channel],
                255,
            );
            self.black[channel] = Self::read_channel(
                settings,
                black_keys[channel],
                self.black[channel],
                0,
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn with(settings: &[(&str, i64)]) -> ColorCorrection {
        let mut color = ColorCorrection::default();
        let map: SettingsMap = settings
            .iter()
            .map(|(k, v)| ((*k).to_string(), SettingsValue::Integer(*v)))
            .collect();
        color.apply_settings(&map);
        color
    }

    #[test]
    fn default_points_are_exact_identity() {
        let mut img = RgbaImage::new(16, 1);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            let v = u8::try_from(x * 16).unwrap();
            *pixel = Rgba([v, 255 - v, v / 2, 200]);
        }
        assert_eq!(ColorCorrection::default().apply(&img), img);
    }

    #[test]
    fn white_point_stretches_up() {
        let color = with(&[
            ("whiteRedValue", 200),
            ("whiteGreenValue", 200),
            ("whiteBlueValue", 200),
        ]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 250, 255]));
        let out = color.apply(&img);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 127, 255, 255]));
    }

    #[test]
    fn black_point_stretches_down() {
        let color = with(&[
            ("blackRedValue", 50),
            ("blackGreenValue", 50),
            ("blackBlueValue", 50),
        ]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([50, 30, 255, 255]));
        let out = color.apply(&img);
        // Span is 205: 50·255/205 − 50 = 12; 30·255/205 − 50 is
        // negative and clamps to 0; 255·255/205 − 50 = 267 clamps
        // to 255.
        assert_eq!(out.get_pixel(0, 0).0[0], 12);
        assert_eq!(out.get_pixel(0, 0).0[1], 0);
        assert_eq!(out.get_pixel(0, 0).0[2], 255);
    }

    #[test]
    fn remap_scales_before_subtracting_black() {
        // The stretch is value·255/span − black, not (value−black)
        // scaled: with white 200 and black 50 a mid value of 100 maps
        // to 100·255/150 − 50 = 120.
        let color = with(&[("whiteRedValue", 200), ("blackRedValue", 50)]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 0, 0, 255]));
        assert_eq!(color.apply(&img).get_pixel(0, 0).0[0], 120);
    }

    #[test]
    fn alpha_channel_is_preserved() {
        let color = with(&[("whiteRedValue", 128)]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([64, 64, 64, 77]));
        assert_eq!(color.apply(&img).get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn inverted_points_do_not_divide_by_zero() {
        let color = with(&[("whiteRedValue", 10), ("blackRedValue", 200)]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        // Span clamps to 1; the result is defined and clamped.
        let _ = color.apply(&img);
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let mut color = with(&[("whiteRedValue", 200)]);
        let mut map = color.settings();
        map.insert("whiteRedValue".into(), SettingsValue::Integer(300));
        color.apply_settings(&map);
        assert_eq!(color.white_point()[0], 200);

        map.insert("whiteRedValue".into(), SettingsValue::Integer(-1));
        color.apply_settings(&map);
        assert_eq!(color.white_point()[0], 200);
    }

    #[test]
    fn missing_keys_restore_defaults() {
        let mut color = with(&[("blackBlueValue", 40)]);
        color.apply_settings(&SettingsMap::new());
        assert_eq!(color, ColorCorrection::default());
    }

    #[test]
    fn settings_round_trip() {
        let color = with(&[
            ("whiteRedValue", 240),
            ("whiteGreenValue", 235),
            ("whiteBlueValue", 230),
            ("blackRedValue", 12),
        ]);
        let mut restored = ColorCorrection::default();
        restored.apply_settings(&color.settings());
        assert_eq!(restored, color);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let empty = RgbaImage::new(0, 0);
        let color = with(&[("whiteRedValue", 200)]);
        assert_eq!(color.apply(&empty).dimensions(), (0, 0));
    }
}
