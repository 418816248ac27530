//! Binarization stage.
//!
//! Converts the page to pure black-and-white. Three methods:
//!
//! - **fixed** — a single global threshold from the settings;
//! - **otsu** — a global threshold derived per image with
//!   [`imageproc::contrast::otsu_level`];
//! - **adaptive** — a per-pixel threshold from the mean of a local
//!   window, computed via a summed-area table, minus a constant. This
//!   handles uneven lighting across the page.
//!
//! An optional bilateral pre-filter smooths scanner noise while
//! keeping text edges sharp. The output stays RGBA so the stage
//! composes with the rest of the chain; every pixel is opaque black
//! or white.

use image::imageops;
use imageproc::contrast::otsu_level;
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use imageproc::filter::bilateral_filter;

use crate::stage::Filter;
use crate::types::{GrayImage, RgbaImage, SettingsMap, SettingsValue};

const METHOD_KEY: &str = "method";
const THRESHOLD_KEY: &str = "threshold";
const BLOCK_SIZE_KEY: &str = "blockSize";
const C_VALUE_KEY: &str = "cValue";
const PREPROCESS_KEY: &str = "preprocessNoise";

const DEFAULT_THRESHOLD: i64 = 128;
const DEFAULT_BLOCK_SIZE: i64 = 15;
const DEFAULT_C_VALUE: i64 = 2;

/// Which binarization method to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdMethod {
    /// Global threshold from the `threshold` setting.
    #[default]
    Fixed,
    /// Per-pixel local-mean threshold.
    Adaptive,
    /// Global threshold derived from the image histogram.
    Otsu,
}

impl ThresholdMethod {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "fixed" => Some(Self::Fixed),
            "adaptive" => Some(Self::Adaptive),
            "otsu" => Some(Self::Otsu),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Adaptive => "adaptive",
            Self::Otsu => "otsu",
        }
    }
}

/// Binarizes the page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    method: ThresholdMethod,
    level: i64,
    block_size: i64,
    c_value: i64,
    preprocess: bool,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            method: ThresholdMethod::Fixed,
            level: DEFAULT_THRESHOLD,
            block_size: DEFAULT_BLOCK_SIZE,
            c_value: DEFAULT_C_VALUE,
            preprocess: false,
        }
    }
}

impl Threshold {
    /// The active method.
    #[must_use]
    pub const fn method(&self) -> ThresholdMethod {
        self.method
    }

    /// The global threshold used by the fixed method.
    #[must_use]
    pub const fn level(&self) -> i64 {
        self.level
    }

    /// The adaptive window size, always odd and at least 1.
    #[must_use]
    pub const fn block_size(&self) -> i64 {
        self.block_size
    }

    fn binarize_global(gray: &GrayImage, level: u8) -> GrayImage {
        let mut out = gray.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
        }
        out
    }

    /// Adaptive binarization: each pixel is compared against the mean
    /// of its local window minus `c_value`. The window mean comes from
    /// a summed-area table so the cost is independent of window size.
    fn binarize_adaptive(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = (gray.width() as usize, gray.height() as usize);

        // integral[y][x] holds the sum over the rectangle [0,x)×[0,y),
        // laid out row-major with stride w + 1.
        let stride = w + 1;
        let mut integral = vec![0_u64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0_u64;
            for x in 0..w {
                #[allow(clippy::cast_possible_truncation)]
                let v = u64::from(gray.get_pixel(x as u32, y as u32).0[0]);
                row_sum += v;
                integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
            }
        }

        #[allow(clippy::cast_sign_loss)]
        let radius = (self.block_size as usize) / 2;
        let mut out = gray.clone();
        for y in 0..h {
            let y0 = y.saturating_sub(radius);
            let y1 = (y + radius + 1).min(h);
            for x in 0..w {
                let x0 = x.saturating_sub(radius);
                let x1 = (x + radius + 1).min(w);
                let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                    - integral[y0 * stride + x1]
                    - integral[y1 * stride + x0];
                let count = ((y1 - y0) * (x1 - x0)) as u64;
                #[allow(clippy::cast_possible_wrap)]
                let local = (sum / count) as i64 - self.c_value;
                #[allow(clippy::cast_possible_truncation)]
                let pixel = out.get_pixel_mut(x as u32, y as u32);
                pixel.0[0] = if i64::from(pixel.0[0]) > local { 255 } else { 0 };
            }
        }
        out
    }
}

impl Filter for Threshold {
    fn identifier(&self) -> &'static str {
        "threshold"
    }

    fn display_name(&self) -> &'static str {
        "Threshold"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        if input.width() == 0 || input.height() == 0 {
            return input.clone();
        }

        let mut gray = imageops::grayscale(input);
        if self.preprocess {
            // Radius 4 gives the classic 9-pixel window. The filter
            // panics on empty images, so this stays behind the empty
            // check above.
            gray = bilateral_filter(&gray, 4, 9.0, GaussianEuclideanColorDistance::new(9.0));
        }

        let binary = match self.method {
            ThresholdMethod::Fixed => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let level = self.level.clamp(0, 255) as u8;
                Self::binarize_global(&gray, level)
            }
            ThresholdMethod::Otsu => Self::binarize_global(&gray, otsu_level(&gray)),
            ThresholdMethod::Adaptive => self.binarize_adaptive(&gray),
        };

        RgbaImage::from_fn(binary.width(), binary.height(), |x, y| {
            let g = binary.get_pixel(x, y).0[0];
            image::Rgba([g, g, g, 255])
        })
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(METHOD_KEY.into(), SettingsValue::Text(self.method.name().into()));
        map.insert(THRESHOLD_KEY.into(), SettingsValue::Integer(self.level));
        map.insert(BLOCK_SIZE_KEY.into(), SettingsValue::Integer(self.block_size));
        map.insert(C_VALUE_KEY.into(), SettingsValue::Integer(self.c_value));
        map.insert(PREPROCESS_KEY.into(), SettingsValue::Boolean(self.preprocess));
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        self.method = settings.get(METHOD_KEY).map_or(ThresholdMethod::Fixed, |value| {
            value
                .as_text()
                .and_then(ThresholdMethod::from_name)
                .unwrap_or(self.method)
        });

        self.level = settings
            .get(THRESHOLD_KEY)
            .map_or(DEFAULT_THRESHOLD, |value| match value.as_integer() {
                Some(v) if (0..=255).contains(&v) => v,
                _ => self.level,
            });

        // The window must be odd so it has a center pixel; even values
        // are widened by one, non-positive values collapse to 1.
        self.block_size = settings
            .get(BLOCK_SIZE_KEY)
            .map_or(DEFAULT_BLOCK_SIZE, |value| {
                value.as_integer().map_or(self.block_size, |v| {
                    let v = v.max(1);
                    if v % 2 == 0 { v + 1 } else { v }
                })
            });

        self.c_value = settings.get(C_VALUE_KEY).map_or(DEFAULT_C_VALUE, |value| {
            value.as_integer().unwrap_or(self.c_value)
        });

        self.preprocess = settings.get(PREPROCESS_KEY).map_or(false, |value| {
            value.as_boolean().unwrap_or(self.preprocess)
        });
    }
}
