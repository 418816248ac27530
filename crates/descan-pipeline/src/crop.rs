//! Cropping stage: pixel-exact rectangular crop.
//!
//! The crop rectangle is defined by two corner points (any order) and
//! is clamped to at least one pixel in each direction. The rectangle
//! may extend past the input image; uncovered output pixels are
//! transparent, so cropping is total rather than partial.

use crate::stage::Filter;
use crate::types::{Point, Rect, RgbaImage, SettingsMap, SettingsValue};
use crate::warp;

const TOP_LEFT_KEY: &str = "topLeftCorner";
const BOTTOM_RIGHT_KEY: &str = "bottomRightCorner";

const DEFAULT_TOP_LEFT: Point = Point::new(0.0, 0.0);
const DEFAULT_BOTTOM_RIGHT: Point = Point::new(100.0, 100.0);

/// Copies out the configured rectangle of the input image.
#[derive(Debug, Clone, Copy)]
pub struct Crop {
    top_left: Point,
    bottom_right: Point,
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            top_left: DEFAULT_TOP_LEFT,
            bottom_right: DEFAULT_BOTTOM_RIGHT,
        }
    }
}

impl Crop {
    /// Create a crop stage spanning the two corners, in any order.
    #[must_use]
    pub const fn new(a: Point, b: Point) -> Self {
        Self {
            top_left: a,
            bottom_right: b,
        }
    }

    /// The crop rectangle, normalized and clamped to a minimum of one
    /// pixel in each direction.
    #[must_use]
    pub fn rectangle(&self) -> Rect {
        let r = Rect::from_corners(self.top_left, self.bottom_right);
        Rect::new(r.x, r.y, r.width.max(1.0), r.height.max(1.0))
    }
}

impl Filter for Crop {
    fn identifier(&self) -> &'static str {
        "Cropping"
    }

    fn display_name(&self) -> &'static str {
        "Cropping"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        if input.width() == 0 || input.height() == 0 {
            return input.clone();
        }

        let rect = self.rectangle();
        #[allow(clippy::cast_possible_truncation)]
        let (left, top) = (rect.x.round() as i64, rect.y.round() as i64);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_w = rect.width.round().max(1.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_h = rect.height.round().max(1.0) as u32;

        RgbaImage::from_fn(out_w, out_h, |x, y| {
            let sx = left + i64::from(x);
            let sy = top + i64::from(y);
            if sx >= 0 && sy >= 0 && sx < i64::from(input.width()) && sy < i64::from(input.height())
            {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                *input.get_pixel(sx as u32, sy as u32)
            } else {
                warp::BACKGROUND
            }
        })
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(TOP_LEFT_KEY.into(), SettingsValue::Point(self.top_left));
        map.insert(
            BOTTOM_RIGHT_KEY.into(),
            SettingsValue::Point(self.bottom_right),
        );
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        // Missing corners reset to the defaults; a present non-point
        // value is invalid and keeps the previous corner.
        self.top_left = settings.get(TOP_LEFT_KEY).map_or(DEFAULT_TOP_LEFT, |value| {
            value.as_point().unwrap_or(self.top_left)
        });
        self.bottom_right = settings
            .get(BOTTOM_RIGHT_KEY)
            .map_or(DEFAULT_BOTTOM_RIGHT, |value| {
                value.as_point().unwrap_or(self.bottom_right)
            });
    }
}
