//! De-keystoning stage: perspective correction from a user-adjusted
//! quadrilateral.
//!
//! The user drags four corner handles onto the corners of the page as
//! it appears in the scan; this stage computes the homography that maps
//! that quadrilateral onto its upright bounding rectangle and resamples
//! through it. Corners may sit outside the image (extrapolation) and
//! may be dragged past each other — correspondence is by name, so the
//! transform follows the user's intent, not coordinate order.
//!
//! A degenerate quadrilateral (collapsed, or three corners in a line)
//! has no perspective mapping; the stage then degrades to pass-through
//! rather than failing the chain.

use crate::geometry::{Homography, Quad};
use crate::stage::Filter;
use crate::types::{Point, Rect, RgbaImage, SettingsMap, SettingsValue};
use crate::warp;

const TOP_LEFT_KEY: &str = "topLeftCorner";
const TOP_RIGHT_KEY: &str = "topRightCorner";
const BOTTOM_RIGHT_KEY: &str = "bottomRightCorner";
const BOTTOM_LEFT_KEY: &str = "bottomLeftCorner";

/// Default corner layout: a 100×100 square at the origin.
fn default_quad() -> Quad {
    Quad::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0))
}

/// Maps a corner quadrilateral onto its bounding rectangle.
#[derive(Debug, Clone, Copy)]
pub struct Dekeystone {
    quad: Quad,
}

impl Default for Dekeystone {
    fn default() -> Self {
        Self {
            quad: default_quad(),
        }
    }
}

impl Dekeystone {
    /// Create a de-keystoning stage for the given quadrilateral.
    ///
    /// A degenerate quadrilateral is rejected and the default square
    /// kept instead, matching the setter policy for invalid values.
    #[must_use]
    pub fn new(quad: Quad) -> Self {
        if quad.is_degenerate() {
            Self::default()
        } else {
            Self { quad }
        }
    }

    /// The current corner quadrilateral.
    #[must_use]
    pub const fn quad(&self) -> Quad {
        self.quad
    }
}

impl Filter for Dekeystone {
    fn identifier(&self) -> &'static str {
        "Dekeystoning"
    }

    fn display_name(&self) -> &'static str {
        "De-keystoning"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        if input.width() == 0 || input.height() == 0 {
            return input.clone();
        }

        let bounds = self.quad.bounding_rect();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_w = bounds.width.round().max(1.0) as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let out_h = bounds.height.round().max(1.0) as u32;

        // Destination pixels live in a rectangle at the origin; map them
        // straight back into the source quadrilateral. Building the
        // rect→quad direction directly avoids a matrix inversion.
        let target = Rect::new(0.0, 0.0, f64::from(out_w), f64::from(out_h));
        let Some(to_source) = Homography::from_correspondences(
            &Quad::from_rect(target).corners(),
            &self.quad.corners(),
        ) else {
            // Degenerate geometry: best effort is the unmodified input.
            return input.clone();
        };

        warp::warp_inverse(input, out_w, out_h, |p: Point| to_source.apply(p))
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(TOP_LEFT_KEY.into(), SettingsValue::Point(self.quad.top_left));
        map.insert(
            TOP_RIGHT_KEY.into(),
            SettingsValue::Point(self.quad.top_right),
        );
        map.insert(
            BOTTOM_RIGHT_KEY.into(),
            SettingsValue::Point(self.quad.bottom_right),
        );
        map.insert(
            BOTTOM_LEFT_KEY.into(),
            SettingsValue::Point(self.quad.bottom_left),
        );
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        let defaults = default_quad();
        // Missing corners reset to the default square; a present
        // non-point value is invalid and keeps the previous corner.
        let corner = |key: &str, previous: Point, fallback: Point| {
            settings
                .get(key)
                .map_or(fallback, |value| value.as_point().unwrap_or(previous))
        };
        let candidate = Quad::new(
            corner(TOP_LEFT_KEY, self.quad.top_left, defaults.top_left),
            corner(TOP_RIGHT_KEY, self.quad.top_right, defaults.top_right),
            corner(BOTTOM_RIGHT_KEY, self.quad.bottom_right, defaults.bottom_right),
            corner(BOTTOM_LEFT_KEY, self.quad.bottom_left, defaults.bottom_left),
        );
        // Invalid geometry is rejected at the setter: keep the previous
        // valid quadrilateral.
        if !candidate.is_degenerate() {
            self.quad = candidate;
        }
    }
}
