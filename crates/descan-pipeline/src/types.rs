//! Shared types for the descan filter pipeline.
//!
//! The settings codec lives here: every stage describes its parameters
//! as a [`SettingsMap`] of [`SettingsValue`]s, and the pipeline
//! aggregates those into a [`PipelineSettings`] keyed by stage
//! identifier. The maps round-trip through serde so callers can persist
//! them in whatever document format they like; this crate never touches
//! a file itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can reference pipeline
/// images without depending on `image` directly.
pub use image::RgbaImage;

/// Re-export `GrayImage` for callers inspecting binarization output.
pub use image::GrayImage;

/// A 2D point in image pixel coordinates.
///
/// Coordinates are real-valued: quadrilateral corners may sit between
/// pixels (or outside the image entirely — that is extrapolation, not
/// an error).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// An axis-aligned rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width; non-negative after [`Rect::from_corners`] normalization.
    pub width: f64,
    /// Height; non-negative after [`Rect::from_corners`] normalization.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from position and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle spanning two corner points, in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self {
            x,
            y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// The top-left corner.
    #[must_use]
    pub const fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The bottom-right corner.
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }
}

/// One persisted parameter value.
///
/// The untagged representation gives settings their natural nested
/// form, e.g. `{"Rotation": {"rotation": 90}}`. Variant order matters
/// for deserialization: booleans and integers are tried before reals so
/// `90` restores as `Integer(90)` and `90.5` as `Real(90.5)`, and
/// rectangles are tried before points so a rectangle object (whose
/// extra `width`/`height` fields a point would silently ignore) is not
/// swallowed by the point variant.
/// [`SettingsValue::as_real`] accepts either numeric variant, so stages
/// reading a numeric key are indifferent to which one a file contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    /// A boolean flag (e.g. `enabled`, `preprocessNoise`).
    Boolean(bool),
    /// An integer value (e.g. a threshold level or color component).
    Integer(i64),
    /// A real value (e.g. a rotation angle or DPI).
    Real(f64),
    /// A string value (e.g. an alignment or unit name).
    Text(String),
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// A 2D point (e.g. a quadrilateral corner).
    Point(Point),
}

impl SettingsValue {
    /// The value as a boolean, if it is one.
    #[must_use]
    pub const fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an integer. `Real` values are truncated toward
    /// zero so files that stored `15.0` still restore an integer
    /// parameter.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    /// The value as a real number, accepting either numeric variant.
    #[must_use]
    pub const fn as_real(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// The value as a string slice, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a point, if it is one.
    #[must_use]
    pub const fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// The value as a rectangle, if it is one.
    #[must_use]
    pub const fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single stage's parameters: key → value.
///
/// `BTreeMap` keeps serialized output deterministic, which makes
/// settings files diff-friendly and tests order-independent.
pub type SettingsMap = BTreeMap<String, SettingsValue>;

/// The whole pipeline's parameters: stage identifier → [`SettingsMap`].
pub type PipelineSettings = BTreeMap<String, SettingsMap>;

/// Errors reported by the pipeline controller.
///
/// Stage computation itself never fails: invalid parameters are
/// rejected at the setter boundary and degenerate geometry degrades to
/// pass-through, so errors only arise from misuse of the controller
/// API.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Two stages in the chain share an identifier. Identifiers key the
    /// settings map, so they must be unique.
    #[error("duplicate stage identifier: {0}")]
    DuplicateStage(String),

    /// A stage identifier was not found in the chain.
    #[error("unknown stage identifier: {0}")]
    UnknownStage(String),

    /// The chain was constructed with no stages.
    #[error("pipeline must contain at least one stage")]
    EmptyChain,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    // --- Rect tests ---

    #[test]
    fn rect_from_corners_normalizes_order() {
        let r = Rect::from_corners(Point::new(10.0, 20.0), Point::new(2.0, 5.0));
        assert_eq!(r, Rect::new(2.0, 5.0, 8.0, 15.0));
    }

    #[test]
    fn rect_corner_accessors() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.top_left(), Point::new(1.0, 2.0));
        assert_eq!(r.bottom_right(), Point::new(4.0, 6.0));
    }

    // --- SettingsValue tests ---

    #[test]
    fn as_real_accepts_both_numeric_variants() {
        assert_eq!(SettingsValue::Integer(90).as_real(), Some(90.0));
        assert_eq!(SettingsValue::Real(90.5).as_real(), Some(90.5));
        assert_eq!(SettingsValue::Boolean(true).as_real(), None);
    }

    #[test]
    fn as_integer_truncates_reals() {
        assert_eq!(SettingsValue::Real(15.9).as_integer(), Some(15));
        assert_eq!(SettingsValue::Integer(-3).as_integer(), Some(-3));
    }

    #[test]
    fn accessors_reject_other_variants() {
        assert_eq!(SettingsValue::Integer(1).as_boolean(), None);
        assert_eq!(SettingsValue::Boolean(true).as_text(), None);
        assert_eq!(SettingsValue::Text("x".into()).as_point(), None);
        assert_eq!(SettingsValue::Integer(0).as_rect(), None);
    }

    // --- Serde round-trips ---

    #[test]
    fn settings_value_json_is_untagged() {
        let json = serde_json::to_string(&SettingsValue::Integer(90)).unwrap();
        assert_eq!(json, "90");
        let json = serde_json::to_string(&SettingsValue::Boolean(true)).unwrap();
        assert_eq!(json, "true");
    }

    #[test]
    fn integer_survives_round_trip_as_integer() {
        let v: SettingsValue = serde_json::from_str("90").unwrap();
        assert_eq!(v, SettingsValue::Integer(90));
    }

    #[test]
    fn real_survives_round_trip_as_real() {
        let v: SettingsValue = serde_json::from_str("90.5").unwrap();
        assert_eq!(v, SettingsValue::Real(90.5));
    }

    #[test]
    fn point_value_round_trip() {
        let v = SettingsValue::Point(Point::new(1.5, -2.0));
        let json = serde_json::to_string(&v).unwrap();
        let back: SettingsValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn rect_value_round_trip() {
        let v = SettingsValue::Rect(Rect::new(0.0, 0.0, 10.0, 20.0));
        let json = serde_json::to_string(&v).unwrap();
        let back: SettingsValue = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn nested_settings_map_round_trip() {
        let mut rotation = SettingsMap::new();
        rotation.insert("rotation".into(), SettingsValue::Integer(90));
        let mut all = PipelineSettings::new();
        all.insert("Rotation".into(), rotation);

        let json = serde_json::to_string(&all).unwrap();
        assert_eq!(json, r#"{"Rotation":{"rotation":90}}"#);
        let back: PipelineSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(all, back);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_display() {
        assert_eq!(
            PipelineError::UnknownStage("nope".into()).to_string(),
            "unknown stage identifier: nope",
        );
        assert_eq!(
            PipelineError::DuplicateStage("Rotation".into()).to_string(),
            "duplicate stage identifier: Rotation",
        );
    }
}
