//! Quadrilateral and homography math for perspective correction.
//!
//! A user-adjusted quadrilateral marks the four corners of the page in
//! the scanned image; de-keystoning maps it onto an upright rectangle.
//! The mapping is the unique projective transform (homography) through
//! the four corner correspondences, solved here as an 8×8 linear
//! system — four points, two equations each, eight unknowns with the
//! bottom-right matrix entry fixed at 1.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};

use crate::types::{Point, Rect};

/// Below this area (in square pixels) a quadrilateral is considered
/// collapsed and the transform refuses to run.
const MIN_QUAD_AREA: f64 = 1e-6;

/// Cross-product magnitude below which three corners count as collinear.
const COLLINEAR_EPS: f64 = 1e-6;

/// A quadrilateral with *named* corners.
///
/// The mapping to the output rectangle depends on correspondence, not
/// on coordinate order: whichever point the user designates top-left
/// lands at the output's top-left, even if it is numerically to the
/// right of the "top-right" point or outside the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quad {
    /// Corner that maps to the output's top-left.
    pub top_left: Point,
    /// Corner that maps to the output's top-right.
    pub top_right: Point,
    /// Corner that maps to the output's bottom-right.
    pub bottom_right: Point,
    /// Corner that maps to the output's bottom-left.
    pub bottom_left: Point,
}

impl Quad {
    /// Create a quadrilateral from its four named corners.
    #[must_use]
    pub const fn new(
        top_left: Point,
        top_right: Point,
        bottom_right: Point,
        bottom_left: Point,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// The axis-aligned rectangle's corners as a quadrilateral.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let br = rect.bottom_right();
        Self::new(
            rect.top_left(),
            Point::new(br.x, rect.y),
            br,
            Point::new(rect.x, br.y),
        )
    }

    /// Corners in top-left, top-right, bottom-right, bottom-left order.
    #[must_use]
    pub const fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Signed shoelace area over the corner cycle, made absolute.
    #[must_use]
    pub fn area(&self) -> f64 {
        let c = self.corners();
        let mut twice = 0.0;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            twice += a.x.mul_add(b.y, -(b.x * a.y));
        }
        twice.abs() / 2.0
    }

    /// Whether the quadrilateral is unusable for perspective mapping:
    /// near-zero area or any three corners collinear.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        if self.area() < MIN_QUAD_AREA {
            return true;
        }
        let c = self.corners();
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let d = c[(i + 2) % 4];
            let cross = (b.x - a.x).mul_add(d.y - a.y, -((b.y - a.y) * (d.x - a.x)));
            if cross.abs() < COLLINEAR_EPS {
                return true;
            }
        }
        false
    }

    /// The smallest axis-aligned rectangle containing all four corners.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        let c = self.corners();
        let min_x = c.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = c.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = c.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = c.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// A 3×3 projective transform between image planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// Solve the homography mapping each `src` corner onto the
    /// corresponding `dst` corner.
    ///
    /// Each correspondence `(x, y) → (u, v)` contributes two rows of the
    /// 8×8 system:
    ///
    /// ```text
    /// [ x  y  1  0  0  0  -u·x  -u·y ] · h = u
    /// [ 0  0  0  x  y  1  -v·x  -v·y ] · h = v
    /// ```
    ///
    /// Returns `None` when the system is singular, which happens exactly
    /// when either point set is degenerate (three collinear corners or a
    /// repeated corner).
    #[must_use]
    pub fn from_correspondences(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);

            a[(2 * i, 0)] = x;
            a[(2 * i, 1)] = y;
            a[(2 * i, 2)] = 1.0;
            a[(2 * i, 6)] = -u * x;
            a[(2 * i, 7)] = -u * y;
            b[2 * i] = u;

            a[(2 * i + 1, 3)] = x;
            a[(2 * i + 1, 4)] = y;
            a[(2 * i + 1, 5)] = 1.0;
            a[(2 * i + 1, 6)] = -v * x;
            a[(2 * i + 1, 7)] = -v * y;
            b[2 * i + 1] = v;
        }

        let h = a.lu().solve(&b)?;
        let m = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        m.iter().all(|v| v.is_finite()).then_some(Self { m })
    }

    /// The homography mapping `quad`'s corners onto `rect`'s corners.
    ///
    /// Returns `None` for a degenerate quadrilateral.
    #[must_use]
    pub fn quad_to_rect(quad: &Quad, rect: Rect) -> Option<Self> {
        if quad.is_degenerate() {
            return None;
        }
        Self::from_correspondences(&quad.corners(), &Quad::from_rect(rect).corners())
    }

    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            m: Matrix3::identity(),
        }
    }

    /// Project a point through the transform.
    ///
    /// Points on the transform's horizon (homogeneous w near zero) come
    /// back with non-finite coordinates; the resampler treats those as
    /// out of bounds.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        let q = self.m * Vector3::new(p.x, p.y, 1.0);
        if q[2].abs() < 1e-12 {
            return Point::new(f64::NAN, f64::NAN);
        }
        Point::new(q[0] / q[2], q[1] / q[2])
    }

    /// The inverse transform, or `None` if the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        self.m.try_inverse().map(|m| Self { m })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn unit_square() -> Quad {
        Quad::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    // --- Quad tests ---

    #[test]
    fn square_area() {
        assert_relative_eq!(unit_square().area(), 10_000.0);
    }

    #[test]
    fn square_is_not_degenerate() {
        assert!(!unit_square().is_degenerate());
    }

    #[test]
    fn collapsed_quad_is_degenerate() {
        let p = Point::new(5.0, 5.0);
        assert!(Quad::new(p, p, p, p).is_degenerate());
    }

    #[test]
    fn three_collinear_corners_are_degenerate() {
        let q = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        );
        assert!(q.is_degenerate());
    }

    #[test]
    fn bounding_rect_spans_all_corners() {
        let q = Quad::new(
            Point::new(-10.0, 5.0),
            Point::new(90.0, -20.0),
            Point::new(110.0, 80.0),
            Point::new(0.0, 100.0),
        );
        let r = q.bounding_rect();
        assert_relative_eq!(r.x, -10.0);
        assert_relative_eq!(r.y, -20.0);
        assert_relative_eq!(r.width, 120.0);
        assert_relative_eq!(r.height, 120.0);
    }

    #[test]
    fn from_rect_names_corners_clockwise() {
        let q = Quad::from_rect(Rect::new(1.0, 2.0, 10.0, 20.0));
        assert_eq!(q.top_left, Point::new(1.0, 2.0));
        assert_eq!(q.top_right, Point::new(11.0, 2.0));
        assert_eq!(q.bottom_right, Point::new(11.0, 22.0));
        assert_eq!(q.bottom_left, Point::new(1.0, 22.0));
    }

    // --- Homography tests ---

    #[test]
    fn identity_correspondence_gives_identity_transform() {
        let corners = unit_square().corners();
        let h = Homography::from_correspondences(&corners, &corners).unwrap();
        for p in [Point::new(0.0, 0.0), Point::new(33.3, 71.2)] {
            let q = h.apply(p);
            assert_relative_eq!(q.x, p.x, epsilon = 1e-9);
            assert_relative_eq!(q.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn corners_map_exactly() {
        let quad = Quad::new(
            Point::new(12.0, 7.0),
            Point::new(180.0, -3.0),
            Point::new(195.0, 160.0),
            Point::new(-5.0, 140.0),
        );
        let rect = Rect::new(0.0, 0.0, 200.0, 150.0);
        let h = Homography::quad_to_rect(&quad, rect).unwrap();

        let expect = Quad::from_rect(rect).corners();
        for (src, dst) in quad.corners().iter().zip(&expect) {
            let p = h.apply(*src);
            assert_relative_eq!(p.x, dst.x, epsilon = 1e-6);
            assert_relative_eq!(p.y, dst.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn degenerate_quad_has_no_transform() {
        let q = Quad::new(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(300.0, 0.0),
        );
        assert!(Homography::quad_to_rect(&q, Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn inverse_round_trips() {
        let quad = Quad::new(
            Point::new(10.0, 10.0),
            Point::new(120.0, 25.0),
            Point::new(110.0, 130.0),
            Point::new(5.0, 115.0),
        );
        let h = Homography::quad_to_rect(&quad, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let inv = h.inverse().unwrap();

        let p = Point::new(42.0, 58.0);
        let back = inv.apply(h.apply(p));
        assert_relative_eq!(back.x, p.x, epsilon = 1e-8);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-8);
    }

    #[test]
    fn corner_correspondence_follows_names_not_positions() {
        // Swap the visual roles: the "top_left" corner sits at the
        // geometric top-right. The transform must still send it to the
        // output's top-left.
        let quad = Quad::new(
            Point::new(100.0, 0.0), // top_left role, top-right position
            Point::new(0.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
        );
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let h = Homography::quad_to_rect(&quad, rect).unwrap();

        let p = h.apply(Point::new(100.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn horizon_points_come_back_non_finite() {
        // A strong perspective mapping has a horizon line; points far
        // behind it divide by a near-zero homogeneous coordinate.
        let quad = Quad::new(
            Point::new(40.0, 40.0),
            Point::new(60.0, 40.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        );
        let h = Homography::quad_to_rect(&quad, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        let inv = h.inverse().unwrap();
        // Probe a grid; at least the mapping must never panic.
        for y in -200..200 {
            let p = inv.apply(Point::new(50.0, f64::from(y)));
            let _ = p.x.is_finite() && p.y.is_finite();
        }
    }
}
