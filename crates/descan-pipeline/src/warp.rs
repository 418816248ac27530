//! Inverse-mapped resampling with bilinear interpolation.
//!
//! Both geometric stages (rotation and de-keystoning) produce their
//! output the same way: for every destination pixel, compute the
//! corresponding source coordinate through the inverse of the forward
//! transform, then sample the source image bilinearly. Source
//! coordinates outside the image resolve to a fully transparent
//! background, so content warped past the canvas edge fades out instead
//! of smearing.

use image::Rgba;

use crate::types::{Point, RgbaImage};

/// Background color for out-of-bounds source coordinates.
pub const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Sample `image` at a real-valued coordinate with bilinear
/// interpolation.
///
/// Pixel centers sit at integer coordinates, so sampling at exactly
/// `(x, y)` with integral `x` and `y` returns that pixel unchanged —
/// this is what makes identity transforms bit-exact. Neighbors outside
/// the image contribute the transparent [`BACKGROUND`]; non-finite
/// coordinates (from points on a homography's horizon) resolve entirely
/// to background.
#[must_use]
pub fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    if !x.is_finite() || !y.is_finite() {
        return BACKGROUND;
    }

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let fetch = |ix: f64, iy: f64| -> [f64; 4] {
        if ix < 0.0 || iy < 0.0 || ix >= f64::from(image.width()) || iy >= f64::from(image.height())
        {
            return [0.0; 4];
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let p = image.get_pixel(ix as u32, iy as u32).0;
        [
            f64::from(p[0]),
            f64::from(p[1]),
            f64::from(p[2]),
            f64::from(p[3]),
        ]
    };

    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1.0, y0);
    let bl = fetch(x0, y0 + 1.0);
    let br = fetch(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let top = tl[c].mul_add(1.0 - fx, tr[c] * fx);
        let bottom = bl[c].mul_add(1.0 - fx, br[c] * fx);
        let value = top.mul_add(1.0 - fy, bottom * fy);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            *slot = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    Rgba(out)
}

/// Produce a `width` × `height` image where each destination pixel is
/// the bilinear sample of `source` at `map(destination)`.
///
/// `map` is the *inverse* of the forward transform: it takes a
/// destination coordinate and answers "which source coordinate lands
/// here".
#[must_use]
pub fn warp_inverse<F>(source: &RgbaImage, width: u32, height: u32, map: F) -> RgbaImage
where
    F: Fn(Point) -> Point,
{
    RgbaImage::from_fn(width, height, |x, y| {
        let src = map(Point::new(f64::from(x), f64::from(y)));
        sample_bilinear(source, src.x, src.y)
    })
}
