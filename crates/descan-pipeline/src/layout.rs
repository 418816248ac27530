//! Scaling and page-layout stage.
//!
//! Resizes the page image to a target pixel size and optionally places
//! it on a larger page canvas. Three mutually exclusive layout modes:
//!
//! - **no-margin** — the canvas is exactly the scaled image;
//! - **margin** — the canvas is the scaled image plus fixed margins on
//!   each side;
//! - **fixed-page** — the canvas is an explicit page size; the image is
//!   scaled down (aspect-preserving) if it overflows, then positioned
//!   by the alignment settings.
//!
//! Sizes are stored in pixels; the DPI and display-unit settings exist
//! so front-ends can show and edit the same sizes in physical units
//! (see [`crate::units`]). The page canvas fill is opaque white, the
//! paper color of a printed page.

use image::{imageops, Rgba};

use crate::stage::Filter;
use crate::types::{RgbaImage, SettingsMap, SettingsValue};
use crate::units::{Unit, DEFAULT_DPI, MIN_DPI};

const MODE_KEY: &str = "layoutMode";
const IMAGE_WIDTH_KEY: &str = "pxImageWidth";
const IMAGE_HEIGHT_KEY: &str = "pxImageHeight";
const PAGE_WIDTH_KEY: &str = "pxPageWidth";
const PAGE_HEIGHT_KEY: &str = "pxPageHeight";
const MARGIN_H_KEY: &str = "pxMarginHorizontal";
const MARGIN_V_KEY: &str = "pxMarginVertical";
const DPI_KEY: &str = "dpi";
const UNIT_KEY: &str = "unit";
// Key spellings kept as the original settings files wrote them.
const H_ALIGN_KEY: &str = "horizontalAlignement";
const V_ALIGN_KEY: &str = "verticalAlignement";

/// Opaque white, the fill color of the page canvas.
const PAGE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Largest accepted pixel value for image sizes, page sizes, and
/// margins. Values beyond this are invalid (the canvas arithmetic must
/// stay inside `u32`) and the setter keeps the previous value.
const MAX_DIMENSION: f64 = 32_768.0;

/// How the canvas around the scaled image is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Canvas equals the scaled image; no border at all.
    #[default]
    NoMargin,
    /// Canvas is the scaled image plus the configured margins.
    Margin,
    /// Canvas is the configured page size.
    FixedPage,
}

impl LayoutMode {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "noMargin" => Some(Self::NoMargin),
            "margin" => Some(Self::Margin),
            "fixedPage" => Some(Self::FixedPage),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::NoMargin => "noMargin",
            Self::Margin => "margin",
            Self::FixedPage => "fixedPage",
        }
    }
}

/// Horizontal placement of the image on a fixed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlignment {
    /// Flush with the left page edge.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Flush with the right page edge.
    Right,
}

impl HorizontalAlignment {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Left" => Some(Self::Left),
            "Center" => Some(Self::Center),
            "Right" => Some(Self::Right),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Center => "Center",
            Self::Right => "Right",
        }
    }

    const fn offset(self, page: u32, image: u32) -> i64 {
        let free = page.saturating_sub(image) as i64;
        match self {
            Self::Left => 0,
            Self::Center => free / 2,
            Self::Right => free,
        }
    }
}

/// Vertical placement of the image on a fixed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlignment {
    /// Flush with the top page edge.
    Top,
    /// Centered.
    #[default]
    Center,
    /// Flush with the bottom page edge.
    Bottom,
}

impl VerticalAlignment {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Top" => Some(Self::Top),
            "Center" => Some(Self::Center),
            "Bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Center => "Center",
            Self::Bottom => "Bottom",
        }
    }

    const fn offset(self, page: u32, image: u32) -> i64 {
        let free = page.saturating_sub(image) as i64;
        match self {
            Self::Top => 0,
            Self::Center => free / 2,
            Self::Bottom => free,
        }
    }
}

/// Scales the page image and lays it out on a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    mode: LayoutMode,
    /// Target image size in pixels; `0.0` means "keep the input size".
    image_width: f64,
    image_height: f64,
    page_width: f64,
    page_height: f64,
    margin_h: f64,
    margin_v: f64,
    dpi: f64,
    unit: Unit,
    h_align: HorizontalAlignment,
    v_align: VerticalAlignment,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            mode: LayoutMode::NoMargin,
            image_width: 0.0,
            image_height: 0.0,
            page_width: 0.0,
            page_height: 0.0,
            margin_h: 0.0,
            margin_v: 0.0,
            dpi: DEFAULT_DPI,
            unit: Unit::Pixel,
            h_align: HorizontalAlignment::Center,
            v_align: VerticalAlignment::Center,
        }
    }
}

impl PageLayout {
    /// The configured scan resolution.
    #[must_use]
    pub const fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Set the scan resolution. Values below [`MIN_DPI`] are rejected
    /// and the previous value kept.
    pub const fn set_dpi(&mut self, dpi: f64) {
        if dpi >= MIN_DPI {
            self.dpi = dpi;
        }
    }

    /// The configured display unit.
    #[must_use]
    pub const fn unit(&self) -> Unit {
        self.unit
    }

    /// The active layout mode.
    #[must_use]
    pub const fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Target image size in pixels, falling back to the input size
    /// when unset.
    fn target_size(&self, input: &RgbaImage) -> (u32, u32) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let w = if self.image_width >= 1.0 {
            self.image_width.round() as u32
        } else {
            input.width()
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let h = if self.image_height >= 1.0 {
            self.image_height.round() as u32
        } else {
            input.height()
        };
        (w.max(1), h.max(1))
    }

    fn read_size(settings: &SettingsMap, key: &str, previous: f64, default: f64) -> f64 {
        settings.get(key).map_or(default, |value| {
            match value.as_real() {
                // Negative or oversized values are invalid: keep the
                // previous value.
                Some(v) if (0.0..=MAX_DIMENSION).contains(&v) => v,
                _ => previous,
            }
        })
    }
}

impl Filter for PageLayout {
    fn identifier(&self) -> &'static str {
        "scaling"
    }

    fn display_name(&self) -> &'static str {
        "Scaling & Layout"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        if input.width() == 0 || input.height() == 0 {
            return input.clone();
        }

        let (tw, th) = self.target_size(input);
        let scaled = if (tw, th) == input.dimensions() {
            input.clone()
        } else {
            imageops::resize(input, tw, th, imageops::FilterType::Triangle)
        };

        match self.mode {
            LayoutMode::NoMargin => scaled,
            LayoutMode::Margin => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let mh = self.margin_h.round().clamp(0.0, MAX_DIMENSION) as u32;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let mv = self.margin_v.round().clamp(0.0, MAX_DIMENSION) as u32;
                let mut canvas = RgbaImage::from_pixel(
                    tw.saturating_add(2 * mh),
                    th.saturating_add(2 * mv),
                    PAGE_FILL,
                );
                imageops::overlay(&mut canvas, &scaled, i64::from(mh), i64::from(mv));
                canvas
            }
            LayoutMode::FixedPage => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let pw = if self.page_width >= 1.0 {
                    self.page_width.round() as u32
                } else {
                    tw
                };
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let ph = if self.page_height >= 1.0 {
                    self.page_height.round() as u32
                } else {
                    th
                };

                // Scale down (never up) to fit the page, preserving aspect.
                let fit = (f64::from(pw) / f64::from(tw))
                    .min(f64::from(ph) / f64::from(th))
                    .min(1.0);
                let (fw, fh) = if fit < 1.0 {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let fw = (f64::from(tw) * fit).round().max(1.0) as u32;
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let fh = (f64::from(th) * fit).round().max(1.0) as u32;
                    (fw, fh)
                } else {
                    (tw, th)
                };
                let placed = if (fw, fh) == scaled.dimensions() {
                    scaled
                } else {
                    imageops::resize(&scaled, fw, fh, imageops::FilterType::Triangle)
                };

                let mut canvas = RgbaImage::from_pixel(pw, ph, PAGE_FILL);
                let x = self.h_align.offset(pw, fw);
                let y = self.v_align.offset(ph, fh);
                imageops::overlay(&mut canvas, &placed, x, y);
                canvas
            }
        }
    }

    fn settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(MODE_KEY.into(), SettingsValue::Text(self.mode.name().into()));
        map.insert(IMAGE_WIDTH_KEY.into(), SettingsValue::Real(self.image_width));
        map.insert(
            IMAGE_HEIGHT_KEY.into(),
            SettingsValue::Real(self.image_height),
        );
        map.insert(PAGE_WIDTH_KEY.into(), SettingsValue::Real(self.page_width));
        map.insert(PAGE_HEIGHT_KEY.into(), SettingsValue::Real(self.page_height));
        map.insert(MARGIN_H_KEY.into(), SettingsValue::Real(self.margin_h));
        map.insert(MARGIN_V_KEY.into(), SettingsValue::Real(self.margin_v));
        map.insert(DPI_KEY.into(), SettingsValue::Real(self.dpi));
        map.insert(UNIT_KEY.into(), SettingsValue::Text(self.unit.name().into()));
        map.insert(
            H_ALIGN_KEY.into(),
            SettingsValue::Text(self.h_align.name().into()),
        );
        map.insert(
            V_ALIGN_KEY.into(),
            SettingsValue::Text(self.v_align.name().into()),
        );
        map
    }

    fn apply_settings(&mut self, settings: &SettingsMap) {
        self.mode = settings.get(MODE_KEY).map_or(LayoutMode::NoMargin, |value| {
            value
                .as_text()
                .and_then(LayoutMode::from_name)
                .unwrap_or(self.mode)
        });

        self.image_width = Self::read_size(settings, IMAGE_WIDTH_KEY, self.image_width, 0.0);
        self.image_height = Self::read_size(settings, IMAGE_HEIGHT_KEY, self.image_height, 0.0);
        self.page_width = Self::read_size(settings, PAGE_WIDTH_KEY, self.page_width, 0.0);
        self.page_height = Self::read_size(settings, PAGE_HEIGHT_KEY, self.page_height, 0.0);
        self.margin_h = Self::read_size(settings, MARGIN_H_KEY, self.margin_h, 0.0);
        self.margin_v = Self::read_size(settings, MARGIN_V_KEY, self.margin_v, 0.0);

        // DPI below the minimum is invalid: keep the previous value
        // when present-but-bad, fall back to the default when absent.
        self.dpi = settings.get(DPI_KEY).map_or(DEFAULT_DPI, |value| {
            match value.as_real() {
                Some(v) if v >= MIN_DPI => v,
                _ => self.dpi,
            }
        });

        self.unit = settings.get(UNIT_KEY).map_or(Unit::Pixel, |value| {
            value.as_text().and_then(Unit::from_name).unwrap_or(self.unit)
        });

        self.h_align = settings
            .get(H_ALIGN_KEY)
            .map_or(HorizontalAlignment::Center, |value| {
                value
                    .as_text()
                    .and_then(HorizontalAlignment::from_name)
                    .unwrap_or(self.h_align)
            });
        self.v_align = settings
            .get(V_ALIGN_KEY)
            .map_or(VerticalAlignment::Center, |value| {
                value
                    .as_text()
                    .and_then(VerticalAlignment::from_name)
                    .unwrap_or(self.v_align)
            });
    }
}
