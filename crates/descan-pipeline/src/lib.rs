//! descan-pipeline: Interactive scanned-page cleanup pipeline (sans-IO).
//!
//! Cleans up raw book/document scans through an ordered filter chain:
//! rotation -> de-keystoning -> cropping -> scaling/layout ->
//! color correction -> thresholding.
//!
//! The chain is built for interactive editing: every stage caches its
//! input and output, and a pair of dirty flags per stage makes
//! recomputation lazy and minimal. Changing one stage's parameters
//! invalidates only that stage and everything downstream; pixels are
//! only processed when an output is actually requested. Stage
//! parameters round-trip through a plain key/value settings codec, so
//! a whole editing session can be saved and restored without touching
//! any image data.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. Decoding, file handling, and
//! any user interface belong to callers.
//!
//! ```
//! use descan_pipeline::{Pipeline, RgbaImage};
//!
//! let mut pipeline = Pipeline::scan_defaults();
//! pipeline.set_image(RgbaImage::new(64, 64));
//! let cleaned = pipeline.result_image();
//! // The default de-keystone and crop frames are 100 x 100 pixels.
//! assert_eq!(cleaned.dimensions(), (100, 100));
//! ```

pub mod color;
pub mod crop;
pub mod dekeystone;
pub mod geometry;
pub mod layout;
pub mod pipeline;
pub mod rotation;
pub mod stage;
pub mod threshold;
pub mod types;
pub mod units;
pub mod warp;

pub use color::ColorCorrection;
pub use crop::Crop;
pub use dekeystone::Dekeystone;
pub use geometry::{Homography, Quad};
pub use layout::{HorizontalAlignment, LayoutMode, PageLayout, VerticalAlignment};
pub use pipeline::{Pipeline, StageEvent};
pub use rotation::Rotation;
pub use stage::{Filter, PassThrough, Stage};
pub use threshold::{Threshold, ThresholdMethod};
pub use types::{
    GrayImage, PipelineError, PipelineSettings, Point, Rect, RgbaImage, SettingsMap,
    SettingsValue,
};
pub use units::Unit;
