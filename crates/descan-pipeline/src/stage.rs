//! The filter stage contract and its cache node.
//!
//! A [`Filter`] is the pure part of a stage: a transform from input
//! image and parameters to output image, plus the settings codec for
//! those parameters. A [`Stage`] wraps a filter with the mutable state
//! the pipeline needs: cached input and output images, the two dirty
//! flags that drive lazy recomputation, and the enabled toggle.
//!
//! # Dirty-flag protocol
//!
//! - `dirty_input` — upstream signalled a change; the cached input must
//!   be refreshed from the previous stage's output before next use.
//! - `dirty_output` — parameters or input changed since the output was
//!   last computed.
//!
//! The cached output is valid exactly when both flags are clear.
//! Invalidation is pushed down the chain synchronously by the pipeline
//! controller; pixel data is only ever pulled, inside
//! [`Stage::refresh`], when someone asks for an output.

use crate::types::{RgbaImage, SettingsMap, SettingsValue};

/// Settings key for the per-stage enable toggle, shared by all stages.
pub const ENABLED_KEY: &str = "enabled";

/// The transform seam every concrete stage implements.
///
/// Implementations must be pure in `apply`: same input image and same
/// parameters produce a bit-identical output image, with no other
/// observable effect. All parameter mutation goes through
/// [`apply_settings`](Self::apply_settings), which must treat missing
/// keys as "reset to the documented default" and silently retain the
/// previous value for out-of-range ones.
pub trait Filter {
    /// Stable unique identifier, used as the settings-map key. Must
    /// never change across versions; saved files depend on it.
    fn identifier(&self) -> &'static str;

    /// Human-readable label. Not used for identity.
    fn display_name(&self) -> &'static str;

    /// Apply the transform. An empty input image yields an empty
    /// output image, never a panic.
    fn apply(&self, input: &RgbaImage) -> RgbaImage;

    /// The current parameters as a settings map. Never includes image
    /// data. Must round-trip through [`apply_settings`](Self::apply_settings).
    fn settings(&self) -> SettingsMap;

    /// Apply the provided keys; reset every recognized-but-absent key
    /// to its default. Must not recompute anything.
    fn apply_settings(&mut self, settings: &SettingsMap);
}

/// The identity filter: output equals input, no parameters.
///
/// Serves as the reference baseline for the stage contract and as a
/// placeholder stage when no transform is wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Filter for PassThrough {
    fn identifier(&self) -> &'static str {
        "passthrough"
    }

    fn display_name(&self) -> &'static str {
        "Pass-through"
    }

    fn apply(&self, input: &RgbaImage) -> RgbaImage {
        input.clone()
    }

    fn settings(&self) -> SettingsMap {
        SettingsMap::new()
    }

    fn apply_settings(&mut self, _settings: &SettingsMap) {}
}

/// One node of the pipeline: a filter plus its cached images and dirty
/// state.
pub struct Stage {
    filter: Box<dyn Filter>,
    enabled: bool,
    input: RgbaImage,
    output: RgbaImage,
    dirty_input: bool,
    dirty_output: bool,
    computations: u64,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("identifier", &self.filter.identifier())
            .field("enabled", &self.enabled)
            .field("dirty_input", &self.dirty_input)
            .field("dirty_output", &self.dirty_output)
            .field("computations", &self.computations)
            .finish()
    }
}

impl Stage {
    /// Wrap a filter in a fresh cache node. The output starts stale so
    /// the first refresh always computes.
    #[must_use]
    pub fn new(filter: Box<dyn Filter>) -> Self {
        Self {
            filter,
            enabled: true,
            input: RgbaImage::new(0, 0),
            output: RgbaImage::new(0, 0),
            dirty_input: false,
            dirty_output: true,
            computations: 0,
        }
    }

    /// The wrapped filter's stable identifier.
    #[must_use]
    pub fn identifier(&self) -> &'static str {
        self.filter.identifier()
    }

    /// The wrapped filter's display label.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        self.filter.display_name()
    }

    /// Replace this stage's input image and mark the output stale.
    pub fn set_input(&mut self, image: RgbaImage) {
        self.input = image;
        self.dirty_output = true;
    }

    /// Record that upstream output changed. The new pixels are not
    /// pulled here — only when a refresh is requested.
    pub const fn mark_input_stale(&mut self) {
        self.dirty_input = true;
    }

    /// Whether the cached input needs to be re-pulled from upstream.
    #[must_use]
    pub const fn is_input_stale(&self) -> bool {
        self.dirty_input
    }

    /// Whether the cached output needs recomputation.
    #[must_use]
    pub const fn is_output_stale(&self) -> bool {
        self.dirty_output
    }

    /// Whether the stage's transform is applied (disabled stages pass
    /// their input through unchanged).
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle the stage. A changed value marks the output stale.
    pub const fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.dirty_output = true;
        }
    }

    /// The stage's parameters, including the shared `enabled` key.
    #[must_use]
    pub fn settings(&self) -> SettingsMap {
        let mut map = self.filter.settings();
        map.insert(ENABLED_KEY.into(), SettingsValue::Boolean(self.enabled));
        map
    }

    /// Apply a settings map. Missing keys reset to defaults (`enabled`
    /// defaults to true). Recomputation is deferred to the next
    /// refresh, so an entire pipeline can be restored without
    /// cascading intermediate recomputes.
    pub fn apply_settings(&mut self, settings: &SettingsMap) {
        // Missing resets to enabled; a present non-boolean value is
        // invalid and keeps the previous state.
        self.enabled = settings.get(ENABLED_KEY).map_or(true, |value| {
            value.as_boolean().unwrap_or(self.enabled)
        });
        self.filter.apply_settings(settings);
        self.dirty_output = true;
    }

    /// Two-step lazy refresh.
    ///
    /// 1. If the input is stale and an upstream image is available,
    ///    adopt it and mark the output stale.
    /// 2. If the output is stale, recompute it and clear the flag.
    ///
    /// After this returns, [`output`](Self::output) is fresh. At most
    /// one computation happens per settled state, and recomputation is
    /// idempotent.
    pub fn refresh(&mut self, upstream: Option<&RgbaImage>) {
        if self.dirty_input {
            if let Some(image) = upstream {
                self.input = image.clone();
                self.dirty_input = false;
                self.dirty_output = true;
            }
        }
        if self.dirty_output {
            self.output = if self.enabled {
                self.computations += 1;
                self.filter.apply(&self.input)
            } else {
                self.input.clone()
            };
            self.dirty_output = false;
        }
    }

    /// The last computed output. Call [`refresh`](Self::refresh) first
    /// if freshness matters.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// How many times the filter's transform has run. Diagnostics:
    /// lets callers (and tests) verify the lazy-recompute contract.
    #[must_use]
    pub const fn computations(&self) -> u64 {
        self.computations
    }
}
