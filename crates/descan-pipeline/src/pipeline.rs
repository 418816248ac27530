//! The pipeline controller: an ordered chain of [`Stage`]s.
//!
//! The controller owns the stages, routes images from each stage's
//! output to the next stage's input, and enforces the lazy-recompute
//! contract: mutations (new source image, changed parameters, toggled
//! stages) only flip dirty flags downstream of the change; pixels are
//! recomputed when an output is actually requested, upstream first,
//! and stages upstream of a change are never touched.
//!
//! Front-ends observe mutations through [`StageEvent`] subscriptions
//! and can keep one stage "selected" for preview; selecting a stage
//! eagerly refreshes the chain up to it.

use crate::color::ColorCorrection;
use crate::crop::Crop;
use crate::dekeystone::Dekeystone;
use crate::layout::PageLayout;
use crate::rotation::Rotation;
use crate::stage::{Filter, Stage};
use crate::threshold::Threshold;
use crate::types::{PipelineError, PipelineSettings, RgbaImage, SettingsMap};

/// A mutation notification, delivered synchronously to subscribers
/// after the pipeline state has been updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// A stage's parameters changed.
    ParametersChanged {
        /// The mutated stage.
        identifier: &'static str,
    },
    /// A stage was enabled or disabled.
    EnabledToggled {
        /// The toggled stage.
        identifier: &'static str,
        /// The new state.
        enabled: bool,
    },
    /// A stage was selected for preview and its output refreshed.
    PreviewRequested {
        /// The selected stage.
        identifier: &'static str,
    },
}

type Subscriber = Box<dyn Fn(&StageEvent)>;

/// An ordered chain of stages with lazy recomputation.
pub struct Pipeline {
    stages: Vec<Stage>,
    current: usize,
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from an ordered list of filters.
    ///
    /// # Errors
    ///
    /// [`PipelineError::EmptyChain`] when no filters are given, and
    /// [`PipelineError::DuplicateStage`] when two filters share an
    /// identifier (identifiers key the settings maps, so they must be
    /// unique).
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Result<Self, PipelineError> {
        if filters.is_empty() {
            return Err(PipelineError::EmptyChain);
        }
        let mut seen = std::collections::BTreeSet::new();
        for filter in &filters {
            if !seen.insert(filter.identifier()) {
                return Err(PipelineError::DuplicateStage(
                    filter.identifier().to_string(),
                ));
            }
        }
        Ok(Self {
            stages: filters.into_iter().map(Stage::new).collect(),
            current: 0,
            subscribers: Vec::new(),
        })
    }

    /// The standard scan-cleanup chain: rotation, de-keystoning,
    /// cropping, scaling and layout, color correction, thresholding.
    #[must_use]
    pub fn scan_defaults() -> Self {
        Self {
            stages: vec![
                Stage::new(Box::new(Rotation::default())),
                Stage::new(Box::new(Dekeystone::default())),
                Stage::new(Box::new(Crop::default())),
                Stage::new(Box::new(PageLayout::default())),
                Stage::new(Box::new(ColorCorrection::default())),
                Stage::new(Box::new(Threshold::default())),
            ],
            current: 0,
            subscribers: Vec::new(),
        }
    }

    /// The number of stages in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages. Always false for a pipeline
    /// built through [`new`](Self::new) or [`scan_defaults`](Self::scan_defaults).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage identifiers in chain order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::identifier).collect()
    }

    /// Read-only access to a stage by identifier.
    #[must_use]
    pub fn stage(&self, identifier: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.identifier() == identifier)
    }

    fn index_of(&self, identifier: &str) -> Result<usize, PipelineError> {
        self.stages
            .iter()
            .position(|s| s.identifier() == identifier)
            .ok_or_else(|| PipelineError::UnknownStage(identifier.to_string()))
    }

    /// Register a mutation observer. Subscribers are called in
    /// registration order, synchronously, after state is updated.
    pub fn subscribe(&mut self, subscriber: impl Fn(&StageEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    fn emit(&self, event: &StageEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }

    /// Mark every stage after `index` as having a stale input.
    fn invalidate_downstream(&mut self, index: usize) {
        for stage in &mut self.stages[index + 1..] {
            stage.mark_input_stale();
        }
    }

    /// Feed a new source image into the head of the chain. No pixels
    /// are processed until an output is requested.
    pub fn set_image(&mut self, image: RgbaImage) {
        self.stages[0].set_input(image);
        self.invalidate_downstream(0);
    }

    /// Refresh stages `0..=index`, upstream first. Clean stages are
    /// skipped; each dirty stage computes at most once.
    fn refresh_through(&mut self, index: usize) {
        self.stages[0].refresh(None);
        for k in 1..=index {
            let (upstream, rest) = self.stages.split_at_mut(k);
            rest[0].refresh(Some(upstream[k - 1].output()));
        }
    }

    /// The final output of the chain, refreshing whatever is stale.
    pub fn result_image(&mut self) -> &RgbaImage {
        let last = self.stages.len() - 1;
        self.refresh_through(last);
        self.stages[last].output()
    }

    /// The output of one stage, refreshing the chain up to it.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownStage`] when no stage has this
    /// identifier.
    pub fn stage_output(&mut self, identifier: &str) -> Result<&RgbaImage, PipelineError> {
        let index = self.index_of(identifier)?;
        self.refresh_through(index);
        Ok(self.stages[index].output())
    }

    /// Update one stage's parameters and invalidate everything
    /// downstream of it. Emits [`StageEvent::ParametersChanged`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownStage`] when no stage has this
    /// identifier.
    pub fn set_stage_settings(
        &mut self,
        identifier: &str,
        settings: &SettingsMap,
    ) -> Result<(), PipelineError> {
        let index = self.index_of(identifier)?;
        self.stages[index].apply_settings(settings);
        self.invalidate_downstream(index);
        self.emit(&StageEvent::ParametersChanged {
            identifier: self.stages[index].identifier(),
        });
        Ok(())
    }

    /// Enable or disable one stage. A no-op toggle emits no event and
    /// invalidates nothing. Emits [`StageEvent::EnabledToggled`] on a
    /// real change.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownStage`] when no stage has this
    /// identifier.
    pub fn set_stage_enabled(
        &mut self,
        identifier: &str,
        enabled: bool,
    ) -> Result<(), PipelineError> {
        let index = self.index_of(identifier)?;
        if self.stages[index].is_enabled() == enabled {
            return Ok(());
        }
        self.stages[index].set_enabled(enabled);
        self.invalidate_downstream(index);
        self.emit(&StageEvent::EnabledToggled {
            identifier: self.stages[index].identifier(),
            enabled,
        });
        Ok(())
    }

    /// Snapshot every stage's parameters, keyed by identifier.
    /// Contains no image data; suitable for serialization.
    #[must_use]
    pub fn settings(&self) -> PipelineSettings {
        self.stages
            .iter()
            .map(|stage| (stage.identifier().to_string(), stage.settings()))
            .collect()
    }

    /// Restore the whole pipeline from a settings snapshot.
    ///
    /// Stages absent from the snapshot are reset to their defaults;
    /// unknown identifiers in the snapshot are ignored. No events are
    /// emitted and nothing is recomputed until an output is requested,
    /// so restoring N stages costs zero pixel work up front.
    pub fn apply_settings(&mut self, settings: &PipelineSettings) {
        let empty = SettingsMap::new();
        for stage in &mut self.stages {
            let map = settings.get(stage.identifier()).unwrap_or(&empty);
            stage.apply_settings(map);
        }
        // Inputs downstream of the head may hold pixels from the old
        // parameter state.
        self.invalidate_downstream(0);
    }

    /// Select a stage for preview: the chain up to it is refreshed
    /// eagerly and [`StageEvent::PreviewRequested`] is emitted.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownStage`] when no stage has this
    /// identifier.
    pub fn select_stage(&mut self, identifier: &str) -> Result<(), PipelineError> {
        let index = self.index_of(identifier)?;
        self.current = index;
        self.refresh_through(index);
        self.emit(&StageEvent::PreviewRequested {
            identifier: self.stages[index].identifier(),
        });
        Ok(())
    }

    /// The identifier of the currently selected stage.
    #[must_use]
    pub fn current_stage_identifier(&self) -> &'static str {
        self.stages[self.current].identifier()
    }

    /// The cached output of the currently selected stage, refreshed.
    pub fn current_stage_output(&mut self) -> &RgbaImage {
        self.refresh_through(self.current);
        self.stages[self.current].output()
    }
}
