//! Per-page layout detection ensemble.
//!
//! Every enabled detection source is run once on the page, low-score detections
//! are dropped, and the survivors of all sources are fused into one consensus
//! layout. A source that fails or is switched off never aborts the page.

use crate::core::config::{ConfigError, ConfigValidator, SourceToggles, validate_range};
use crate::core::traits::DetectionSource;
use crate::pipeline::result::{PageLayout, SourceReport, SourceStatus};
use crate::processors::{BoxFusionEngine, DetectionBox, FusedBox, FusionConfig, RawDetection};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for per-page layout detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Detections scoring below this never reach fusion (default: 0.3)
    pub min_box_score: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { min_box_score: 0.3 }
    }
}

impl LayoutConfig {
    /// Sets the minimum detection score.
    pub fn with_min_box_score(mut self, score: f32) -> Self {
        self.min_box_score = score;
        self
    }
}

impl ConfigValidator for LayoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("layout.min_box_score", self.min_box_score, 0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
struct SourceSlot {
    source: Arc<dyn DetectionSource>,
    enabled: bool,
}

/// Runs the detection ensemble on single pages.
#[derive(Debug, Clone)]
pub struct PageLayoutPipeline {
    sources: Vec<SourceSlot>,
    config: LayoutConfig,
    engine: BoxFusionEngine,
}

impl PageLayoutPipeline {
    /// Creates a pipeline over `sources`, all enabled, in the given order.
    pub fn new(
        sources: Vec<Arc<dyn DetectionSource>>,
        config: LayoutConfig,
        fusion: FusionConfig,
    ) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|source| SourceSlot {
                    source,
                    enabled: true,
                })
                .collect(),
            config,
            engine: BoxFusionEngine::new(fusion),
        }
    }

    /// Applies per-source enable flags.
    ///
    /// Fails if a toggle names a source this pipeline does not have.
    pub fn with_toggles(mut self, toggles: &SourceToggles) -> Result<Self, ConfigError> {
        let names: Vec<&str> = self.sources.iter().map(|s| s.source.name()).collect();
        toggles.check_known(&names)?;
        for slot in &mut self.sources {
            slot.enabled = toggles.is_enabled(slot.source.name());
        }
        Ok(self)
    }

    /// Returns the layout configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Names of the enabled sources, in order.
    pub fn enabled_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.source.name())
            .collect()
    }

    /// Detects and fuses the layout of one page.
    ///
    /// Sources run in parallel, but their detections are concatenated in source
    /// order so the fused result does not depend on scheduling.
    pub fn process_page(&self, page: usize, image: &RgbImage) -> PageLayout {
        let outcomes: Vec<Option<Result<Vec<RawDetection>, String>>> = self
            .sources
            .par_iter()
            .map(|slot| {
                if !slot.enabled {
                    return None;
                }
                Some(slot.source.detect(image).map_err(|err| {
                    tracing::warn!(
                        target: "layout",
                        source = slot.source.name(),
                        page,
                        error = %err,
                        "Detection source failed; skipping it for this page"
                    );
                    err.to_string()
                }))
            })
            .collect();

        let per_source = self
            .sources
            .iter()
            .zip(outcomes)
            .map(|(slot, outcome)| (slot.source.name(), outcome));
        self.assemble(page, per_source)
    }

    /// Fuses detections that were computed elsewhere.
    ///
    /// Each entry is a source name and its raw detections, in source order. Used
    /// to inspect fusion settings offline.
    pub fn layout_from_detections<'a, I>(&self, page: usize, detections: I) -> PageLayout
    where
        I: IntoIterator<Item = (&'a str, Vec<RawDetection>)>,
    {
        let per_source = detections
            .into_iter()
            .map(|(name, raw)| (name, Some(Ok(raw))));
        self.assemble(page, per_source)
    }

    fn assemble<'a, I>(&self, page: usize, per_source: I) -> PageLayout
    where
        I: Iterator<Item = (&'a str, Option<Result<Vec<RawDetection>, String>>)>,
    {
        let mut reports = Vec::new();
        let mut boxes: Vec<DetectionBox> = Vec::new();

        for (name, outcome) in per_source {
            let status = match outcome {
                None => SourceStatus::Disabled,
                Some(Err(error)) => SourceStatus::Failed { error },
                Some(Ok(raw)) => {
                    let detections = raw.len();
                    let before = boxes.len();
                    boxes.extend(
                        raw.into_iter()
                            .filter(|d| d.score >= self.config.min_box_score)
                            .map(|d| d.on_page(page)),
                    );
                    SourceStatus::Completed {
                        detections,
                        kept: boxes.len() - before,
                    }
                }
            };
            reports.push(SourceReport::new(name, status));
        }

        if !reports.iter().any(SourceReport::is_completed) && !reports.is_empty() {
            tracing::warn!(
                target: "layout",
                page,
                "No detection source produced results; page layout is empty"
            );
        }

        let mut fused = self.engine.fuse(&boxes);
        fused.sort_by(FusedBox::reading_order);

        tracing::debug!(
            target: "layout",
            page,
            detections = boxes.len(),
            regions = fused.len(),
            "Fused page layout"
        );

        PageLayout {
            page,
            boxes: fused,
            sources: reports,
        }
    }
}
