//! Configuration handling for the CLI.

use layout_fusion::core::{ConfigValidator, PipelineConfig, PipelineResult};
use std::path::Path;
use tracing::info;

/// Settings that can be overridden from the command line or environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub iou_threshold: Option<f32>,
    pub min_dimension: Option<f32>,
    pub min_box_score: Option<f32>,
    pub margin: Option<f32>,
    pub unknown_confidence: Option<f32>,
    pub normalization_constant: Option<f64>,
}

/// Loads the pipeline configuration, applies overrides and validates the result.
///
/// Without a file the built-in defaults are used.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> PipelineResult<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    if let Some(v) = overrides.iou_threshold {
        config.fusion.iou_threshold = v;
    }
    if let Some(v) = overrides.min_dimension {
        config.fusion.min_dimension = v;
    }
    if let Some(v) = overrides.min_box_score {
        config.layout.min_box_score = v;
    }
    if let Some(v) = overrides.margin {
        config.arbitration.margin = v;
    }
    if let Some(v) = overrides.unknown_confidence {
        config.arbitration.unknown_confidence = v;
    }
    if let Some(v) = overrides.normalization_constant {
        config.scoring.normalization_constant = v;
    }

    config.validate()?;
    Ok(config)
}
