//! Top-level configuration for the layout and recognition pipeline.

use super::errors::{ConfigError, ConfigValidator};
use super::parallel::ParallelPolicy;
use crate::core::errors::PipelineResult;
use crate::pipeline::layout::LayoutConfig;
use crate::pipeline::recognition::RecognitionConfig;
use crate::processors::{ArbitrationConfig, FusionConfig, ScorerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-source enable flags, keyed by detection source name.
///
/// Sources missing from the map are enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceToggles(BTreeMap<String, bool>);

impl SourceToggles {
    /// Creates an empty toggle set (everything enabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the named source.
    pub fn set(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.0.insert(name.into(), enabled);
        self
    }

    /// Whether the named source is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(true)
    }

    /// Names mentioned in the toggles.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fails if a toggle names a source that is not in `known`.
    pub fn check_known(&self, known: &[&str]) -> Result<(), ConfigError> {
        for name in self.names() {
            if !known.contains(&name) {
                return Err(ConfigError::UnknownSource {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Every externally settable knob of the pipeline.
///
/// All sections default independently, so a config file only needs the values
/// it changes:
///
/// ```json
/// {
///   "fusion": { "iou_threshold": 0.55 },
///   "layout": { "min_box_score": 0.25 },
///   "sources": { "publaynet": false }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Box fusion settings.
    pub fusion: FusionConfig,
    /// Per-page layout settings.
    pub layout: LayoutConfig,
    /// Language-model calibration settings.
    pub scoring: ScorerConfig,
    /// Candidate arbitration settings.
    pub arbitration: ArbitrationConfig,
    /// Region recognition settings.
    pub recognition: RecognitionConfig,
    /// Detection source enable flags.
    pub sources: SourceToggles,
    /// Worker pool settings.
    pub parallel: ParallelPolicy,
}

impl PipelineConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.fusion.validate()?;
        self.layout.validate()?;
        self.scoring.validate()?;
        self.arbitration.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PipelineError;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.fusion.iou_threshold, 0.5);
        assert_eq!(config.fusion.min_dimension, 10.0);
        assert_eq!(config.layout.min_box_score, 0.3);
        assert_eq!(config.arbitration.margin, 0.05);
        assert_eq!(config.scoring.normalization_constant, 50.0);
        assert!(config.sources.is_enabled("anything"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"fusion": {"iou_threshold": 0.6}, "sources": {"publaynet": false}}"#,
        )
        .unwrap();
        assert_eq!(config.fusion.iou_threshold, 0.6);
        assert_eq!(config.fusion.min_dimension, 10.0);
        assert!(!config.sources.is_enabled("publaynet"));
        assert!(config.sources.is_enabled("yolo"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = PipelineConfig::from_json_str(r#"{"fusion": {"iou_threshold": 1.5}}"#)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError { .. }));

        let err = PipelineConfig::from_json_str(r#"{"scoring": {"normalization_constant": 0}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("normalization_constant"));
    }

    #[test]
    fn test_malformed_json() {
        let err = PipelineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"arbitration": {{"margin": 0.1}}}}"#).unwrap();
        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.arbitration.margin, 0.1);

        let missing = PipelineConfig::from_json_file("/nonexistent/pipeline.json");
        assert!(matches!(missing, Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_check_known_sources() {
        let toggles = SourceToggles::new().set("yolo", false);
        assert!(toggles.check_known(&["yolo", "publaynet"]).is_ok());
        assert_eq!(
            toggles.check_known(&["publaynet"]),
            Err(ConfigError::UnknownSource {
                name: "yolo".to_string()
            })
        );
    }
}
