//! Core error types for the layout and recognition pipeline.
//!
//! This module defines the main [`PipelineError`] enum and the [`ProcessingStage`]
//! enum used to tag where a failure happened. Fusion and arbitration themselves
//! never fail; these errors come from configuration, image loading and the
//! external capabilities (detectors, OCR engines, language models).

use thiserror::Error;

/// Stage of the pipeline an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Running a layout detection source.
    Detection,
    /// Cropping a region out of a page image.
    RegionCrop,
    /// Running an OCR source on a region.
    Recognition,
    /// Scoring text with a language model.
    Scoring,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Detection => write!(f, "detection"),
            ProcessingStage::RegionCrop => write!(f, "region crop"),
            ProcessingStage::Recognition => write!(f, "recognition"),
            ProcessingStage::Scoring => write!(f, "scoring"),
        }
    }
}

/// Errors that can occur in the layout and recognition pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error occurred while loading a page image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// An external capability (detector, OCR engine, language model) failed.
    #[error("{stage} failed in source '{source_name}': {context}")]
    Source {
        /// Name of the capability that failed.
        source_name: String,
        /// The stage the capability was serving.
        stage: ProcessingStage,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, when the capability reported one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Malformed JSON in a configuration or detection file.
    #[error("json")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<crate::core::config::ConfigError> for PipelineError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl PipelineError {
    /// Creates a configuration error with context and details.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use layout_fusion::core::errors::PipelineError;
    /// let err = PipelineError::config_error_detailed(
    ///     "source toggles",
    ///     "source 'yolo' is not registered",
    /// );
    /// assert!(matches!(err, PipelineError::ConfigError { .. }));
    /// ```
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Wraps an error reported by an external capability.
    pub fn source_failure(
        source_name: impl Into<String>,
        stage: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Source {
            source_name: source_name.into(),
            stage,
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// A capability failure with no underlying error value.
    pub fn source_unavailable(
        source_name: impl Into<String>,
        stage: ProcessingStage,
        context: impl Into<String>,
    ) -> Self {
        Self::Source {
            source_name: source_name.into(),
            stage,
            context: context.into(),
            source: None,
        }
    }

    /// Creates a processing error for the given stage.
    pub fn processing(kind: ProcessingStage, context: impl Into<String>) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
        }
    }
}
