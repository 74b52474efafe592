//! Capability contracts consumed by the pipeline.
//!
//! Detectors, OCR engines and language models are opaque to this crate. Each is
//! reached through one of the narrow traits below, so backends are interchangeable
//! and tests can substitute deterministic doubles. Implementations are expected to
//! be fully initialized before they are handed to the pipeline and must be safe to
//! call from several worker threads at once.

use crate::core::errors::PipelineResult;
use crate::processors::RawDetection;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A layout detector.
pub trait DetectionSource: Debug + Send + Sync {
    /// Stable name used in configuration toggles and logs.
    fn name(&self) -> &str;

    /// Detects layout regions on a page image.
    fn detect(&self, image: &RgbImage) -> PipelineResult<Vec<RawDetection>>;
}

/// Output of the primary OCR engine for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    /// Transcribed text.
    pub text: String,
    /// Engine-native confidence, if the engine reports one.
    pub confidence: Option<f32>,
}

impl RecognizedText {
    /// Creates a new recognition result.
    pub fn new(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// Aggregates line-level engine output into one region transcription.
    ///
    /// Line texts are joined with a single space and the confidence is the mean
    /// of the line scores. No lines yields empty text with no confidence.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: AsRef<str>,
    {
        let mut texts = Vec::new();
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for (text, score) in lines {
            texts.push(text.as_ref().to_string());
            sum += f64::from(score);
            count += 1;
        }

        let confidence = (count > 0).then(|| (sum / count as f64) as f32);
        Self {
            text: texts.join(" "),
            confidence,
        }
    }
}

/// The primary OCR engine: returns text with an engine-native confidence.
pub trait PrimaryRecognizer: Debug + Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Transcribes a cropped region.
    fn recognize(&self, region: &RgbImage) -> PipelineResult<RecognizedText>;
}

/// The secondary OCR engine: returns text only; its confidence is derived from
/// a language model.
pub trait SecondaryRecognizer: Debug + Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Transcribes a cropped region.
    fn recognize(&self, region: &RgbImage) -> PipelineResult<String>;
}

/// Negative log-likelihood reported by a language model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeLogLikelihood {
    /// Mean NLL per token.
    PerToken(f64),
    /// Summed NLL over `tokens` tokens.
    Total {
        /// Summed negative log-likelihood.
        nll: f64,
        /// Number of tokens the sum covers.
        tokens: usize,
    },
}

impl NegativeLogLikelihood {
    /// Mean NLL per token; `+inf` when a total covers zero tokens.
    pub fn mean(&self) -> f64 {
        match *self {
            NegativeLogLikelihood::PerToken(nll) => nll,
            NegativeLogLikelihood::Total { tokens: 0, .. } => f64::INFINITY,
            NegativeLogLikelihood::Total { nll, tokens } => nll / tokens as f64,
        }
    }
}

/// A language model that scores text likelihood.
pub trait LanguageModelScorer: Debug + Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    /// Returns the negative log-likelihood of `text`.
    fn score(&self, text: &str) -> PipelineResult<NegativeLogLikelihood>;
}
