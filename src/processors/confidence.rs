//! Confidence calibration for transcription candidates.
//!
//! The primary OCR engine reports its own confidence, while the secondary engine
//! reports none and is judged by how fluent a language model finds its text. The
//! two signals live on different scales, so each goes through its own calibration
//! function into `[0, 1]` before the arbiter compares them.

use crate::core::config::{ConfigError, ConfigValidator, validate_positive};
use crate::core::traits::LanguageModelScorer;
use crate::processors::normalization::TextNormalizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A calibrated confidence, or the explicit absence of one.
///
/// `Unknown` means no evidence was available (for example the language model is
/// not loaded). It is deliberately not the same as `Known(0.0)`; callers that
/// need a number must pick one with [`Confidence::known_or`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Confidence {
    /// A value in `[0, 1]`.
    Known(f32),
    /// No evidence available.
    Unknown,
}

impl Confidence {
    /// Builds a known confidence, clamping to `[0, 1]`. NaN maps to `Unknown`.
    pub fn known(value: f32) -> Self {
        if value.is_nan() {
            Confidence::Unknown
        } else {
            Confidence::Known(value.clamp(0.0, 1.0))
        }
    }

    /// The value, if known.
    pub fn value(&self) -> Option<f32> {
        match *self {
            Confidence::Known(v) => Some(v),
            Confidence::Unknown => None,
        }
    }

    /// The value, or `default` when unknown.
    pub fn known_or(&self, default: f32) -> f32 {
        self.value().unwrap_or(default)
    }

    /// Whether no evidence was available.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Confidence::Unknown)
    }
}

impl From<Option<f32>> for Confidence {
    fn from(value: Option<f32>) -> Self {
        calibrate_engine_score(value)
    }
}

/// Maps a language-model perplexity to `[0, 1]`: `clamp(1 - perplexity / c, 0, 1)`.
///
/// Infinite or NaN perplexity yields 0.
pub fn calibrate_perplexity(perplexity: f64, normalization_constant: f64) -> f32 {
    if !perplexity.is_finite() {
        return 0.0;
    }
    (1.0 - perplexity / normalization_constant).clamp(0.0, 1.0) as f32
}

/// Maps an engine-native OCR score to a [`Confidence`].
///
/// Missing or non-finite scores are `Unknown`; anything else is clamped to `[0, 1]`.
pub fn calibrate_engine_score(score: Option<f32>) -> Confidence {
    match score {
        Some(s) if s.is_finite() => Confidence::Known(s.clamp(0.0, 1.0)),
        _ => Confidence::Unknown,
    }
}

/// Configuration for language-model confidence scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Perplexity at which confidence reaches zero (default: 50.0)
    pub normalization_constant: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            normalization_constant: 50.0,
        }
    }
}

impl ConfigValidator for ScorerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_positive("scoring.normalization_constant", self.normalization_constant)
    }
}

/// Perplexity and calibrated confidence of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextScore {
    /// `exp(mean token NLL)`; `None` when the language model could not score the text.
    pub perplexity: Option<f64>,
    /// Calibrated confidence.
    pub confidence: Confidence,
}

/// Turns a language-model likelihood into a calibrated confidence.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    model: Option<Arc<dyn LanguageModelScorer>>,
    config: ScorerConfig,
}

impl ConfidenceScorer {
    /// Creates a scorer backed by `model`. `None` makes every non-empty text `Unknown`.
    pub fn new(model: Option<Arc<dyn LanguageModelScorer>>, config: ScorerConfig) -> Self {
        Self { model, config }
    }

    /// Whether a language model is attached.
    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Scores `text`.
    ///
    /// The text is normalized first and the model sees the normalized form. Text
    /// that normalizes to nothing (only whitespace or zero-width characters)
    /// has infinite perplexity and a known confidence of 0. A missing model, a
    /// model error, or a negative/NaN likelihood yields `Unknown`.
    pub fn score(&self, text: &str) -> TextScore {
        let text = TextNormalizer::new().normalize(text);
        if text.is_empty() {
            return TextScore {
                perplexity: Some(f64::INFINITY),
                confidence: Confidence::Known(0.0),
            };
        }

        let Some(model) = self.model.as_ref() else {
            return TextScore {
                perplexity: None,
                confidence: Confidence::Unknown,
            };
        };

        let nll = match model.score(&text) {
            Ok(nll) => nll.mean(),
            Err(err) => {
                tracing::warn!(
                    target: "scoring",
                    model = model.name(),
                    error = %err,
                    "Language model scoring failed; confidence is unknown"
                );
                return TextScore {
                    perplexity: None,
                    confidence: Confidence::Unknown,
                };
            }
        };

        if nll.is_nan() || nll < 0.0 {
            tracing::warn!(
                target: "scoring",
                model = model.name(),
                nll,
                "Language model returned an invalid likelihood; confidence is unknown"
            );
            return TextScore {
                perplexity: None,
                confidence: Confidence::Unknown,
            };
        }

        let perplexity = nll.exp();
        TextScore {
            perplexity: Some(perplexity),
            confidence: Confidence::Known(calibrate_perplexity(
                perplexity,
                self.config.normalization_constant,
            )),
        }
    }

    /// Shorthand for `self.score(text).confidence`.
    pub fn confidence(&self, text: &str) -> Confidence {
        self.score(text).confidence
    }
}
