//! Arbitration between two transcriptions of the same region.
//!
//! The primary engine's text is kept unless the secondary engine is more
//! confident by more than a configurable margin. The reported confidence is the
//! best evidence either candidate offered, whichever text won.

use crate::core::config::{ConfigError, ConfigValidator, validate_range};
use crate::processors::confidence::Confidence;
use crate::processors::normalization::TextNormalizer;
use serde::{Deserialize, Serialize};

/// Which OCR source produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// The primary OCR engine (engine-native confidence).
    Primary,
    /// The secondary OCR engine (language-model confidence).
    Secondary,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::Primary => write!(f, "primary"),
            CandidateSource::Secondary => write!(f, "secondary"),
        }
    }
}

/// One OCR source's transcription of a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionCandidate {
    /// Transcribed text, possibly empty.
    pub text: String,
    /// Calibrated confidence.
    pub confidence: Confidence,
    /// Producing source.
    pub source: CandidateSource,
}

impl TranscriptionCandidate {
    /// Creates a candidate.
    pub fn new(text: impl Into<String>, confidence: Confidence, source: CandidateSource) -> Self {
        Self {
            text: text.into(),
            confidence,
            source,
        }
    }

    /// An empty candidate with unknown confidence, used when a source failed.
    pub fn empty(source: CandidateSource) -> Self {
        Self::new(String::new(), Confidence::Unknown, source)
    }
}

/// Final text chosen for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationResult {
    /// Normalized text of the chosen candidate; empty if both were empty.
    pub text: String,
    /// `max` of both candidates' confidences, in `[0, 1]`.
    pub confidence: f32,
    /// The candidate whose text was kept; `None` when both were empty.
    pub chosen_source: Option<CandidateSource>,
}

impl ArbitrationResult {
    /// The explicit result for two empty candidates.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            chosen_source: None,
        }
    }

    /// Whether no text was produced.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Configuration for OCR arbitration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Lead the secondary candidate needs over the primary to win (default: 0.05)
    pub margin: f32,
    /// Value substituted for an unknown confidence at comparison time (default: 0.0)
    pub unknown_confidence: f32,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            margin: 0.05,
            unknown_confidence: 0.0,
        }
    }
}

impl ArbitrationConfig {
    /// Sets the margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the value used for unknown confidences.
    pub fn with_unknown_confidence(mut self, value: f32) -> Self {
        self.unknown_confidence = value;
        self
    }
}

impl ConfigValidator for ArbitrationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("arbitration.margin", self.margin, 0.0, 1.0)?;
        validate_range(
            "arbitration.unknown_confidence",
            self.unknown_confidence,
            0.0,
            1.0,
        )
    }
}

/// Decides the final text of a region from a primary and a secondary candidate.
#[derive(Debug, Clone, Default)]
pub struct OcrArbiter {
    config: ArbitrationConfig,
    normalizer: TextNormalizer,
}

impl OcrArbiter {
    /// Creates an arbiter with the given configuration.
    pub fn new(config: ArbitrationConfig) -> Self {
        Self {
            config,
            normalizer: TextNormalizer::new(),
        }
    }

    /// Returns the arbiter configuration.
    pub fn config(&self) -> &ArbitrationConfig {
        &self.config
    }

    /// Chooses between `primary` (A) and `secondary` (B).
    ///
    /// 1. B non-empty and `conf(B) > conf(A) + margin` picks B.
    /// 2. Otherwise a non-empty A is kept.
    /// 3. Otherwise a non-empty B is used.
    /// 4. Otherwise the result is empty with confidence 0.
    ///
    /// Texts are normalized before the emptiness checks. The returned confidence is
    /// `max(conf(A), conf(B))` regardless of which text won.
    pub fn arbitrate(
        &self,
        primary: &TranscriptionCandidate,
        secondary: &TranscriptionCandidate,
    ) -> ArbitrationResult {
        let text_a = self.normalizer.normalize(&primary.text);
        let text_b = self.normalizer.normalize(&secondary.text);

        if text_a.is_empty() && text_b.is_empty() {
            return ArbitrationResult::empty();
        }

        let conf_a = primary.confidence.known_or(self.config.unknown_confidence);
        let conf_b = secondary.confidence.known_or(self.config.unknown_confidence);
        let confidence = conf_a.max(conf_b);

        let (text, chosen) = if !text_b.is_empty() && conf_b > conf_a + self.config.margin {
            (text_b, secondary.source)
        } else if !text_a.is_empty() {
            (text_a, primary.source)
        } else {
            (text_b, secondary.source)
        };

        tracing::trace!(
            target: "arbitration",
            chosen = %chosen,
            conf_a,
            conf_b,
            "Arbitrated transcription candidates"
        );

        ArbitrationResult {
            text,
            confidence,
            chosen_source: Some(chosen),
        }
    }
}
