//! Pure processing steps of the pipeline.
//!
//! Everything here is deterministic and synchronous: geometry, box fusion, text
//! normalization, confidence calibration and candidate arbitration. None of it
//! touches an external capability except through handles passed in by the caller.

pub mod arbitration;
pub mod confidence;
pub mod fusion;
pub mod geometry;
pub mod normalization;

pub use arbitration::{
    ArbitrationConfig, ArbitrationResult, CandidateSource, OcrArbiter, TranscriptionCandidate,
};
pub use confidence::{
    Confidence, ConfidenceScorer, ScorerConfig, TextScore, calibrate_engine_score,
    calibrate_perplexity,
};
pub use fusion::{BoxFusionEngine, FusionConfig};
pub use geometry::{DetectionBox, FusedBox, RawDetection};
pub use normalization::TextNormalizer;
