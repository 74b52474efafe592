//! The core module of the pipeline.
//!
//! This module contains the pieces every stage depends on:
//! - Configuration management and validation
//! - Error handling
//! - Capability traits for detectors, OCR engines and language models
//! - The process-scoped capability registry

pub mod config;
pub mod errors;
pub mod registry;
pub mod traits;

pub use config::{ConfigError, ConfigValidator, ParallelPolicy, PipelineConfig, SourceToggles};
pub use errors::{PipelineError, PipelineResult, ProcessingStage};
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder};
pub use traits::{
    DetectionSource, LanguageModelScorer, NegativeLogLikelihood, PrimaryRecognizer,
    RecognizedText, SecondaryRecognizer,
};
