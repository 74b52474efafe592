//! Configuration management for the pipeline.
//!
//! This module provides configuration types, validation helpers, and the
//! worker pool policy shared by the layout and recognition stages.

pub mod errors;
pub mod parallel;
pub mod pipeline;

pub use errors::{
    ConfigError, ConfigValidator, validate_non_negative, validate_positive, validate_range,
};
pub use parallel::ParallelPolicy;
pub use pipeline::{PipelineConfig, SourceToggles};
