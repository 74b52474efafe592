//! # layout-fusion
//!
//! Layout detection ensembling and dual-source OCR arbitration for scanned documents.
//!
//! Several layout detectors are run on each page and their boxes are merged with
//! Weighted Box Fusion into one consensus layout. Every fused region is then read by
//! two OCR engines: a primary engine that reports its own confidence and a secondary
//! engine whose text is scored by a language model. An arbiter keeps one of the two
//! transcriptions per region.
//!
//! Detectors, OCR engines and the language model are supplied by the host
//! application through the traits in [`core::traits`] and shared via a
//! [`core::CapabilityRegistry`].
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, capability traits and the registry
//! * [`processors`] - Box fusion, text normalization, confidence scoring, arbitration
//! * [`pipeline`] - Page layout, region recognition and document pipelines
//! * [`utils`] - Region cropping, image loading and logging setup
//!
//! ## Example
//!
//! ```rust
//! use layout_fusion::processors::{BoxFusionEngine, DetectionBox, FusionConfig};
//!
//! let engine = BoxFusionEngine::new(FusionConfig::default());
//! let fused = engine.fuse(&[
//!     DetectionBox::new(0, 0, 100, 50, "text", 0.9, 0),
//!     DetectionBox::new(2, 2, 102, 52, "text", 0.8, 0),
//! ]);
//! assert_eq!(fused.len(), 1);
//! assert_eq!(fused[0].source_count, 2);
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;
