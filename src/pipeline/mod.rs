//! Pipelines that drive detection sources and OCR engines.
//!
//! - [`PageLayoutPipeline`] runs the detection ensemble and fuses one page.
//! - [`RegionRecognizer`] transcribes the fused regions of a page.
//! - [`DocumentPipeline`] combines both over the pages of a document.

pub mod document;
pub mod layout;
pub mod recognition;
pub mod result;

pub use document::DocumentPipeline;
pub use layout::{LayoutConfig, PageLayoutPipeline};
pub use recognition::{RecognitionConfig, RegionRecognizer};
pub use result::{
    DocumentElement, DocumentResult, PageLayout, RegionText, SourceReport, SourceStatus,
};
