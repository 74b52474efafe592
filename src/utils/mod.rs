//! Utility functions for the layout pipeline.
//!
//! This module provides region cropping helpers, page image loading and logging setup.

pub mod bbox_crop;

pub use bbox_crop::BBoxCrop;

use crate::core::errors::PipelineResult;
use image::RgbImage;
use std::path::Path;

/// Initializes the tracing subscriber for logging.
///
/// The filter is read from `RUST_LOG` and falls back to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Loads a page image from disk and converts it to RGB.
pub fn load_image(path: impl AsRef<Path>) -> PipelineResult<RgbImage> {
    let img = image::open(path.as_ref())?;
    Ok(img.to_rgb8())
}

/// Loads several page images, failing on the first unreadable file.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> PipelineResult<Vec<RgbImage>> {
    paths.iter().map(load_image).collect()
}
