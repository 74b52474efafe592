//! Bounding box based image cropping utilities.

use crate::core::errors::{PipelineError, PipelineResult, ProcessingStage};
use crate::processors::FusedBox;
use image::{RgbImage, imageops};

/// Bounding box based image cropping utilities.
pub struct BBoxCrop;

impl BBoxCrop {
    /// Crops the region covered by a fused box out of a page image.
    ///
    /// Fused coordinates are fractional; the crop is rounded outward (floor of the
    /// top-left corner, ceiling of the bottom-right one) so no covered pixel is lost,
    /// then clamped to the image bounds.
    ///
    /// # Arguments
    ///
    /// * `image` - The page image
    /// * `region` - The fused box to crop
    ///
    /// # Returns
    ///
    /// The cropped region, or an error when nothing of the box lies inside the image.
    pub fn crop_region(image: &RgbImage, region: &FusedBox) -> PipelineResult<RgbImage> {
        let coords = Self::pixel_bounds(image.width(), image.height(), region).ok_or_else(|| {
            PipelineError::processing(
                ProcessingStage::RegionCrop,
                format!(
                    "region ({:.1}, {:.1})-({:.1}, {:.1}) lies outside the {}x{} page",
                    region.x1,
                    region.y1,
                    region.x2,
                    region.y2,
                    image.width(),
                    image.height()
                ),
            )
        })?;
        Ok(Self::slice_rgb_image(image, coords))
    }

    /// Integer pixel bounds `(x1, y1, x2, y2)` of `region` inside a `width`x`height`
    /// image, or `None` if the clamped box is empty.
    fn pixel_bounds(width: u32, height: u32, region: &FusedBox) -> Option<(u32, u32, u32, u32)> {
        if ![region.x1, region.y1, region.x2, region.y2]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let x1 = region.x1.floor().clamp(0.0, width as f32) as u32;
        let y1 = region.y1.floor().clamp(0.0, height as f32) as u32;
        let x2 = region.x2.ceil().clamp(0.0, width as f32) as u32;
        let y2 = region.y2.ceil().clamp(0.0, height as f32) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1, y1, x2, y2))
    }

    /// Copies the pixels of `coords` (x1, y1, x2, y2) into a new image.
    fn slice_rgb_image(img: &RgbImage, coords: (u32, u32, u32, u32)) -> RgbImage {
        let (x1, y1, x2, y2) = coords;
        imageops::crop_imm(img, x1, y1, x2 - x1, y2 - y1).to_image()
    }
}
