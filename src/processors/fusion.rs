//! Weighted Box Fusion of layout detections.
//!
//! Independent detectors tend to report the same layout object with slightly
//! different boxes. [`BoxFusionEngine`] clusters same-label detections around the
//! highest-scoring unvisited box and replaces each cluster with one consensus box
//! whose corners are the score-weighted average of the members'.

use crate::core::config::{ConfigError, ConfigValidator, validate_non_negative, validate_range};
use crate::processors::geometry::{DetectionBox, FusedBox};
use serde::{Deserialize, Serialize};

/// Lower bound on a member's weight so an all-zero-score cluster cannot divide by zero.
const MIN_FUSION_WEIGHT: f32 = 1e-6;

/// Configuration for box fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Minimum IoU with the cluster anchor for a box to join the cluster (default: 0.5)
    pub iou_threshold: f32,
    /// Emitted boxes with width or height `<=` this are dropped (default: 10.0)
    pub min_dimension: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            min_dimension: 10.0,
        }
    }
}

impl FusionConfig {
    /// Sets the IoU threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Sets the minimum dimension.
    pub fn with_min_dimension(mut self, min_dimension: f32) -> Self {
        self.min_dimension = min_dimension;
        self
    }
}

impl ConfigValidator for FusionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_range("fusion.iou_threshold", self.iou_threshold, 0.0, 1.0)?;
        validate_non_negative("fusion.min_dimension", self.min_dimension)
    }
}

/// Merges overlapping detections from several sources into one box per object.
///
/// Fusion is a pure function of its input list: it holds no state between calls
/// and can be shared across threads freely.
#[derive(Debug, Clone, Default)]
pub struct BoxFusionEngine {
    config: FusionConfig,
}

impl BoxFusionEngine {
    /// Creates a fusion engine with the given configuration.
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuses the raw detections of one page.
    ///
    /// # Arguments
    ///
    /// * `boxes` - Concatenated detections from every source for the page.
    ///
    /// # Returns
    ///
    /// One [`FusedBox`] per cluster, in anchor order (descending anchor score).
    /// Malformed boxes are discarded before clustering and slivers thinner than
    /// `min_dimension` are discarded after it. Empty input yields an empty list.
    pub fn fuse(&self, boxes: &[DetectionBox]) -> Vec<FusedBox> {
        let mut valid: Vec<&DetectionBox> = boxes.iter().filter(|b| b.is_valid()).collect();

        let rejected = boxes.len() - valid.len();
        if rejected > 0 {
            tracing::debug!(
                target: "fusion",
                rejected,
                total = boxes.len(),
                "Discarded malformed detection boxes before fusion"
            );
        }

        // sort_by is stable, so equal scores keep their input order.
        valid.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut visited = vec![false; valid.len()];
        let mut fused = Vec::new();

        for i in 0..valid.len() {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let anchor = valid[i];

            let mut cluster = vec![anchor];
            for j in (i + 1)..valid.len() {
                if visited[j] {
                    continue;
                }
                let candidate = valid[j];
                if candidate.label == anchor.label
                    && anchor.iou(candidate) >= self.config.iou_threshold
                {
                    visited[j] = true;
                    cluster.push(candidate);
                }
            }

            let merged = if cluster.len() == 1 {
                FusedBox::passthrough(anchor)
            } else {
                merge_cluster(&cluster)
            };

            if merged.width() <= self.config.min_dimension
                || merged.height() <= self.config.min_dimension
            {
                tracing::trace!(
                    target: "fusion",
                    label = %merged.label,
                    width = merged.width(),
                    height = merged.height(),
                    "Dropped sliver box"
                );
                continue;
            }
            fused.push(merged);
        }

        tracing::debug!(
            target: "fusion",
            input = boxes.len(),
            output = fused.len(),
            "Fused detection boxes"
        );

        fused
    }
}

/// Merges a cluster of two or more boxes; the first member is the anchor.
fn merge_cluster(cluster: &[&DetectionBox]) -> FusedBox {
    let anchor = cluster[0];

    let mut sum_w = 0.0f64;
    let mut sum_score = 0.0f64;
    let mut sums = [0.0f64; 4];

    for member in cluster {
        let w = f64::from(member.score.max(MIN_FUSION_WEIGHT));
        sum_w += w;
        sum_score += f64::from(member.score);
        sums[0] += w * f64::from(member.x1);
        sums[1] += w * f64::from(member.y1);
        sums[2] += w * f64::from(member.x2);
        sums[3] += w * f64::from(member.y2);
    }

    FusedBox {
        x1: (sums[0] / sum_w) as f32,
        y1: (sums[1] / sum_w) as f32,
        x2: (sums[2] / sum_w) as f32,
        y2: (sums[3] / sum_w) as f32,
        label: anchor.label.clone(),
        score: (sum_score / cluster.len() as f64) as f32,
        page: anchor.page,
        source_count: cluster.len(),
    }
}
