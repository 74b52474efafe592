//! Geometric primitives for layout detection boxes.
//!
//! This module provides the axis-aligned box types that flow through the layout
//! pipeline: [`RawDetection`] as reported by a detection source, [`DetectionBox`]
//! once tagged with its page, and [`FusedBox`] as emitted by box fusion. It also
//! provides the area and Intersection-over-Union computations used for clustering.

use serde::{Deserialize, Serialize};

/// A detection as reported by a single layout detection source.
///
/// Sources know nothing about page indices; the layout pipeline tags each
/// detection with the page it was produced for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    /// Left edge in pixels.
    pub x1: i32,
    /// Top edge in pixels.
    pub y1: i32,
    /// Right edge in pixels (exclusive).
    pub x2: i32,
    /// Bottom edge in pixels (exclusive).
    pub y2: i32,
    /// Layout class, e.g. `text`, `title`, `table`.
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub score: f32,
}

impl RawDetection {
    /// Creates a new raw detection.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32, label: impl Into<String>, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: label.into(),
            score,
        }
    }

    /// Attaches a page index, producing a [`DetectionBox`].
    pub fn on_page(self, page: usize) -> DetectionBox {
        DetectionBox {
            x1: self.x1,
            y1: self.y1,
            x2: self.x2,
            y2: self.y2,
            label: self.label,
            score: self.score,
            page,
        }
    }
}

/// A layout detection on a specific page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// Left edge in pixels.
    pub x1: i32,
    /// Top edge in pixels.
    pub y1: i32,
    /// Right edge in pixels (exclusive).
    pub x2: i32,
    /// Bottom edge in pixels (exclusive).
    pub y2: i32,
    /// Layout class.
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub score: f32,
    /// Zero-based page index.
    pub page: usize,
}

impl DetectionBox {
    /// Creates a new detection box.
    ///
    /// # Arguments
    ///
    /// * `x1`, `y1` - Top-left corner.
    /// * `x2`, `y2` - Bottom-right corner.
    /// * `label` - Layout class.
    /// * `score` - Detector confidence.
    /// * `page` - Page index.
    ///
    /// # Returns
    ///
    /// A new `DetectionBox`. Geometry is not checked here; see [`DetectionBox::is_valid`].
    pub fn new(
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        label: impl Into<String>,
        score: f32,
        page: usize,
    ) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: label.into(),
            score,
            page,
        }
    }

    /// Width in pixels, clamped to zero.
    pub fn width(&self) -> i64 {
        (i64::from(self.x2) - i64::from(self.x1)).max(0)
    }

    /// Height in pixels, clamped to zero.
    pub fn height(&self) -> i64 {
        (i64::from(self.y2) - i64::from(self.y1)).max(0)
    }

    /// Area of the box, `max(0, x2-x1) * max(0, y2-y1)`.
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Whether the box can take part in fusion.
    ///
    /// A box is valid when `x2 > x1`, `y2 > y1` and its score is a finite number.
    /// Non-finite scores cannot be ordered, so they are treated as malformed input.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1 && self.score.is_finite()
    }

    /// Computes the area of intersection between this box and another.
    ///
    /// Intersection width and height are clamped to zero before multiplying,
    /// so disjoint boxes yield 0.
    pub fn intersection_area(&self, other: &DetectionBox) -> i64 {
        let inter_w = (i64::from(self.x2.min(other.x2)) - i64::from(self.x1.max(other.x1))).max(0);
        let inter_h = (i64::from(self.y2.min(other.y2)) - i64::from(self.y1.max(other.y1))).max(0);
        inter_w * inter_h
    }

    /// Computes the Intersection over Union (IoU) between this box and another.
    ///
    /// # Arguments
    ///
    /// * `other` - The other box to compute IoU with.
    ///
    /// # Returns
    ///
    /// `intersection / (area(self) + area(other) - intersection)`, between 0.0 and 1.0.
    /// Returns 0.0 when the union is empty.
    pub fn iou(&self, other: &DetectionBox) -> f32 {
        let inter = self.intersection_area(other);
        if inter <= 0 {
            return 0.0;
        }

        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }

        (inter as f64 / union as f64) as f32
    }
}

/// A consensus box produced by fusing one or more [`DetectionBox`]es of the same label.
///
/// Coordinates are kept as floats: the score-weighted average of integer corners is
/// generally fractional, and rounding it would move boxes by up to half a pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedBox {
    /// Left edge in pixels.
    pub x1: f32,
    /// Top edge in pixels.
    pub y1: f32,
    /// Right edge in pixels.
    pub x2: f32,
    /// Bottom edge in pixels.
    pub y2: f32,
    /// Layout class (taken from the cluster anchor).
    pub label: String,
    /// Fusion confidence: mean score of the cluster members.
    pub score: f32,
    /// Zero-based page index.
    pub page: usize,
    /// Number of raw detections merged into this box (>= 1).
    pub source_count: usize,
}

impl FusedBox {
    /// Wraps a single unmerged detection.
    pub fn passthrough(b: &DetectionBox) -> Self {
        Self {
            x1: b.x1 as f32,
            y1: b.y1 as f32,
            x2: b.x2 as f32,
            y2: b.y2 as f32,
            label: b.label.clone(),
            score: b.score,
            page: b.page,
            source_count: 1,
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area of the box, clamped to zero.
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Orders boxes by `(page, y1, x1)`, the deterministic reading-order approximation.
    pub fn reading_order(a: &FusedBox, b: &FusedBox) -> std::cmp::Ordering {
        a.page
            .cmp(&b.page)
            .then_with(|| a.y1.total_cmp(&b.y1))
            .then_with(|| a.x1.total_cmp(&b.x1))
    }
}
