//! Region transcription with two OCR engines.
//!
//! Each fused region is cropped out of the page and read by both engines. The
//! primary engine reports its own confidence; the secondary engine's text is
//! scored by the language model. The arbiter then keeps one of the two texts.

use crate::core::config::ParallelPolicy;
use crate::core::traits::{PrimaryRecognizer, SecondaryRecognizer};
use crate::pipeline::result::{PageLayout, RegionText};
use crate::processors::{
    ArbitrationResult, CandidateSource, ConfidenceScorer, FusedBox, OcrArbiter,
    TranscriptionCandidate, calibrate_engine_score,
};
use crate::utils::BBoxCrop;
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for region recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Region labels that are never sent to OCR (default: figure, picture, image)
    pub skip_labels: Vec<String>,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            skip_labels: vec!["figure".into(), "picture".into(), "image".into()],
        }
    }
}

impl RecognitionConfig {
    /// Replaces the skipped labels.
    pub fn with_skip_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Whether regions labelled `label` bypass OCR. Comparison ignores ASCII case.
    pub fn skips(&self, label: &str) -> bool {
        self.skip_labels
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// Transcribes the regions of a page.
#[derive(Debug, Clone, Default)]
pub struct RegionRecognizer {
    primary: Option<Arc<dyn PrimaryRecognizer>>,
    secondary: Option<Arc<dyn SecondaryRecognizer>>,
    scorer: ConfidenceScorer,
    arbiter: OcrArbiter,
    config: RecognitionConfig,
    parallel: ParallelPolicy,
}

impl RegionRecognizer {
    /// Creates a recognizer from its capabilities and processing steps.
    pub fn new(
        primary: Option<Arc<dyn PrimaryRecognizer>>,
        secondary: Option<Arc<dyn SecondaryRecognizer>>,
        scorer: ConfidenceScorer,
        arbiter: OcrArbiter,
    ) -> Self {
        Self {
            primary,
            secondary,
            scorer,
            arbiter,
            ..Self::default()
        }
    }

    /// Sets the recognition configuration.
    pub fn with_config(mut self, config: RecognitionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the parallel policy used for regions.
    pub fn with_parallel_policy(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether at least one OCR engine is attached.
    pub fn is_available(&self) -> bool {
        self.primary.is_some() || self.secondary.is_some()
    }

    /// Runs both engines on a cropped region and calibrates their confidences.
    ///
    /// A failing or missing engine contributes an empty candidate with unknown
    /// confidence.
    pub fn candidates(&self, region: &RgbImage) -> (TranscriptionCandidate, TranscriptionCandidate) {
        let primary = match &self.primary {
            Some(engine) => match engine.recognize(region) {
                Ok(rec) => TranscriptionCandidate::new(
                    rec.text,
                    calibrate_engine_score(rec.confidence),
                    CandidateSource::Primary,
                ),
                Err(err) => {
                    tracing::warn!(
                        target: "recognition",
                        engine = engine.name(),
                        error = %err,
                        "Primary OCR failed; using an empty candidate"
                    );
                    TranscriptionCandidate::empty(CandidateSource::Primary)
                }
            },
            None => TranscriptionCandidate::empty(CandidateSource::Primary),
        };

        let secondary = match &self.secondary {
            Some(engine) => match engine.recognize(region) {
                Ok(text) => {
                    let confidence = self.scorer.confidence(&text);
                    TranscriptionCandidate::new(text, confidence, CandidateSource::Secondary)
                }
                Err(err) => {
                    tracing::warn!(
                        target: "recognition",
                        engine = engine.name(),
                        error = %err,
                        "Secondary OCR failed; using an empty candidate"
                    );
                    TranscriptionCandidate::empty(CandidateSource::Secondary)
                }
            },
            None => TranscriptionCandidate::empty(CandidateSource::Secondary),
        };

        (primary, secondary)
    }

    /// Crops, transcribes and arbitrates one region.
    ///
    /// Returns `None` for skipped labels, regions that fall outside the page, or
    /// when no OCR engine is attached.
    pub fn recognize_region(&self, page: &RgbImage, region: &FusedBox) -> Option<ArbitrationResult> {
        if !self.is_available() || self.config.skips(&region.label) {
            return None;
        }

        let crop = match BBoxCrop::crop_region(page, region) {
            Ok(crop) => crop,
            Err(err) => {
                tracing::debug!(
                    target: "recognition",
                    page = region.page,
                    label = %region.label,
                    error = %err,
                    "Skipping region that could not be cropped"
                );
                return None;
            }
        };

        let (primary, secondary) = self.candidates(&crop);
        Some(self.arbiter.arbitrate(&primary, &secondary))
    }

    /// Transcribes every region of a page layout, keeping layout order.
    pub fn recognize_page(&self, page: &RgbImage, layout: &PageLayout) -> Vec<RegionText> {
        let recognize = |region: &FusedBox| RegionText {
            region: region.clone(),
            result: self.recognize_region(page, region),
        };

        if self.parallel.parallel_regions(layout.boxes.len()) {
            layout.boxes.par_iter().map(recognize).collect()
        } else {
            layout.boxes.iter().map(recognize).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{PipelineError, PipelineResult, ProcessingStage};
    use crate::core::traits::{LanguageModelScorer, NegativeLogLikelihood, RecognizedText};
    use crate::processors::{ArbitrationConfig, Confidence, DetectionBox, ScorerConfig};

    #[derive(Debug)]
    struct FixedPrimary(&'static str, Option<f32>);

    impl PrimaryRecognizer for FixedPrimary {
        fn name(&self) -> &str {
            "fixed-primary"
        }

        fn recognize(&self, _region: &RgbImage) -> PipelineResult<RecognizedText> {
            Ok(RecognizedText::new(self.0, self.1))
        }
    }

    #[derive(Debug)]
    struct BrokenPrimary;

    impl PrimaryRecognizer for BrokenPrimary {
        fn name(&self) -> &str {
            "broken-primary"
        }

        fn recognize(&self, _region: &RgbImage) -> PipelineResult<RecognizedText> {
            Err(PipelineError::source_unavailable(
                "broken-primary",
                ProcessingStage::Recognition,
                "engine offline",
            ))
        }
    }

    #[derive(Debug)]
    struct FixedSecondary(&'static str);

    impl SecondaryRecognizer for FixedSecondary {
        fn name(&self) -> &str {
            "fixed-secondary"
        }

        fn recognize(&self, _region: &RgbImage) -> PipelineResult<String> {
            Ok(self.0.to_string())
        }
    }

    /// Perplexity 10, i.e. confidence 0.8 with the default constant.
    #[derive(Debug)]
    struct FluentModel;

    impl LanguageModelScorer for FluentModel {
        fn name(&self) -> &str {
            "fluent"
        }

        fn score(&self, _text: &str) -> PipelineResult<NegativeLogLikelihood> {
            Ok(NegativeLogLikelihood::PerToken(10f64.ln()))
        }
    }

    fn recognizer(
        primary: Option<Arc<dyn PrimaryRecognizer>>,
        secondary: Option<Arc<dyn SecondaryRecognizer>>,
        with_model: bool,
    ) -> RegionRecognizer {
        let model: Option<Arc<dyn LanguageModelScorer>> =
            with_model.then(|| Arc::new(FluentModel) as Arc<dyn LanguageModelScorer>);
        RegionRecognizer::new(
            primary,
            secondary,
            ConfidenceScorer::new(model, ScorerConfig::default()),
            OcrArbiter::new(ArbitrationConfig::default()),
        )
    }

    fn region(label: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> FusedBox {
        FusedBox::passthrough(&DetectionBox::new(x1, y1, x2, y2, label, 0.9, 0))
    }

    fn layout(boxes: Vec<FusedBox>) -> PageLayout {
        PageLayout {
            page: 0,
            boxes,
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_secondary_wins_with_fluent_text() {
        let r = recognizer(
            Some(Arc::new(FixedPrimary("Xin chao", Some(0.6)))),
            Some(Arc::new(FixedSecondary("Xin chào"))),
            true,
        );
        let result = r
            .recognize_region(&RgbImage::new(100, 100), &region("text", 0, 0, 50, 20))
            .unwrap();
        assert_eq!(result.text, "Xin chào");
        assert_eq!(result.chosen_source, Some(CandidateSource::Secondary));
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_secondary_without_model_is_unknown() {
        let r = recognizer(
            Some(Arc::new(FixedPrimary("foo", Some(0.4)))),
            Some(Arc::new(FixedSecondary("bar"))),
            false,
        );
        let (a, b) = r.candidates(&RgbImage::new(10, 10));
        assert_eq!(a.confidence, Confidence::Known(0.4));
        assert_eq!(b.confidence, Confidence::Unknown);

        let result = r
            .recognize_region(&RgbImage::new(100, 100), &region("text", 0, 0, 50, 20))
            .unwrap();
        assert_eq!(result.text, "foo");
    }

    #[test]
    fn test_failing_primary_falls_back_to_secondary() {
        let r = recognizer(
            Some(Arc::new(BrokenPrimary)),
            Some(Arc::new(FixedSecondary("bar"))),
            false,
        );
        let (a, _) = r.candidates(&RgbImage::new(10, 10));
        assert_eq!(a, TranscriptionCandidate::empty(CandidateSource::Primary));

        let result = r
            .recognize_region(&RgbImage::new(100, 100), &region("text", 0, 0, 50, 20))
            .unwrap();
        assert_eq!(result.text, "bar");
        assert_eq!(result.chosen_source, Some(CandidateSource::Secondary));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_missing_secondary_keeps_primary() {
        let r = recognizer(Some(Arc::new(FixedPrimary("foo", Some(0.7)))), None, true);
        let result = r
            .recognize_region(&RgbImage::new(100, 100), &region("text", 0, 0, 50, 20))
            .unwrap();
        assert_eq!(result.text, "foo");
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_skipped_and_uncroppable_regions() {
        let r = recognizer(Some(Arc::new(FixedPrimary("foo", Some(0.7)))), None, false);
        let page = RgbImage::new(100, 100);
        assert!(r.recognize_region(&page, &region("Figure", 0, 0, 50, 50)).is_none());
        assert!(r.recognize_region(&page, &region("text", 300, 300, 350, 350)).is_none());

        let none = RegionRecognizer::default();
        assert!(!none.is_available());
        assert!(none.recognize_region(&page, &region("text", 0, 0, 50, 50)).is_none());
    }

    #[test]
    fn test_recognize_page_keeps_order_in_parallel() {
        let r = recognizer(Some(Arc::new(FixedPrimary("foo", Some(0.7)))), None, false)
            .with_parallel_policy(ParallelPolicy::new().with_region_threshold(0))
            .with_config(RecognitionConfig::default().with_skip_labels(["table"]));
        let boxes: Vec<FusedBox> = (0..8)
            .map(|i| region(if i == 3 { "table" } else { "text" }, 0, i * 20, 50, i * 20 + 15))
            .collect();

        let texts = r.recognize_page(&RgbImage::new(100, 200), &layout(boxes.clone()));
        assert_eq!(texts.len(), 8);
        for (text, expected) in texts.iter().zip(&boxes) {
            assert_eq!(&text.region, expected);
        }
        assert!(texts[3].result.is_none());
        assert_eq!(texts[0].result.as_ref().unwrap().text, "foo");
    }

    #[test]
    fn test_default_skip_labels() {
        let config = RecognitionConfig::default();
        assert!(config.skips("figure"));
        assert!(config.skips("IMAGE"));
        assert!(!config.skips("text"));
    }
}
