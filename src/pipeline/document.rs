//! Multi-page document processing.

use crate::core::config::{ConfigValidator, ParallelPolicy, PipelineConfig};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::registry::CapabilityRegistry;
use crate::pipeline::layout::PageLayoutPipeline;
use crate::pipeline::recognition::RegionRecognizer;
use crate::pipeline::result::{DocumentElement, DocumentResult, RegionText};
use crate::processors::{ConfidenceScorer, OcrArbiter};
use crate::utils::load_images;
use image::RgbImage;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs layout fusion and region recognition over the pages of a document.
///
/// Pages are independent: each is detected, fused and transcribed on its own,
/// optionally in parallel. A shared cancellation flag is checked before every
/// page starts. When `max_threads` is configured, all page, source and region
/// work runs on a dedicated pool of that size.
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    layout: PageLayoutPipeline,
    recognizer: RegionRecognizer,
    parallel: ParallelPolicy,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl DocumentPipeline {
    /// Assembles a pipeline from its stages.
    ///
    /// Fails if the worker pool requested by `parallel.max_threads` cannot be built.
    pub fn new(
        layout: PageLayoutPipeline,
        recognizer: RegionRecognizer,
        parallel: ParallelPolicy,
    ) -> PipelineResult<Self> {
        let pool = parallel.build_thread_pool().map_err(|err| {
            PipelineError::config_error_detailed("parallel.max_threads", err.to_string())
        })?;
        Ok(Self {
            layout,
            recognizer,
            parallel,
            pool: pool.map(Arc::new),
        })
    }

    /// Builds a pipeline from registered capabilities and a configuration.
    ///
    /// The configuration is validated, and source toggles must name registered
    /// detection sources.
    pub fn from_registry(
        registry: &CapabilityRegistry,
        config: &PipelineConfig,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let layout = PageLayoutPipeline::new(
            registry.detectors().to_vec(),
            config.layout.clone(),
            config.fusion.clone(),
        )
        .with_toggles(&config.sources)?;

        let scorer = ConfidenceScorer::new(
            registry.language_model().cloned(),
            config.scoring.clone(),
        );
        let recognizer = RegionRecognizer::new(
            registry.primary().cloned(),
            registry.secondary().cloned(),
            scorer,
            OcrArbiter::new(config.arbitration.clone()),
        )
        .with_config(config.recognition.clone())
        .with_parallel_policy(config.parallel.clone());

        tracing::info!(
            target: "pipeline",
            sources = ?layout.enabled_sources(),
            ocr = recognizer.is_available(),
            max_threads = config.parallel.max_threads,
            "Document pipeline ready"
        );

        Self::new(layout, recognizer, config.parallel.clone())
    }

    /// The layout stage.
    pub fn layout(&self) -> &PageLayoutPipeline {
        &self.layout
    }

    /// Detects, fuses and transcribes one page.
    pub fn process_page(&self, page: usize, image: &RgbImage) -> Vec<RegionText> {
        let layout = self.layout.process_page(page, image);
        self.recognizer.recognize_page(image, &layout)
    }

    /// Processes every page of a document.
    pub fn process(&self, pages: &[RgbImage]) -> DocumentResult {
        self.process_with_cancel(pages, &AtomicBool::new(false))
    }

    /// Processes a document, stopping when `cancel` is set.
    ///
    /// Pages that have not started when the flag is observed are skipped. Every
    /// page that did finish is kept, whether or not an earlier page was skipped;
    /// [`DocumentResult::completed_pages`] lists them.
    pub fn process_with_cancel(&self, pages: &[RgbImage], cancel: &AtomicBool) -> DocumentResult {
        let outcomes = match &self.pool {
            Some(pool) => pool.install(|| self.run_pages(pages, cancel)),
            None => self.run_pages(pages, cancel),
        };
        let result = assemble_document(outcomes);

        tracing::info!(
            target: "pipeline",
            pages = pages.len(),
            pages_completed = result.pages_completed(),
            elements = result.elements.len(),
            cancelled = result.cancelled,
            "Document processed"
        );

        result
    }

    fn run_pages(&self, pages: &[RgbImage], cancel: &AtomicBool) -> Vec<Option<Vec<RegionText>>> {
        let run = |(page, image): (usize, &RgbImage)| {
            if cancel.load(Ordering::Acquire) {
                tracing::debug!(target: "pipeline", page, "Cancelled before page started");
                return None;
            }
            Some(self.process_page(page, image))
        };

        if self.parallel.parallel_pages(pages.len()) {
            pages.par_iter().enumerate().map(run).collect()
        } else {
            pages.iter().enumerate().map(run).collect()
        }
    }

    /// Loads page images from disk and processes them in order.
    pub fn process_files<P: AsRef<Path>>(&self, paths: &[P]) -> PipelineResult<DocumentResult> {
        let pages = load_images(paths)?;
        Ok(self.process(&pages))
    }
}

/// Turns per-page outcomes (`None` for skipped pages) into a document result.
fn assemble_document(outcomes: Vec<Option<Vec<RegionText>>>) -> DocumentResult {
    let mut elements = Vec::new();
    let mut completed_pages = Vec::new();
    let mut cancelled = false;

    for (page, outcome) in outcomes.into_iter().enumerate() {
        let Some(regions) = outcome else {
            cancelled = true;
            continue;
        };
        elements.extend(
            regions
                .into_iter()
                .enumerate()
                .map(|(order, region)| DocumentElement::from_region(order, region)),
        );
        completed_pages.push(page);
    }

    DocumentResult {
        elements,
        completed_pages,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SourceToggles;
    use crate::core::traits::{DetectionSource, PrimaryRecognizer, RecognizedText};
    use crate::processors::RawDetection;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    #[derive(Debug)]
    struct TwoRegionDetector;

    impl DetectionSource for TwoRegionDetector {
        fn name(&self) -> &str {
            "two-region"
        }

        fn detect(&self, _image: &RgbImage) -> PipelineResult<Vec<RawDetection>> {
            Ok(vec![
                RawDetection::new(10, 60, 150, 100, "text", 0.8),
                RawDetection::new(10, 10, 150, 40, "title", 0.9),
            ])
        }
    }

    /// Raises the cancellation flag after its first call.
    #[derive(Debug)]
    struct CancellingDetector {
        flag: Arc<AtomicBool>,
        calls: AtomicUsize,
    }

    impl DetectionSource for CancellingDetector {
        fn name(&self) -> &str {
            "cancelling"
        }

        fn detect(&self, _image: &RgbImage) -> PipelineResult<Vec<RawDetection>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.flag.store(true, Ordering::Release);
            Ok(vec![RawDetection::new(0, 0, 50, 50, "text", 0.9)])
        }
    }

    #[derive(Debug)]
    struct EchoPrimary;

    impl PrimaryRecognizer for EchoPrimary {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, region: &RgbImage) -> PipelineResult<RecognizedText> {
            Ok(RecognizedText::new(format!("{}px", region.width()), Some(0.9)))
        }
    }

    /// Identifies pages by image width. Page 0 raises the cancellation flag once
    /// page 2 has started, and page 2 finishes only after the flag is up.
    #[derive(Debug)]
    struct OverlappingPagesDetector {
        flag: Arc<AtomicBool>,
        last_page_started: AtomicBool,
    }

    impl OverlappingPagesDetector {
        fn wait_for(condition: impl Fn() -> bool) {
            let deadline = Instant::now() + Duration::from_secs(5);
            while !condition() && Instant::now() < deadline {
                std::thread::yield_now();
            }
        }
    }

    impl DetectionSource for OverlappingPagesDetector {
        fn name(&self) -> &str {
            "overlapping"
        }

        fn detect(&self, image: &RgbImage) -> PipelineResult<Vec<RawDetection>> {
            match image.width() {
                100 => {
                    Self::wait_for(|| self.last_page_started.load(Ordering::Acquire));
                    self.flag.store(true, Ordering::Release);
                }
                102 => {
                    self.last_page_started.store(true, Ordering::Release);
                    Self::wait_for(|| self.flag.load(Ordering::Acquire));
                }
                _ => {}
            }
            Ok(vec![RawDetection::new(0, 0, 50, 50, "text", 0.9)])
        }
    }

    /// Records the size of the pool each call runs on.
    #[derive(Debug, Default)]
    struct PoolSizeDetector {
        seen: Mutex<Vec<usize>>,
    }

    impl DetectionSource for PoolSizeDetector {
        fn name(&self) -> &str {
            "pool-size"
        }

        fn detect(&self, _image: &RgbImage) -> PipelineResult<Vec<RawDetection>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(rayon::current_num_threads());
            }
            Ok(vec![RawDetection::new(0, 0, 50, 50, "text", 0.9)])
        }
    }

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::builder()
            .detector(Arc::new(TwoRegionDetector))
            .primary_recognizer(Arc::new(EchoPrimary))
            .build()
            .unwrap()
    }

    fn pages(n: usize) -> Vec<RgbImage> {
        (0..n).map(|_| RgbImage::new(200, 200)).collect()
    }

    #[test]
    fn test_processes_all_pages_in_order() {
        let pipeline =
            DocumentPipeline::from_registry(&registry(), &PipelineConfig::default()).unwrap();
        let result = pipeline.process(&pages(3));

        assert_eq!(result.completed_pages, vec![0, 1, 2]);
        assert!(!result.cancelled);
        assert_eq!(result.elements.len(), 6);

        let keys: Vec<(usize, usize, &str)> = result
            .elements
            .iter()
            .map(|e| (e.page, e.order, e.kind.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (0, 0, "title"),
                (0, 1, "text"),
                (1, 0, "title"),
                (1, 1, "text"),
                (2, 0, "title"),
                (2, 1, "text"),
            ]
        );
        assert_eq!(result.elements[0].text.as_deref(), Some("140px"));
        assert!(result.to_markdown().starts_with("# 140px\n\n140px\n\n# 140px"));
    }

    #[test]
    fn test_cancel_before_start_keeps_nothing() {
        let pipeline =
            DocumentPipeline::from_registry(&registry(), &PipelineConfig::default()).unwrap();
        let result = pipeline.process_with_cancel(&pages(4), &AtomicBool::new(true));
        assert!(result.completed_pages.is_empty());
        assert!(result.cancelled);
        assert!(result.elements.is_empty());
    }

    #[test]
    fn test_cancel_mid_document_keeps_completed_pages() {
        let flag = Arc::new(AtomicBool::new(false));
        let detector = Arc::new(CancellingDetector {
            flag: flag.clone(),
            calls: AtomicUsize::new(0),
        });
        let registry = CapabilityRegistry::builder()
            .detector(detector.clone())
            .build()
            .unwrap();
        let mut config = PipelineConfig::default();
        config.parallel = ParallelPolicy::new().with_page_threshold(usize::MAX);

        let pipeline = DocumentPipeline::from_registry(&registry, &config).unwrap();
        let result = pipeline.process_with_cancel(&pages(3), &flag);

        assert_eq!(result.completed_pages, vec![0]);
        assert!(result.cancelled);
        assert_eq!(result.elements.len(), 1);
        assert_eq!(result.elements[0].page, 0);
        assert!(result.elements[0].text.is_none());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parallel_cancel_keeps_pages_finished_after_a_skip() {
        let flag = Arc::new(AtomicBool::new(false));
        let detector = Arc::new(OverlappingPagesDetector {
            flag: flag.clone(),
            last_page_started: AtomicBool::new(false),
        });
        let registry = CapabilityRegistry::builder()
            .detector(detector)
            .build()
            .unwrap();
        let mut config = PipelineConfig::default();
        config.parallel = ParallelPolicy::new().with_max_threads(Some(2));

        let pages: Vec<RgbImage> = (0..3).map(|i| RgbImage::new(100 + i, 100)).collect();
        let pipeline = DocumentPipeline::from_registry(&registry, &config).unwrap();
        let result = pipeline.process_with_cancel(&pages, &flag);

        assert!(result.is_page_completed(0));
        assert!(result.is_page_completed(2));
        assert_eq!(result.page_elements(2).count(), 1);
        assert_eq!(result.cancelled, !result.is_page_completed(1));
    }

    #[test]
    fn test_assemble_keeps_pages_after_a_skipped_one() {
        let region = |page: usize| RegionText {
            region: crate::processors::FusedBox::passthrough(
                &crate::processors::DetectionBox::new(0, 0, 10, 10, "text", 0.9, page),
            ),
            result: None,
        };
        let result = assemble_document(vec![
            Some(vec![region(0)]),
            None,
            Some(vec![region(2), region(2)]),
            None,
        ]);

        assert_eq!(result.completed_pages, vec![0, 2]);
        assert!(result.cancelled);
        let keys: Vec<(usize, usize)> = result.elements.iter().map(|e| (e.page, e.order)).collect();
        assert_eq!(keys, vec![(0, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_max_threads_sizes_the_worker_pool() {
        let detector = Arc::new(PoolSizeDetector::default());
        let registry = CapabilityRegistry::builder()
            .detector(detector.clone())
            .build()
            .unwrap();
        let mut config = PipelineConfig::default();
        config.parallel = ParallelPolicy::new().with_max_threads(Some(2));

        let pipeline = DocumentPipeline::from_registry(&registry, &config).unwrap();
        pipeline.process(&pages(3));

        let seen = detector.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![2, 2, 2]);
    }

    #[test]
    fn test_unknown_toggle_is_a_config_error() {
        let mut config = PipelineConfig::default();
        config.sources = SourceToggles::new().set("missing", false);
        let err = DocumentPipeline::from_registry(&registry(), &config).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError { .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.fusion.iou_threshold = -0.1;
        assert!(DocumentPipeline::from_registry(&registry(), &config).is_err());
    }

    #[test]
    fn test_process_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-1.png");
        RgbImage::new(200, 200).save(&path).unwrap();

        let pipeline =
            DocumentPipeline::from_registry(&registry(), &PipelineConfig::default()).unwrap();
        let result = pipeline.process_files(&[&path]).unwrap();
        assert_eq!(result.pages_completed(), 1);
        assert_eq!(result.elements.len(), 2);

        let missing = pipeline.process_files(&[dir.path().join("missing.png")]);
        assert!(matches!(missing, Err(PipelineError::ImageLoad(_))));
    }
}
