//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

/// Centralized configuration for parallel processing across the pipeline.
///
/// Pages of a document and regions of a page are independent units of work, so
/// both fan out over rayon's pool. Small workloads stay sequential because the
/// fork/join overhead dominates for a handful of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Page counts `<=` this value are processed sequentially.
    /// Default: 1 (any multi-page document runs in parallel)
    #[serde(default = "ParallelPolicy::default_page_threshold")]
    pub page_threshold: usize,

    /// Region counts `<=` this value are recognized sequentially.
    /// Default: 4
    #[serde(default = "ParallelPolicy::default_region_threshold")]
    pub region_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the page threshold.
    pub fn with_page_threshold(mut self, threshold: usize) -> Self {
        self.page_threshold = threshold;
        self
    }

    /// Set the region threshold.
    pub fn with_region_threshold(mut self, threshold: usize) -> Self {
        self.region_threshold = threshold;
        self
    }

    /// Whether `pages` pages should be processed on the pool.
    pub fn parallel_pages(&self, pages: usize) -> bool {
        pages > self.page_threshold
    }

    /// Whether `regions` regions should be recognized on the pool.
    pub fn parallel_regions(&self, regions: usize) -> bool {
        regions > self.region_threshold
    }

    /// Build a dedicated rayon thread pool with the configured number of threads.
    ///
    /// Work run through [`rayon::ThreadPool::install`] on the returned pool, including
    /// nested `par_iter` calls, is limited to `max_threads` workers. The global pool
    /// is left untouched, so several pipelines with different limits can coexist.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(pool))` if `max_threads` is set
    /// - `Ok(None)` if `max_threads` is None (use rayon's global pool)
    /// - `Err` if the pool could not be created
    pub fn build_thread_pool(
        &self,
    ) -> Result<Option<rayon::ThreadPool>, rayon::ThreadPoolBuildError> {
        self.max_threads
            .map(|num_threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("layout-fusion-{i}"))
                    .build()
            })
            .transpose()
    }

    fn default_page_threshold() -> usize {
        1
    }

    fn default_region_threshold() -> usize {
        4
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            page_threshold: Self::default_page_threshold(),
            region_threshold: Self::default_region_threshold(),
        }
    }
}
