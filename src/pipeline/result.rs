//! Result types produced by the layout and recognition pipelines.

use crate::core::errors::PipelineResult;
use crate::processors::{ArbitrationResult, CandidateSource, FusedBox};
use serde::{Deserialize, Serialize};

/// What happened to one detection source on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source ran. `kept` detections passed the score filter.
    Completed { detections: usize, kept: usize },
    /// The source returned an error; its detections were skipped.
    Failed { error: String },
    /// The source is switched off in the configuration.
    Disabled,
}

/// Per-source outcome for a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Source name.
    pub name: String,
    /// Outcome.
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceReport {
    /// Creates a report.
    pub fn new(name: impl Into<String>, status: SourceStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    /// Whether the source contributed to the page.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, SourceStatus::Completed { .. })
    }
}

/// Fused layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Zero-based page index.
    pub page: usize,
    /// Fused regions in reading order.
    pub boxes: Vec<FusedBox>,
    /// One entry per configured detection source, in registration order.
    pub sources: Vec<SourceReport>,
}

impl PageLayout {
    /// Number of sources that ran successfully.
    pub fn completed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_completed()).count()
    }
}

/// A fused region with its recognized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionText {
    /// The fused layout region.
    pub region: FusedBox,
    /// Arbitrated text; `None` when the region was not sent to OCR (skipped label,
    /// crop outside the page, or no OCR engine configured).
    pub result: Option<ArbitrationResult>,
}

/// One element of a processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentElement {
    /// Zero-based page index.
    pub page: usize,
    /// Position in the page's reading order, starting at 0.
    pub order: usize,
    /// Layout label.
    pub kind: String,
    /// `[x1, y1, x2, y2]` in page pixels.
    pub bbox: [f32; 4],
    /// Fusion score of the region.
    pub layout_score: f32,
    /// Number of detections merged into the region.
    pub source_count: usize,
    /// Recognized text, if the region was recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Arbitrated text confidence, if the region was recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// OCR source whose text was kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_source: Option<CandidateSource>,
}

impl DocumentElement {
    /// Builds the element at position `order` from a recognized region.
    pub fn from_region(order: usize, region: RegionText) -> Self {
        let RegionText { region, result } = region;
        let (text, confidence, chosen_source) = match result {
            Some(r) => (Some(r.text), Some(r.confidence), r.chosen_source),
            None => (None, None, None),
        };
        Self {
            page: region.page,
            order,
            bbox: [region.x1, region.y1, region.x2, region.y2],
            kind: region.label,
            layout_score: region.score,
            source_count: region.source_count,
            text,
            confidence,
            chosen_source,
        }
    }

    /// The element as a Markdown block, or `None` if it renders to nothing.
    fn markdown_block(&self) -> Option<String> {
        let kind = self.kind.to_ascii_lowercase().replace('_', "-");
        if is_visual_label(&kind) {
            return Some(format!(
                "![{}](page-{}-region-{})",
                self.kind, self.page, self.order
            ));
        }

        let text = self.text.as_deref().filter(|t| !t.is_empty())?;
        let block = match kind.as_str() {
            "title" | "doc-title" => format!("# {text}"),
            "section-header" | "heading" | "paragraph-title" => format!("## {text}"),
            "list" | "list-item" => format!("- {text}"),
            _ => text.to_string(),
        };
        Some(block)
    }
}

/// Labels rendered as image references rather than text.
pub(crate) fn is_visual_label(kind: &str) -> bool {
    matches!(kind, "figure" | "picture" | "image")
}

/// Output of a document run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Elements ordered by page, then reading order.
    pub elements: Vec<DocumentElement>,
    /// Indices of the pages that were fully processed, ascending. After a
    /// cancellation this need not be a contiguous prefix.
    pub completed_pages: Vec<usize>,
    /// Whether some pages were skipped because the run was cancelled.
    pub cancelled: bool,
}

impl DocumentResult {
    /// Number of fully processed pages.
    pub fn pages_completed(&self) -> usize {
        self.completed_pages.len()
    }

    /// Whether `page` was fully processed.
    pub fn is_page_completed(&self, page: usize) -> bool {
        self.completed_pages.binary_search(&page).is_ok()
    }

    /// Elements of one page.
    pub fn page_elements(&self, page: usize) -> impl Iterator<Item = &DocumentElement> {
        self.elements.iter().filter(move |e| e.page == page)
    }

    /// Renders the document as Markdown.
    ///
    /// Titles become `#` headings, section headers `##` headings, list items `-`
    /// bullets and visual regions image references. Other regions are paragraphs.
    /// Regions without text are left out, and blocks are separated by a blank line.
    pub fn to_markdown(&self) -> String {
        let blocks: Vec<String> = self
            .elements
            .iter()
            .filter_map(DocumentElement::markdown_block)
            .collect();
        if blocks.is_empty() {
            return String::new();
        }
        let mut md = blocks.join("\n\n");
        md.push('\n');
        md
    }

    /// Serializes the result as pretty-printed JSON.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::DetectionBox;

    fn element(page: usize, order: usize, kind: &str, text: Option<&str>) -> DocumentElement {
        let region = FusedBox::passthrough(&DetectionBox::new(0, 0, 100, 20, kind, 0.9, page));
        let result = text.map(|t| ArbitrationResult {
            text: t.to_string(),
            confidence: 0.8,
            chosen_source: Some(CandidateSource::Primary),
        });
        DocumentElement::from_region(order, RegionText { region, result })
    }

    #[test]
    fn test_from_region_copies_fields() {
        let e = element(2, 3, "text", Some("hello"));
        assert_eq!(e.page, 2);
        assert_eq!(e.order, 3);
        assert_eq!(e.bbox, [0.0, 0.0, 100.0, 20.0]);
        assert_eq!(e.text.as_deref(), Some("hello"));
        assert_eq!(e.confidence, Some(0.8));
        assert_eq!(e.chosen_source, Some(CandidateSource::Primary));
        assert_eq!(e.source_count, 1);
    }

    #[test]
    fn test_markdown_rendering() {
        let result = DocumentResult {
            elements: vec![
                element(0, 0, "title", Some("Report")),
                element(0, 1, "section_header", Some("Intro")),
                element(0, 2, "text", Some("Body text.")),
                element(0, 3, "list-item", Some("first")),
                element(0, 4, "figure", None),
                element(1, 0, "text", Some("")),
                element(1, 1, "text", Some("Page two.")),
            ],
            completed_pages: vec![0, 1],
            cancelled: false,
        };
        assert_eq!(
            result.to_markdown(),
            "# Report\n\n## Intro\n\nBody text.\n\n- first\n\n![figure](page-0-region-4)\n\nPage two.\n"
        );
    }

    #[test]
    fn test_empty_document_renders_nothing() {
        assert_eq!(DocumentResult::default().to_markdown(), "");
    }

    #[test]
    fn test_json_skips_missing_text() {
        let result = DocumentResult {
            elements: vec![element(0, 0, "figure", None)],
            completed_pages: vec![0],
            cancelled: false,
        };
        let json = result.to_json().unwrap();
        assert!(!json.contains("\"text\""));
        let back: DocumentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_source_report_serialization() {
        let report = SourceReport::new(
            "yolo",
            SourceStatus::Completed {
                detections: 5,
                kept: 3,
            },
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["name"], "yolo");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["kept"], 3);
        assert!(report.is_completed());
        assert!(!SourceReport::new("publaynet", SourceStatus::Disabled).is_completed());
    }

    #[test]
    fn test_page_elements_filter() {
        let result = DocumentResult {
            elements: vec![element(0, 0, "text", Some("a")), element(1, 0, "text", Some("b"))],
            completed_pages: vec![0, 1],
            cancelled: false,
        };
        assert_eq!(result.page_elements(1).count(), 1);
    }
}
