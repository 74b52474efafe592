//! Offline fusion and arbitration of pre-computed model outputs.

use clap::ValueEnum;
use layout_fusion::core::{PipelineConfig, PipelineResult};
use layout_fusion::pipeline::{PageLayout, PageLayoutPipeline};
use layout_fusion::processors::{
    ArbitrationResult, CandidateSource, Confidence, OcrArbiter, RawDetection, TextNormalizer,
    TranscriptionCandidate, calibrate_engine_score, calibrate_perplexity,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON on one line
    Json,
    /// Human-readable summary
    Pretty,
}

/// Detections of one source on one page.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDetections {
    pub name: String,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Detections of every source for one page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDetections {
    /// Page index; defaults to the position in the input.
    #[serde(default)]
    pub page: Option<usize>,
    pub sources: Vec<SourceDetections>,
}

/// Input of the `fuse` command.
#[derive(Debug, Clone, Deserialize)]
pub struct FuseInput {
    pub pages: Vec<PageDetections>,
}

/// Primary engine output for one region.
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Secondary engine output for one region, with its language-model perplexity.
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryOutput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub perplexity: Option<f64>,
}

/// One region's pair of transcriptions.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePair {
    pub primary: PrimaryOutput,
    pub secondary: SecondaryOutput,
}

/// Input of the `arbitrate` command.
#[derive(Debug, Clone, Deserialize)]
pub struct ArbitrateInput {
    pub pairs: Vec<CandidatePair>,
}

#[derive(Debug, Serialize)]
struct ArbitratedPair {
    index: usize,
    #[serde(flatten)]
    result: ArbitrationResult,
}

/// Fuses every page of `input`. Sources switched off in the configuration are ignored.
pub fn fuse_pages(input: FuseInput, config: &PipelineConfig) -> Vec<PageLayout> {
    let pipeline = PageLayoutPipeline::new(Vec::new(), config.layout.clone(), config.fusion.clone());

    input
        .pages
        .into_iter()
        .enumerate()
        .map(|(position, page)| {
            let index = page.page.unwrap_or(position);
            let mut sources: Vec<SourceDetections> = page
                .sources
                .into_iter()
                .filter(|s| {
                    let enabled = config.sources.is_enabled(&s.name);
                    if !enabled {
                        info!("Ignoring disabled source '{}' on page {}", s.name, index);
                    }
                    enabled
                })
                .collect();
            pipeline.layout_from_detections(
                index,
                sources
                    .iter_mut()
                    .map(|s| (s.name.as_str(), std::mem::take(&mut s.detections))),
            )
        })
        .collect()
}

/// Calibrates both candidates of `pair`.
///
/// A secondary text without a perplexity has unknown confidence; one that
/// normalizes to nothing is known to be worthless.
pub fn candidates(
    pair: &CandidatePair,
    config: &PipelineConfig,
) -> (TranscriptionCandidate, TranscriptionCandidate) {
    let primary = TranscriptionCandidate::new(
        pair.primary.text.clone(),
        calibrate_engine_score(pair.primary.confidence),
        CandidateSource::Primary,
    );

    let secondary_text = TextNormalizer::new().normalize(&pair.secondary.text);
    let secondary_confidence = if secondary_text.is_empty() {
        Confidence::Known(0.0)
    } else {
        match pair.secondary.perplexity {
            Some(ppl) if ppl.is_nan() || ppl < 0.0 => {
                warn!("Ignoring invalid perplexity {}", ppl);
                Confidence::Unknown
            }
            Some(ppl) => Confidence::Known(calibrate_perplexity(
                ppl,
                config.scoring.normalization_constant,
            )),
            None => Confidence::Unknown,
        }
    };
    let secondary = TranscriptionCandidate::new(
        pair.secondary.text.clone(),
        secondary_confidence,
        CandidateSource::Secondary,
    );

    (primary, secondary)
}

/// Arbitrates every pair of `input`, in order.
pub fn arbitrate_pairs(input: &ArbitrateInput, config: &PipelineConfig) -> Vec<ArbitrationResult> {
    let arbiter = OcrArbiter::new(config.arbitration.clone());
    input
        .pairs
        .iter()
        .map(|pair| {
            let (a, b) = candidates(pair, config);
            arbiter.arbitrate(&a, &b)
        })
        .collect()
}

/// Runs the `fuse` command on a JSON file.
pub fn run_fuse(path: &Path, config: &PipelineConfig, format: OutputFormat) -> PipelineResult<()> {
    let start = Instant::now();
    let input: FuseInput = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    info!("Loaded {} pages from {}", input.pages.len(), path.display());

    let layouts = fuse_pages(input, config);
    info!("Fused in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&layouts)?),
        OutputFormat::Pretty => print_layouts(&layouts),
    }
    Ok(())
}

/// Runs the `arbitrate` command on a JSON file.
pub fn run_arbitrate(
    path: &Path,
    config: &PipelineConfig,
    format: OutputFormat,
) -> PipelineResult<()> {
    let input: ArbitrateInput = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    info!("Loaded {} candidate pairs from {}", input.pairs.len(), path.display());

    let results = arbitrate_pairs(&input, config);

    match format {
        OutputFormat::Json => {
            let rows: Vec<ArbitratedPair> = results
                .into_iter()
                .enumerate()
                .map(|(index, result)| ArbitratedPair { index, result })
                .collect();
            println!("{}", serde_json::to_string(&rows)?);
        }
        OutputFormat::Pretty => {
            println!("\n=== Arbitration Results ===");
            for (idx, result) in results.iter().enumerate() {
                let source = result
                    .chosen_source
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "[{}] \"{}\" ({:.1}%, {})",
                    idx + 1,
                    result.text,
                    result.confidence * 100.0,
                    source
                );
            }
        }
    }
    Ok(())
}

fn print_layouts(layouts: &[PageLayout]) {
    println!("\n=== Fused Layout ===");
    for layout in layouts {
        println!("Page {}: {} regions", layout.page, layout.boxes.len());
        for (idx, b) in layout.boxes.iter().enumerate() {
            println!(
                "  [{}] {} ({:.1}%, {} sources)",
                idx + 1,
                b.label,
                b.score * 100.0,
                b.source_count
            );
            println!(
                "      Position: [{:.1}, {:.1}] - [{:.1}, {:.1}]",
                b.x1, b.y1, b.x2, b.y2
            );
        }
    }
}
