//! layout-fusion CLI
//!
//! Offline inspection of box fusion and OCR arbitration settings on model outputs
//! that were computed elsewhere.
//!
//! # Usage
//!
//! ```bash
//! layout-fusion fuse --input detections.json --iou-threshold 0.55
//! layout-fusion arbitrate --input candidates.json --margin 0.1 --output json
//! ```

mod cli;
mod config;

use clap::{Args, Parser, Subcommand};
use cli::OutputFormat;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "layout-fusion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fuse layout detections and arbitrate OCR transcriptions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// JSON pipeline configuration file
    #[arg(long, env = "LAYOUT_FUSION_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse per-source detections from a JSON file
    Fuse {
        /// JSON file with per-page, per-source detections
        #[arg(long, short)]
        input: PathBuf,

        /// IoU at or above which same-label boxes are merged
        #[arg(long = "iou-threshold", env = "LAYOUT_FUSION_IOU_THRESHOLD")]
        iou_threshold: Option<f32>,

        /// Fused boxes this thin or thinner are dropped
        #[arg(long = "min-dimension", env = "LAYOUT_FUSION_MIN_DIMENSION")]
        min_dimension: Option<f32>,

        /// Detections scoring below this are discarded before fusion
        #[arg(long = "min-box-score", env = "LAYOUT_FUSION_MIN_BOX_SCORE")]
        min_box_score: Option<f32>,

        #[command(flatten)]
        common: Common,
    },
    /// Arbitrate primary/secondary transcription pairs from a JSON file
    Arbitrate {
        /// JSON file with candidate pairs
        #[arg(long, short)]
        input: PathBuf,

        /// Lead the secondary candidate needs over the primary to win
        #[arg(long, env = "LAYOUT_FUSION_MARGIN")]
        margin: Option<f32>,

        /// Confidence assumed when a candidate has none
        #[arg(long = "unknown-confidence", env = "LAYOUT_FUSION_UNKNOWN_CONFIDENCE")]
        unknown_confidence: Option<f32>,

        /// Perplexity at which secondary confidence reaches zero
        #[arg(long = "normalization-constant", env = "LAYOUT_FUSION_NORMALIZATION_CONSTANT")]
        normalization_constant: Option<f64>,

        #[command(flatten)]
        common: Common,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    layout_fusion::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse {
            input,
            iou_threshold,
            min_dimension,
            min_box_score,
            common,
        } => {
            let overrides = config::Overrides {
                iou_threshold,
                min_dimension,
                min_box_score,
                ..config::Overrides::default()
            };
            let config = config::load(common.config.as_deref(), &overrides)?;

            info!("Fusing detections from {}", input.display());
            cli::run_fuse(&input, &config, common.output)?;
        }
        Commands::Arbitrate {
            input,
            margin,
            unknown_confidence,
            normalization_constant,
            common,
        } => {
            let overrides = config::Overrides {
                margin,
                unknown_confidence,
                normalization_constant,
                ..config::Overrides::default()
            };
            let config = config::load(common.config.as_deref(), &overrides)?;

            info!("Arbitrating candidates from {}", input.display());
            cli::run_arbitrate(&input, &config, common.output)?;
        }
    }

    Ok(())
}
