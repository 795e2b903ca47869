use anyhow::{Context, Result};
use clap::Parser;
use freshness_vision::pipeline::{AnalysisResult, ConfidenceMode, FreshnessPipeline, PipelineConfig};
use freshness_vision::record::{AnalysisRecord, HistorySummary, read_jsonl};
use freshness_vision::{BatchAnalyzer, BatchItem, MAX_BATCH_SIZE};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Judges the freshness of food photos.
#[derive(Parser, Debug)]
#[command(name = "freshness_tester", version)]
struct Args {
    /// JSON pipeline configuration. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the confidence sampler. Every image restarts from this seed,
    /// so images in the same bracket report the same confidence.
    #[arg(long)]
    seed: Option<u64>,

    /// Report bracket midpoints instead of sampled confidences.
    #[arg(long)]
    midpoint: bool,

    /// Print one JSON object per image.
    #[arg(long)]
    json: bool,

    /// Append results to this JSON-lines history and print its summary.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Images to analyse.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    info!(images = args.images.len(), seed = ?config.seed, "starting analysis");

    let analyzer = BatchAnalyzer::new(FreshnessPipeline::new(config));
    let mut items = Vec::with_capacity(args.images.len());
    for batch in args.images.chunks(MAX_BATCH_SIZE) {
        items.extend(analyzer.analyze_batch(batch).await);
    }
    analyzer.shutdown().await;

    for item in &items {
        if args.json {
            println!("{}", serde_json::to_string(item)?);
        } else {
            print_item(item);
        }
    }

    if let Some(history) = &args.history {
        append_history(history, &items)?;
        let records = read_jsonl(BufReader::new(File::open(history)?))
            .with_context(|| format!("reading history {}", history.display()))?;
        let summary = HistorySummary::from_records(&records, chrono::Utc::now());
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.midpoint {
        config.confidence_mode = ConfidenceMode::Midpoint;
    }
    Ok(config)
}

fn print_item(item: &BatchItem) {
    let AnalysisResult {
        label,
        confidence,
        food_type,
        quality_report,
    } = &item.result;

    println!(
        "{}: {label} ({confidence:.2}%) {food_type} | {} {} blur {:.2}",
        item.path.display(),
        quality_report.quality,
        quality_report.resolution,
        quality_report.blur_score,
    );

    if !item.result.is_error() {
        let tips = item.result.storage_tips();
        println!(
            "    store at {}, humidity {}, keeps {}",
            tips.temperature_range, tips.humidity_range, tips.shelf_life_range
        );
        for tip in tips.tips {
            println!("    - {tip}");
        }
    }
}

fn append_history(history: &Path, items: &[BatchItem]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(history)
        .with_context(|| format!("opening history {}", history.display()))?;
    let now = chrono::Utc::now();

    for item in items {
        let filename = item
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.path.display().to_string());
        AnalysisRecord::from_result(filename, &item.result, now).write_jsonl(&file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn seed_help_explains_repeated_confidence() {
        let command = Args::command();
        let seed = command
            .get_arguments()
            .find(|arg| arg.get_id() == "seed")
            .unwrap();
        let help = seed.get_help().unwrap().to_string();
        assert!(help.contains("restarts from this seed"), "{help}");
    }

    #[test]
    fn flags_override_the_config() {
        let args = Args::parse_from(["freshness_tester", "--seed", "7", "--midpoint", "a.png"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.confidence_mode, ConfidenceMode::Midpoint);
    }
}
