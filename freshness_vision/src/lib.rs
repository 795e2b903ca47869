// THEORY:
// This file is the main entry point for the `freshness_vision` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (like the `freshness_tester`
// command-line tool).
//
// The primary goal is to export the `FreshnessPipeline` and its associated data
// structures (`PipelineConfig`, `AnalysisResult`, etc.) as the high-level
// interface for the whole engine. The analytical stages live in `core_modules`
// and stay public for callers who want a single stage, but nothing requires
// touching them directly.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod record;

pub use error::{VisionError, VisionResult};
pub use parallel_pipeline::{BatchAnalyzer, BatchItem, MAX_BATCH_SIZE};
pub use pipeline::{
    AnalysisResult, ConfidenceMode, FoodCategory, FreshnessAssessment, FreshnessLabel, FreshnessPipeline,
    PipelineConfig, QualityLabel, QualityReport, StorageTip, storage_tips,
};
pub use record::{AnalysisRecord, HistorySummary};
