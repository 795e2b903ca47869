// THEORY:
// The `pipeline` module is the top-level API for the freshness engine. It wires
// the core modules into one call: a path goes in, an `AnalysisResult` comes out.
//
// Key architectural principles:
// 1.  **Explicit Object**: the caller builds one `FreshnessPipeline` from a
//     `PipelineConfig` and shares it by reference. There is no global model.
// 2.  **Stateless Calls**: `analyze` takes `&self` and keeps nothing between
//     calls, so one pipeline can serve many threads.
// 3.  **Injected Randomness**: confidence sampling draws from a caller-supplied
//     `Rng`. `analyze` builds one per call, seeded from the config when a seed
//     is set.
// 4.  **Degrade, Never Throw**: stage errors are caught here and turned into
//     the documented fallback values. Callers never handle an `Err`.

use crate::core_modules::color_space::ColorSpaceViews;
use crate::core_modules::feature_extractor::{DEFAULT_CANNY_HIGH, DEFAULT_CANNY_LOW, FeatureExtractor};
use crate::core_modules::food_category::{CategoryThresholds, FoodCategoryDetector};
use crate::core_modules::freshness_classifier::{Classification, FreshnessClassifier};
use crate::core_modules::freshness_scorer::FreshnessScorer;
use crate::core_modules::image_loader::{self, DEFAULT_MAX_DIMENSION};
use crate::core_modules::quality_analyzer::QualityAnalyzer;
use crate::error::{VisionError, VisionResult};
use image::{DynamicImage, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::feature_extractor::FeatureVector;
pub use crate::core_modules::food_category::FoodCategory;
pub use crate::core_modules::freshness_classifier::{ConfidenceMode, FreshnessLabel};
pub use crate::core_modules::freshness_scorer::{FreshnessScore, ScoringWeights};
pub use crate::core_modules::quality_analyzer::{QualityLabel, QualityReport};
pub use crate::core_modules::storage_tips::{StorageTip, storage_tips};

/// Verdict reported when features could not be computed from a decoded image.
const FALLBACK_CONFIDENCE: f64 = 70.0;

/// Configuration for the FreshnessPipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Longest side of the working buffer for freshness features. `None`
    /// analyses the image at full size.
    pub max_dimension: Option<u32>,
    pub confidence_mode: ConfidenceMode,
    /// Seeds the confidence sampler. Every call restarts from this seed.
    pub seed: Option<u64>,
    pub canny_low: f32,
    pub canny_high: f32,
    pub scoring: ScoringWeights,
    pub categories: CategoryThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: Some(DEFAULT_MAX_DIMENSION),
            confidence_mode: ConfidenceMode::Random,
            seed: None,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            scoring: ScoringWeights::default(),
            categories: CategoryThresholds::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON configuration. Missing keys take their default value.
    pub fn from_json_file(path: &Path) -> VisionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VisionError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| VisionError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate().map_err(|message| VisionError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot drive the pipeline.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.canny_low.is_finite() && self.canny_high.is_finite()) {
            return Err("canny thresholds must be finite".to_string());
        }
        if self.canny_low > self.canny_high {
            return Err(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            ));
        }
        Ok(())
    }
}

/// The primary output of the pipeline for a single image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub label: FreshnessLabel,
    /// Percent, two decimals. `0.0` for `FreshnessLabel::Error`.
    pub confidence: f64,
    pub food_type: FoodCategory,
    pub quality_report: QualityReport,
}

impl AnalysisResult {
    /// The result for an image that could not be decoded.
    pub fn failed() -> Self {
        let error = Classification::error();
        Self {
            label: error.label,
            confidence: error.confidence,
            food_type: FoodCategory::Unknown,
            quality_report: QualityReport::unknown(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.label == FreshnessLabel::Error
    }

    /// Storage advice for the detected category.
    pub fn storage_tips(&self) -> &'static StorageTip {
        self.food_type.storage_tips()
    }
}

/// The deterministic half of an analysis: everything except confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessAssessment {
    pub features: FeatureVector,
    pub score: FreshnessScore,
    pub category: FoodCategory,
}

/// The main, top-level struct for the freshness engine.
#[derive(Debug, Clone)]
pub struct FreshnessPipeline {
    config: PipelineConfig,
    extractor: FeatureExtractor,
    scorer: FreshnessScorer,
    classifier: FreshnessClassifier,
    detector: FoodCategoryDetector,
    quality: QualityAnalyzer,
}

impl Default for FreshnessPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl FreshnessPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.canny_low, config.canny_high),
            scorer: FreshnessScorer::new(config.scoring.clone()),
            classifier: FreshnessClassifier::new(config.confidence_mode),
            detector: FoodCategoryDetector::new(config.categories.clone()),
            quality: QualityAnalyzer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyses the image at `path`. Never fails; see [`AnalysisResult::failed`].
    pub fn analyze(&self, path: impl AsRef<Path>) -> AnalysisResult {
        let mut rng = self.rng();
        self.analyze_with_rng(path, &mut rng)
    }

    pub fn analyze_with_rng<R: Rng + ?Sized>(&self, path: impl AsRef<Path>, rng: &mut R) -> AnalysisResult {
        let path = path.as_ref();
        match image_loader::load_rgb(path) {
            Ok(rgb) => self.analyze_rgb(&rgb, rng),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "image could not be decoded");
                AnalysisResult::failed()
            }
        }
    }

    /// Analyses an image the caller has already decoded.
    pub fn analyze_image<R: Rng + ?Sized>(&self, image: &DynamicImage, rng: &mut R) -> AnalysisResult {
        match image_loader::from_dynamic(image) {
            Ok(rgb) => self.analyze_rgb(&rgb, rng),
            Err(err) => {
                warn!(error = %err, "image buffer is unusable");
                AnalysisResult::failed()
            }
        }
    }

    fn analyze_rgb<R: Rng + ?Sized>(&self, rgb: &RgbImage, rng: &mut R) -> AnalysisResult {
        // Stage 1: Photo quality, on the full-resolution buffer.
        let quality_report = self.quality.analyze_or_unknown(rgb);

        // Stage 2: Features on the bounded working buffer.
        let features = self.features(rgb);

        // Stage 3: Category, independent of the score.
        let food_type = self.detector.detect_or_default(&features);

        // Stage 4: Score and verdict.
        let classification = match &features {
            Ok(f) => {
                let score = self.scorer.score(f);
                self.classifier.classify(score, food_type, rng)
            }
            Err(err) => {
                warn!(error = %err, "freshness scoring fell back to the neutral verdict");
                Classification {
                    label: FreshnessLabel::Okay,
                    confidence: FALLBACK_CONFIDENCE,
                }
            }
        };

        AnalysisResult {
            label: classification.label,
            confidence: classification.confidence,
            food_type,
            quality_report,
        }
    }

    /// Runs every deterministic stage and reports the intermediate values.
    pub fn assess(&self, rgb: &RgbImage) -> VisionResult<FreshnessAssessment> {
        let features = self.features(rgb)?;
        Ok(FreshnessAssessment {
            score: self.scorer.score(&features),
            category: self.detector.detect(&features),
            features,
        })
    }

    /// Loads `path` and runs [`assess`](Self::assess), surfacing errors.
    pub fn assess_path(&self, path: impl AsRef<Path>) -> VisionResult<FreshnessAssessment> {
        let rgb = image_loader::load_rgb(path.as_ref())?;
        self.assess(&rgb)
    }

    fn features(&self, rgb: &RgbImage) -> VisionResult<FeatureVector> {
        let working = image_loader::downscale(rgb, self.config.max_dimension);
        let views = ColorSpaceViews::from_rgb(&working);
        debug!(width = views.width(), height = views.height(), "color-space views ready");
        self.extractor.extract(&views)
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn seeded() -> FreshnessPipeline {
        FreshnessPipeline::new(PipelineConfig {
            seed: Some(42),
            ..PipelineConfig::default()
        })
    }

    #[test]
    fn missing_file_reports_error_triplet() {
        let result = seeded().analyze("/no/such/image.jpg");
        assert_eq!(result, AnalysisResult::failed());
        assert_eq!(result.label.as_str(), "Error");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.food_type.as_str(), "unknown");
        assert_eq!(result.quality_report.resolution, "Unknown");
        assert_eq!(result.storage_tips(), FoodCategory::Fruit.storage_tips());
    }

    #[test]
    fn medium_gray_is_okay_dairy() {
        let rgb = RgbImage::from_pixel(300, 300, Rgb([128, 128, 128]));
        let assessment = seeded().assess(&rgb).unwrap();
        assert_eq!(assessment.features.gray_ratio, 1.0);
        assert_eq!(assessment.features.mold_ratio, 0.0);
        assert_eq!(assessment.features.rotten_ratio, 0.0);
        assert_eq!(assessment.features.slimy_ratio, 0.0);
        assert_eq!(assessment.features.dried_ratio, 0.0);
        assert_eq!(assessment.score.value(), 50.0);
        assert_eq!(assessment.category, FoodCategory::Dairy);

        let result = seeded().analyze_image(&DynamicImage::ImageRgb8(rgb), &mut StdRng::seed_from_u64(3));
        assert_eq!(result.label, FreshnessLabel::Okay);
        assert!((70.0..=85.0).contains(&result.confidence));
    }

    #[test]
    fn vivid_red_is_fresh_fruit() {
        let rgb = RgbImage::from_pixel(256, 256, Rgb([220, 30, 40]));
        let pipeline = seeded();
        let assessment = pipeline.assess(&rgb).unwrap();
        assert_eq!(assessment.category, FoodCategory::Fruit);
        // 70 + 10 (bright) + 15 (vibrant)
        assert_eq!(assessment.score.value(), 95.0);

        let result = pipeline.analyze_image(&DynamicImage::ImageRgb8(rgb), &mut StdRng::seed_from_u64(0));
        assert_eq!(result.label, FreshnessLabel::Fresh);
        assert!((85.0..=95.0).contains(&result.confidence));
        assert_eq!(result.quality_report.quality, QualityLabel::PoorBlurry);
    }

    #[test]
    fn seeded_pipelines_repeat_themselves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banana.png");
        RgbImage::from_fn(120, 80, |x, y| Rgb([230, 190 + (x % 20) as u8, (y % 40) as u8]))
            .save(&path)
            .unwrap();

        let pipeline = seeded();
        assert_eq!(pipeline.analyze(&path), pipeline.analyze(&path));
        assert_eq!(pipeline.assess_path(&path).unwrap(), pipeline.assess_path(&path).unwrap());
    }

    #[test]
    fn downscale_does_not_move_uniform_features() {
        let rgb = RgbImage::from_pixel(1200, 900, Rgb([40, 160, 60]));
        let bounded = seeded().assess(&rgb).unwrap();
        let full = FreshnessPipeline::new(PipelineConfig {
            max_dimension: None,
            ..PipelineConfig::default()
        })
        .assess(&rgb)
        .unwrap();
        assert_eq!(bounded.features.green_ratio, full.features.green_ratio);
        assert_eq!(bounded.score, full.score);
        assert_eq!(bounded.category, FoodCategory::Vegetable);
    }

    #[test]
    fn empty_dynamic_image_fails_cleanly() {
        let result = seeded().analyze_image(&DynamicImage::new_rgb8(0, 0), &mut StdRng::seed_from_u64(1));
        assert!(result.is_error());
    }

    #[test]
    fn config_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "seed": 9, "confidence_mode": "midpoint", "scoring": { "baseline": 60.0 } }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.confidence_mode, ConfidenceMode::Midpoint);
        assert_eq!(config.scoring.baseline, 60.0);
        assert_eq!(config.scoring.mold_weight, 150.0);
        assert_eq!(config.max_dimension, Some(DEFAULT_MAX_DIMENSION));
    }

    #[test]
    fn bad_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(VisionError::Config { .. })
        ));
    }

    #[test]
    fn inverted_canny_pair_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "canny_low": 200.0, "canny_high": 100.0 }"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(VisionError::Config { .. })
        ));
    }

    #[test]
    fn inverted_canny_pair_still_analyzes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.png");
        RgbImage::from_fn(64, 64, |x, y| {
            let v = if (x / 4 + y / 4) % 2 == 0 { 255 } else { 0 };
            Rgb([v, v, v])
        })
        .save(&path)
        .unwrap();

        let pipeline = FreshnessPipeline::new(PipelineConfig {
            canny_low: 200.0,
            canny_high: 100.0,
            seed: Some(5),
            ..PipelineConfig::default()
        });
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pipeline.analyze(&path)));
        let result = outcome.expect("analysis must not panic");
        assert!(!result.is_error());
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FreshnessPipeline>();
    }
}
