// THEORY:
// Photo quality is judged separately from freshness. It answers "can this photo
// be trusted?" (sharp, well exposed, contrasty, large enough) and never feeds
// the freshness scorer. It runs on the full-resolution decode, not on the
// downscaled working buffer, because sharpness and resolution are properties of
// the photo the user actually took.

use crate::core_modules::D1::pixel::pixel::Pixel;
use crate::core_modules::color_space::gray_view;
use crate::core_modules::feature_extractor::laplacian_variance;
use crate::core_modules::round2;
use crate::error::{VisionError, VisionResult};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

const BLURRY_BELOW: f64 = 50.0;
const SHARP_ABOVE: f64 = 100.0;
const DARK_BELOW: f64 = 50.0;
const OVEREXPOSED_ABOVE: f64 = 230.0;
const LOW_CONTRAST_BELOW: f64 = 20.0;
const MIN_SIDE: u32 = 224;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityLabel {
    #[serde(rename = "Poor - Blurry Image")]
    PoorBlurry,
    #[serde(rename = "Poor - Too Dark")]
    PoorTooDark,
    #[serde(rename = "Poor - Overexposed")]
    PoorOverexposed,
    #[serde(rename = "Fair - Low Contrast")]
    FairLowContrast,
    #[serde(rename = "Fair - Low Resolution")]
    FairLowResolution,
    #[serde(rename = "Good - Clear Image")]
    GoodClear,
    #[serde(rename = "Fair - Acceptable")]
    FairAcceptable,
    /// The photo could not be analysed.
    Unknown,
}

impl QualityLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityLabel::PoorBlurry => "Poor - Blurry Image",
            QualityLabel::PoorTooDark => "Poor - Too Dark",
            QualityLabel::PoorOverexposed => "Poor - Overexposed",
            QualityLabel::FairLowContrast => "Fair - Low Contrast",
            QualityLabel::FairLowResolution => "Fair - Low Resolution",
            QualityLabel::GoodClear => "Good - Clear Image",
            QualityLabel::FairAcceptable => "Fair - Acceptable",
            QualityLabel::Unknown => "Unknown",
        }
    }

    /// The quality ladder. First matching rule wins, and the final arm makes
    /// it total.
    pub fn classify(metrics: &QualityMetrics) -> QualityLabel {
        let low_resolution = metrics.width < MIN_SIDE || metrics.height < MIN_SIDE;

        if metrics.blur_score < BLURRY_BELOW {
            QualityLabel::PoorBlurry
        } else if metrics.brightness_mean < DARK_BELOW {
            QualityLabel::PoorTooDark
        } else if metrics.brightness_mean > OVEREXPOSED_ABOVE {
            QualityLabel::PoorOverexposed
        } else if metrics.brightness_std < LOW_CONTRAST_BELOW {
            QualityLabel::FairLowContrast
        } else if low_resolution {
            QualityLabel::FairLowResolution
        } else if metrics.blur_score > SHARP_ABOVE {
            QualityLabel::GoodClear
        } else {
            QualityLabel::FairAcceptable
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw measurements the quality ladder is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    /// Laplacian variance of the grayscale image.
    pub blur_score: f64,
    /// Mean of the HSV value channel.
    pub brightness_mean: f64,
    /// Standard deviation of the HSV value channel.
    pub brightness_std: f64,
    pub width: u32,
    pub height: u32,
}

impl QualityMetrics {
    pub fn measure(rgb: &RgbImage) -> VisionResult<Self> {
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::EmptyImage { width, height });
        }

        let blur_score = laplacian_variance(&gray_view(rgb));

        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for rgb_pixel in rgb.pixels() {
            let value = Pixel::from(rgb_pixel).to_hsv().value as u64;
            sum += value;
            sum_sq += value * value;
        }
        let count = width as f64 * height as f64;
        let brightness_mean = sum as f64 / count;
        let brightness_std = (sum_sq as f64 / count - brightness_mean * brightness_mean)
            .max(0.0)
            .sqrt();

        if !blur_score.is_finite() || !brightness_mean.is_finite() {
            return Err(VisionError::computation("quality metrics are not finite"));
        }

        Ok(Self {
            blur_score,
            brightness_mean,
            brightness_std,
            width,
            height,
        })
    }
}

/// The technical photo-quality verdict handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub quality: QualityLabel,
    /// `"WxH"`, or `"Unknown"` when the image could not be read.
    pub resolution: String,
    /// Laplacian variance, rounded to two decimals.
    pub blur_score: f64,
}

impl QualityReport {
    pub fn unknown() -> Self {
        Self {
            quality: QualityLabel::Unknown,
            resolution: "Unknown".to_string(),
            blur_score: 0.0,
        }
    }

    pub fn from_metrics(metrics: &QualityMetrics) -> Self {
        Self {
            quality: QualityLabel::classify(metrics),
            resolution: format!("{}x{}", metrics.width, metrics.height),
            blur_score: round2(metrics.blur_score),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    pub fn analyze(&self, rgb: &RgbImage) -> VisionResult<QualityReport> {
        let metrics = QualityMetrics::measure(rgb)?;
        let report = QualityReport::from_metrics(&metrics);
        debug!(
            quality = %report.quality,
            blur = metrics.blur_score,
            brightness = metrics.brightness_mean,
            contrast = metrics.brightness_std,
            "quality analysed"
        );
        Ok(report)
    }

    /// Like [`analyze`](Self::analyze), degrading any failure to the unknown report.
    pub fn analyze_or_unknown(&self, rgb: &RgbImage) -> QualityReport {
        self.analyze(rgb).unwrap_or_else(|err| {
            warn!(error = %err, "quality analysis failed");
            QualityReport::unknown()
        })
    }
}
