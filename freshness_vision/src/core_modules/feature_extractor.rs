// THEORY:
// The feature extractor condenses the color-space views into one fixed-schema
// `FeatureVector`. It is the engine's only reader of raw pixels after the
// transformer; the scorer and the category detector work purely on its output.
//
// Key principles:
// 1.  **Named Predicates**: each `*_ratio` is the fraction of pixels satisfying a
//     predicate over HSV channel ranges (`ColorPattern::matches`). Masks may
//     overlap, so the ratios need not sum to 1.
// 2.  **One Denominator**: every ratio divides by the same pixel count, gathered
//     in a single pass over the HSV view.
// 3.  **Spatial Statistics**: sharpness (Laplacian variance) and edge density
//     are the only neighbor-aware features and both read the grayscale view.
// 4.  **Pure Function**: no state, no randomness. The same views always yield
//     the same vector.

use crate::core_modules::D1::pixel::pixel::{HsvPixel, LabPixel};
use crate::core_modules::color_space::ColorSpaceViews;
use crate::error::{VisionError, VisionResult};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CANNY_LOW: f32 = 50.0;
pub const DEFAULT_CANNY_HIGH: f32 = 150.0;

/// Every statistic the scorer and the category detector consume.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub h_mean: f64,
    pub h_std: f64,
    pub s_mean: f64,
    pub s_std: f64,
    pub v_mean: f64,
    pub v_std: f64,
    pub l_mean: f64,
    pub a_mean: f64,
    pub b_mean: f64,

    pub mold_ratio: f64,
    pub rotten_ratio: f64,
    pub slimy_ratio: f64,
    pub dried_ratio: f64,
    pub gray_ratio: f64,
    pub white_ratio: f64,
    pub green_ratio: f64,
    pub red_ratio: f64,
    pub orange_ratio: f64,
    /// Warm low-saturation tones (crusts, toast), distinct from `rotten_ratio`.
    pub brown_ratio: f64,

    /// Fraction of pixels flagged by the Canny detector.
    pub edge_density: f64,
    /// Variance of the 3x3 Laplacian response over the grayscale view.
    pub laplacian_variance: f64,
    /// `1 / (1 + h_std + s_std)`.
    pub color_uniformity: f64,
}

/// The visual patterns measured as pixel ratios. Hue is on the 0..=179 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPattern {
    /// Blue-green fuzz in shadow, or near-black desaturated spots.
    Mold,
    /// Dark saturated browns.
    Rot,
    /// Very saturated but dark, wet-looking surfaces.
    Slime,
    /// Dull, mid-dark desaturated patches.
    Dried,
    Gray,
    White,
    Green,
    Red,
    Orange,
    Brown,
}

impl ColorPattern {
    pub const ALL: [ColorPattern; 10] = [
        ColorPattern::Mold,
        ColorPattern::Rot,
        ColorPattern::Slime,
        ColorPattern::Dried,
        ColorPattern::Gray,
        ColorPattern::White,
        ColorPattern::Green,
        ColorPattern::Red,
        ColorPattern::Orange,
        ColorPattern::Brown,
    ];

    #[inline]
    pub fn matches(self, pixel: &HsvPixel) -> bool {
        let HsvPixel {
            hue: h,
            saturation: s,
            value: v,
        } = *pixel;
        match self {
            ColorPattern::Mold => ((80..=140).contains(&h) && s > 30 && v < 100) || (s < 20 && v < 40),
            ColorPattern::Rot => (5..=25).contains(&h) && s > 40 && v < 60,
            ColorPattern::Slime => s > 150 && v < 80,
            ColorPattern::Dried => s < 20 && v > 30 && v < 80,
            ColorPattern::Gray => s < 30,
            ColorPattern::White => s < 40 && v > 120,
            ColorPattern::Green => h > 40 && h <= 85 && s > 30,
            ColorPattern::Red => (h <= 10 || h >= 170) && s > 40,
            ColorPattern::Orange => h > 10 && h <= 40 && s > 40,
            ColorPattern::Brown => h > 5 && h < 35 && s < 100 && v > 40,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Computes `FeatureVector`s from color-space views.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    canny_low: f32,
    canny_high: f32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self {
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
        }
    }
}

impl FeatureExtractor {
    /// Canny requires `low <= high`: an inverted pair is swapped, and a
    /// non-finite pair falls back to the defaults.
    pub fn new(canny_low: f32, canny_high: f32) -> Self {
        if !(canny_low.is_finite() && canny_high.is_finite()) {
            return Self::default();
        }
        Self {
            canny_low: canny_low.min(canny_high),
            canny_high: canny_high.max(canny_low),
        }
    }

    pub fn extract(&self, views: &ColorSpaceViews) -> VisionResult<FeatureVector> {
        if views.is_empty() {
            return Err(VisionError::computation("cannot extract features from an empty buffer"));
        }
        let total = views.pixel_count() as f64;

        // Single pass over HSV: channel moments and every mask count.
        let mut hue = ChannelAccumulator::default();
        let mut saturation = ChannelAccumulator::default();
        let mut value = ChannelAccumulator::default();
        let mut counts = [0u64; ColorPattern::ALL.len()];

        for pixel in &views.hsv {
            hue.push(pixel.hue);
            saturation.push(pixel.saturation);
            value.push(pixel.value);
            for pattern in ColorPattern::ALL {
                if pattern.matches(pixel) {
                    counts[pattern.index()] += 1;
                }
            }
        }

        let (l_mean, a_mean, b_mean) = lab_means(&views.lab);
        let ratio = |pattern: ColorPattern| counts[pattern.index()] as f64 / total;

        let (h_mean, h_std) = hue.stats();
        let (s_mean, s_std) = saturation.stats();
        let (v_mean, v_std) = value.stats();

        let features = FeatureVector {
            h_mean,
            h_std,
            s_mean,
            s_std,
            v_mean,
            v_std,
            l_mean,
            a_mean,
            b_mean,
            mold_ratio: ratio(ColorPattern::Mold),
            rotten_ratio: ratio(ColorPattern::Rot),
            slimy_ratio: ratio(ColorPattern::Slime),
            dried_ratio: ratio(ColorPattern::Dried),
            gray_ratio: ratio(ColorPattern::Gray),
            white_ratio: ratio(ColorPattern::White),
            green_ratio: ratio(ColorPattern::Green),
            red_ratio: ratio(ColorPattern::Red),
            orange_ratio: ratio(ColorPattern::Orange),
            brown_ratio: ratio(ColorPattern::Brown),
            edge_density: self.edge_density(&views.gray),
            laplacian_variance: laplacian_variance(&views.gray),
            color_uniformity: 1.0 / (1.0 + h_std + s_std),
        };

        if !features.is_finite() {
            return Err(VisionError::computation("feature vector contains non-finite values"));
        }

        debug!(
            mold = features.mold_ratio,
            rot = features.rotten_ratio,
            s_mean = features.s_mean,
            v_mean = features.v_mean,
            edges = features.edge_density,
            "extracted features"
        );
        Ok(features)
    }

    /// Fraction of grayscale pixels marked as edges by Canny.
    pub fn edge_density(&self, gray: &GrayImage) -> f64 {
        let (width, height) = gray.dimensions();
        if width < 3 || height < 3 {
            return 0.0;
        }
        let edges = imageproc::edges::canny(gray, self.canny_low, self.canny_high);
        let flagged = edges.pixels().filter(|p| p.0[0] > 0).count();
        flagged as f64 / (width as f64 * height as f64)
    }
}

impl FeatureVector {
    fn is_finite(&self) -> bool {
        [
            self.h_mean,
            self.h_std,
            self.s_mean,
            self.s_std,
            self.v_mean,
            self.v_std,
            self.l_mean,
            self.a_mean,
            self.b_mean,
            self.edge_density,
            self.laplacian_variance,
            self.color_uniformity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Running sum and sum of squares for one byte channel.
#[derive(Debug, Default)]
struct ChannelAccumulator {
    count: u64,
    sum: u64,
    sum_sq: u64,
}

impl ChannelAccumulator {
    #[inline]
    fn push(&mut self, value: u8) {
        let value = value as u64;
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Population mean and standard deviation.
    fn stats(&self) -> (f64, f64) {
        if self.count == 0 {
            return (0.0, 0.0);
        }
        let count = self.count as f64;
        let mean = self.sum as f64 / count;
        let variance = (self.sum_sq as f64 / count - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }
}

fn lab_means(lab: &[LabPixel]) -> (f64, f64, f64) {
    if lab.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let (mut l, mut a, mut b) = (0u64, 0u64, 0u64);
    for pixel in lab {
        l += pixel.lightness as u64;
        a += pixel.a as u64;
        b += pixel.b as u64;
    }
    let count = lab.len() as f64;
    (l as f64 / count, a as f64 / count, b as f64 / count)
}

/// Variance of the 4-neighbour Laplacian `[0,1,0; 1,-4,1; 0,1,0]` over every
/// pixel, with mirrored (reflect-101) borders. Flat images score 0.
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let num_pixels = width as u64 * height as u64;
    if num_pixels == 0 {
        return 0.0;
    }

    let at = |x: i64, y: i64| -> i64 {
        let x = reflect_101(x, width as i64);
        let y = reflect_101(y, height as i64);
        gray.get_pixel(x, y).0[0] as i64
    };

    let mut sum = 0i64;
    let mut sum_sq = 0i64;
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let response = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4 * at(x, y);
            sum += response;
            sum_sq += response * response;
        }
    }

    let count = num_pixels as f64;
    let mean = sum as f64 / count;
    (sum_sq as f64 / count - mean * mean).max(0.0)
}

#[inline]
fn reflect_101(index: i64, len: i64) -> u32 {
    if len <= 1 {
        return 0;
    }
    let reflected = if index < 0 {
        -index
    } else if index >= len {
        2 * len - 2 - index
    } else {
        index
    };
    reflected.clamp(0, len - 1) as u32
}
