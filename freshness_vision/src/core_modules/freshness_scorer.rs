// THEORY:
// The scorer folds a `FeatureVector` into one bounded freshness score. It starts
// from a neutral baseline and applies ordered penalty and bonus terms, each a
// linear function of one feature or a fixed step gated by a threshold. All the
// constants live in `ScoringWeights` so retuning is a configuration change.
//
// The intermediate, unclamped value never leaves this module.

use crate::core_modules::feature_extractor::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Tunable constants of the freshness formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub baseline: f64,

    // Linear spoilage penalties, score -= ratio * weight.
    pub mold_weight: f64,
    pub rot_weight: f64,
    pub slime_weight: f64,
    pub dried_weight: f64,

    /// Flat penalty once gray discoloration covers more than `gray_threshold`.
    pub gray_penalty: f64,
    pub gray_threshold: f64,

    pub dark_value_threshold: f64,
    pub dark_value_penalty: f64,
    pub bright_value_threshold: f64,
    pub bright_value_bonus: f64,

    /// Bonus when both `s_mean` and `v_mean` exceed their thresholds.
    pub vibrancy_saturation_threshold: f64,
    pub vibrancy_value_threshold: f64,
    pub vibrancy_bonus: f64,

    /// Wrinkled or shrivelled surfaces produce dense edge maps.
    pub texture_edge_threshold: f64,
    pub texture_penalty: f64,

    /// Lab lightness on the byte scale.
    pub dark_lightness_threshold: f64,
    pub dark_lightness_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            baseline: 70.0,
            mold_weight: 150.0,
            rot_weight: 100.0,
            slime_weight: 120.0,
            dried_weight: 60.0,
            gray_penalty: 20.0,
            gray_threshold: 0.30,
            dark_value_threshold: 40.0,
            dark_value_penalty: 25.0,
            bright_value_threshold: 200.0,
            bright_value_bonus: 10.0,
            vibrancy_saturation_threshold: 100.0,
            vibrancy_value_threshold: 100.0,
            vibrancy_bonus: 15.0,
            texture_edge_threshold: 0.25,
            texture_penalty: 20.0,
            dark_lightness_threshold: 50.0,
            dark_lightness_penalty: 15.0,
        }
    }
}

/// A freshness score, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct FreshnessScore(f64);

impl FreshnessScore {
    /// Clamps `value` into range. NaN collapses to the minimum.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return FreshnessScore(MIN_SCORE);
        }
        FreshnessScore(value.clamp(MIN_SCORE, MAX_SCORE))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FreshnessScorer {
    weights: ScoringWeights,
}

impl FreshnessScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, f: &FeatureVector) -> FreshnessScore {
        let w = &self.weights;
        let mut score = w.baseline;

        score -= f.mold_ratio * w.mold_weight;
        score -= f.rotten_ratio * w.rot_weight;
        score -= f.slimy_ratio * w.slime_weight;
        score -= f.dried_ratio * w.dried_weight;

        if f.gray_ratio > w.gray_threshold {
            score -= w.gray_penalty;
        }

        if f.v_mean < w.dark_value_threshold {
            score -= w.dark_value_penalty;
        } else if f.v_mean > w.bright_value_threshold {
            score += w.bright_value_bonus;
        }

        if f.s_mean > w.vibrancy_saturation_threshold && f.v_mean > w.vibrancy_value_threshold {
            score += w.vibrancy_bonus;
        }

        if f.edge_density > w.texture_edge_threshold {
            score -= w.texture_penalty;
        }

        if f.l_mean < w.dark_lightness_threshold {
            score -= w.dark_lightness_penalty;
        }

        trace!(raw = score, "freshness score before clamp");
        FreshnessScore::new(score)
    }
}
