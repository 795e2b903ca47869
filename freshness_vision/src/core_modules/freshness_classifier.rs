// THEORY:
// The classifier maps a freshness score onto a verdict. It is state-free: the
// only moving part is the confidence sampler, and its random source is injected
// by the caller so a seeded generator makes results reproducible.
//
// Two threshold ladders exist. Cooked dishes are browned and grayish by nature,
// so they get their own cut-offs and confidence brackets; every raw category
// shares the other ladder.

use crate::core_modules::food_category::FoodCategory;
use crate::core_modules::freshness_scorer::FreshnessScore;
use crate::core_modules::round2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The freshness verdict. `Error` marks an image that could not be analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FreshnessLabel {
    Fresh,
    Okay,
    Avoid,
    Error,
}

impl FreshnessLabel {
    pub const VERDICTS: [FreshnessLabel; 3] = [FreshnessLabel::Fresh, FreshnessLabel::Okay, FreshnessLabel::Avoid];

    pub fn as_str(self) -> &'static str {
        match self {
            FreshnessLabel::Fresh => "Fresh",
            FreshnessLabel::Okay => "Okay",
            FreshnessLabel::Avoid => "Avoid",
            FreshnessLabel::Error => "Error",
        }
    }
}

impl fmt::Display for FreshnessLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive confidence range, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBracket {
    pub low: f64,
    pub high: f64,
}

impl ConfidenceBracket {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn contains(&self, confidence: f64) -> bool {
        confidence >= self.low && confidence <= self.high
    }
}

/// How a confidence value is picked inside its bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMode {
    /// Uniform draw from the injected generator.
    #[default]
    Random,
    /// Always the bracket midpoint.
    Midpoint,
}

/// Score cut-offs and the confidence bracket of each verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdLadder {
    pub fresh_min: f64,
    pub okay_min: f64,
    pub fresh: ConfidenceBracket,
    pub okay: ConfidenceBracket,
    pub avoid: ConfidenceBracket,
}

impl ThresholdLadder {
    pub const COOKED: ThresholdLadder = ThresholdLadder {
        fresh_min: 65.0,
        okay_min: 40.0,
        fresh: ConfidenceBracket::new(82.0, 92.0),
        okay: ConfidenceBracket::new(72.0, 85.0),
        avoid: ConfidenceBracket::new(82.0, 95.0),
    };

    pub const RAW: ThresholdLadder = ThresholdLadder {
        fresh_min: 60.0,
        okay_min: 35.0,
        fresh: ConfidenceBracket::new(85.0, 95.0),
        okay: ConfidenceBracket::new(70.0, 85.0),
        avoid: ConfidenceBracket::new(80.0, 95.0),
    };

    pub fn for_category(category: FoodCategory) -> &'static ThresholdLadder {
        if category.is_cooked() {
            &Self::COOKED
        } else {
            &Self::RAW
        }
    }

    pub fn label_for(&self, score: f64) -> FreshnessLabel {
        if score >= self.fresh_min {
            FreshnessLabel::Fresh
        } else if score >= self.okay_min {
            FreshnessLabel::Okay
        } else {
            FreshnessLabel::Avoid
        }
    }

    /// The bracket of a verdict. `Error` has none.
    pub fn bracket(&self, label: FreshnessLabel) -> Option<ConfidenceBracket> {
        match label {
            FreshnessLabel::Fresh => Some(self.fresh),
            FreshnessLabel::Okay => Some(self.okay),
            FreshnessLabel::Avoid => Some(self.avoid),
            FreshnessLabel::Error => None,
        }
    }
}

/// A verdict with its confidence, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub label: FreshnessLabel,
    pub confidence: f64,
}

impl Classification {
    pub fn error() -> Self {
        Self {
            label: FreshnessLabel::Error,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessClassifier {
    mode: ConfidenceMode,
}

impl FreshnessClassifier {
    pub fn new(mode: ConfidenceMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConfidenceMode {
        self.mode
    }

    pub fn classify<R: Rng + ?Sized>(
        &self,
        score: FreshnessScore,
        category: FoodCategory,
        rng: &mut R,
    ) -> Classification {
        let ladder = ThresholdLadder::for_category(category);
        let label = ladder.label_for(score.value());
        let confidence = match ladder.bracket(label) {
            Some(bracket) => self.sample(bracket, rng),
            None => 0.0,
        };

        debug!(score = score.value(), %category, %label, confidence, "classified");
        Classification { label, confidence }
    }

    fn sample<R: Rng + ?Sized>(&self, bracket: ConfidenceBracket, rng: &mut R) -> f64 {
        let raw = match self.mode {
            ConfidenceMode::Random => rng.gen_range(bracket.low..=bracket.high),
            ConfidenceMode::Midpoint => bracket.midpoint(),
        };
        round2(raw).clamp(bracket.low, bracket.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn score(value: f64) -> FreshnessScore {
        FreshnessScore::new(value)
    }

    #[test]
    fn raw_ladder_cutoffs() {
        let ladder = ThresholdLadder::RAW;
        assert_eq!(ladder.label_for(60.0), FreshnessLabel::Fresh);
        assert_eq!(ladder.label_for(59.99), FreshnessLabel::Okay);
        assert_eq!(ladder.label_for(35.0), FreshnessLabel::Okay);
        assert_eq!(ladder.label_for(34.99), FreshnessLabel::Avoid);
    }

    #[test]
    fn cooked_ladder_cutoffs() {
        let ladder = ThresholdLadder::for_category(FoodCategory::CookedFood);
        assert_eq!(ladder.label_for(65.0), FreshnessLabel::Fresh);
        assert_eq!(ladder.label_for(64.0), FreshnessLabel::Okay);
        assert_eq!(ladder.label_for(40.0), FreshnessLabel::Okay);
        assert_eq!(ladder.label_for(39.0), FreshnessLabel::Avoid);
    }

    #[test]
    fn labels_never_worsen_as_score_rises() {
        for category in [FoodCategory::Fruit, FoodCategory::CookedFood] {
            let ladder = ThresholdLadder::for_category(category);
            let mut previous = ladder.label_for(0.0);
            let mut seen = Vec::new();
            for step in 0..=200 {
                let label = ladder.label_for(step as f64 * 0.5);
                // Fresh < Okay < Avoid in declaration order.
                assert!(label <= previous, "{category}: {previous} -> {label} at {}", step as f64 * 0.5);
                assert!(FreshnessLabel::VERDICTS.contains(&label));
                if !seen.contains(&label) {
                    seen.push(label);
                }
                previous = label;
            }
            // Walking up from 0 visits every verdict, worst first.
            let mut expected = FreshnessLabel::VERDICTS.to_vec();
            expected.reverse();
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn random_confidence_stays_in_bracket() {
        let classifier = FreshnessClassifier::default();
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            for category in [FoodCategory::CookedFood, FoodCategory::Vegetable] {
                for value in [10.0, 50.0, 90.0] {
                    let c = classifier.classify(score(value), category, &mut rng);
                    let bracket = ThresholdLadder::for_category(category).bracket(c.label).unwrap();
                    assert!(bracket.contains(c.confidence), "{c:?} outside {bracket:?}");
                    assert!(c.confidence > 0.0 && c.confidence <= 100.0);
                }
            }
        }
    }

    #[test]
    fn same_seed_same_confidence() {
        let classifier = FreshnessClassifier::new(ConfidenceMode::Random);
        let a = classifier.classify(score(72.0), FoodCategory::Fruit, &mut StdRng::seed_from_u64(7));
        let b = classifier.classify(score(72.0), FoodCategory::Fruit, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn midpoint_mode_is_deterministic() {
        let classifier = FreshnessClassifier::new(ConfidenceMode::Midpoint);
        let mut rng = StdRng::seed_from_u64(1);
        let fresh = classifier.classify(score(80.0), FoodCategory::Fruit, &mut rng);
        assert_eq!(fresh, Classification { label: FreshnessLabel::Fresh, confidence: 90.0 });

        let okay = classifier.classify(score(50.0), FoodCategory::CookedFood, &mut rng);
        assert_eq!(okay, Classification { label: FreshnessLabel::Okay, confidence: 78.5 });

        let avoid = classifier.classify(score(5.0), FoodCategory::Dairy, &mut rng);
        assert_eq!(avoid, Classification { label: FreshnessLabel::Avoid, confidence: 87.5 });
    }

    #[test]
    fn confidence_has_two_decimals() {
        let mut rng = StdRng::seed_from_u64(99);
        let c = FreshnessClassifier::default().classify(score(45.0), FoodCategory::Meat, &mut rng);
        assert_eq!(c.confidence, round2(c.confidence));
    }

    #[test]
    fn mode_parses_from_snake_case() {
        let mode: ConfidenceMode = serde_json::from_str("\"midpoint\"").unwrap();
        assert_eq!(mode, ConfidenceMode::Midpoint);
    }
}
