// THEORY:
// Category detection is an ordered rule cascade over the same features the
// scorer reads, evaluated independently of the freshness verdict. The first rule
// that fires wins, so the order of `FoodCategoryDetector::detect` is part of its
// contract: mixed plates (white base with colored toppings) are recognised before
// plain white dairy, and the catch-all is the cooked-food ladder.
//
// Meat, seafood and eggs are never produced by the cascade. They exist so that
// callers can look up storage advice for categories chosen by other means.

use crate::core_modules::feature_extractor::FeatureVector;
use crate::error::VisionResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Fruit,
    Vegetable,
    Meat,
    Dairy,
    CookedFood,
    Bread,
    Seafood,
    Eggs,
    /// The image could not be decoded.
    Unknown,
}

impl FoodCategory {
    pub const KNOWN: [FoodCategory; 8] = [
        FoodCategory::Fruit,
        FoodCategory::Vegetable,
        FoodCategory::Meat,
        FoodCategory::Dairy,
        FoodCategory::CookedFood,
        FoodCategory::Bread,
        FoodCategory::Seafood,
        FoodCategory::Eggs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FoodCategory::Fruit => "fruit",
            FoodCategory::Vegetable => "vegetable",
            FoodCategory::Meat => "meat",
            FoodCategory::Dairy => "dairy",
            FoodCategory::CookedFood => "cooked_food",
            FoodCategory::Bread => "bread",
            FoodCategory::Seafood => "seafood",
            FoodCategory::Eggs => "eggs",
            FoodCategory::Unknown => "unknown",
        }
    }

    /// Looks a category up by its snake_case key.
    pub fn from_key(key: &str) -> Option<FoodCategory> {
        let key = key.trim();
        FoodCategory::KNOWN
            .into_iter()
            .chain(std::iter::once(FoodCategory::Unknown))
            .find(|category| category.as_str().eq_ignore_ascii_case(key))
    }

    pub fn is_cooked(self) -> bool {
        self == FoodCategory::CookedFood
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds of the category cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub mixed_white_min: f64,
    pub mixed_orange_min: f64,
    pub mixed_green_min: f64,
    pub dairy_white_min: f64,
    pub bread_brown_min: f64,
    pub bread_saturation_max: f64,
    pub vegetable_green_min: f64,
    pub fruit_saturation_min: f64,
    pub fruit_value_min: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            mixed_white_min: 0.25,
            mixed_orange_min: 0.15,
            mixed_green_min: 0.10,
            dairy_white_min: 0.50,
            bread_brown_min: 0.30,
            bread_saturation_max: 50.0,
            vegetable_green_min: 0.25,
            fruit_saturation_min: 60.0,
            fruit_value_min: 100.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FoodCategoryDetector {
    thresholds: CategoryThresholds,
}

impl FoodCategoryDetector {
    pub fn new(thresholds: CategoryThresholds) -> Self {
        Self { thresholds }
    }

    /// Runs the cascade. First matching rule wins.
    pub fn detect(&self, f: &FeatureVector) -> FoodCategory {
        let t = &self.thresholds;

        if f.white_ratio > t.mixed_white_min
            && (f.orange_ratio > t.mixed_orange_min || f.green_ratio > t.mixed_green_min)
        {
            return FoodCategory::CookedFood;
        }
        if f.white_ratio > t.dairy_white_min {
            return FoodCategory::Dairy;
        }
        if f.brown_ratio > t.bread_brown_min && f.s_mean < t.bread_saturation_max {
            return FoodCategory::Bread;
        }
        if f.green_ratio > t.vegetable_green_min {
            return FoodCategory::Vegetable;
        }
        if f.s_mean > t.fruit_saturation_min && f.v_mean > t.fruit_value_min {
            return FoodCategory::Fruit;
        }
        FoodCategory::CookedFood
    }

    /// Like [`detect`](Self::detect), but a failed feature computation
    /// degrades to `Fruit` instead of propagating.
    pub fn detect_or_default(&self, features: &VisionResult<FeatureVector>) -> FoodCategory {
        match features {
            Ok(f) => self.detect(f),
            Err(err) => {
                warn!(error = %err, "category detection fell back to fruit");
                FoodCategory::Fruit
            }
        }
    }
}
