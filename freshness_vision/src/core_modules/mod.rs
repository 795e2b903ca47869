// The analytical layers of the engine, leaf first.

#[allow(non_snake_case)]
pub mod D1;
pub mod image_loader;
pub mod color_space;
pub mod feature_extractor;
pub mod freshness_scorer;
pub mod freshness_classifier;
pub mod food_category;
pub mod storage_tips;
pub mod quality_analyzer;

/// Rounds to two decimal places, the precision reported to callers.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
