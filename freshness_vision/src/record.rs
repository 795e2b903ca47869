// THEORY:
// A record is the persisted form of one analysis: the verdict flattened next to
// the file name and the moment it was taken. Records are plain data and carry no
// references back into the pipeline, so they can be stored as JSON lines and
// summarised later without re-running anything.

use crate::core_modules::food_category::FoodCategory;
use crate::core_modules::freshness_classifier::FreshnessLabel;
use crate::error::VisionResult;
use crate::pipeline::AnalysisResult;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// How far back the daily breakdown of a summary reaches.
pub const HISTORY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub image_filename: String,
    pub label: FreshnessLabel,
    pub confidence: f64,
    pub food_type: FoodCategory,
    /// Same value as `blur_score`; kept for readers that expect the field.
    pub quality_score: f64,
    pub resolution: String,
    pub blur_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn from_result(image_filename: impl Into<String>, result: &AnalysisResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            image_filename: image_filename.into(),
            label: result.label,
            confidence: result.confidence,
            food_type: result.food_type,
            quality_score: result.quality_report.blur_score,
            resolution: result.quality_report.resolution.clone(),
            blur_score: result.quality_report.blur_score,
            timestamp,
        }
    }

    /// Appends the record as one JSON line.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> VisionResult<()> {
        let line = serde_json::to_string(self).map_err(std::io::Error::other)?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// Reads every record from JSON lines. Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> VisionResult<Vec<AnalysisRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(std::io::Error::other)?;
        records.push(record);
    }
    Ok(records)
}

/// Counts of the three verdicts. `Error` records are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelCounts {
    pub fresh: usize,
    pub okay: usize,
    pub avoid: usize,
}

impl LabelCounts {
    pub fn record(&mut self, label: FreshnessLabel) {
        match label {
            FreshnessLabel::Fresh => self.fresh += 1,
            FreshnessLabel::Okay => self.okay += 1,
            FreshnessLabel::Avoid => self.avoid += 1,
            FreshnessLabel::Error => {}
        }
    }

    pub fn total(&self) -> usize {
        self.fresh + self.okay + self.avoid
    }
}

/// Aggregate view over stored records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_analyses: usize,
    pub labels: LabelCounts,
    /// Keyed by category name; undecodable images land under `"unknown"`.
    pub food_types: BTreeMap<String, usize>,
    /// Verdict counts per UTC day, limited to the last [`HISTORY_WINDOW_DAYS`].
    pub daily: BTreeMap<NaiveDate, LabelCounts>,
}

impl HistorySummary {
    pub fn from_records(records: &[AnalysisRecord], now: DateTime<Utc>) -> Self {
        let window_start = now - Duration::days(HISTORY_WINDOW_DAYS);
        let mut summary = HistorySummary {
            total_analyses: records.len(),
            ..HistorySummary::default()
        };

        for record in records {
            summary.labels.record(record.label);
            *summary
                .food_types
                .entry(record.food_type.as_str().to_string())
                .or_default() += 1;

            if record.timestamp >= window_start && record.timestamp <= now {
                summary
                    .daily
                    .entry(record.timestamp.date_naive())
                    .or_default()
                    .record(record.label);
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::quality_analyzer::{QualityLabel, QualityReport};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn record(label: FreshnessLabel, food_type: FoodCategory, timestamp: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            image_filename: "plate.jpg".into(),
            label,
            confidence: 80.0,
            food_type,
            quality_score: 120.0,
            resolution: "640x480".into(),
            blur_score: 120.0,
            timestamp,
        }
    }

    #[test]
    fn record_flattens_the_result() {
        let result = AnalysisResult {
            label: FreshnessLabel::Okay,
            confidence: 77.25,
            food_type: FoodCategory::Bread,
            quality_report: QualityReport {
                quality: QualityLabel::GoodClear,
                resolution: "800x600".into(),
                blur_score: 312.5,
            },
        };
        let rec = AnalysisRecord::from_result("toast.jpg", &result, at(3, 9));
        assert_eq!(rec.quality_score, 312.5);
        assert_eq!(rec.blur_score, 312.5);
        assert_eq!(rec.resolution, "800x600");
        assert_eq!(rec.food_type, FoodCategory::Bread);
    }

    #[test]
    fn jsonl_round_trip_skips_blank_lines() {
        let mut buffer = Vec::new();
        let first = record(FreshnessLabel::Fresh, FoodCategory::Fruit, at(1, 8));
        let second = record(FreshnessLabel::Error, FoodCategory::Unknown, at(2, 8));
        first.write_jsonl(&mut buffer).unwrap();
        buffer.extend_from_slice(b"\n");
        second.write_jsonl(&mut buffer).unwrap();

        let records = read_jsonl(buffer.as_slice()).unwrap();
        assert_eq!(records, vec![first, second]);
    }

    #[test]
    fn corrupt_line_is_an_error() {
        assert!(read_jsonl(&b"{\"label\": 3}\n"[..]).is_err());
    }

    #[test]
    fn summary_counts_labels_types_and_days() {
        let now = at(31, 12);
        let records = vec![
            record(FreshnessLabel::Fresh, FoodCategory::Fruit, at(30, 8)),
            record(FreshnessLabel::Fresh, FoodCategory::Fruit, at(30, 18)),
            record(FreshnessLabel::Avoid, FoodCategory::Dairy, at(31, 7)),
            record(FreshnessLabel::Error, FoodCategory::Unknown, at(31, 9)),
            // Outside the daily window, still in the totals.
            record(FreshnessLabel::Okay, FoodCategory::CookedFood, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
        ];

        let summary = HistorySummary::from_records(&records, now);
        assert_eq!(summary.total_analyses, 5);
        assert_eq!(summary.labels, LabelCounts { fresh: 2, okay: 1, avoid: 1 });
        assert_eq!(summary.labels.total(), 4);
        assert_eq!(summary.food_types["fruit"], 2);
        assert_eq!(summary.food_types["unknown"], 1);
        assert_eq!(summary.food_types["cooked_food"], 1);

        assert_eq!(summary.daily.len(), 2);
        let may_30 = NaiveDate::from_ymd_opt(2024, 5, 30).unwrap();
        let may_31 = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(summary.daily[&may_30].fresh, 2);
        assert_eq!(summary.daily[&may_31], LabelCounts { fresh: 0, okay: 0, avoid: 1 });
    }

    #[test]
    fn empty_history_is_all_zero() {
        let summary = HistorySummary::from_records(&[], at(1, 0));
        assert_eq!(summary, HistorySummary::default());
    }
}
