//! Aggregate benchmark metrics
//!
//! Pure aggregation over a record slice: the same records always produce
//! the same metrics. Rates are percentages; accuracy and confidence stay
//! as fractions, matching how the results are consumed downstream.

use crate::harness::{BenchmarkRecord, ConfidenceLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category accuracy breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

/// Aggregated results of a benchmark run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    /// Fraction of correct predictions under the lenient match policy
    pub accuracy: f64,
    pub total: usize,
    pub correct: usize,

    pub avg_time_ms: f64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,

    pub undefined_count: usize,
    /// Percentage of predictions flagged undefined
    pub undefined_rate: f64,
    /// Percentage neither correct nor undefined
    pub error_rate: f64,
    /// Percentage of classify calls that did not fail outright
    pub success_rate: f64,

    pub avg_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    pub high_confidence_count: usize,
    pub medium_confidence_count: usize,
    pub low_confidence_count: usize,
    pub high_confidence_pct: f64,

    pub per_category: BTreeMap<String, CategoryAccuracy>,
    pub best_category: Option<String>,
    pub best_category_accuracy: f64,
    pub worst_category: Option<String>,
    pub worst_category_accuracy: f64,
}

impl BenchmarkMetrics {
    /// Aggregate a record set. Empty input yields zeroed metrics.
    pub fn from_records(records: &[BenchmarkRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total = records.len();
        let correct = records.iter().filter(|r| r.is_correct).count();
        let undefined = records.iter().filter(|r| r.is_undefined).count();
        let successes = records.iter().filter(|r| r.success).count();
        // Wrong and not explained away as undefined
        let misses = records
            .iter()
            .filter(|r| !r.is_correct && !r.is_undefined)
            .count();

        let times: Vec<f64> = records.iter().map(|r| r.time_ms).collect();
        let avg_time_ms = times.iter().sum::<f64>() / total as f64;
        let min_time_ms = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max_time_ms = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let confidences: Vec<f64> = records.iter().map(|r| r.confidence as f64).collect();
        let avg_confidence = confidences.iter().sum::<f64>() / total as f64;
        let min_confidence = confidences.iter().copied().fold(f64::INFINITY, f64::min);
        let max_confidence = confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let high_confidence_count = records
            .iter()
            .filter(|r| r.confidence_level == ConfidenceLevel::High)
            .count();
        let medium_confidence_count = records
            .iter()
            .filter(|r| r.confidence_level == ConfidenceLevel::Medium)
            .count();
        let low_confidence_count = records
            .iter()
            .filter(|r| r.confidence_level == ConfidenceLevel::Low)
            .count();

        let mut per_category: BTreeMap<String, CategoryAccuracy> = BTreeMap::new();
        for record in records {
            let entry = per_category.entry(record.true_category.clone()).or_default();
            entry.total += 1;
            if record.is_correct {
                entry.correct += 1;
            }
        }
        for entry in per_category.values_mut() {
            entry.accuracy = entry.correct as f64 / entry.total as f64;
        }

        let mut best_category = None;
        let mut best_category_accuracy = f64::NEG_INFINITY;
        let mut worst_category = None;
        let mut worst_category_accuracy = f64::INFINITY;
        for (category, entry) in &per_category {
            if entry.accuracy > best_category_accuracy {
                best_category_accuracy = entry.accuracy;
                best_category = Some(category.clone());
            }
            if entry.accuracy < worst_category_accuracy {
                worst_category_accuracy = entry.accuracy;
                worst_category = Some(category.clone());
            }
        }

        Self {
            accuracy: correct as f64 / total as f64,
            total,
            correct,
            avg_time_ms,
            min_time_ms,
            max_time_ms,
            undefined_count: undefined,
            undefined_rate: undefined as f64 / total as f64 * 100.0,
            error_rate: misses as f64 / total as f64 * 100.0,
            success_rate: successes as f64 / total as f64 * 100.0,
            avg_confidence,
            min_confidence,
            max_confidence,
            high_confidence_count,
            medium_confidence_count,
            low_confidence_count,
            high_confidence_pct: high_confidence_count as f64 / total as f64 * 100.0,
            per_category,
            best_category,
            best_category_accuracy,
            worst_category,
            worst_category_accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        category: &str,
        predicted: &str,
        confidence: f32,
        is_correct: bool,
        is_undefined: bool,
        time_ms: f64,
    ) -> BenchmarkRecord {
        BenchmarkRecord {
            filename: format!("{category}.txt"),
            true_category: category.to_string(),
            predicted_category: predicted.to_string(),
            confidence,
            is_undefined,
            time_ms,
            is_correct,
            success: predicted != "ERROR",
            error: None,
            text_length: 100,
            word_count: 20,
            method: None,
            confidence_level: ConfidenceLevel::from_confidence(confidence),
        }
    }

    #[test]
    fn test_empty_records_yield_zeroed_metrics() {
        let metrics = BenchmarkMetrics::from_records(&[]);
        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert!(metrics.best_category.is_none());
    }

    #[test]
    fn test_basic_aggregates() {
        let records = vec![
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 10.0),
            record("Спам / Реклама", "Личное сообщение", 0.5, false, false, 30.0),
            record("Личное сообщение", "Личное сообщение", 0.8, true, false, 20.0),
            record("Личное сообщение", "Не определена", 0.1, false, true, 40.0),
        ];
        let metrics = BenchmarkMetrics::from_records(&records);

        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.correct, 2);
        assert!((metrics.accuracy - 0.5).abs() < 1e-9);
        assert!((metrics.avg_time_ms - 25.0).abs() < 1e-9);
        assert_eq!(metrics.min_time_ms, 10.0);
        assert_eq!(metrics.max_time_ms, 40.0);
        assert_eq!(metrics.undefined_count, 1);
        assert!((metrics.undefined_rate - 25.0).abs() < 1e-9);
        // One record is neither correct nor undefined
        assert!((metrics.error_rate - 25.0).abs() < 1e-9);
        assert!((metrics.success_rate - 100.0).abs() < 1e-9);
        assert_eq!(metrics.high_confidence_count, 2);
        assert_eq!(metrics.medium_confidence_count, 1);
        assert_eq!(metrics.low_confidence_count, 1);
        assert!((metrics.high_confidence_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_category_best_and_worst() {
        let records = vec![
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 10.0),
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 10.0),
            record("Личное сообщение", "Спам / Реклама", 0.6, false, false, 10.0),
        ];
        let metrics = BenchmarkMetrics::from_records(&records);

        assert_eq!(metrics.per_category.len(), 2);
        assert_eq!(metrics.best_category.as_deref(), Some("Спам / Реклама"));
        assert_eq!(metrics.best_category_accuracy, 1.0);
        assert_eq!(metrics.worst_category.as_deref(), Some("Личное сообщение"));
        assert_eq!(metrics.worst_category_accuracy, 0.0);
    }

    #[test]
    fn test_failed_calls_lower_success_rate() {
        let records = vec![
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 10.0),
            record("Спам / Реклама", "ERROR", 0.0, false, true, 5.0),
        ];
        let metrics = BenchmarkMetrics::from_records(&records);
        assert!((metrics.success_rate - 50.0).abs() < 1e-9);
        // The ERROR record counts as undefined, not as an error-rate miss
        assert!((metrics.error_rate - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_rate_counts_unexplained_misses_only() {
        // An undefined prediction that the lenient policy accepts (undefined
        // truth label) is both correct and undefined. It must not push the
        // error rate negative: only rows that are wrong without being
        // undefined count as errors.
        let records = vec![
            record("Не определена", "Не определена", 0.1, true, true, 5.0),
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 5.0),
        ];
        let metrics = BenchmarkMetrics::from_records(&records);
        assert_eq!(metrics.correct, 2);
        assert_eq!(metrics.undefined_count, 1);
        assert_eq!(metrics.error_rate, 0.0);
        assert!(metrics.error_rate >= 0.0);
    }

    #[test]
    fn test_determinism() {
        let records = vec![
            record("Спам / Реклама", "Спам / Реклама", 0.9, true, false, 10.0),
            record("Личное сообщение", "Не определена", 0.2, false, true, 12.0),
        ];
        let a = serde_json::to_string(&BenchmarkMetrics::from_records(&records)).unwrap();
        let b = serde_json::to_string(&BenchmarkMetrics::from_records(&records)).unwrap();
        assert_eq!(a, b);
    }
}
