//! Benchmark execution loop
//!
//! Runs a classifier over loaded samples one at a time, timing each call
//! and scoring it with the lenient match policy. A classify error becomes
//! an `ERROR` record and the run continues; the loop itself never fails.
//! Progress callbacks fire on a fixed cadence and may abandon the run.

use crate::dataset::BenchmarkSample;
use crate::matching::CategoryMatcher;
use crate::metrics::BenchmarkMetrics;
use maillens_classifiers::{Classifier, Method};
use maillens_core::Result;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::time::Instant;
use tracing::{info, warn};

/// Length cap for stored error messages.
const ERROR_MESSAGE_LIMIT: usize = 100;

/// Run-wide options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkOptions {
    /// Applied to the classifier before the run; `None` keeps its current
    /// threshold. Benchmarks default to a permissive 0.15 so accuracy
    /// reflects ranking quality rather than threshold tuning.
    #[serde(default = "default_threshold")]
    pub threshold: Option<f32>,

    /// Progress callback cadence in samples
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

fn default_threshold() -> Option<f32> {
    Some(0.15)
}

fn default_progress_every() -> usize {
    10
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            progress_every: default_progress_every(),
        }
    }
}

/// Partial state handed to the progress callback
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub processed: usize,
    pub total: usize,
    /// Accuracy over the samples processed so far
    pub accuracy: f64,
    pub mean_latency_ms: f64,
}

/// Confidence band of a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence > 0.7 {
            Self::High
        } else if confidence > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One sample's outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub filename: String,
    pub true_category: String,
    pub predicted_category: String,
    pub confidence: f32,
    pub is_undefined: bool,
    pub time_ms: f64,
    pub is_correct: bool,
    /// False only when the classify call itself failed
    pub success: bool,
    pub error: Option<String>,
    pub text_length: usize,
    pub word_count: usize,
    pub method: Option<Method>,
    pub confidence_level: ConfidenceLevel,
}

/// Complete result of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub records: Vec<BenchmarkRecord>,
    pub metrics: BenchmarkMetrics,
    pub total_time_ms: f64,
    /// True when a progress callback broke out of the loop
    pub aborted: bool,
}

/// Drives a classifier over a sample set.
pub struct BenchmarkHarness {
    matcher: CategoryMatcher,
    options: BenchmarkOptions,
}

impl BenchmarkHarness {
    pub fn new(options: BenchmarkOptions) -> Result<Self> {
        Ok(Self {
            matcher: CategoryMatcher::new()?,
            options,
        })
    }

    /// Run without progress reporting.
    pub async fn run(
        &self,
        classifier: &dyn Classifier,
        samples: &[BenchmarkSample],
    ) -> BenchmarkRun {
        self.run_with_progress(classifier, samples, |_| ControlFlow::Continue(()))
            .await
    }

    /// Run with a progress callback invoked every `progress_every` samples
    /// and after the last one. Returning `ControlFlow::Break` abandons the
    /// run; records collected so far are kept and marked `aborted`.
    pub async fn run_with_progress(
        &self,
        classifier: &dyn Classifier,
        samples: &[BenchmarkSample],
        mut progress: impl FnMut(ProgressUpdate) -> ControlFlow<()>,
    ) -> BenchmarkRun {
        if let Some(threshold) = self.options.threshold {
            classifier.set_threshold(threshold);
        }
        info!(
            classifier = classifier.name(),
            samples = samples.len(),
            "Benchmark run started"
        );

        let run_start = Instant::now();
        let mut records = Vec::with_capacity(samples.len());
        let mut aborted = false;

        for (i, sample) in samples.iter().enumerate() {
            let call_start = Instant::now();
            let record = match classifier.classify(&sample.text).await {
                Ok(result) => {
                    let time_ms = call_start.elapsed().as_secs_f64() * 1000.0;
                    let is_undefined = result.is_undefined();
                    let is_correct =
                        self.matcher
                            .matches(&result.category, &sample.true_category, is_undefined);
                    BenchmarkRecord {
                        filename: sample.filename.clone(),
                        true_category: sample.true_category.clone(),
                        predicted_category: result.category,
                        confidence: result.confidence,
                        is_undefined,
                        time_ms,
                        is_correct,
                        success: true,
                        error: None,
                        text_length: sample.length,
                        word_count: sample.words,
                        method: Some(result.method),
                        confidence_level: ConfidenceLevel::from_confidence(result.confidence),
                    }
                }
                Err(e) => {
                    let time_ms = call_start.elapsed().as_secs_f64() * 1000.0;
                    warn!(filename = %sample.filename, error = %e, "Classify call failed");
                    BenchmarkRecord {
                        filename: sample.filename.clone(),
                        true_category: sample.true_category.clone(),
                        predicted_category: "ERROR".to_string(),
                        confidence: 0.0,
                        is_undefined: true,
                        time_ms,
                        is_correct: false,
                        success: false,
                        error: Some(e.to_string().chars().take(ERROR_MESSAGE_LIMIT).collect()),
                        text_length: sample.length,
                        word_count: sample.words,
                        method: None,
                        confidence_level: ConfidenceLevel::Low,
                    }
                }
            };
            records.push(record);

            let processed = i + 1;
            if processed % self.options.progress_every == 0 || processed == samples.len() {
                let update = partial_update(&records, samples.len());
                if progress(update).is_break() {
                    warn!(processed, "Benchmark run abandoned by caller");
                    aborted = true;
                    break;
                }
            }
        }

        let total_time_ms = run_start.elapsed().as_secs_f64() * 1000.0;
        let metrics = BenchmarkMetrics::from_records(&records);
        info!(
            accuracy = metrics.accuracy,
            mean_latency_ms = metrics.avg_time_ms,
            total_time_ms,
            "Benchmark run finished"
        );

        BenchmarkRun {
            records,
            metrics,
            total_time_ms,
            aborted,
        }
    }
}

fn partial_update(records: &[BenchmarkRecord], total: usize) -> ProgressUpdate {
    let processed = records.len();
    let correct = records.iter().filter(|r| r.is_correct).count();
    let mean_latency_ms = if processed > 0 {
        records.iter().map(|r| r.time_ms).sum::<f64>() / processed as f64
    } else {
        0.0
    };
    ProgressUpdate {
        processed,
        total,
        accuracy: if processed > 0 {
            correct as f64 / processed as f64
        } else {
            0.0
        },
        mean_latency_ms,
    }
}
