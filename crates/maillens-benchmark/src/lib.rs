//! MailLens Benchmark
//!
//! Measures classifier quality over a labeled email dataset: loads
//! `labels.csv` plus the referenced text files, runs a classifier over every
//! sample with wall-clock timing, scores predictions with a lenient
//! category-match policy, and aggregates accuracy/latency/confidence
//! metrics. Results export as CSV (per-sample records) and JSON (metrics).

pub mod dataset;
pub mod encoding;
pub mod export;
pub mod harness;
pub mod matching;
pub mod metrics;

pub use dataset::{BenchmarkSample, Dataset, DatasetConfig, DatasetLoader, LoadReport};
pub use encoding::TextEncoding;
pub use export::{export_run, ExportPaths};
pub use harness::{
    BenchmarkHarness, BenchmarkOptions, BenchmarkRecord, BenchmarkRun, ConfidenceLevel,
    ProgressUpdate,
};
pub use matching::CategoryMatcher;
pub use metrics::{BenchmarkMetrics, CategoryAccuracy};
