//! Labeled dataset loading
//!
//! A dataset directory holds `labels.csv` (`filename,true_category`) plus
//! the referenced email text files. Loading is resilient by construction:
//! a missing or undecodable file is replaced by a category template, a
//! malformed CSV row is skipped, and texts are padded/truncated into the
//! configured length band. Only a missing `labels.csv` is an error.

use crate::encoding;
use maillens_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Appended once to texts below the minimum length.
const PAD_SUFFIX: &str = "Дополнительный текст для соответствия минимальной длине.";

/// Stand-in texts for rows whose file cannot be read.
const TEMPLATE_BANK: &[(&str, &str)] = &[
    (
        "Деловое предложение",
        "Предложение о сотрудничестве в сфере IT разработки. Готовы обсудить условия партнерства и предоставить коммерческое предложение.",
    ),
    (
        "Жалоба клиента",
        "Официальная жалоба на качество обслуживания. Требуется срочное решение проблемы и компенсация ущерба.",
    ),
    (
        "Техническая поддержка",
        "Запрос в техническую поддержку. Проблема с доступом к системе, необходима помощь специалиста.",
    ),
    (
        "Финансовый запрос",
        "Запрос финансовых документов и уточнение условий оплаты по договору.",
    ),
    (
        "Спам / Реклама",
        "Специальное предложение! Ограниченная акция со скидками!",
    ),
    (
        "HR / Рекрутинг",
        "Приглашение на собеседование. Обсуждение условий трудоустройства.",
    ),
    (
        "Юридическое письмо",
        "Юридическое уведомление по договору с требованием исполнения обязательств.",
    ),
    (
        "Новости / Анонсы",
        "Анонс новых функций платформы и важные объявления для пользователей.",
    ),
    (
        "Маркетинг / Продажи",
        "Маркетинговое предложение со специальными условиями для клиентов.",
    ),
    (
        "Личное сообщение",
        "Неформальное сообщение от коллеги или знакомого.",
    ),
];

/// Dataset loading limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Texts shorter than this (trimmed) are padded
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Texts longer than this are truncated with an ellipsis
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// At most this many rows are loaded
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

fn default_min_text_length() -> usize {
    50
}

fn default_max_text_length() -> usize {
    10_000
}

fn default_max_samples() -> usize {
    500
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            min_text_length: default_min_text_length(),
            max_text_length: default_max_text_length(),
            max_samples: default_max_samples(),
        }
    }
}

/// One labeled email ready for classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSample {
    pub filename: String,
    pub true_category: String,
    pub text: String,
    /// Length in characters after padding/truncation
    pub length: usize,
    pub words: usize,
    /// False when a template stood in for the file
    pub loaded_from_file: bool,
}

/// Outcome summary of a dataset load
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadReport {
    pub total: usize,
    pub loaded: usize,
    pub substituted: usize,
    /// Sample count per true category
    pub categories: BTreeMap<String, usize>,
}

/// Loaded samples plus their load report
#[derive(Debug, Clone)]
pub struct Dataset {
    pub samples: Vec<BenchmarkSample>,
    pub report: LoadReport,
}

#[derive(Debug, Deserialize)]
struct LabelRow {
    filename: String,
    true_category: String,
}

/// Reads a labeled dataset directory into memory.
pub struct DatasetLoader {
    dir: PathBuf,
    config: DatasetConfig,
}

impl DatasetLoader {
    pub fn new(dir: impl Into<PathBuf>, config: DatasetConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    /// Load up to `max_samples` labeled emails.
    pub fn load(&self) -> Result<Dataset> {
        let labels_path = self.dir.join("labels.csv");
        if !labels_path.exists() {
            return Err(Error::dataset(format!(
                "labels.csv not found in {}",
                self.dir.display()
            )));
        }

        let raw = std::fs::read(&labels_path)?;
        let (decoded, _) = encoding::decode(&raw);
        let mut reader = csv::ReaderBuilder::new().from_reader(decoded.as_bytes());

        let mut samples = Vec::new();
        let mut report = LoadReport::default();

        for row in reader.deserialize::<LabelRow>() {
            if samples.len() >= self.config.max_samples {
                break;
            }
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed labels.csv row");
                    continue;
                }
            };
            let filename = row.filename.trim().to_string();
            let true_category = row.true_category.trim().to_string();
            if filename.is_empty() || true_category.is_empty() {
                warn!("Skipping labels.csv row with empty filename or category");
                continue;
            }

            report.total += 1;
            *report.categories.entry(true_category.clone()).or_insert(0) += 1;

            let (text, loaded_from_file) = match self.read_email(&filename) {
                Some(content) => {
                    report.loaded += 1;
                    (content, true)
                }
                None => {
                    debug!(filename, "Email file missing, substituting template");
                    report.substituted += 1;
                    (template_for(&true_category), false)
                }
            };

            let text = self.fit_length(text);
            samples.push(BenchmarkSample {
                length: text.chars().count(),
                words: text.split_whitespace().count(),
                filename,
                true_category,
                text,
                loaded_from_file,
            });
        }

        info!(
            total = report.total,
            loaded = report.loaded,
            substituted = report.substituted,
            categories = report.categories.len(),
            "Dataset loaded"
        );
        Ok(Dataset { samples, report })
    }

    /// Try the named file, then the same stem with `.txt` and `.eml`.
    fn read_email(&self, filename: &str) -> Option<String> {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.to_string());

        let candidates = [
            self.dir.join(filename),
            self.dir.join(format!("{stem}.txt")),
            self.dir.join(format!("{stem}.eml")),
        ];

        for path in &candidates {
            if let Ok(bytes) = std::fs::read(path) {
                let (content, _) = encoding::decode(&bytes);
                if !content.trim().is_empty() {
                    return Some(content);
                }
            }
        }
        None
    }

    /// Pad below-minimum texts and truncate above-maximum ones.
    fn fit_length(&self, text: String) -> String {
        let mut text = text;
        if text.trim().chars().count() < self.config.min_text_length {
            text.push('\n');
            text.push_str(PAD_SUFFIX);
        }
        if text.chars().count() > self.config.max_text_length {
            let mut truncated: String = text.chars().take(self.config.max_text_length).collect();
            truncated.push_str("...");
            text = truncated;
        }
        text
    }
}

/// Template text for a category, with a generic fallback for unknown ones.
fn template_for(category: &str) -> String {
    TEMPLATE_BANK
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, text)| (*text).to_string())
        .unwrap_or_else(|| format!("Текст письма категории: {category}"))
}
