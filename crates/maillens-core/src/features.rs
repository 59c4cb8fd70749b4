//! Deterministic text feature extraction
//!
//! Features are a pure function of the input string: the same text always
//! produces the same `TextFeatures`, and empty or degenerate input produces
//! zeroed defaults rather than an error. Ratios divide by `max(len, 1)` so
//! there is no division by zero anywhere in this module.

use crate::error::Result;
use crate::Error;
use aho_corasick::AhoCorasick;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const GREETING_WORDS: &[&str] = &[
    "уважаемый",
    "уважаемая",
    "здравствуйте",
    "добрый день",
    "привет",
    "дорогой",
    "дорогая",
    "hello",
    "hi",
    "dear",
];

const THANKS_WORDS: &[&str] = &[
    "спасибо",
    "благодарю",
    "thank you",
    "thanks",
    "благодарность",
];

const URGENT_WORDS: &[&str] = &["срочно", "urgent", "asap", "немедленно", "важно", "important"];

const MEETING_WORDS: &[&str] = &[
    "встреча",
    "звонок",
    "совещание",
    "конференция",
    "meeting",
    "call",
    "conference",
];

const POSITIVE_WORDS: &[&str] = &[
    "отличн", "хорош", "прекрасн", "супер", "great", "good", "excellent", "спасиб",
];

const NEGATIVE_WORDS: &[&str] = &[
    "плох",
    "ужасн",
    "кошмар",
    "разочарован",
    "bad",
    "terrible",
    "disappointed",
    "жалоб",
];

const FORMAL_WORDS: &[&str] = &["прошу", "предлагаю", "сообщаю", "уведомляю", "информирую"];

const INFORMAL_WORDS: &[&str] = &["привет", "пока", "ок", "ладно", "чё", "ага"];

/// Lexical and statistical features derived from raw text.
///
/// Purely a value: no identity, no mutation after extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub char_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub uppercase_ratio: f32,
    pub digit_count: usize,

    pub has_greeting: bool,
    pub has_thanks: bool,
    pub has_urgent: bool,
    pub has_meeting: bool,
    pub has_date: bool,
    pub has_time: bool,
    pub has_money: bool,
    pub has_url: bool,
    pub has_email: bool,

    pub positive_score: usize,
    pub negative_score: usize,
    pub sentiment_ratio: f32,
    pub formal_score: usize,
    pub informal_score: usize,
    /// 0.5 when the text carries no formality signal either way.
    pub formality_ratio: f32,
    /// Weighted combination of average word length, sentence count, and
    /// type-token ratio, clamped to [0, 1].
    pub text_complexity: f32,

    pub is_short: bool,
    pub is_long: bool,
    pub has_questions: bool,
    pub is_emotional: bool,
}

impl TextFeatures {
    /// Stable content hash of the feature set, used as part of the
    /// classification cache key.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        // serde_json output is deterministic for a fixed struct
        let encoded = serde_json::to_string(self).unwrap_or_default();
        hasher.update(encoded.as_bytes());
        let digest = hasher.finalize();
        format!("{digest:x}")
    }
}

/// Extracts [`TextFeatures`] from raw text.
///
/// Lexicon scans run on compiled case-insensitive automata; the extractor
/// is immutable after construction and safe to share.
pub struct TextFeatureExtractor {
    greetings: AhoCorasick,
    thanks: AhoCorasick,
    urgent: AhoCorasick,
    meetings: AhoCorasick,
    positive: AhoCorasick,
    negative: AhoCorasick,
    formal: AhoCorasick,
    informal: AhoCorasick,
    date_re: Regex,
    time_re: Regex,
    money_re: Regex,
    url_re: Regex,
    email_re: Regex,
}

fn build_matcher(patterns: &[&str]) -> Result<AhoCorasick> {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .map_err(|e| Error::internal(format!("Failed to build lexicon matcher: {e}")))
}

fn build_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::internal(format!("Failed to compile regex: {e}")))
}

impl TextFeatureExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            greetings: build_matcher(GREETING_WORDS)?,
            thanks: build_matcher(THANKS_WORDS)?,
            urgent: build_matcher(URGENT_WORDS)?,
            meetings: build_matcher(MEETING_WORDS)?,
            positive: build_matcher(POSITIVE_WORDS)?,
            negative: build_matcher(NEGATIVE_WORDS)?,
            formal: build_matcher(FORMAL_WORDS)?,
            informal: build_matcher(INFORMAL_WORDS)?,
            date_re: build_regex(r"\d{1,2}[-./]\d{1,2}[-./]\d{2,4}")?,
            time_re: build_regex(r"\d{1,2}:\d{2}")?,
            money_re: build_regex(r"\$\d+|€\d+|£\d+|\d+\s*(руб|р\.|долл|евро)")?,
            url_re: build_regex(r"https?://\S+|www\.\S+")?,
            email_re: build_regex(r"\S+@\S+\.\S+")?,
        })
    }

    /// Extract features from raw text. Total: never fails, empty input
    /// yields zeroed defaults.
    pub fn extract(&self, text: &str) -> TextFeatures {
        let lower = text.to_lowercase();
        let char_count = text.chars().count();
        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();

        // Segment count over runs of sentence punctuation; a trailing
        // terminator still contributes a (possibly empty) segment.
        let sentence_count = split_sentences(text);

        let exclamation_count = text.matches('!').count();
        let question_count = text.matches('?').count();
        let uppercase_count = text.chars().filter(|c| c.is_uppercase()).count();
        let uppercase_ratio = uppercase_count as f32 / char_count.max(1) as f32;
        let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();

        let positive_score = self.positive.find_iter(&lower).count();
        let negative_score = self.negative.find_iter(&lower).count();
        let formal_score = self.formal.find_iter(&lower).count();
        let informal_score = self.informal.find_iter(&lower).count();

        let (sentiment_ratio, formality_ratio) = if word_count > 0 {
            let sentiment =
                (positive_score as f32 - negative_score as f32) / word_count as f32;
            let formality = if formal_score + informal_score > 0 {
                formal_score as f32 / (formal_score + informal_score) as f32
            } else {
                0.5
            };
            (sentiment, formality)
        } else {
            (0.0, 0.5)
        };

        let text_complexity = if word_count > 0 {
            let avg_word_len =
                words.iter().map(|w| w.chars().count()).sum::<usize>() as f32 / word_count as f32;
            let unique_words: std::collections::HashSet<&str> = words.iter().copied().collect();
            let ttr = unique_words.len() as f32 / word_count as f32;
            ((avg_word_len * 0.3 + sentence_count as f32 * 0.4 + ttr * 0.3) / 10.0).min(1.0)
        } else {
            0.0
        };

        TextFeatures {
            char_count,
            word_count,
            sentence_count,
            exclamation_count,
            question_count,
            uppercase_ratio,
            digit_count,
            has_greeting: self.greetings.is_match(&lower),
            has_thanks: self.thanks.is_match(&lower),
            has_urgent: self.urgent.is_match(&lower),
            has_meeting: self.meetings.is_match(&lower),
            has_date: self.date_re.is_match(text),
            has_time: self.time_re.is_match(text),
            has_money: self.money_re.is_match(&lower),
            has_url: self.url_re.is_match(text),
            has_email: self.email_re.is_match(text),
            positive_score,
            negative_score,
            sentiment_ratio,
            formal_score,
            informal_score,
            formality_ratio,
            text_complexity,
            is_short: word_count < 20,
            is_long: word_count > 500,
            has_questions: question_count > 0,
            is_emotional: exclamation_count > 2,
        }
    }
}

fn split_sentences(text: &str) -> usize {
    let mut segments = 1usize;
    let mut in_separator = false;
    for c in text.chars() {
        let is_terminal = matches!(c, '.' | '!' | '?');
        if is_terminal && !in_separator {
            segments += 1;
        }
        in_separator = is_terminal;
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TextFeatureExtractor {
        TextFeatureExtractor::new().unwrap()
    }

    #[test]
    fn test_empty_input_yields_defaults() {
        let features = extractor().extract("");
        assert_eq!(features.char_count, 0);
        assert_eq!(features.word_count, 0);
        assert_eq!(features.uppercase_ratio, 0.0);
        assert_eq!(features.text_complexity, 0.0);
        assert_eq!(features.formality_ratio, 0.5);
        assert!(!features.is_long);
        assert!(features.is_short);
    }

    #[test]
    fn test_counts_and_flags() {
        let text = "Здравствуйте! Встреча 25.01.2024 в 15:00. Срочно подтвердите!";
        let features = extractor().extract(text);
        assert!(features.has_greeting);
        assert!(features.has_meeting);
        assert!(features.has_urgent);
        assert!(features.has_date);
        assert!(features.has_time);
        assert_eq!(features.exclamation_count, 2);
        assert!(!features.has_url);
    }

    #[test]
    fn test_money_and_url_detection() {
        let features = extractor().extract("Счёт на 50000 руб, детали: https://pay.example.com");
        assert!(features.has_money);
        assert!(features.has_url);
    }

    #[test]
    fn test_sentiment_scores() {
        let features = extractor().extract("Отличный сервис, всё хорошо, спасибо!");
        assert!(features.positive_score >= 2);
        assert_eq!(features.negative_score, 0);
        assert!(features.sentiment_ratio > 0.0);
    }

    #[test]
    fn test_complexity_bounded() {
        let long = "Уведомляю о необходимости предоставления документации. ".repeat(50);
        let features = extractor().extract(&long);
        assert!(features.text_complexity >= 0.0);
        assert!(features.text_complexity <= 1.0);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ex = extractor();
        let text = "Привет! Как дела? Встретимся завтра в 10:00.";
        let a = ex.extract(text);
        let b = ex.extract(text);
        assert_eq!(a, b);
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_signature_differs_for_different_text() {
        let ex = extractor();
        let a = ex.extract("Первый текст письма, достаточно длинный.");
        let b = ex.extract("Совсем другое содержание с вопросом?");
        assert_ne!(a.signature(), b.signature());
    }
}
