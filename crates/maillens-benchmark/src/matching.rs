//! Category match policy
//!
//! Benchmark truth labels rarely spell categories exactly the way a
//! classifier emits them, so scoring is lenient: beyond normalized
//! equality, a prediction counts as correct when it shares a meaningful
//! token with the truth, when both names fall into the same synonym group,
//! or when an undefined prediction meets a truth label that itself denotes
//! "undefined". `matches_strict` stays available for exact accuracy.

use aho_corasick::AhoCorasick;
use maillens_core::{Error, Result};

/// Fixed equivalence classes of category names. Every phrase is lowercase;
/// names are normalized before lookup, so the automaton needs no
/// case-folding of its own.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["деловое предложение", "коммерческое предложение", "бизнес предложение"],
    &["жалоба клиента", "претензия", "рекламация"],
    &["техническая поддержка", "техподдержка", "поддержка"],
    &["финансовый запрос", "финансы", "счёт", "оплата"],
    &["спам / реклама", "спам", "реклама", "рассылка"],
    &["hr / рекрутинг", "кадры", "рекрутинг", "вакансия"],
    &["юридическое письмо", "юридическое", "договор"],
    &["новости / анонсы", "новости", "анонс", "объявление"],
    &["маркетинг / продажи", "маркетинг", "продажи"],
    &["личное сообщение", "личное", "неформальное"],
];

/// Markers in a truth label that denote the undefined class.
const UNDEFINED_TRUTH_MARKERS: &[&str] = &["не определ", "undefined"];

/// Lenient category comparison for benchmark scoring.
pub struct CategoryMatcher {
    automaton: AhoCorasick,
    /// Synonym group index per automaton pattern, parallel to the patterns
    group_ids: Vec<usize>,
}

impl CategoryMatcher {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::new();
        let mut group_ids = Vec::new();
        for (group_id, group) in SYNONYM_GROUPS.iter().enumerate() {
            for phrase in *group {
                patterns.push(*phrase);
                group_ids.push(group_id);
            }
        }
        let automaton = AhoCorasick::new(&patterns)
            .map_err(|e| Error::internal(format!("Failed to build synonym automaton: {e}")))?;
        Ok(Self {
            automaton,
            group_ids,
        })
    }

    /// Whether a prediction counts as correct against the truth label.
    pub fn matches(&self, predicted: &str, truth: &str, is_undefined: bool) -> bool {
        let predicted = normalize(predicted);
        let truth = normalize(truth);

        if predicted == truth {
            return true;
        }
        if shares_token(&predicted, &truth) {
            return true;
        }
        if self.groups_of(&predicted) & self.groups_of(&truth) != 0 {
            return true;
        }
        is_undefined
            && UNDEFINED_TRUTH_MARKERS
                .iter()
                .any(|marker| truth.contains(marker))
    }

    /// Normalized equality only.
    pub fn matches_strict(&self, predicted: &str, truth: &str) -> bool {
        normalize(predicted) == normalize(truth)
    }

    /// Bitmask of synonym groups a normalized name touches.
    fn groups_of(&self, name: &str) -> u32 {
        let mut mask = 0u32;
        for hit in self.automaton.find_overlapping_iter(name) {
            mask |= 1 << self.group_ids[hit.pattern().as_usize()];
        }
        mask
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Any token longer than two characters appearing in both names.
fn shares_token(a: &str, b: &str) -> bool {
    let tokens_b: Vec<&str> = b
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();
    a.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .any(|w| tokens_b.contains(&w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> CategoryMatcher {
        CategoryMatcher::new().unwrap()
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let m = matcher();
        assert!(m.matches("  спам / реклама ", "Спам / Реклама", false));
        assert!(m.matches_strict("ЛИЧНОЕ СООБЩЕНИЕ", "личное сообщение"));
    }

    #[test]
    fn test_shared_token() {
        let m = matcher();
        // "спам" appears in both names
        assert!(m.matches("Спам", "Спам / Реклама", false));
        // "/" is too short to count as a shared token
        assert!(!m.matches("А / Б", "В / Г", false));
    }

    #[test]
    fn test_synonym_groups() {
        let m = matcher();
        assert!(m.matches("Деловое предложение", "коммерческое предложение", false));
        assert!(m.matches("Претензия", "Жалоба клиента", false));
        assert!(m.matches("Техподдержка", "Техническая поддержка", false));
        assert!(m.matches("Вакансия", "HR / Рекрутинг", false));
        assert!(m.matches("Оплата", "Финансовый запрос", false));
    }

    #[test]
    fn test_unrelated_categories_do_not_match() {
        let m = matcher();
        assert!(!m.matches("Спам / Реклама", "Жалоба клиента", false));
        assert!(!m.matches("Спам / Реклама", "Финансовый запрос", false));
        assert!(!m.matches("Личное сообщение", "Юридическое письмо", false));
    }

    #[test]
    fn test_undefined_prediction_matches_undefined_truth() {
        let m = matcher();
        assert!(m.matches("Маркетинг / Продажи", "Не определена", true));
        assert!(m.matches("ERROR", "undefined", true));
        // Same truth without the undefined flag is a miss
        assert!(!m.matches("Маркетинг / Продажи", "Не определена", false));
    }

    #[test]
    fn test_strict_rejects_lenient_matches() {
        let m = matcher();
        assert!(!m.matches_strict("Претензия", "Жалоба клиента"));
        assert!(!m.matches_strict("Спам", "Спам / Реклама"));
    }
}
