//! Email text cleaning and sanitization
//!
//! These are total functions: any input string, including empty text,
//! produces a well-formed output.

/// Lines containing any of these markers are treated as signatures or
/// contact blocks and dropped during cleaning.
const SIGNATURE_MARKERS: &[&str] = &[
    "с уважением",
    "best regards",
    "kind regards",
    "sincerely",
    "искренне ваш",
    "спасибо",
    "thank you",
    "thanks",
    "sent from",
    "отправлено с",
    "дата:",
    "date:",
    "тел.",
    "phone:",
    "email:",
    "e-mail:",
    "confidential",
    "конфиденциально",
];

/// Markers of machine-generated boilerplate lines.
const AUTO_GENERATED_MARKERS: &[&str] = &[
    "автоматически сгенерирован",
    "auto-generated",
    "не отвечайте на это письмо",
    "do not reply",
];

/// Strip signatures, contact blocks, and auto-generated boilerplate from
/// email body text. Used before registering few-shot examples so the
/// representative embedding reflects the message, not the footer.
pub fn clean_email_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut clean_lines = Vec::new();
    for line in text.lines() {
        let line_lower = line.trim().to_lowercase();

        if SIGNATURE_MARKERS.iter().any(|m| line_lower.contains(m)) {
            continue;
        }
        if AUTO_GENERATED_MARKERS.iter().any(|m| line_lower.contains(m)) {
            continue;
        }
        if !line.trim().is_empty() {
            clean_lines.push(line);
        }
    }

    clean_lines.join("\n")
}

/// Truncate input to at most `max_chars` characters.
///
/// Truncation is on character boundaries so multi-byte input never splits
/// mid-codepoint.
pub fn sanitize(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Dominant script of a text, used for display and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ru,
    En,
    Mixed,
    Unknown,
}

/// Detect the dominant script by counting Cyrillic vs Latin letters.
pub fn detect_language(text: &str) -> Language {
    let mut ru = 0usize;
    let mut en = 0usize;

    for c in text.chars() {
        if ('а'..='я').contains(&c) || ('А'..='Я').contains(&c) || c == 'ё' || c == 'Ё' {
            ru += 1;
        } else if c.is_ascii_alphabetic() {
            en += 1;
        }
    }

    match (ru, en) {
        (0, 0) => Language::Unknown,
        (r, e) if r > e => Language::Ru,
        (r, e) if e > r => Language::En,
        _ => Language::Mixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_drops_signature_lines() {
        let text = "Добрый день!\nПредлагаем сотрудничество.\nС уважением,\nИван Петров";
        let cleaned = clean_email_text(text);
        assert!(cleaned.contains("Предлагаем сотрудничество."));
        assert!(!cleaned.to_lowercase().contains("с уважением"));
    }

    #[test]
    fn test_clean_drops_auto_generated() {
        let text = "Hello\nThis message was auto-generated, do not reply\nBye";
        let cleaned = clean_email_text(text);
        assert!(!cleaned.contains("auto-generated"));
        assert!(cleaned.contains("Hello"));
    }

    #[test]
    fn test_clean_empty_input() {
        assert_eq!(clean_email_text(""), "");
    }

    #[test]
    fn test_sanitize_char_boundaries() {
        let text = "привет мир";
        assert_eq!(sanitize(text, 6), "привет");
        assert_eq!(sanitize(text, 100), text);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Привет, как дела?"), Language::Ru);
        assert_eq!(detect_language("Hello there"), Language::En);
        assert_eq!(detect_language("12345 !!!"), Language::Unknown);
    }
}
