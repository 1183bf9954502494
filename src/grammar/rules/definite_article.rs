//! Rule 2: postposed definite article.
//!
//! Bulgarian marks definiteness with a suffix, not a separate word. Detects
//! a bare noun in a context that demands definiteness — here, directly
//! following one of a small set of deictic verbs, with no preceding
//! indefinite article — and suggests the correct definite form.
//!
//! A small static lookup table (indefinite → definite) sidesteps guessing
//! gender from spelling — which Bulgarian doesn't expose reliably on the
//! surface form — and, as a side effect, means an already-definite noun
//! simply isn't a key in the table, so it's never miscorrected.

use crate::grammar::{byte_to_char_offset, Correction, CorrectionType, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static DEICTIC_VERBS: &[&str] = &["виждам", "намирам", "купувам", "взимам", "донасям"];

/// Indefinite → definite (short/oblique, object-position form) for common
/// A2/B1 scenario vocabulary.
static DEFINITE_FORMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("стол", "стола");
    m.insert("маса", "масата");
    m.insert("прозорец", "прозореца");
    m.insert("ключ", "ключа");
    m.insert("вестник", "вестника");
    m.insert("дете", "детето");
    m.insert("кафе", "кафето");
    m.insert("книга", "книгата");
    m.insert("телефон", "телефона");
    m.insert("чадър", "чадъра");
    m
});

static TRIGGER_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = DEICTIC_VERBS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\s+(\p{{L}}+)\s*\.?$")).unwrap()
});

pub fn check(text: &str) -> Vec<Correction> {
    let mut out = Vec::new();

    for sentence in text.split(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let lower = sentence.to_lowercase();
        if lower.contains("един ") || lower.contains("една ") || lower.contains("едно ") {
            continue;
        }

        let Some(caps) = TRIGGER_RE.captures(sentence) else {
            continue;
        };
        let noun_match = caps.get(2).unwrap();
        let noun = noun_match.as_str();

        let Some(&definite) = DEFINITE_FORMS.get(noun.to_lowercase().as_str()) else {
            continue;
        };

        let offset_in_text = text.find(sentence).unwrap_or(0);
        let abs_start = offset_in_text + noun_match.start();
        let abs_end = offset_in_text + noun_match.end();

        out.push(Correction {
            kind: CorrectionType::DefiniteArticle,
            before: noun.to_string(),
            after: definite.to_string(),
            note: "The object refers to a specific, identifiable thing — use the definite suffix.".into(),
            error_tag: "definite_article".into(),
            severity: Severity::Serious,
            span: Some(Span {
                start: byte_to_char_offset(text, abs_start),
                end: byte_to_char_offset(text, abs_end),
            }),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_vizhdam_stol() {
        let corrections = check("Виждам стол.");
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.kind, CorrectionType::DefiniteArticle);
        assert_eq!(c.before, "стол");
        assert_eq!(c.after, "стола");
        assert_eq!(c.severity, Severity::Serious);
    }

    #[test]
    fn indefinite_article_present_is_fine() {
        assert!(check("Виждам един стол.").is_empty());
    }

    #[test]
    fn already_definite_is_not_in_table() {
        assert!(check("Виждам стола.").is_empty());
    }

    #[test]
    fn feminine_noun_gets_ta_suffix() {
        let corrections = check("Купувам маса.");
        assert_eq!(corrections[0].after, "масата");
    }

    #[test]
    fn unknown_noun_is_skipped() {
        assert!(check("Виждам бисквитка.").is_empty());
    }
}
