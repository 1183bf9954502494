//! Rule 5: agreement / case / spelling / vocabulary.
//!
//! Smaller, lower-severity rules. Each is a static lookup table — a direct
//! wrong-form → right-form mapping rather than a generative rule, since
//! these categories are long tails of one-off learner mistakes rather than
//! a handful of productive patterns.

use crate::grammar::{byte_to_char_offset, Correction, CorrectionType, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Common spelling confusions among learners (ъ/а, gender-marking typos).
static SPELLING_FIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("блъгарин", "българин");
    m.insert("телефом", "телефон");
    m.insert("магазим", "магазин");
    m.insert("извеняввам", "извинявам");
    m
});

/// False friends: words that look similar across Slavic L1s but mean
/// something different or unidiomatic in Bulgarian.
static VOCAB_FIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("склеп", "хладилник");
    m.insert("диван", "канапе");
    m
});

/// Adjective-noun gender agreement: a small set of adjectives whose
/// masculine form is commonly left unagreed before a feminine noun.
static AGREEMENT_PAIRS: &[(&str, &str, &str)] = &[
    ("добър", "жена", "добра"),
    ("хубав", "книга", "хубава"),
    ("малък", "къща", "малка"),
];

fn lookup_word_re(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).unwrap()
}

pub fn check(text: &str) -> Vec<Correction> {
    let mut out = Vec::new();

    for (wrong, right) in SPELLING_FIXES.iter() {
        if let Some(m) = lookup_word_re(wrong).find(text) {
            out.push(Correction {
                kind: CorrectionType::Spelling,
                before: m.as_str().to_string(),
                after: right.to_string(),
                note: "Common spelling slip.".into(),
                error_tag: "spelling".into(),
                severity: Severity::Minor,
                span: Some(Span {
                    start: byte_to_char_offset(text, m.start()),
                    end: byte_to_char_offset(text, m.end()),
                }),
            });
        }
    }

    for (wrong, right) in VOCAB_FIXES.iter() {
        if let Some(m) = lookup_word_re(wrong).find(text) {
            out.push(Correction {
                kind: CorrectionType::Vocab,
                before: m.as_str().to_string(),
                after: right.to_string(),
                note: "Not the idiomatic Bulgarian word for this.".into(),
                error_tag: "vocab".into(),
                severity: Severity::Minor,
                span: Some(Span {
                    start: byte_to_char_offset(text, m.start()),
                    end: byte_to_char_offset(text, m.end()),
                }),
            });
        }
    }

    for (adj, noun, agreed) in AGREEMENT_PAIRS {
        let pattern = Regex::new(&format!(r"(?i)\b{}\s+{}\b", regex::escape(adj), regex::escape(noun))).unwrap();
        if let Some(m) = pattern.find(text) {
            out.push(Correction {
                kind: CorrectionType::Agreement,
                before: m.as_str().to_string(),
                after: format!("{agreed} {noun}"),
                note: "The adjective must agree with the noun's gender.".into(),
                error_tag: "agreement".into(),
                severity: Severity::Minor,
                span: Some(Span {
                    start: byte_to_char_offset(text, m.start()),
                    end: byte_to_char_offset(text, m.end()),
                }),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_spelling_slip() {
        let corrections = check("Аз съм блъгарин.");
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].kind, CorrectionType::Spelling);
        assert_eq!(corrections[0].after, "българин");
    }

    #[test]
    fn detects_false_friend_vocab() {
        let corrections = check("Сложи го в склеп.");
        assert_eq!(corrections[0].kind, CorrectionType::Vocab);
    }

    #[test]
    fn detects_gender_disagreement() {
        let corrections = check("Това е добър жена.");
        assert_eq!(corrections[0].kind, CorrectionType::Agreement);
        assert_eq!(corrections[0].after, "добра жена");
    }

    #[test]
    fn clean_text_has_no_misc_corrections() {
        assert!(check("Добра книга.").is_empty());
    }
}
