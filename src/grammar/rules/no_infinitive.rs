//! Rule 1: no-infinitive / да+present.
//!
//! Bulgarian has no infinitive; a modal verb must be followed by `да` plus a
//! present-tense conjugated verb. Detects a modal directly followed by
//! another finite verb with no intervening `да`.

use crate::grammar::{byte_to_char_offset, Correction, CorrectionType, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MODAL_VERBS: &[&str] = &[
    "искам", "искаш", "иска", "искаме", "искате", "искат", "мога", "можеш", "може", "можем",
    "можете", "могат", "трябва", "обичам", "обичаш", "обича", "обичаме", "обичате", "обичат",
];

/// Common present-tense → да-complement mappings for verbs whose
/// conjugation class changes between the two forms (e.g. imperfective
/// `поръчвам` → perfective `поръчам`). Verbs not listed here keep their
/// surface form; only `да` is inserted.
static DA_COMPLEMENT: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("поръчвам", "поръчам");
    m.insert("поръчваш", "поръчаш");
    m.insert("купувам", "купя");
    m.insert("ходя", "отида");
    m.insert("отивам", "отида");
    m.insert("пиша", "напиша");
    m.insert("чета", "прочета");
    m
});

static MODAL_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = MODAL_VERBS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\s+(?!да\b)(\p{{L}}+)\b")).unwrap()
});

pub fn check(text: &str) -> Vec<Correction> {
    let mut out = Vec::new();

    for caps in MODAL_RE.captures_iter(text) {
        let full = caps.get(0).unwrap();
        let modal = caps.get(1).unwrap().as_str();
        let verb = caps.get(2).unwrap().as_str();

        // Skip when the "verb" is actually another modal or a conjunction —
        // a crude guard against false positives like "искам и мога".
        if MODAL_VERBS.iter().any(|m| m.eq_ignore_ascii_case(verb)) {
            continue;
        }

        let complement = DA_COMPLEMENT
            .get(verb.to_lowercase().as_str())
            .copied()
            .unwrap_or(verb);

        let before = full.as_str().to_string();
        let after = format!("{modal} да {complement}");

        let start = byte_to_char_offset(text, full.start());
        let end = byte_to_char_offset(text, full.end());

        out.push(Correction {
            kind: CorrectionType::NoInfinitive,
            before,
            after,
            note: "Bulgarian has no infinitive — use да + present tense after a modal verb.".into(),
            error_tag: "no_infinitive".into(),
            severity: Severity::Moderate,
            span: Some(Span { start, end }),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_iskam_porachvam() {
        let corrections = check("Искам поръчвам кафе.");
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.kind, CorrectionType::NoInfinitive);
        assert_eq!(c.before, "Искам поръчвам");
        assert_eq!(c.after, "Искам да поръчам");
        assert_eq!(c.severity, Severity::Moderate);
    }

    #[test]
    fn correct_usage_no_false_positive() {
        let corrections = check("Искам да поръчам кафе.");
        assert!(corrections.is_empty());
    }

    #[test]
    fn unlisted_verb_keeps_surface_form() {
        let corrections = check("Трябва работя утре.");
        assert_eq!(corrections[0].after, "Трябва да работя");
    }
}
