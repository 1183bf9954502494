//! Rule 3: future with ще.
//!
//! A bare present-tense verb near a future time adverbial should be
//! prefixed with `ще`.

use crate::grammar::{byte_to_char_offset, Correction, CorrectionType, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static FUTURE_ADVERBIALS: &[&str] = &[
    "утре", "довечера", "скоро", "после", "по-късно", "следващата седмица", "следващия месец",
];

/// Matches a future adverbial followed (anywhere later in the sentence, not
/// necessarily adjacent) by a bare present-tense verb not already preceded
/// by `ще`.
static VERB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\p{L}+)(ам|ям|а|я|им|им|ем|иш|еш)\b").unwrap());

pub fn check(text: &str) -> Vec<Correction> {
    let mut out = Vec::new();

    let lower = text.to_lowercase();
    let has_future_adverbial = FUTURE_ADVERBIALS.iter().any(|adv| lower.contains(adv));
    if !has_future_adverbial {
        return out;
    }

    for caps in VERB_RE.captures_iter(text) {
        let full = caps.get(0).unwrap();
        let word = full.as_str();

        // Already future-marked or not actually a verb-shaped word we trust.
        let preceding = &text[..full.start()];
        if preceding.trim_end().to_lowercase().ends_with("ще") {
            continue;
        }
        // Skip the adverbials themselves and short function words.
        if FUTURE_ADVERBIALS.iter().any(|a| a.eq_ignore_ascii_case(word)) || word.chars().count() < 3 {
            continue;
        }

        let start = byte_to_char_offset(text, full.start());
        let end = byte_to_char_offset(text, full.end());

        out.push(Correction {
            kind: CorrectionType::FutureShte,
            before: word.to_string(),
            after: format!("ще {word}"),
            note: "Future actions need ще before the present-tense verb.".into(),
            error_tag: "future_shte".into(),
            severity: Severity::Moderate,
            span: Some(Span { start, end }),
        });
        // One correction per sentence is enough for this heuristic pass.
        break;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_utre_hodya() {
        let corrections = check("Утре ходя на работа.");
        assert_eq!(corrections.len(), 1);
        let c = &corrections[0];
        assert_eq!(c.kind, CorrectionType::FutureShte);
        assert_eq!(c.before, "ходя");
        assert_eq!(c.after, "ще ходя");
    }

    #[test]
    fn no_adverbial_no_correction() {
        assert!(check("Аз ходя на работа.").is_empty());
    }

    #[test]
    fn already_marked_with_shte_is_fine() {
        assert!(check("Утре ще ходя на работа.").is_empty());
    }
}
