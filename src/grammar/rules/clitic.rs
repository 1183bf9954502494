//! Rule 4: clitic positioning.
//!
//! Short unstressed pronouns/particles (clitics) can't stand at the start of
//! a sentence, and must follow — not precede — the negator `не`.

use crate::grammar::{byte_to_char_offset, Correction, CorrectionType, Severity, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static CLITICS: &[&str] = &["се", "си", "ми", "ти", "му", "ни", "ви", "им", "го", "я", "ги"];

static SENTENCE_INITIAL_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = CLITICS.join("|");
    Regex::new(&format!(r"(?i)^\s*({alternation})\b\s+(\p{{L}}+)")).unwrap()
});

static BEFORE_NE_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = CLITICS.join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\s+(не)\b")).unwrap()
});

pub fn check(text: &str) -> Vec<Correction> {
    let mut out = Vec::new();

    for sentence in text.split(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let offset_in_text = text.find(sentence).unwrap_or(0);

        if let Some(caps) = SENTENCE_INITIAL_RE.captures(sentence) {
            let full = caps.get(0).unwrap();
            let clitic = caps.get(1).unwrap().as_str();
            let verb = caps.get(2).unwrap().as_str();

            let before = full.as_str().to_string();
            let after = format!("{verb} {clitic}");
            let abs_start = offset_in_text + full.start();
            let abs_end = offset_in_text + full.end();

            out.push(Correction {
                kind: CorrectionType::CliticPosition,
                before,
                after,
                note: "A clitic pronoun can't open a sentence — it follows the verb.".into(),
                error_tag: "clitic_position".into(),
                severity: Severity::Moderate,
                span: Some(Span {
                    start: byte_to_char_offset(text, abs_start),
                    end: byte_to_char_offset(text, abs_end),
                }),
            });
        }

        if let Some(caps) = BEFORE_NE_RE.captures(sentence) {
            let full = caps.get(0).unwrap();
            let clitic = caps.get(1).unwrap().as_str();

            let before = full.as_str().to_string();
            let after = format!("не {clitic}");
            let abs_start = offset_in_text + full.start();
            let abs_end = offset_in_text + full.end();

            out.push(Correction {
                kind: CorrectionType::CliticPosition,
                before,
                after,
                note: "The clitic follows не, not the other way around.".into(),
                error_tag: "clitic_position".into(),
                severity: Severity::Moderate,
                span: Some(Span {
                    start: byte_to_char_offset(text, abs_start),
                    end: byte_to_char_offset(text, abs_end),
                }),
            });
        }
    }

    out
}
