//! Grammar Analyzer: a deterministic rule engine over Bulgarian text.
//!
//! Small, pure functions over `Lazy<HashMap<...>>`/`Lazy<Regex>` lookup
//! tables, one file per rule family. `analyze` composes them and is the
//! only public entry point; nothing here ever touches I/O or global
//! mutable state.

pub mod rules;

use crate::config::L1Language;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Serious,
}

impl Severity {
    fn rank(self) -> u8 {
        match self {
            Severity::Minor => 0,
            Severity::Moderate => 1,
            Severity::Serious => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionType {
    NoInfinitive,
    DefiniteArticle,
    FutureShte,
    CliticPosition,
    Agreement,
    Case,
    Spelling,
    Vocab,
}

impl CorrectionType {
    /// Stable identifier used for tie-breaking (ties break by rule id,
    /// lexicographic).
    fn rule_id(self) -> &'static str {
        match self {
            CorrectionType::NoInfinitive => "no_infinitive",
            CorrectionType::DefiniteArticle => "definite_article",
            CorrectionType::FutureShte => "future_shte",
            CorrectionType::CliticPosition => "clitic_position",
            CorrectionType::Agreement => "agreement",
            CorrectionType::Case => "case",
            CorrectionType::Spelling => "spelling",
            CorrectionType::Vocab => "vocab",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    #[serde(rename = "type")]
    pub kind: CorrectionType,
    pub before: String,
    pub after: String,
    pub note: String,
    pub error_tag: String,
    pub severity: Severity,
    pub span: Option<Span>,
}

/// Returns the substring of `text` covered by `span`, indexed by Unicode
/// scalar value (char) offsets rather than bytes, since Cyrillic text makes
/// byte offsets an awkward public contract.
pub fn char_slice(text: &str, span: Span) -> String {
    text.chars().skip(span.start).take(span.end - span.start).collect()
}

/// Converts a byte offset (as produced by `regex::Match`) into a char
/// offset. Rule modules match on byte-indexed regexes but spans on the wire
/// are char-indexed.
pub(crate) fn byte_to_char_offset(text: &str, byte_idx: usize) -> usize {
    text.char_indices().take_while(|(b, _)| *b < byte_idx).count()
}

/// Pure function: same input always yields the same output — no randomness,
/// no global time, no I/O.
///
/// `l1` selects which contrast note the Coach Orchestrator later attaches
/// from the Content Store; it does not change which errors are reported
/// here.
pub fn analyze(text: &str, _l1: L1Language) -> Vec<Correction> {
    use unicode_normalization::UnicodeNormalization;
    let normalized: String = text.nfc().collect();

    let mut found = Vec::new();
    found.extend(rules::no_infinitive::check(&normalized));
    found.extend(rules::future_shte::check(&normalized));
    found.extend(rules::definite_article::check(&normalized));
    found.extend(rules::clitic::check(&normalized));
    found.extend(rules::misc::check(&normalized));

    resolve_conflicts(found)
}

/// If two corrections' spans overlap, keep the higher-severity one,
/// breaking ties by rule id.
fn resolve_conflicts(mut corrections: Vec<Correction>) -> Vec<Correction> {
    corrections.sort_by(|a, b| match (a.span, b.span) {
        (Some(sa), Some(sb)) => sa.start.cmp(&sb.start),
        _ => std::cmp::Ordering::Equal,
    });

    let mut kept: Vec<Correction> = Vec::new();
    for candidate in corrections {
        let conflict_idx = kept.iter().position(|existing| match (existing.span, candidate.span) {
            (Some(a), Some(b)) => a.start < b.end && b.start < a.end,
            _ => false,
        });

        match conflict_idx {
            None => kept.push(candidate),
            Some(idx) => {
                let existing = &kept[idx];
                let candidate_wins = match candidate.severity.rank().cmp(&existing.severity.rank()) {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => {
                        candidate.kind.rule_id() < existing.kind.rule_id()
                    }
                };
                if candidate_wins {
                    kept[idx] = candidate;
                }
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_sentence_has_no_corrections() {
        let result = analyze("Здравей, как си?", L1Language::Pl);
        assert!(result.is_empty());
    }

    #[test]
    fn char_slice_matches_before_invariant() {
        let corrections = analyze("Искам поръчвам кафе.", L1Language::Pl);
        for c in &corrections {
            if let Some(span) = c.span {
                assert_eq!(char_slice("Искам поръчвам кафе.", span), c.before);
            }
        }
    }

    #[test]
    fn overlapping_spans_keep_higher_severity() {
        let a = Correction {
            kind: CorrectionType::Agreement,
            before: "стол".into(),
            after: "стола".into(),
            note: String::new(),
            error_tag: String::new(),
            severity: Severity::Minor,
            span: Some(Span { start: 0, end: 4 }),
        };
        let b = Correction {
            kind: CorrectionType::DefiniteArticle,
            before: "стол".into(),
            after: "стола".into(),
            note: String::new(),
            error_tag: String::new(),
            severity: Severity::Serious,
            span: Some(Span { start: 0, end: 4 }),
        };
        let resolved = resolve_conflicts(vec![a, b]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].kind, CorrectionType::DefiniteArticle);
    }

    #[test]
    fn correction_round_trips_through_json() {
        let c = Correction {
            kind: CorrectionType::FutureShte,
            before: "ходя".into(),
            after: "ще ходя".into(),
            note: "future tense needs ще".into(),
            error_tag: "future_shte".into(),
            severity: Severity::Moderate,
            span: Some(Span { start: 5, end: 9 }),
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: Correction = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
