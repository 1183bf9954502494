//! Content Store: in-memory, startup-loaded grammar pack and
//! scenarios, read-only lookup by id for the rest of the process lifetime.
//!
//! Loaded once in `main` before the HTTP surface reports `ready`, then
//! shared as a plain `Arc<ContentStore>` — no lock needed since nothing
//! ever mutates it after `load()` returns: immutable after startup,
//! shared read-only, lock-free.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub use crate::error::ContentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillType {
    Transform,
    Fill,
    Choice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    A2,
    B1,
    B2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drill {
    pub id: String,
    pub grammar_id: String,
    pub prompt_bg: String,
    pub answer_bg: String,
    #[serde(rename = "type")]
    pub kind: DrillType,
    pub level: Level,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarItem {
    pub id: String,
    pub title_bg: String,
    pub micro_explanation_bg: String,
    #[serde(default)]
    pub examples: Vec<String>,
    /// L1 language code (`PL`, `RU`, `UK`, `SR`) → contrast note text.
    #[serde(default)]
    pub contrast_notes: HashMap<String, String>,
    #[serde(default)]
    pub drills: Vec<Drill>,
    /// Rule ids (see `crate::grammar::CorrectionType`) this item explains.
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub title_bg: String,
    #[serde(default)]
    pub grammar_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GrammarPackFile {
    items: Vec<GrammarItem>,
}

#[derive(Debug, Deserialize)]
struct ScenarioPackFile {
    scenarios: Vec<Scenario>,
}

pub struct ContentStore {
    grammar_items: HashMap<String, GrammarItem>,
    scenarios: Vec<Scenario>,
}

impl ContentStore {
    pub fn load(dir: &Path) -> Result<Self, ContentError> {
        let grammar_path = dir.join("bg_grammar_pack.json");
        let scenarios_path = dir.join("bg_scenarios_with_grammar.json");

        let grammar_pack: GrammarPackFile = read_json(&grammar_path)?;
        let scenario_pack: ScenarioPackFile = read_json(&scenarios_path)?;

        let grammar_items = grammar_pack
            .items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();

        Ok(Self {
            grammar_items,
            scenarios: scenario_pack.scenarios,
        })
    }

    pub fn grammar_item(&self, id: &str) -> Option<&GrammarItem> {
        self.grammar_items.get(id)
    }

    /// Finds the grammar item whose `triggers` list names this rule id
    /// (e.g. `"future_shte"`), used by the Coach Orchestrator to look up
    /// the explanation for a reported `Correction`.
    pub fn grammar_item_for_rule(&self, rule_id: &str) -> Option<&GrammarItem> {
        self.grammar_items
            .values()
            .find(|item| item.triggers.iter().any(|t| t == rule_id))
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Drills for a grammar item at or below the learner's level: the
    /// highest level ≤ the user's level.
    pub fn drills_for(&self, grammar_id: &str, max_level: Level) -> Vec<&Drill> {
        let Some(item) = self.grammar_item(grammar_id) else {
            return Vec::new();
        };
        let mut eligible: Vec<&Drill> = item.drills.iter().filter(|d| d.level <= max_level).collect();
        eligible.sort_by(|a, b| b.level.cmp(&a.level));
        eligible
    }

    pub fn len(&self) -> usize {
        self.grammar_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammar_items.is_empty()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ContentError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| ContentError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path) {
        let grammar = serde_json::json!({
            "items": [{
                "id": "future_shte",
                "title_bg": "Бъдеще време с ще",
                "micro_explanation_bg": "Добави ще пред глагола.",
                "examples": ["Утре ще ходя на работа."],
                "contrast_notes": {"PL": "W polskim czas przyszly..."},
                "drills": [{
                    "id": "drill-1",
                    "grammar_id": "future_shte",
                    "prompt_bg": "___ ходя на работа утре.",
                    "answer_bg": "Ще",
                    "type": "fill",
                    "level": "A2",
                    "hint": null
                }],
                "triggers": ["future_shte"]
            }]
        });
        let scenarios = serde_json::json!({"scenarios": [{"id": "cafe", "title_bg": "В кафенето", "grammar_ids": ["future_shte"]}]});

        std::fs::File::create(dir.join("bg_grammar_pack.json"))
            .unwrap()
            .write_all(grammar.to_string().as_bytes())
            .unwrap();
        std::fs::File::create(dir.join("bg_scenarios_with_grammar.json"))
            .unwrap()
            .write_all(scenarios.to_string().as_bytes())
            .unwrap();
    }

    #[test]
    fn loads_and_looks_up_by_id() {
        let dir = std::env::temp_dir().join(format!("bg-coach-content-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_fixture(&dir);

        let store = ContentStore::load(&dir).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.grammar_item("future_shte").is_some());
        assert!(store.grammar_item_for_rule("future_shte").is_some());
        assert_eq!(store.scenarios().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_content_error() {
        let dir = std::env::temp_dir().join("bg-coach-content-test-missing");
        std::fs::create_dir_all(&dir).ok();
        let result = ContentStore::load(&dir);
        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
