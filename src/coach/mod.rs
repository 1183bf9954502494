//! Coach Orchestrator: composes the grammar analyzer, chat provider,
//! and content lookup into one payload per final transcript.

use crate::chat::{complete_with_retry, ChatMessage, ChatProvider};
use crate::content::{ContentStore, Drill, Level};
use crate::grammar::{Correction, Severity};
use serde::{Deserialize, Serialize};

const FALLBACK_REPLY: &str = "Разбрах. Нека опитаме отново.";
const MAX_DRILLS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachPayload {
    pub turn_seq: u64,
    pub reply_bg: String,
    pub corrections: Vec<Correction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrastive_note: Option<String>,
    pub drills: Vec<DrillView>,
}

/// Wire projection of `content::Drill` — drops `grammar_id`, which is an
/// internal lookup key the client never needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillView {
    pub id: String,
    pub prompt_bg: String,
    pub answer_bg: String,
    #[serde(rename = "type")]
    pub kind: crate::content::DrillType,
    pub level: Level,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&Drill> for DrillView {
    fn from(d: &Drill) -> Self {
        Self {
            id: d.id.clone(),
            prompt_bg: d.prompt_bg.clone(),
            answer_bg: d.answer_bg.clone(),
            kind: d.kind,
            level: d.level,
            hint: d.hint.clone(),
        }
    }
}

fn top_correction(corrections: &[Correction]) -> Option<&Correction> {
    corrections.iter().max_by(|a, b| {
        severity_rank(a.severity)
            .cmp(&severity_rank(b.severity))
            .then_with(|| a.before.len().cmp(&b.before.len()))
    })
}

fn severity_rank(s: Severity) -> u8 {
    match s {
        Severity::Minor => 0,
        Severity::Moderate => 1,
        Severity::Serious => 2,
    }
}

fn free_conversation_system_prompt() -> String {
    "Ти си приятелски учител по български език. Отговори кратко и естествено на ученика, \
     без да коригираш граматика в този отговор."
        .to_string()
}

fn correction_system_prompt(
    final_text: &str,
    correction: &Correction,
    micro_explanation: &str,
    contrast_note: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Ученикът каза: \"{final_text}\". Той направи грешка: \"{}\" вместо \"{}\". {}",
        correction.before, correction.after, micro_explanation
    );
    if let Some(note) = contrast_note {
        prompt.push_str(&format!(" Съпоставка с родния му език: {note}"));
    }
    prompt.push_str(
        " Отговори естествено на съдържанието първо, после кратко спомени поправката.",
    );
    prompt
}

pub struct CoachOrchestrator<'a> {
    content: &'a ContentStore,
    l1_code: &'static str,
    learner_level: Level,
}

impl<'a> CoachOrchestrator<'a> {
    pub fn new(content: &'a ContentStore, l1_code: &'static str, learner_level: Level) -> Self {
        Self {
            content,
            l1_code,
            learner_level,
        }
    }

    /// Compose and emit exactly one `CoachPayload` for this final transcript;
    /// the client must always receive exactly one Coach event per Final.
    pub async fn compose(
        &self,
        turn_seq: u64,
        final_text: &str,
        corrections: Vec<Correction>,
        chat: &dyn ChatProvider,
    ) -> CoachPayload {
        if corrections.is_empty() {
            return self.free_conversation(turn_seq, final_text, chat).await;
        }

        let top = top_correction(&corrections).cloned().expect("non-empty corrections");
        let grammar_item = self.content.grammar_item_for_rule(top.error_tag.as_str());

        let micro_explanation = grammar_item
            .map(|g| g.micro_explanation_bg.as_str())
            .unwrap_or("");
        let contrast_note = grammar_item.and_then(|g| g.contrast_notes.get(self.l1_code)).map(String::as_str);

        let system_prompt = correction_system_prompt(final_text, &top, micro_explanation, contrast_note);
        let messages = [ChatMessage {
            role: "user",
            content: final_text.to_string(),
        }];

        let reply = match complete_with_retry(chat, &messages, &system_prompt, 200).await {
            Ok(text) => text,
            Err(_) => FALLBACK_REPLY.to_string(),
        };

        let drills = grammar_item
            .map(|g| {
                self.content
                    .drills_for(&g.id, self.learner_level)
                    .into_iter()
                    .take(MAX_DRILLS)
                    .map(DrillView::from)
                    .collect()
            })
            .unwrap_or_default();

        CoachPayload {
            turn_seq,
            reply_bg: reply,
            corrections,
            contrastive_note: contrast_note.map(str::to_string),
            drills,
        }
    }

    async fn free_conversation(
        &self,
        turn_seq: u64,
        final_text: &str,
        chat: &dyn ChatProvider,
    ) -> CoachPayload {
        let system_prompt = free_conversation_system_prompt();
        let messages = [ChatMessage {
            role: "user",
            content: final_text.to_string(),
        }];

        let reply = match complete_with_retry(chat, &messages, &system_prompt, 150).await {
            Ok(text) => text,
            Err(_) => FALLBACK_REPLY.to_string(),
        };

        CoachPayload {
            turn_seq,
            reply_bg: reply,
            corrections: Vec::new(),
            contrastive_note: None,
            drills: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::DummyChat;
    use crate::grammar::{CorrectionType, Span};
    use std::path::Path;

    fn store() -> ContentStore {
        ContentStore::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("content").as_path())
            .expect("content pack must load for tests")
    }

    #[tokio::test]
    async fn free_conversation_when_no_corrections() {
        let content = store();
        let orch = CoachOrchestrator::new(&content, "PL", Level::B1);
        let chat = DummyChat::new();
        let payload = orch.compose(1, "Здравей, как си?", vec![], &chat).await;
        assert!(payload.corrections.is_empty());
        assert!(payload.drills.is_empty());
        assert!(!payload.reply_bg.is_empty());
    }

    #[tokio::test]
    async fn correction_path_attaches_drills_and_contrast_note() {
        let content = store();
        let orch = CoachOrchestrator::new(&content, "PL", Level::B1);
        let chat = DummyChat::new();

        let correction = Correction {
            kind: CorrectionType::FutureShte,
            before: "ходя".into(),
            after: "ще ходя".into(),
            note: String::new(),
            error_tag: "future_shte".into(),
            severity: Severity::Moderate,
            span: Some(Span { start: 5, end: 9 }),
        };

        let payload = orch
            .compose(2, "Утре ходя на работа.", vec![correction], &chat)
            .await;

        assert_eq!(payload.corrections.len(), 1);
        assert!(!payload.drills.is_empty());
        assert!(payload.contrastive_note.is_some());
    }

    #[tokio::test]
    async fn always_emits_fallback_on_fatal_chat_error() {
        use crate::chat::{ChatError, ChatMessage as Msg, ChatProvider};
        use async_trait::async_trait;

        struct AlwaysFails;
        #[async_trait]
        impl ChatProvider for AlwaysFails {
            fn name(&self) -> &'static str {
                "always_fails"
            }
            async fn complete(&self, _m: &[Msg], _s: &str, _t: u32) -> Result<String, ChatError> {
                Err(ChatError::Fatal("down".into()))
            }
        }

        let content = store();
        let orch = CoachOrchestrator::new(&content, "PL", Level::B1);
        let chat = AlwaysFails;
        let payload = orch.compose(3, "Здравей", vec![], &chat).await;
        assert_eq!(payload.reply_bg, FALLBACK_REPLY);
    }
}
