use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conversation::models::{Message, MessageRole};
use crate::stages::Stage;

/// Per-stage transcripts. Each stage's model only ever sees its own list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTranscripts(BTreeMap<Stage, Vec<Message>>);

impl StageTranscripts {
    pub fn extend(&mut self, stage: Stage, messages: impl IntoIterator<Item = Message>) {
        self.0.entry(stage).or_default().extend(messages);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn get(&self, stage: Stage) -> &[Message] {
        self.0.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cross-stage view: stages in their fixed order, each non-empty transcript
    /// preceded by a boundary marker. Pure; the same input gives the same output.
    pub fn all_history(&self) -> Vec<Message> {
        let mut all = Vec::new();
        for stage in Stage::ALL {
            let messages = self.get(stage);
            if messages.is_empty() {
                continue;
            }
            all.push(stage_marker(stage, messages[0].timestamp));
            all.extend(messages.iter().cloned());
        }
        all
    }
}

fn stage_marker(stage: Stage, timestamp: i64) -> Message {
    Message {
        id: format!("stage_boundary_{}", stage.id()),
        role: MessageRole::System,
        content: format!("[阶段：{}]", stage.display_name()),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_history_orders_by_stage_with_markers() {
        let mut transcripts = StageTranscripts::default();
        // Inserted out of stage order on purpose.
        transcripts.extend(Stage::SalaryTalk, [Message::user("期望 30k")]);
        transcripts.extend(Stage::CareerPlanning, [Message::user("我想做产品")]);
        transcripts.extend(Stage::CareerPlanning, [Message::assistant("好的")]);

        let all = transcripts.all_history();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, "stage_boundary_career_planning");
        assert_eq!(all[0].role, MessageRole::System);
        assert_eq!(all[1].content, "我想做产品");
        assert_eq!(all[3].id, "stage_boundary_salary_talk");
        assert_eq!(all[4].content, "期望 30k");
        assert_eq!(all, transcripts.all_history());
    }

    #[test]
    fn test_transcripts_are_independent() {
        let mut transcripts = StageTranscripts::default();
        transcripts.extend(
            Stage::Interview,
            vec![Message::user("a"), Message::assistant("b")],
        );
        assert_eq!(transcripts.get(Stage::Interview).len(), 2);
        assert!(transcripts.get(Stage::Offer).is_empty());
    }

    #[test]
    fn test_serializes_as_map_keyed_by_stage_id() {
        let mut transcripts = StageTranscripts::default();
        transcripts.extend(Stage::Offer, [Message::user("x")]);
        let json = serde_json::to_value(&transcripts).unwrap();
        assert!(json.get("offer").is_some());
    }
}
