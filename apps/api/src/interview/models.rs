use serde::{Deserialize, Serialize};

/// The five round categories, serialized by their Chinese labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundType {
    #[serde(rename = "技术面", alias = "technical")]
    Technical,
    #[serde(rename = "业务面", alias = "business")]
    Business,
    #[serde(rename = "行为面", alias = "behavioral")]
    Behavioral,
    #[serde(rename = "HR面", alias = "hr")]
    Hr,
    #[serde(rename = "终面", alias = "final")]
    Final,
}

impl RoundType {
    pub const ALL: [RoundType; 5] = [
        RoundType::Technical,
        RoundType::Business,
        RoundType::Behavioral,
        RoundType::Hr,
        RoundType::Final,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RoundType::Technical => "技术面",
            RoundType::Business => "业务面",
            RoundType::Behavioral => "行为面",
            RoundType::Hr => "HR面",
            RoundType::Final => "终面",
        }
    }

    /// Question count used in "AI recommends" mode.
    pub fn recommended_count(&self) -> u32 {
        match self {
            RoundType::Technical => 5,
            RoundType::Business | RoundType::Behavioral => 4,
            RoundType::Hr | RoundType::Final => 3,
        }
    }
}

/// Coaching notes shown with a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTips {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub framework: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_notes: Option<String>,
    #[serde(default)]
    pub pitfalls: Vec<String>,
    #[serde(default)]
    pub pro_tips: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    #[default]
    Pending,
    Answered,
    Evaluated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationSource {
    #[default]
    Heuristic,
    Model,
}

/// Four 0–100 sub-scores and their rounded mean, plus written feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Evaluation {
    pub accuracy: u32,
    pub completeness: u32,
    pub logic: u32,
    pub communication: u32,
    pub score: u32,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub tips: Vec<String>,
    pub source: EvaluationSource,
}

impl Evaluation {
    pub fn sub_scores(&self) -> [u32; 4] {
        [self.accuracy, self.completeness, self.logic, self.communication]
    }
}

/// Rounded mean of the four sub-scores.
pub fn mean_score(sub_scores: [u32; 4]) -> u32 {
    let sum: u32 = sub_scores.iter().sum();
    (f64::from(sum) / 4.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub tips: QuestionTips,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(default)]
    pub status: QuestionStatus,
}

impl Question {
    pub fn new(id: String, text: impl Into<String>, tips: QuestionTips) -> Self {
        Self {
            id,
            text: text.into(),
            tips,
            user_answer: None,
            evaluation: None,
            status: QuestionStatus::Pending,
        }
    }
}

/// Where a live round stands. Before `start_round` (and after a round
/// completes) the client is in setup; no server state exists then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Question,
    Analysis,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRound {
    pub round_type: RoundType,
    pub total_questions: u32,
    pub current_question_index: u32,
    pub questions: Vec<Question>,
    pub completed: bool,
    pub phase: RoundPhase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_type_labels_round_trip_through_serde() {
        for round_type in RoundType::ALL {
            let json = serde_json::to_value(round_type).unwrap();
            assert_eq!(json, serde_json::json!(round_type.label()));
        }
        let parsed: RoundType = serde_json::from_str("\"technical\"").unwrap();
        assert_eq!(parsed, RoundType::Technical);
    }

    #[test]
    fn test_mean_score_rounds_half_up() {
        assert_eq!(mean_score([60, 50, 70, 65]), 61);
        assert_eq!(mean_score([61, 62, 70, 65]), 65);
        assert_eq!(mean_score([100, 100, 100, 100]), 100);
    }

    #[test]
    fn test_evaluation_decodes_partial_json() {
        let evaluation: Evaluation = serde_json::from_str(r#"{"score": 80}"#).unwrap();
        assert_eq!(evaluation.score, 80);
        assert_eq!(evaluation.source, EvaluationSource::Heuristic);
    }
}
