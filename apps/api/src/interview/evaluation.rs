//! Model-scored answers with the heuristic as fallback.

use serde::Deserialize;
use tracing::warn;

use crate::interview::models::{mean_score, Evaluation, EvaluationSource, Question, RoundType};
use crate::interview::scoring::heuristic_evaluation;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{parse_json_object, ChatMessage, Completer, CompletionOptions};

const EVALUATION_PROMPT: &str = r#"你是一位严格但友善的「{round}」面试官。请评估候选人对下面问题的回答。

问题：{question}
考察意图：{intent}
候选人回答：{answer}

从四个维度各打 0-100 分：accuracy（切题与准确）、completeness（完整）、logic（逻辑）、communication（表达）。
严格按以下 JSON 输出：
{"accuracy": 0, "completeness": 0, "logic": 0, "communication": 0, "strengths": ["亮点"], "improvements": ["不足"], "tips": ["改进建议"]}"#;

#[derive(Debug, Deserialize)]
struct ModelScores {
    accuracy: f64,
    completeness: f64,
    logic: f64,
    communication: f64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    improvements: Vec<String>,
    #[serde(default)]
    tips: Vec<String>,
}

/// Scores one answer. Never fails: provider errors and malformed scores fall
/// back to the heuristic.
pub async fn evaluate_answer(
    completer: &dyn Completer,
    options: &CompletionOptions,
    round_type: RoundType,
    question: &Question,
    answer: &str,
) -> Evaluation {
    let prompt = EVALUATION_PROMPT
        .replace("{round}", round_type.label())
        .replace("{question}", &question.text)
        .replace("{intent}", &question.tips.intent)
        .replace("{answer}", answer);
    let messages = [ChatMessage::system(JSON_ONLY_SYSTEM), ChatMessage::user(prompt)];

    match completer.complete(&messages, options).await {
        Ok(raw) => match parse_scores(&raw) {
            Some(evaluation) => evaluation,
            None => {
                warn!("Answer evaluation output was malformed, scoring heuristically");
                heuristic_evaluation(&question.text, answer)
            }
        },
        Err(e) => {
            warn!("Answer evaluation failed, scoring heuristically: {e}");
            heuristic_evaluation(&question.text, answer)
        }
    }
}

fn parse_scores(raw: &str) -> Option<Evaluation> {
    let scores: ModelScores = serde_json::from_value(parse_json_object(raw)?).ok()?;
    let clamp = |v: f64| v.round().clamp(0.0, 100.0) as u32;
    let sub_scores = [
        clamp(scores.accuracy),
        clamp(scores.completeness),
        clamp(scores.logic),
        clamp(scores.communication),
    ];
    Some(Evaluation {
        accuracy: sub_scores[0],
        completeness: sub_scores[1],
        logic: sub_scores[2],
        communication: sub_scores[3],
        score: mean_score(sub_scores),
        strengths: scores.strengths,
        improvements: scores.improvements,
        tips: scores.tips,
        source: EvaluationSource::Model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::models::QuestionTips;
    use crate::test_support::{chat_options, ScriptedCompleter};

    fn question() -> Question {
        Question::new("q_1".into(), "讲讲你的项目成果", QuestionTips::default())
    }

    #[tokio::test]
    async fn test_model_scores_are_clamped_and_averaged() {
        let completer = ScriptedCompleter::new(|_, _| {
            Ok(r#"```json
{"accuracy": 120, "completeness": 80, "logic": 70.4, "communication": -5, "strengths": ["结构清晰"]}
```"#
                .to_string())
        });
        let evaluation = evaluate_answer(
            &completer,
            &chat_options(),
            RoundType::Business,
            &question(),
            "我负责的项目让留存提升了 5%",
        )
        .await;
        assert_eq!(evaluation.source, EvaluationSource::Model);
        assert_eq!(evaluation.sub_scores(), [100, 80, 70, 0]);
        assert_eq!(evaluation.score, 63);
        assert_eq!(evaluation.strengths, vec!["结构清晰".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back_to_heuristic() {
        let completer = ScriptedCompleter::new(|_, _| Ok("这个回答不错！".to_string()));
        let answer = "我负责的项目让留存提升了 5%";
        let evaluation =
            evaluate_answer(&completer, &chat_options(), RoundType::Business, &question(), answer)
                .await;
        assert_eq!(evaluation, heuristic_evaluation("讲讲你的项目成果", answer));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_heuristic() {
        let completer = ScriptedCompleter::unavailable();
        let evaluation =
            evaluate_answer(&completer, &chat_options(), RoundType::Hr, &question(), "").await;
        assert_eq!(evaluation.source, EvaluationSource::Heuristic);
        assert_eq!(evaluation.score, 61);
    }
}
