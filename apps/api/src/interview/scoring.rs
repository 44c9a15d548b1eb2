//! Deterministic answer scoring.
//!
//! The coefficients and keyword buckets are a compatibility contract: stored
//! reports and the standalone assess endpoint depend on them staying fixed.

use crate::interview::models::{mean_score, Evaluation, EvaluationSource};

struct TopicBucket {
    /// Substrings of the question text that select this bucket.
    triggers: &'static [&'static str],
    /// Keywords an answer should mention.
    keywords: &'static [&'static str],
}

const TOPIC_BUCKETS: [TopicBucket; 3] = [
    // Project and result oriented.
    TopicBucket {
        triggers: &["项目", "成果", "结果", "挑战", "负责", "经历"],
        keywords: &["结果", "成果", "提升", "负责", "目标", "完成", "增长"],
    },
    // User insight.
    TopicBucket {
        triggers: &["用户", "需求", "体验", "洞察", "痛点"],
        keywords: &["用户", "需求", "调研", "访谈", "痛点", "场景", "反馈"],
    },
    // Data-driven decisions.
    TopicBucket {
        triggers: &["数据", "指标", "决策", "分析", "量化"],
        keywords: &["数据", "指标", "分析", "转化", "留存", "A/B", "实验"],
    },
];

const CONNECTIVE_WORDS: &[&str] = &[
    "首先", "其次", "然后", "最后", "因此", "所以", "但是", "因为", "另外", "总之", "第一",
    "第二",
];

/// Keywords for the buckets the question selects. A question matching no
/// bucket is checked against all three.
fn relevant_keywords(question: &str) -> Vec<&'static str> {
    let selected: Vec<&TopicBucket> = TOPIC_BUCKETS
        .iter()
        .filter(|b| b.triggers.iter().any(|t| question.contains(t)))
        .collect();
    let buckets: Vec<&TopicBucket> = if selected.is_empty() {
        TOPIC_BUCKETS.iter().collect()
    } else {
        selected
    };
    buckets
        .into_iter()
        .flat_map(|b| b.keywords.iter().copied())
        .collect()
}

fn capped(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Scores an answer from its length (in characters) and keyword presence.
pub fn heuristic_evaluation(question: &str, answer: &str) -> Evaluation {
    let answer = answer.trim();
    let len = answer.chars().count() as f64;
    let has_keyword = relevant_keywords(question)
        .iter()
        .any(|k| answer.contains(k));
    let has_connective = CONNECTIVE_WORDS.iter().any(|w| answer.contains(w));

    let accuracy = capped(60.0 + 30.0 * flag(has_keyword) + (len / 50.0).min(10.0));
    let completeness = capped(50.0 + (len / 30.0).min(30.0) + 20.0 * flag(len > 100.0));
    let logic = capped(70.0 + 20.0 * flag(len > 150.0) + 10.0 * flag(has_connective));
    let communication = capped(65.0 + (len / 40.0).min(25.0) + 10.0 * flag(len > 80.0));

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut tips = Vec::new();

    if has_keyword {
        strengths.push("回答切中了问题的核心要点".to_string());
    } else {
        improvements.push("回答与问题的关联度不够，建议紧扣考察点".to_string());
        tips.push("先复述问题的核心，再给出对应的经历或观点".to_string());
    }
    if len > 100.0 {
        strengths.push("内容较为充实，细节丰富".to_string());
    } else {
        improvements.push("回答偏简短，可以补充具体事例和数据".to_string());
        tips.push("用 STAR 法则组织：情境、任务、行动、结果".to_string());
    }
    if has_connective {
        strengths.push("表达有条理，层次清晰".to_string());
    } else {
        improvements.push("可以使用“首先、其次、最后”等连接词让结构更清晰".to_string());
    }
    if tips.is_empty() {
        tips.push("尝试用量化结果收尾，让面试官记住你的贡献".to_string());
    }

    let sub_scores = [accuracy, completeness, logic, communication];
    Evaluation {
        accuracy,
        completeness,
        logic,
        communication,
        score: mean_score(sub_scores),
        strengths,
        improvements,
        tips,
        source: EvaluationSource::Heuristic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_answer_gets_base_scores() {
        let evaluation = heuristic_evaluation("介绍一个你负责的项目", "");
        assert_eq!(evaluation.sub_scores(), [60, 50, 70, 65]);
        assert_eq!(evaluation.score, 61);
    }

    #[test]
    fn test_keyword_and_connective_bonuses() {
        // 20 characters: len/50 = 0.4, len/30 ≈ 0.67, len/40 = 0.5.
        let answer = "首先我负责这个项目最终让转化提升了百分之";
        assert_eq!(answer.chars().count(), 20);
        let evaluation = heuristic_evaluation("讲讲你的项目成果", answer);
        assert_eq!(evaluation.accuracy, 90);
        assert_eq!(evaluation.completeness, 51);
        assert_eq!(evaluation.logic, 80);
        assert_eq!(evaluation.communication, 66);
        assert_eq!(evaluation.score, 72);
    }

    #[test]
    fn test_bucket_selected_by_question_text() {
        // "用户" is only a keyword of the user-insight bucket.
        let answer = "我会先访谈用户";
        assert!(heuristic_evaluation("如何洞察用户需求", answer).accuracy >= 90);
        assert!(heuristic_evaluation("你如何用数据做决策", answer).accuracy < 90);
    }

    #[test]
    fn test_long_answers_stay_within_bounds() {
        let answers = [
            String::new(),
            "数据".repeat(40),
            "首先，我们分析了用户数据。".repeat(30),
            "x".repeat(10_000),
        ];
        for answer in &answers {
            let evaluation = heuristic_evaluation("用数据驱动决策的例子", answer);
            for sub in evaluation.sub_scores() {
                assert!(sub <= 100, "sub-score {sub} out of range");
            }
            assert_eq!(evaluation.score, mean_score(evaluation.sub_scores()));
        }
    }

    #[test]
    fn test_maximum_scores() {
        let answer = format!("首先{}", "数据".repeat(600));
        let evaluation = heuristic_evaluation("数据分析", &answer);
        assert_eq!(evaluation.sub_scores(), [100, 100, 100, 100]);
        assert_eq!(evaluation.score, 100);
    }
}
