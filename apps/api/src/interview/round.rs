//! Interview round state machine: question → analysis → (question | completed).

use thiserror::Error;

use crate::interview::models::{
    Evaluation, InterviewRound, Question, QuestionStatus, RoundPhase, RoundType,
};
use crate::whiteboard::models::{InterviewReport, ReportQuestion};

const REPORT_LIST_LIMIT: usize = 3;

/// Indexed like `Evaluation::sub_scores`.
const DIMENSION_ADVICE: [&str; 4] = [
    "回答前先明确考察点，确保每个回答都紧扣问题",
    "用 STAR 法则补全情境、行动与结果，避免只讲一半",
    "先给结论再分点展开，用“首先、其次、最后”串联",
    "控制语速与篇幅，多用具体数据和例子增强说服力",
];

#[derive(Debug, Error, PartialEq)]
pub enum RoundError {
    #[error("The round has no questions")]
    NoQuestions,

    #[error("The round is already completed")]
    AlreadyCompleted,

    #[error("Answer cannot be empty")]
    EmptyAnswer,

    #[error("The current question has already been answered")]
    AlreadyAnswered,

    #[error("The current question has not been answered yet")]
    NotAnswered,

    #[error("The current question has not been evaluated yet")]
    NotEvaluated,

    #[error("No more questions in this round")]
    NoMoreQuestions,

    #[error("No question in this round has been evaluated")]
    NothingToReport,
}

impl InterviewRound {
    pub fn start(round_type: RoundType, questions: Vec<Question>) -> Result<Self, RoundError> {
        if questions.is_empty() {
            return Err(RoundError::NoQuestions);
        }
        Ok(Self {
            round_type,
            total_questions: questions.len() as u32,
            current_question_index: 0,
            questions,
            completed: false,
            phase: RoundPhase::Question,
        })
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index as usize)
    }

    fn current_mut(&mut self) -> Result<&mut Question, RoundError> {
        if self.completed {
            return Err(RoundError::AlreadyCompleted);
        }
        let index = self.current_question_index as usize;
        self.questions.get_mut(index).ok_or(RoundError::NoQuestions)
    }

    /// Records the answer to the current question.
    pub fn submit_answer(&mut self, answer: &str) -> Result<&Question, RoundError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RoundError::EmptyAnswer);
        }
        let question = self.current_mut()?;
        if question.status != QuestionStatus::Pending {
            return Err(RoundError::AlreadyAnswered);
        }
        question.user_answer = Some(answer.to_string());
        question.status = QuestionStatus::Answered;
        Ok(question)
    }

    /// Attaches the evaluation to the answered current question and moves to analysis.
    pub fn record_evaluation(&mut self, evaluation: Evaluation) -> Result<(), RoundError> {
        let question = self.current_mut()?;
        if question.status != QuestionStatus::Answered {
            return Err(RoundError::NotAnswered);
        }
        question.evaluation = Some(evaluation);
        question.status = QuestionStatus::Evaluated;
        self.phase = RoundPhase::Analysis;
        Ok(())
    }

    pub fn has_more(&self) -> bool {
        self.current_question_index + 1 < self.total_questions
    }

    /// Moves from analysis to the next question.
    pub fn advance(&mut self) -> Result<&Question, RoundError> {
        let question = self.current_mut()?;
        if question.status != QuestionStatus::Evaluated {
            return Err(RoundError::NotEvaluated);
        }
        if !self.has_more() {
            return Err(RoundError::NoMoreQuestions);
        }
        self.current_question_index += 1;
        self.phase = RoundPhase::Question;
        self.current_question().ok_or(RoundError::NoMoreQuestions)
    }

    /// Completes the round and summarizes its evaluated questions. A round may
    /// be finished early; unanswered questions are left out of the report.
    pub fn finalize(&mut self, epoch_ms: i64, created_at: &str) -> Result<InterviewReport, RoundError> {
        if self.completed {
            return Err(RoundError::AlreadyCompleted);
        }
        let evaluated: Vec<(&Question, &Evaluation)> = self
            .questions
            .iter()
            .filter_map(|q| q.evaluation.as_ref().map(|e| (q, e)))
            .collect();
        if evaluated.is_empty() {
            return Err(RoundError::NothingToReport);
        }

        let overall_score = {
            let total: u32 = evaluated.iter().map(|(_, e)| e.score).sum();
            (f64::from(total) / evaluated.len() as f64).round() as u32
        };
        let strengths = collect_unique(evaluated.iter().flat_map(|(_, e)| &e.strengths));
        let improvements = collect_unique(evaluated.iter().flat_map(|(_, e)| &e.improvements));
        let suggestions = suggestions_for(evaluated.iter().map(|(_, e)| *e));

        let report = InterviewReport {
            id: format!("report_{epoch_ms}_0"),
            round: self.round_type.label().to_string(),
            question_count: evaluated.len() as u32,
            questions: evaluated
                .iter()
                .map(|(q, e)| ReportQuestion {
                    question: q.text.clone(),
                    user_answer: q.user_answer.clone().unwrap_or_default(),
                    evaluation: Some((*e).clone()),
                })
                .collect(),
            overall_score,
            strengths,
            improvements,
            suggestions,
            created_at: Some(created_at.to_string()),
        };

        self.completed = true;
        self.phase = RoundPhase::Completed;
        Ok(report)
    }
}

fn collect_unique<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for item in items {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
        if unique.len() == REPORT_LIST_LIMIT {
            break;
        }
    }
    unique
}

/// One suggestion per dimension whose average is the round's weakest, plus
/// any dimension averaging under 70.
fn suggestions_for<'a>(evaluations: impl Iterator<Item = &'a Evaluation>) -> Vec<String> {
    let mut totals = [0u32; 4];
    let mut count = 0u32;
    for evaluation in evaluations {
        for (total, sub) in totals.iter_mut().zip(evaluation.sub_scores()) {
            *total += sub;
        }
        count += 1;
    }
    if count == 0 {
        return Vec::new();
    }
    let averages = totals.map(|t| t / count);
    let weakest = averages.iter().copied().min().unwrap_or(0);

    averages
        .iter()
        .zip(DIMENSION_ADVICE)
        .filter(|(avg, _)| **avg == weakest || **avg < 70)
        .map(|(_, advice)| advice.to_string())
        .collect()
}
