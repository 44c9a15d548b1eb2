//! Whiteboard merge: pure combination of the previous document with a new extraction.
//!
//! Each field is combined according to `WhiteboardField::strategy()`. Inputs are
//! never mutated; a fresh document is returned.

use std::collections::HashSet;

use crate::whiteboard::models::{
    MergeStrategy, Whiteboard, WhiteboardField, WhiteboardPatch, WhiteboardRecord,
};

pub fn merge_whiteboard(previous: &Whiteboard, patch: &WhiteboardPatch) -> Whiteboard {
    Whiteboard {
        intent_role: merge_scalar(
            WhiteboardField::IntentRole.strategy(),
            &previous.intent_role,
            patch.intent_role.as_ref(),
        ),
        key_skills: merge_strings(
            WhiteboardField::KeySkills.strategy(),
            &previous.key_skills,
            patch.key_skills.as_deref(),
        ),
        star_projects: merge_records(
            WhiteboardField::StarProjects.strategy(),
            &previous.star_projects,
            patch.star_projects.as_deref(),
        ),
        resume_insights: merge_records(
            WhiteboardField::ResumeInsights.strategy(),
            &previous.resume_insights,
            patch.resume_insights.as_deref(),
        ),
        interview_reports: merge_records(
            WhiteboardField::InterviewReports.strategy(),
            &previous.interview_reports,
            patch.interview_reports.as_deref(),
        ),
        target_companies: merge_records(
            WhiteboardField::TargetCompanies.strategy(),
            &previous.target_companies,
            patch.target_companies.as_deref(),
        ),
        salary_strategy: merge_object(
            WhiteboardField::SalaryStrategy.strategy(),
            &previous.salary_strategy,
            patch.salary_strategy.as_ref(),
        ),
        offers: merge_records(
            WhiteboardField::Offers.strategy(),
            &previous.offers,
            patch.offers.as_deref(),
        ),
    }
}

fn merge_records<T: WhiteboardRecord>(
    strategy: MergeStrategy,
    previous: &[T],
    incoming: Option<&[T]>,
) -> Vec<T> {
    let Some(incoming) = incoming else {
        return previous.to_vec();
    };
    match strategy {
        MergeStrategy::ReplaceIfPresent => incoming.to_vec(),
        _ => append_unique(previous, incoming),
    }
}

fn append_unique<T: WhiteboardRecord>(previous: &[T], incoming: &[T]) -> Vec<T> {
    let mut seen: HashSet<String> = previous.iter().map(|r| r.id().to_string()).collect();
    let mut merged = previous.to_vec();
    for record in incoming {
        if seen.insert(record.id().to_string()) {
            merged.push(record.clone());
        }
    }
    merged
}

fn merge_strings(
    strategy: MergeStrategy,
    previous: &[String],
    incoming: Option<&[String]>,
) -> Vec<String> {
    let Some(incoming) = incoming else {
        return previous.to_vec();
    };
    match strategy {
        MergeStrategy::ReplaceIfPresent => incoming.to_vec(),
        _ => {
            let mut merged = previous.to_vec();
            for skill in incoming {
                if !skill.trim().is_empty() && !merged.contains(skill) {
                    merged.push(skill.clone());
                }
            }
            merged
        }
    }
}

fn merge_scalar(
    strategy: MergeStrategy,
    previous: &Option<String>,
    incoming: Option<&String>,
) -> Option<String> {
    match (strategy, incoming) {
        (MergeStrategy::ReplaceIfPresent, Some(value)) => Some(value.clone()),
        (_, Some(value)) if !value.trim().is_empty() => Some(value.clone()),
        _ => previous.clone(),
    }
}

fn merge_object<T: Clone>(
    strategy: MergeStrategy,
    previous: &Option<T>,
    incoming: Option<&T>,
) -> Option<T> {
    match (strategy, incoming) {
        (MergeStrategy::ReplaceIfPresent, Some(value)) => Some(value.clone()),
        // Objects have no append or union form: only fill a missing value.
        (_, Some(value)) if previous.is_none() => Some(value.clone()),
        _ => previous.clone(),
    }
}

/// Removes one record from a list field. Returns the new document and whether
/// anything was removed. Scalar fields are cleared when `id` matches their value.
pub fn remove_record(whiteboard: &Whiteboard, field: WhiteboardField, id: &str) -> (Whiteboard, bool) {
    let mut next = whiteboard.clone();
    let removed = match field {
        WhiteboardField::StarProjects => retain_without(&mut next.star_projects, id),
        WhiteboardField::ResumeInsights => retain_without(&mut next.resume_insights, id),
        WhiteboardField::InterviewReports => retain_without(&mut next.interview_reports, id),
        WhiteboardField::TargetCompanies => retain_without(&mut next.target_companies, id),
        WhiteboardField::Offers => retain_without(&mut next.offers, id),
        WhiteboardField::KeySkills => {
            let before = next.key_skills.len();
            next.key_skills.retain(|s| s != id);
            before != next.key_skills.len()
        }
        WhiteboardField::IntentRole => {
            if next.intent_role.as_deref() == Some(id) {
                next.intent_role = None;
                true
            } else {
                false
            }
        }
        WhiteboardField::SalaryStrategy => next.salary_strategy.take().is_some(),
    };
    (next, removed)
}

fn retain_without<T: WhiteboardRecord>(records: &mut Vec<T>, id: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.id() != id);
    before != records.len()
}
