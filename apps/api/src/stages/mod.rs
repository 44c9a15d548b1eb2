//! Stage Registry: the seven coaching stages in their fixed order.
//!
//! Pure lookup: identifiers, display names, descriptions, the per-stage system
//! prompt, and successor/predecessor computation. Advancement only moves one
//! step forward; manual jumps are a UI concern and bypass this on purpose.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod advance;
pub mod prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CareerPlanning,
    ProjectReview,
    ResumeOptimization,
    ApplicationStrategy,
    Interview,
    SalaryTalk,
    Offer,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::CareerPlanning,
        Stage::ProjectReview,
        Stage::ResumeOptimization,
        Stage::ApplicationStrategy,
        Stage::Interview,
        Stage::SalaryTalk,
        Stage::Offer,
    ];

    pub const FIRST: Stage = Stage::CareerPlanning;

    pub fn id(&self) -> &'static str {
        match self {
            Stage::CareerPlanning => "career_planning",
            Stage::ProjectReview => "project_review",
            Stage::ResumeOptimization => "resume_optimization",
            Stage::ApplicationStrategy => "application_strategy",
            Stage::Interview => "interview",
            Stage::SalaryTalk => "salary_talk",
            Stage::Offer => "offer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::CareerPlanning => "职业规划",
            Stage::ProjectReview => "项目梳理",
            Stage::ResumeOptimization => "简历优化",
            Stage::ApplicationStrategy => "投递策略",
            Stage::Interview => "面试准备",
            Stage::SalaryTalk => "薪资谈判",
            Stage::Offer => "Offer 评估",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::CareerPlanning => "明确求职意向、目标岗位与核心技能",
            Stage::ProjectReview => "用 STAR 法则梳理项目经历",
            Stage::ResumeOptimization => "逐段优化简历表达，突出成果与数据",
            Stage::ApplicationStrategy => "筛选目标公司，制定投递节奏",
            Stage::Interview => "模拟面试练习，逐题获得反馈",
            Stage::SalaryTalk => "了解市场行情，制定谈薪策略",
            Stage::Offer => "对比 Offer，做出最终选择",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        prompts::system_prompt(*self)
    }

    fn position(&self) -> usize {
        // ALL is exhaustive, so the lookup always succeeds.
        Stage::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.position() + 1).copied()
    }

    pub fn prev(&self) -> Option<Stage> {
        self.position().checked_sub(1).map(|i| Stage::ALL[i])
    }

    pub fn is_valid(id: &str) -> bool {
        id.parse::<Stage>().is_ok()
    }

    /// Parses a stage identifier, falling back to the first stage for unknown input.
    pub fn parse_or_first(id: Option<&str>) -> Stage {
        id.and_then(|s| s.parse().ok()).unwrap_or(Stage::FIRST)
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.id() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One row of the stage catalogue returned by `GET /stages`.
#[derive(Debug, Clone, Serialize)]
pub struct StageInfo {
    pub id: Stage,
    pub name: &'static str,
    pub description: &'static str,
    pub prev: Option<Stage>,
    pub next: Option<Stage>,
}

pub fn catalogue() -> Vec<StageInfo> {
    Stage::ALL
        .iter()
        .map(|s| StageInfo {
            id: *s,
            name: s.display_name(),
            description: s.description(),
            prev: s.prev(),
            next: s.next(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_stages() {
        assert_eq!(Stage::Offer.next(), None);
        assert_eq!(Stage::CareerPlanning.prev(), None);
    }

    #[test]
    fn test_next_then_prev_round_trips_for_interior_stages() {
        for stage in &Stage::ALL[1..Stage::ALL.len() - 1] {
            let next = stage.next().unwrap();
            assert_eq!(next.prev(), Some(*stage));
            let prev = stage.prev().unwrap();
            assert_eq!(prev.next(), Some(*stage));
        }
    }

    #[test]
    fn test_order_is_fixed() {
        let ids: Vec<_> = Stage::ALL.iter().map(Stage::id).collect();
        assert_eq!(
            ids,
            vec![
                "career_planning",
                "project_review",
                "resume_optimization",
                "application_strategy",
                "interview",
                "salary_talk",
                "offer"
            ]
        );
    }

    #[test]
    fn test_is_valid_and_fallback() {
        assert!(Stage::is_valid("salary_talk"));
        assert!(!Stage::is_valid("negotiation"));
        assert_eq!(Stage::parse_or_first(Some("bogus")), Stage::CareerPlanning);
        assert_eq!(Stage::parse_or_first(None), Stage::CareerPlanning);
        assert_eq!(Stage::parse_or_first(Some("offer")), Stage::Offer);
    }

    #[test]
    fn test_serde_uses_snake_case_ids() {
        let json = serde_json::to_string(&Stage::ResumeOptimization).unwrap();
        assert_eq!(json, "\"resume_optimization\"");
        let stage: Stage = serde_json::from_str("\"application_strategy\"").unwrap();
        assert_eq!(stage, Stage::ApplicationStrategy);
    }

    #[test]
    fn test_catalogue_covers_every_stage() {
        let rows = catalogue();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| !r.name.is_empty()));
        assert_eq!(rows[0].prev, None);
        assert_eq!(rows[0].next, Some(Stage::ProjectReview));
        assert_eq!(rows[6].next, None);
    }
}
