//! Same-turn structured hints pulled from reply text with regexes and keyword lists.
//!
//! Hints are advisory. They are returned alongside the reply for immediate
//! display and never feed the whiteboard merge; the extractor owns that path.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::conversation::models::{Message, MessageRole};
use crate::stages::Stage;

const SKILL_KEYWORDS: &[&str] = &[
    "Python",
    "Java",
    "Go",
    "Rust",
    "JavaScript",
    "TypeScript",
    "React",
    "Vue",
    "SQL",
    "Excel",
    "Axure",
    "Figma",
    "机器学习",
    "深度学习",
    "数据分析",
    "需求分析",
    "产品设计",
    "用户研究",
    "项目管理",
    "沟通协调",
    "团队管理",
    "用户增长",
    "内容运营",
    "A/B测试",
];

const COMPANY_KEYWORDS: &[&str] = &[
    "字节跳动",
    "阿里巴巴",
    "腾讯",
    "百度",
    "美团",
    "京东",
    "拼多多",
    "快手",
    "小红书",
    "网易",
    "华为",
    "小米",
    "滴滴",
    "蚂蚁集团",
    "哔哩哔哩",
    "携程",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
    /// `"k"` (thousands per month) or `"w"` (ten-thousands per year).
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_role: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_skills: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_companies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_range: Option<SalaryRange>,
}

impl StructuredHints {
    pub fn is_empty(&self) -> bool {
        self.intent_role.is_none()
            && self.key_skills.is_empty()
            && self.target_companies.is_empty()
            && self.salary_range.is_none()
    }
}

fn role_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:想找|想做|想从事|想成为|目标是|意向是|应聘|求职)\s*(?:一份|一名|一个)?\s*([\p{Han}A-Za-z]{2,12}?)(?:的)?(?:工作|岗位|职位)",
        )
        .expect("role regex is valid")
    })
}

fn salary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3})\s*(?:-|~|到|至)\s*(\d{1,3})\s*(k|w|万)")
            .expect("salary regex is valid")
    })
}

/// Best-effort hints for one turn. Which texts are scanned depends on the stage:
/// career planning also reads the user's side of the transcript, where intent
/// is usually stated.
pub fn extract_hints(stage: Stage, reply: &str, transcript: &[Message]) -> StructuredHints {
    let user_text: String = transcript
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut hints = StructuredHints::default();
    match stage {
        Stage::CareerPlanning => {
            hints.intent_role = find_role(&user_text).or_else(|| find_role(reply));
            hints.key_skills = find_keywords(&[&user_text, reply], SKILL_KEYWORDS);
        }
        Stage::ProjectReview | Stage::ResumeOptimization => {
            hints.key_skills = find_keywords(&[reply], SKILL_KEYWORDS);
        }
        Stage::ApplicationStrategy => {
            hints.target_companies = find_keywords(&[&user_text, reply], COMPANY_KEYWORDS);
        }
        Stage::SalaryTalk | Stage::Offer => {
            hints.salary_range = find_salary(&user_text).or_else(|| find_salary(reply));
            hints.target_companies = find_keywords(&[&user_text], COMPANY_KEYWORDS);
        }
        Stage::Interview => {}
    }
    hints
}

fn find_role(text: &str) -> Option<String> {
    role_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Keywords present in any of `texts`, in list order, without duplicates.
fn find_keywords(texts: &[&str], keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| texts.iter().any(|t| t.contains(*k)))
        .map(|k| k.to_string())
        .collect()
}

fn find_salary(text: &str) -> Option<SalaryRange> {
    let caps = salary_regex().captures(text)?;
    let min: u32 = caps.get(1)?.as_str().parse().ok()?;
    let max: u32 = caps.get(2)?.as_str().parse().ok()?;
    let unit = match caps.get(3)?.as_str().to_lowercase().as_str() {
        "k" => "k",
        _ => "w",
    };
    (min <= max).then(|| SalaryRange {
        min,
        max,
        unit: unit.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_user_message() {
        let transcript = vec![Message::user("我想找产品经理的工作")];
        let hints = extract_hints(Stage::CareerPlanning, "好的，我们来聊聊。", &transcript);
        assert_eq!(hints.intent_role.as_deref(), Some("产品经理"));
    }

    #[test]
    fn test_role_variants() {
        assert_eq!(find_role("我的目标是数据分析师岗位").as_deref(), Some("数据分析师"));
        assert_eq!(find_role("想做一名前端开发的职位").as_deref(), Some("前端开发"));
        assert_eq!(find_role("今天天气不错"), None);
    }

    #[test]
    fn test_skills_deduplicated_in_list_order() {
        let transcript = vec![Message::user("我会SQL和Python，也做过数据分析")];
        let hints = extract_hints(Stage::CareerPlanning, "Python 很重要", &transcript);
        assert_eq!(hints.key_skills, vec!["Python", "SQL", "数据分析"]);
    }

    #[test]
    fn test_salary_range() {
        let transcript = vec![Message::user("我期望 25-35k")];
        let hints = extract_hints(Stage::SalaryTalk, "", &transcript);
        assert_eq!(
            hints.salary_range,
            Some(SalaryRange {
                min: 25,
                max: 35,
                unit: "k".into()
            })
        );
        assert_eq!(find_salary("年包40到50万").map(|r| r.unit), Some("w".into()));
        assert_eq!(find_salary("50-40k"), None);
    }

    #[test]
    fn test_interview_stage_has_no_hints() {
        let transcript = vec![Message::user("我想找产品经理的工作")];
        let hints = extract_hints(Stage::Interview, "腾讯 Python 25-35k", &transcript);
        assert!(hints.is_empty());
        assert_eq!(serde_json::to_value(&hints).unwrap(), serde_json::json!({}));
    }
}
