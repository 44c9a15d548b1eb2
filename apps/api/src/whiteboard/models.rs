use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::interview::models::Evaluation;

// ────────────────────────────────────────────────────────────────────────────
// Lenient field decoding
// ────────────────────────────────────────────────────────────────────────────

/// Accepts a string, a number, or null. Models are inconsistent about `"30k"` vs `30000`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accepts a list of strings or a single string.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// A list-field record carrying a synthetic de-duplication id.
pub trait WhiteboardRecord: Clone {
    /// Prefix used when generating ids: `<kind>_<epoch-ms>_<index>`.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Fills `id` and `createdAt` when absent; existing values are kept.
    fn stamp(&mut self, id: String, created_at: &str);
}

macro_rules! impl_record {
    ($ty:ty, $kind:literal) => {
        impl WhiteboardRecord for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn stamp(&mut self, id: String, created_at: &str) {
                if self.id.trim().is_empty() {
                    self.id = id;
                }
                if self.created_at.is_none() {
                    self.created_at = Some(created_at.to_string());
                }
            }
        }
    };
}

/// A project experience in STAR form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarProject {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "title", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub situation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A before/after rewrite of one resume passage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInsight {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub section: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub original: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub optimized: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// Summary of one interview-practice round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewReport {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub round: String,
    #[serde(default)]
    pub question_count: u32,
    #[serde(default)]
    pub questions: Vec<ReportQuestion>,
    #[serde(default)]
    pub overall_score: u32,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub improvements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCompany {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "company")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: Option<String>,
    /// 冲刺 / 匹配 / 保底
    #[serde(default, deserialize_with = "lenient_string")]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStrategy {
    #[serde(default, deserialize_with = "lenient_string")]
    pub target_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub minimum_acceptable: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub market_reference: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub negotiation_points: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub base_salary: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bonus: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub equity: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub benefits: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub cons: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(StarProject, "project");
impl_record!(ResumeInsight, "insight");
impl_record!(InterviewReport, "report");
impl_record!(TargetCompany, "company");
impl_record!(Offer, "offer");

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

/// The per-session structured summary accumulated from conversation.
/// An empty whiteboard serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Whiteboard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub star_projects: Vec<StarProject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resume_insights: Vec<ResumeInsight>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interview_reports: Vec<InterviewReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_companies: Vec<TargetCompany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_strategy: Option<SalaryStrategy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offers: Vec<Offer>,
}

/// Newly extracted fields. `None` means "not present in this extraction",
/// which matters for the replace-if-present fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteboardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star_projects: Option<Vec<StarProject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_insights: Option<Vec<ResumeInsight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_reports: Option<Vec<InterviewReport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_companies: Option<Vec<TargetCompany>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_strategy: Option<SalaryStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offers: Option<Vec<Offer>>,
}

impl WhiteboardPatch {
    pub fn is_empty(&self) -> bool {
        *self == WhiteboardPatch::default()
    }
}

/// How incoming values for a field combine with what the whiteboard already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Previous records first, then incoming records whose id is not yet present.
    AppendUnique,
    /// Case-sensitive string union, previous order preserved.
    UnionStrings,
    /// Scalar overwrite, only when the incoming value is non-empty.
    OverwriteIfNonEmpty,
    /// Whole-field replacement whenever the incoming value is present at all.
    ReplaceIfPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WhiteboardField {
    IntentRole,
    KeySkills,
    StarProjects,
    ResumeInsights,
    InterviewReports,
    TargetCompanies,
    SalaryStrategy,
    Offers,
}

impl WhiteboardField {
    // targetCompanies / salaryStrategy / offers expect the model to return the
    // complete current set, so they replace rather than append.
    pub fn strategy(&self) -> MergeStrategy {
        match self {
            WhiteboardField::IntentRole => MergeStrategy::OverwriteIfNonEmpty,
            WhiteboardField::KeySkills => MergeStrategy::UnionStrings,
            WhiteboardField::StarProjects
            | WhiteboardField::ResumeInsights
            | WhiteboardField::InterviewReports => MergeStrategy::AppendUnique,
            WhiteboardField::TargetCompanies
            | WhiteboardField::SalaryStrategy
            | WhiteboardField::Offers => MergeStrategy::ReplaceIfPresent,
        }
    }
}
