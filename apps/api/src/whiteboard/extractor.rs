//! Whiteboard Extractor: a second, JSON-only completion call that turns the
//! conversation into whiteboard fields.
//!
//! Never fails: any provider error or unparseable output yields an empty patch,
//! which callers treat as "nothing new" rather than as an error.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::conversation::models::{Message, MessageRole};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{parse_json_object, ChatMessage, Completer, CompletionOptions};
use crate::stages::Stage;
use crate::whiteboard::models::{WhiteboardPatch, WhiteboardRecord};
use crate::whiteboard::prompts::{extraction_schema, EXTRACTION_PROMPT_TEMPLATE, RESUME_PARSE_SCHEMA};

/// Runs the extraction pass for `stage` over `transcript`.
pub async fn extract_whiteboard(
    completer: &dyn Completer,
    options: &CompletionOptions,
    stage: Stage,
    transcript: &[Message],
) -> WhiteboardPatch {
    if !transcript.iter().any(|m| m.role != MessageRole::System) {
        return WhiteboardPatch::default();
    }
    let prompt = build_prompt(extraction_schema(stage), &render_transcript(transcript));
    run(completer, options, &prompt, stage.id()).await
}

/// Extracts intent, skills and projects from raw resume text.
pub async fn extract_from_resume(
    completer: &dyn Completer,
    options: &CompletionOptions,
    resume_text: &str,
) -> WhiteboardPatch {
    if resume_text.trim().is_empty() {
        return WhiteboardPatch::default();
    }
    let transcript = format!("用户上传的简历：\n{resume_text}");
    let prompt = build_prompt(RESUME_PARSE_SCHEMA, &transcript);
    run(completer, options, &prompt, "resume").await
}

async fn run(
    completer: &dyn Completer,
    options: &CompletionOptions,
    prompt: &str,
    label: &str,
) -> WhiteboardPatch {
    let messages = [ChatMessage::system(JSON_ONLY_SYSTEM), ChatMessage::user(prompt)];
    match completer.complete(&messages, options).await {
        Ok(raw) => {
            let patch = parse_extraction(&raw);
            debug!("Extraction for {label} produced empty={}", patch.is_empty());
            patch
        }
        Err(e) => {
            warn!("Whiteboard extraction for {label} failed: {e}");
            WhiteboardPatch::default()
        }
    }
}

fn build_prompt(schema: &str, transcript: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{schema}", schema)
        .replace("{transcript}", transcript)
}

fn render_transcript(transcript: &[Message]) -> String {
    transcript
        .iter()
        .map(|m| match m.role {
            MessageRole::User => format!("用户：{}", m.content),
            MessageRole::Assistant => format!("教练：{}", m.content),
            MessageRole::System => m.content.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses raw model output into a stamped patch, using the current time for ids.
pub fn parse_extraction(raw: &str) -> WhiteboardPatch {
    let now = Utc::now();
    parse_extraction_at(raw, now.timestamp_millis(), &now.to_rfc3339())
}

pub fn parse_extraction_at(raw: &str, epoch_ms: i64, created_at: &str) -> WhiteboardPatch {
    let Some(Value::Object(object)) = parse_json_object(raw) else {
        warn!("Extraction output was not a JSON object; ignoring");
        return WhiteboardPatch::default();
    };
    let mut patch = patch_from_object(&object);
    stamp_patch(&mut patch, epoch_ms, created_at);
    patch
}

/// Field-by-field decoding so one malformed field does not discard the rest.
fn patch_from_object(object: &Map<String, Value>) -> WhiteboardPatch {
    WhiteboardPatch {
        intent_role: field::<String>(object, "intentRole").filter(|s| !s.trim().is_empty()),
        key_skills: field(object, "keySkills"),
        star_projects: field(object, "starProjects"),
        resume_insights: field(object, "resumeInsights"),
        interview_reports: field(object, "interviewReports"),
        target_companies: field(object, "targetCompanies"),
        salary_strategy: field(object, "salaryStrategy"),
        offers: field(object, "offers"),
    }
}

fn field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<T> {
    let value = object.get(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Dropping malformed extraction field '{key}': {e}");
            None
        }
    }
}

/// Gives every list record an id (`<kind>_<epoch-ms>_<index>`) and a creation
/// timestamp when the model did not supply them.
pub fn stamp_patch(patch: &mut WhiteboardPatch, epoch_ms: i64, created_at: &str) {
    if let Some(records) = patch.star_projects.as_mut() {
        stamp_records(records, epoch_ms, created_at);
    }
    if let Some(records) = patch.resume_insights.as_mut() {
        stamp_records(records, epoch_ms, created_at);
    }
    if let Some(records) = patch.interview_reports.as_mut() {
        stamp_records(records, epoch_ms, created_at);
    }
    if let Some(records) = patch.target_companies.as_mut() {
        stamp_records(records, epoch_ms, created_at);
    }
    if let Some(records) = patch.offers.as_mut() {
        stamp_records(records, epoch_ms, created_at);
    }
}

fn stamp_records<T: WhiteboardRecord>(records: &mut [T], epoch_ms: i64, created_at: &str) {
    for (index, record) in records.iter_mut().enumerate() {
        record.stamp(format!("{}_{}_{}", T::KIND, epoch_ms, index), created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::test_support::{extraction_options, ScriptedCompleter};

    const TS: &str = "2026-10-16T08:00:00+00:00";

    #[test]
    fn test_fenced_and_plain_output_parse_identically() {
        let plain = r#"{"intentRole": "产品经理", "keySkills": ["需求分析", "Axure"]}"#;
        let fenced = format!("```json\n{plain}\n```");
        assert_eq!(
            parse_extraction_at(plain, 1, TS),
            parse_extraction_at(&fenced, 1, TS)
        );
        let patch = parse_extraction_at(plain, 1, TS);
        assert_eq!(patch.intent_role.as_deref(), Some("产品经理"));
        assert_eq!(patch.key_skills.unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_output_yields_empty_patch() {
        assert!(parse_extraction_at("抱歉，我无法提取。", 1, TS).is_empty());
        assert!(parse_extraction_at("{not: valid json", 1, TS).is_empty());
        assert!(parse_extraction_at("", 1, TS).is_empty());
    }

    #[test]
    fn test_records_are_stamped_with_kind_timestamp_and_index() {
        let raw = r#"{"starProjects": [{"name": "A"}, {"id": "project_keep", "name": "B"}]}"#;
        let patch = parse_extraction_at(raw, 1700000000000, TS);
        let projects = patch.star_projects.unwrap();
        assert_eq!(projects[0].id, "project_1700000000000_0");
        assert_eq!(projects[1].id, "project_keep");
        assert!(projects.iter().all(|p| p.created_at.as_deref() == Some(TS)));
    }

    #[test]
    fn test_malformed_field_does_not_discard_others() {
        let raw = r#"{"intentRole": "运营", "offers": "not a list"}"#;
        let patch = parse_extraction_at(raw, 1, TS);
        assert_eq!(patch.intent_role.as_deref(), Some("运营"));
        assert!(patch.offers.is_none());
    }

    #[tokio::test]
    async fn test_extraction_uses_json_only_instruction() {
        let completer = ScriptedCompleter::new(|messages, options| {
            assert!(messages[0].content.contains("valid JSON only"));
            assert!(messages[1].content.contains("intentRole"));
            assert!(options.temperature < 0.5);
            Ok(r#"{"intentRole": "产品经理"}"#.to_string())
        });
        let transcript = vec![Message::user("我想找产品经理的工作")];
        let patch = extract_whiteboard(
            &completer,
            &extraction_options(),
            Stage::CareerPlanning,
            &transcript,
        )
        .await;
        assert_eq!(patch.intent_role.as_deref(), Some("产品经理"));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty_patch() {
        let completer = ScriptedCompleter::new(|_, _| Err(LlmError::EmptyContent));
        let transcript = vec![Message::user("hello")];
        let patch = extract_whiteboard(
            &completer,
            &extraction_options(),
            Stage::Offer,
            &transcript,
        )
        .await;
        assert!(patch.is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_the_call() {
        let completer = ScriptedCompleter::new(|_, _| panic!("should not be called"));
        let patch = extract_whiteboard(
            &completer,
            &extraction_options(),
            Stage::CareerPlanning,
            &[],
        )
        .await;
        assert!(patch.is_empty());
    }
}
