//! Stage dispatcher: stage prompt + transcript → model reply + advisory hints.

use serde::Serialize;
use tracing::debug;

use crate::conversation::hints::{extract_hints, StructuredHints};
use crate::conversation::models::{Message, MessageRole};
use crate::llm_client::prompts::COACH_PERSONA;
use crate::llm_client::{ChatMessage, Completer, CompletionOptions, LlmError, LlmErrorKind};
use crate::stages::Stage;

/// Most recent messages sent with each turn.
const HISTORY_WINDOW: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTurn {
    pub reply: String,
    pub structured: StructuredHints,
}

/// Builds the model input for one turn: persona plus stage prompt as the
/// system message, then the tail of the stage transcript.
pub fn build_stage_messages(stage: Stage, history: &[Message]) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut messages = Vec::with_capacity(HISTORY_WINDOW + 1);
    messages.push(ChatMessage::system(format!(
        "{COACH_PERSONA}\n\n{}",
        stage.system_prompt()
    )));
    messages.extend(
        history[start..]
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(Message::to_chat_message),
    );
    messages
}

/// One conversational turn. `history` ends with the user's new message.
/// Errors are returned unretried.
pub async fn run_stage_turn(
    completer: &dyn Completer,
    options: &CompletionOptions,
    stage: Stage,
    history: &[Message],
) -> Result<StageTurn, LlmError> {
    let messages = build_stage_messages(stage, history);
    debug!("Stage {stage}: sending {} messages", messages.len());

    let reply = completer.complete(&messages, options).await?;
    let structured = extract_hints(stage, &reply, history);
    Ok(StageTurn { reply, structured })
}

/// The reply shown in place of a model answer when the call failed.
pub fn user_facing_error_reply(error: &LlmError) -> String {
    match error.kind() {
        LlmErrorKind::Credential => format!(
            "AI 服务配置有误：{error}。请检查服务端的 LLM_API_KEY 配置后重试。"
        ),
        LlmErrorKind::Quota => {
            "AI 服务额度已用尽或请求过于频繁，请稍后再试，或检查账户余额。".to_string()
        }
        LlmErrorKind::Timeout => "抱歉，AI 响应超时了，请稍后重试。".to_string(),
        LlmErrorKind::Generic => "抱歉，AI 服务暂时不可用，请稍后再试。".to_string(),
    }
}
