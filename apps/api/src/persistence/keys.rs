// Persisted key constants. Changing these orphans existing stored state.

use crate::stages::Stage;

pub const WHITEBOARD_KEY: &str = "whiteboard_data";
pub const CHAT_HISTORY_PREFIX: &str = "chat_history_";
pub const CURRENT_STAGE_KEY: &str = "current_stage";
pub const USER_ID_KEY: &str = "user_id";
pub const SESSION_ID_KEY: &str = "session_id";

/// `session:<session_id>:<key>`
pub fn scoped(session_id: &str, key: &str) -> String {
    format!("session:{session_id}:{key}")
}

pub fn chat_history_key(stage: Stage) -> String {
    format!("{CHAT_HISTORY_PREFIX}{}", stage.id())
}

pub fn interview_key(session_id: &str) -> String {
    format!("interview:{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            scoped("abc", &chat_history_key(Stage::SalaryTalk)),
            "session:abc:chat_history_salary_talk"
        );
        assert_eq!(scoped("abc", WHITEBOARD_KEY), "session:abc:whiteboard_data");
        assert_eq!(interview_key("abc"), "interview:abc");
    }
}
