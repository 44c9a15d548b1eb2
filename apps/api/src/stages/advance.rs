//! Stage-advance predicate.
//!
//! Kept isolated from the state machine so it can be swapped for a classifier.

const ADVANCE_PHRASES: &[&str] = &[
    "完成了",
    "下一步",
    "下一阶段",
    "进入下一",
    "准备好了",
    "可以继续",
    "没问题了",
    "next stage",
    "i'm done",
    "ready to continue",
];

/// True when the user's message reads as "I'm done, move on".
pub fn user_requested_advance(text: &str) -> bool {
    let lower = text.to_lowercase();
    ADVANCE_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_chinese_phrases() {
        assert!(user_requested_advance("好的，这部分完成了"));
        assert!(user_requested_advance("继续下一步吧"));
    }

    #[test]
    fn test_detects_english_case_insensitively() {
        assert!(user_requested_advance("OK, Ready to continue"));
    }

    #[test]
    fn test_ordinary_messages_do_not_advance() {
        assert!(!user_requested_advance("我想找产品经理的工作"));
        assert!(!user_requested_advance(""));
    }
}
