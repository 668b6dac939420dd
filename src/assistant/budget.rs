//! Token budget heuristics
//!
//! Character-count estimates, not a tokenizer: about four characters per
//! token is close enough to keep prompts under the context window.

use super::session::Session;
use crate::llm::{ChatMessage, ChatRole};

/// Floor for the prompt budget
pub const MIN_BUDGET: u32 = 512;

/// Rough token count: `max(1, chars / 4)`
pub fn rough_tokens(s: &str) -> usize {
    (s.chars().count() / 4).max(1)
}

fn total_tokens(messages: &[ChatMessage]) -> usize {
    messages.iter().map(|m| rough_tokens(&m.content)).sum()
}

/// Tokens available for the prompt of `session`
pub fn budget_for(session: &Session) -> u32 {
    session
        .max_context
        .saturating_sub(session.max_output)
        .saturating_sub(session.headroom)
        .max(MIN_BUDGET)
}

/// Drop the oldest non-system messages until the estimate fits `budget`
///
/// At least two messages are always kept, and system messages are never
/// removed.
pub fn fit_messages_to_budget(messages: &[ChatMessage], budget: u32) -> Vec<ChatMessage> {
    let budget = budget as usize;
    let mut kept = messages.to_vec();
    while total_tokens(&kept) > budget && kept.len() > 2 {
        match kept.iter().position(|m| m.role != ChatRole::System) {
            Some(i) => {
                kept.remove(i);
            }
            None => break,
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rough_tokens() {
        assert_eq!(rough_tokens(""), 1);
        assert_eq!(rough_tokens("abc"), 1);
        assert_eq!(rough_tokens("abcdefgh"), 2);
        assert_eq!(rough_tokens("äöüäöüäö"), 2);
    }

    #[test]
    fn test_budget_for() {
        let mut session = Session::named("t");
        assert_eq!(budget_for(&session), 20000 - 1024 - 512);

        session.max_context = 1000;
        assert_eq!(budget_for(&session), MIN_BUDGET);

        session.max_output = 5000;
        assert_eq!(budget_for(&session), MIN_BUDGET);
    }

    #[test]
    fn test_fit_drops_oldest_non_system() {
        let long = "x".repeat(400); // 100 tokens
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user(long.clone()),
            ChatMessage::assistant(long.clone()),
            ChatMessage::user("latest question"),
        ];
        let fitted = fit_messages_to_budget(&messages, 150);
        assert_eq!(fitted.len(), 3);
        assert_eq!(fitted[0].role, ChatRole::System);
        assert_eq!(fitted[1].role, ChatRole::Assistant);
        assert_eq!(fitted[2].content, "latest question");
    }

    #[test]
    fn test_fit_keeps_two_messages() {
        let long = "y".repeat(4000);
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user(long.clone()),
            ChatMessage::user(long),
        ];
        let fitted = fit_messages_to_budget(&messages, 10);
        assert_eq!(fitted.len(), 2);
        assert_eq!(fitted[0].role, ChatRole::System);
    }

    #[test]
    fn test_fit_stops_when_only_system_remains() {
        let long = "z".repeat(4000);
        let messages = vec![
            ChatMessage::system(long.clone()),
            ChatMessage::system(long.clone()),
            ChatMessage::system(long),
        ];
        assert_eq!(fit_messages_to_budget(&messages, 10).len(), 3);
    }

    #[test]
    fn test_fit_within_budget_is_unchanged() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("q")];
        assert_eq!(fit_messages_to_budget(&messages, 512), messages);
    }
}
