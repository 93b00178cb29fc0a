//! Bounded history window.
//!
//! Both the rewriter and the answer generator prompt with the same suffix of
//! the conversation: the last [`HISTORY_WINDOW`] messages (three
//! user/assistant pairs), oldest first.

use crate::models::ChatMessage;

/// Maximum number of messages included in a prompt.
pub const HISTORY_WINDOW: usize = 6;

/// Returns the last `min(HISTORY_WINDOW, history.len())` messages, in order.
pub fn history_window(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("q{}", i))
                } else {
                    ChatMessage::assistant(format!("a{}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_window_empty() {
        assert!(history_window(&[]).is_empty());
    }

    #[test]
    fn test_window_shorter_than_limit() {
        let history = conversation(4);
        assert_eq!(history_window(&history), &history[..]);
    }

    #[test]
    fn test_window_exactly_limit() {
        let history = conversation(6);
        assert_eq!(history_window(&history).len(), 6);
    }

    #[test]
    fn test_window_keeps_last_six_in_order() {
        for n in 7..20 {
            let history = conversation(n);
            let window = history_window(&history);
            assert_eq!(window.len(), HISTORY_WINDOW);
            assert_eq!(window, &history[n - 6..]);
        }
    }
}
