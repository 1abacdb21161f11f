//! Termination predicate shared by the conversation session and its agents.

use crate::message::Message;

/// Token an agent sends to end the group conversation.
pub const TERMINATE: &str = "TERMINATE";

/// Reply used by agents that have nothing else to say.
pub const DEFAULT_AUTO_REPLY: &str = "Reply `TERMINATE` if the task is done.";

/// True iff the content, case-folded, ends with `TERMINATE` or `TERMINATE.`.
///
/// Trailing whitespace is ignored.
pub fn is_termination_text(content: &str) -> bool {
    let folded = content.trim_end().to_uppercase();
    folded.ends_with(TERMINATE) || folded.ends_with("TERMINATE.")
}

/// Predicate form over a message.
pub fn is_termination_msg(message: &Message) -> bool {
    is_termination_text(&message.content)
}

/// Remove a trailing termination token, leaving the rest of the answer.
pub fn strip_termination(content: &str) -> &str {
    let trimmed = content.trim_end();
    let upper = trimmed.to_uppercase();
    for token in ["TERMINATE.", TERMINATE] {
        if upper.ends_with(token) && trimmed.is_char_boundary(trimmed.len() - token.len()) {
            return trimmed[..trimmed.len() - token.len()].trim_end();
        }
    }
    trimmed
}
