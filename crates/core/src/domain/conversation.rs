use serde::{Deserialize, Serialize};

/// Mutable per-session collection state. One instance per patient session,
/// owned exclusively by the session store; "new chat" replaces it with
/// `ConversationState::default()`.
///
/// Invariant: `conversation_complete` implies `feedback_saved`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub satisfaction_rating: Option<u8>,
    pub comments: Option<String>,
    pub category: Option<String>,
    pub awaiting_rating: bool,
    pub awaiting_comments: bool,
    pub feedback_saved: bool,
    pub conversation_complete: bool,
}

impl ConversationState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
