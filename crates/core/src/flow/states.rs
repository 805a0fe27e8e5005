use serde::{Deserialize, Serialize};

use crate::domain::conversation::ConversationState;
use crate::domain::feedback::FeedbackDraft;

/// Collection stage, derived from [`ConversationState`] flags rather than
/// stored separately so the two can never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStage {
    New,
    AwaitingRating,
    AwaitingComments,
    Complete,
}

impl FlowStage {
    pub fn of(state: &ConversationState) -> Self {
        if state.conversation_complete {
            Self::Complete
        } else if state.awaiting_comments {
            Self::AwaitingComments
        } else if state.awaiting_rating {
            Self::AwaitingRating
        } else {
            Self::New
        }
    }
}

/// What an incoming patient message means at the current stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    Greeting,
    FeedbackShared,
    RatingProvided(u8),
    InvalidRating,
    CommentsProvided,
    EmptyMessage,
    Gratitude,
    Farewell,
    FollowUp,
}

/// Side effect the caller must execute after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowAction {
    PersistFeedback(FeedbackDraft),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub from: FlowStage,
    pub to: FlowStage,
    pub event: FlowEvent,
    pub state: ConversationState,
    pub reply: String,
    pub action: Option<FlowAction>,
}
