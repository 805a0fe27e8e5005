use crate::classify::{categorize, default_category_table, KeywordTable};
use crate::domain::conversation::ConversationState;
use crate::domain::feedback::FeedbackDraft;
use crate::domain::patient::PatientProfile;
use crate::errors::CoreError;
use crate::flow::prompts;
use crate::flow::states::{FlowAction, FlowEvent, FlowStage, StepOutcome};

/// Conversation state machine for feedback collection.
///
/// Stages run NEW -> AWAITING_RATING -> AWAITING_COMMENTS -> COMPLETE; the
/// categorize and save steps happen inside the transition that leaves
/// AWAITING_COMMENTS (or AWAITING_RATING, when the patient led with their
/// story and the comments are already stashed). Every step is re-entrant:
/// input that cannot advance the current stage leaves the state unchanged
/// and re-prompts.
pub struct FeedbackFlow {
    category_table: KeywordTable,
}

impl Default for FeedbackFlow {
    fn default() -> Self {
        Self { category_table: default_category_table() }
    }
}

impl FeedbackFlow {
    pub fn new(category_table: KeywordTable) -> Self {
        Self { category_table }
    }

    /// Classifies an incoming message relative to the current stage.
    pub fn classify_message(stage: FlowStage, message: &str) -> FlowEvent {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return FlowEvent::EmptyMessage;
        }
        match stage {
            FlowStage::New => {
                if is_simple_greeting(trimmed) {
                    FlowEvent::Greeting
                } else {
                    FlowEvent::FeedbackShared
                }
            }
            FlowStage::AwaitingRating => match parse_rating(trimmed) {
                Some(rating) => FlowEvent::RatingProvided(rating),
                None => FlowEvent::InvalidRating,
            },
            FlowStage::AwaitingComments => FlowEvent::CommentsProvided,
            FlowStage::Complete => {
                let lowered = trimmed.to_lowercase();
                if GRATITUDE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                    FlowEvent::Gratitude
                } else if FAREWELL_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                    FlowEvent::Farewell
                } else {
                    FlowEvent::FollowUp
                }
            }
        }
    }

    /// Applies one patient message to the conversation. The returned state
    /// replaces the caller's copy; the optional action must be executed by
    /// the caller (persistence lives outside the flow).
    pub fn handle_message(
        &self,
        profile: &PatientProfile,
        current: &ConversationState,
        message: &str,
    ) -> Result<StepOutcome, CoreError> {
        let from = FlowStage::of(current);
        let event = Self::classify_message(from, message);
        let mut state = current.clone();
        let name = profile.name.as_str();

        let (reply, action) = match (from, &event) {
            (_, FlowEvent::EmptyMessage) => (prompts::EMPTY_MESSAGE.to_owned(), None),
            (FlowStage::New, FlowEvent::Greeting) => (prompts::invite_feedback(name), None),
            (FlowStage::New, FlowEvent::FeedbackShared) => {
                // Stash the story so the patient does not have to repeat it
                // after rating.
                state.comments = Some(message.trim().to_owned());
                state.awaiting_rating = true;
                (prompts::rating_prompt(name), None)
            }
            (FlowStage::AwaitingRating, FlowEvent::RatingProvided(rating)) => {
                state.satisfaction_rating = Some(*rating);
                state.awaiting_rating = false;
                if state.comments.is_some() {
                    let draft = self.finalize_draft(profile, &mut state)?;
                    (String::new(), Some(FlowAction::PersistFeedback(draft)))
                } else {
                    state.awaiting_comments = true;
                    (prompts::comment_prompt(*rating).to_owned(), None)
                }
            }
            (FlowStage::AwaitingRating, FlowEvent::InvalidRating) => {
                (prompts::INVALID_RATING.to_owned(), None)
            }
            (FlowStage::AwaitingComments, FlowEvent::CommentsProvided) => {
                state.comments = Some(message.trim().to_owned());
                state.awaiting_comments = false;
                let draft = self.finalize_draft(profile, &mut state)?;
                (String::new(), Some(FlowAction::PersistFeedback(draft)))
            }
            (FlowStage::Complete, FlowEvent::Gratitude) => (prompts::gratitude_reply(name), None),
            (FlowStage::Complete, FlowEvent::Farewell) => (prompts::farewell_reply(name), None),
            (FlowStage::Complete, _) => (prompts::follow_up_reply(name), None),
            // Remaining combinations cannot be produced by classify_message.
            (_, _) => (prompts::follow_up_reply(name), None),
        };

        let to = FlowStage::of(&state);
        Ok(StepOutcome { from, to, event, state, reply, action })
    }

    /// Marks the conversation saved and complete. Called by the service
    /// after the persist action succeeds.
    pub fn confirm_saved(state: &mut ConversationState) {
        state.feedback_saved = true;
        state.conversation_complete = true;
    }

    /// Assigns the category exactly once. Re-running returns the stored
    /// label without consulting the table again.
    pub fn assign_category(&self, state: &mut ConversationState) -> String {
        if let Some(category) = &state.category {
            return category.clone();
        }
        let category = categorize(state.comments.as_deref().unwrap_or(""), &self.category_table);
        state.category = Some(category.clone());
        category
    }

    fn finalize_draft(
        &self,
        profile: &PatientProfile,
        state: &mut ConversationState,
    ) -> Result<FeedbackDraft, CoreError> {
        let category = self.assign_category(state);
        FeedbackDraft::new(
            Some(&profile.nhs_number),
            Some(&profile.name),
            state.satisfaction_rating,
            state.comments.as_deref(),
            Some(&category),
        )
    }
}

fn parse_rating(message: &str) -> Option<u8> {
    let rating: u8 = message.trim().parse().ok()?;
    (1..=5).contains(&rating).then_some(rating)
}

fn is_simple_greeting(message: &str) -> bool {
    let normalized: String = message
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect();
    let normalized = normalized.trim();
    if GREETING_PHRASES.contains(&normalized) {
        return true;
    }
    // Short variants like "hello there" still count as greetings; a
    // greeting word followed by more than one extra word is the start of
    // the patient's story.
    let mut words = normalized.split_whitespace();
    match words.next() {
        Some(opener) => GREETING_OPENERS.contains(&opener) && words.count() <= 1,
        None => false,
    }
}

const GREETING_PHRASES: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "hiya",
    "ok",
    "okay",
    "thanks",
    "thank you",
    "good morning",
    "good afternoon",
    "good evening",
];

const GREETING_OPENERS: &[&str] = &["hello", "hi", "hey", "hiya"];

const GRATITUDE_KEYWORDS: &[&str] =
    &["thank", "thanks", "thx", "appreciate", "grateful", "thankyou"];

const FAREWELL_KEYWORDS: &[&str] = &["bye", "goodbye", "see you", "farewell"];
