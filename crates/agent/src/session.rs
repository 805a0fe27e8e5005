use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use careloop_core::domain::conversation::ConversationState;
use careloop_core::domain::patient::PatientProfile;

/// One patient's in-flight conversation. Held behind a per-session mutex so
/// messages from the same patient are applied in order.
#[derive(Clone, Debug)]
pub struct FeedbackSession {
    pub profile: PatientProfile,
    pub state: ConversationState,
}

impl FeedbackSession {
    pub fn new(profile: PatientProfile) -> Self {
        Self { profile, state: ConversationState::default() }
    }

    /// "New chat" discards in-progress answers unconditionally.
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

/// Session registry keyed by NHS number. The outer lock only guards the
/// map; message handling locks the individual session.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<FeedbackSession>>>>,
}

impl SessionStore {
    pub async fn get_or_create(&self, profile: &PatientProfile) -> Arc<Mutex<FeedbackSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(profile.nhs_number.clone())
            .or_insert_with(|| Arc::new(Mutex::new(FeedbackSession::new(profile.clone()))))
            .clone()
    }

    pub async fn get(&self, nhs_number: &str) -> Option<Arc<Mutex<FeedbackSession>>> {
        let sessions = self.sessions.lock().await;
        sessions.get(nhs_number).cloned()
    }

    pub async fn remove(&self, nhs_number: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(nhs_number);
    }
}
