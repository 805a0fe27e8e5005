use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use careloop_core::classify::{default_issue_table, KeywordTable};
use careloop_core::errors::CoreError;
use careloop_core::flow::{FeedbackFlow, FlowAction};
use careloop_core::insights::common_issues;
use careloop_core::{flow::prompts, PatientProfile};
use careloop_db::repositories::{FeedbackRepository, RepositoryError, UserRepository};

use crate::session::{FeedbackSession, SessionStore};

#[derive(Debug)]
pub struct SessionStart {
    pub profile: PatientProfile,
    pub greeting: String,
}

/// Drives one conversation turn at a time: flow engine for the reply,
/// repositories for the side effects.
pub struct FeedbackService {
    flow: FeedbackFlow,
    issue_table: KeywordTable,
    users: Arc<dyn UserRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    sessions: SessionStore,
}

impl FeedbackService {
    pub fn new(users: Arc<dyn UserRepository>, feedback: Arc<dyn FeedbackRepository>) -> Self {
        Self {
            flow: FeedbackFlow::default(),
            issue_table: default_issue_table(),
            users,
            feedback,
            sessions: SessionStore::default(),
        }
    }

    /// Looks up the patient and opens (or resumes) their session.
    pub async fn start_session(&self, nhs_number: &str) -> Result<SessionStart, CoreError> {
        let profile = self
            .users
            .find_by_nhs_number(nhs_number)
            .await
            .map_err(repository_failure)?
            .ok_or_else(|| CoreError::not_found("patient", nhs_number))?;

        self.sessions.get_or_create(&profile).await;
        let greeting = prompts::initial_greeting(&profile);
        info!(nhs_number, "feedback session started");
        Ok(SessionStart { profile, greeting })
    }

    /// Discards any in-progress answers and greets the patient fresh.
    pub async fn new_chat(&self, nhs_number: &str) -> Result<String, CoreError> {
        let session = self.session_for(nhs_number).await?;
        let mut session = session.lock().await;
        session.reset();
        Ok(prompts::new_chat_greeting(&session.profile.name))
    }

    /// Applies one patient message. When a turn completes the feedback, the
    /// record is persisted and the confirmation carries the live
    /// common-issues summary.
    pub async fn handle_message(
        &self,
        nhs_number: &str,
        message: &str,
    ) -> Result<String, CoreError> {
        let session = self.session_for(nhs_number).await?;
        let mut session = session.lock().await;

        let outcome = self.flow.handle_message(&session.profile, &session.state, message)?;
        session.state = outcome.state;

        match outcome.action {
            Some(FlowAction::PersistFeedback(draft)) => {
                let record = draft.into_record();
                let feedback_id = record.id.0.clone();
                self.feedback.insert(record).await.map_err(repository_failure)?;
                FeedbackFlow::confirm_saved(&mut session.state);
                info!(nhs_number, feedback_id, "feedback saved");

                Ok(prompts::saved_confirmation(
                    &session.profile.name,
                    &self.issue_summary().await,
                ))
            }
            None => Ok(outcome.reply),
        }
    }

    async fn session_for(
        &self,
        nhs_number: &str,
    ) -> Result<Arc<Mutex<FeedbackSession>>, CoreError> {
        if let Some(session) = self.sessions.get(nhs_number).await {
            return Ok(session);
        }
        let profile = self
            .users
            .find_by_nhs_number(nhs_number)
            .await
            .map_err(repository_failure)?
            .ok_or_else(|| CoreError::not_found("patient", nhs_number))?;
        Ok(self.sessions.get_or_create(&profile).await)
    }

    /// Common-issues rollup over every stored comment. A read failure only
    /// degrades the confirmation, so it is logged and swallowed.
    async fn issue_summary(&self) -> String {
        match self.feedback.list_all().await {
            Ok(records) => {
                let comments: Vec<String> =
                    records.into_iter().map(|record| record.comments).collect();
                common_issues(&comments, &self.issue_table)
            }
            Err(error) => {
                warn!(error = %error, "could not load comments for issue summary");
                common_issues(&[], &self.issue_table)
            }
        }
    }
}

fn repository_failure(error: RepositoryError) -> CoreError {
    CoreError::transient(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use careloop_core::domain::patient::PatientProfile;
    use careloop_core::errors::CoreError;
    use careloop_db::repositories::{
        FeedbackRepository, InMemoryFeedbackRepository, InMemoryUserRepository, UserRepository,
    };

    use super::FeedbackService;

    async fn service_with_patient() -> (FeedbackService, Arc<InMemoryFeedbackRepository>) {
        let users = Arc::new(InMemoryUserRepository::default());
        let feedback = Arc::new(InMemoryFeedbackRepository::default());

        users
            .save(PatientProfile {
                nhs_number: "9434765919".to_string(),
                name: "Asha".to_string(),
                age: 52,
                gender: "Female".to_string(),
                treatment: "Outpatient".to_string(),
                date_of_treatment: "2026-07-12".to_string(),
                health_issue: "Knee Replacement".to_string(),
            })
            .await
            .expect("save profile");

        (FeedbackService::new(users, feedback.clone()), feedback)
    }

    #[tokio::test]
    async fn full_conversation_persists_feedback_and_confirms() {
        let (service, feedback) = service_with_patient().await;

        let start = service.start_session("9434765919").await.expect("start");
        assert!(start.greeting.contains("Asha"));
        assert!(start.greeting.contains("Knee Replacement"));

        let reply = service.handle_message("9434765919", "hi").await.expect("greet");
        assert!(reply.contains("healthcare experience"));

        let reply = service
            .handle_message("9434765919", "The wait was too long and staff were rude.")
            .await
            .expect("feedback");
        assert!(reply.contains("scale from 1 to 5"));

        let reply = service.handle_message("9434765919", "2").await.expect("rating");
        assert!(reply.contains("Thank you"), "expected confirmation, got: {reply}");

        let records = feedback.list_all().await.expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 2);
        assert_eq!(records[0].category, "Staff");
        assert_eq!(records[0].nhs_number, "9434765919");
    }

    #[tokio::test]
    async fn confirmation_reflects_common_issues_from_history() {
        let (service, _) = service_with_patient().await;
        service.start_session("9434765919").await.expect("start");

        service
            .handle_message("9434765919", "I waited three hours and the queue never moved")
            .await
            .expect("feedback");
        let reply = service.handle_message("9434765919", "1").await.expect("rating");

        assert!(reply.contains("Long wait"), "expected issue rollup, got: {reply}");
    }

    #[tokio::test]
    async fn unknown_patient_is_rejected_at_init() {
        let (service, _) = service_with_patient().await;

        let error = service.start_session("0000000000").await.expect_err("must fail");
        assert!(matches!(error, CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn new_chat_discards_progress() {
        let (service, feedback) = service_with_patient().await;
        service.start_session("9434765919").await.expect("start");

        service
            .handle_message("9434765919", "The nurses ignored my call button")
            .await
            .expect("feedback");
        let greeting = service.new_chat("9434765919").await.expect("new chat");
        assert!(greeting.contains("Asha"));

        // The stashed comments are gone, so the next message starts over.
        let reply = service.handle_message("9434765919", "hello").await.expect("greet again");
        assert!(reply.contains("healthcare experience"));
        assert!(feedback.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn completed_session_answers_gratitude_and_farewell() {
        let (service, _) = service_with_patient().await;
        service.start_session("9434765919").await.expect("start");

        service
            .handle_message("9434765919", "Everything was smooth and well organised")
            .await
            .expect("feedback");
        service.handle_message("9434765919", "5").await.expect("rating");

        let thanks = service.handle_message("9434765919", "thanks!").await.expect("gratitude");
        assert!(thanks.contains("You're welcome"));

        let bye = service.handle_message("9434765919", "bye").await.expect("farewell");
        assert!(bye.contains("Goodbye"));
    }
}
