use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::blocks::{MessageTemplate, ModalView};

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("slack api rejected the call: {0}")]
    Api(String),
}

/// Channel and timestamp of a posted message, as returned by
/// `chat.postMessage`. Required later to update it in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, NotifierError>;

    async fn update_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), NotifierError>;

    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifierError>;
}

pub struct SlackNotifier {
    http: Client,
    bot_token: SecretString,
    base_url: String,
}

#[derive(Serialize)]
struct PostMessageBody<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [crate::blocks::Block],
}

#[derive(Serialize)]
struct UpdateMessageBody<'a> {
    channel: &'a str,
    ts: &'a str,
    text: &'a str,
    blocks: &'a [crate::blocks::Block],
}

#[derive(Serialize)]
struct OpenViewBody<'a> {
    trigger_id: &'a str,
    view: &'a ModalView,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl ApiResponse {
    fn into_result(self, method: &str) -> Result<Self, NotifierError> {
        if self.ok {
            Ok(self)
        } else {
            let reason = self.error.unwrap_or_else(|| "unknown_error".to_string());
            Err(NotifierError::Api(format!("{method}: {reason}")))
        }
    }
}

impl SlackNotifier {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, "https://slack.com/api")
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: Client::new(), bot_token, base_url: base_url.into() }
    }

    async fn call<B: Serialize>(&self, method: &str, body: &B) -> Result<ApiResponse, NotifierError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await?;
        let parsed: ApiResponse = response.json().await?;
        debug!(method, ok = parsed.ok, "slack api call completed");
        parsed.into_result(method)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, NotifierError> {
        let body = PostMessageBody {
            channel,
            text: &message.fallback_text,
            blocks: &message.blocks,
        };
        let response = self.call("chat.postMessage", &body).await?;
        match (response.channel, response.ts) {
            (Some(channel), Some(ts)) => Ok(MessageRef { channel, ts }),
            _ => Err(NotifierError::Api(
                "chat.postMessage: response missing channel or ts".to_string(),
            )),
        }
    }

    async fn update_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), NotifierError> {
        let body = UpdateMessageBody {
            channel: &target.channel,
            ts: &target.ts,
            text: &message.fallback_text,
            blocks: &message.blocks,
        };
        self.call("chat.update", &body).await?;
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifierError> {
        let body = OpenViewBody { trigger_id, view };
        self.call("views.open", &body).await?;
        Ok(())
    }
}

/// Test double that records every call instead of talking to Slack.
#[derive(Default)]
pub struct RecordingNotifier {
    state: std::sync::Mutex<RecordingState>,
}

#[derive(Default)]
struct RecordingState {
    posted: Vec<(String, MessageTemplate)>,
    updated: Vec<(MessageRef, MessageTemplate)>,
    modals: Vec<(String, ModalView)>,
    fail_posts: bool,
}

impl RecordingNotifier {
    pub fn failing_posts() -> Self {
        let notifier = Self::default();
        notifier.state.lock().expect("recording lock").fail_posts = true;
        notifier
    }

    pub fn posted(&self) -> Vec<(String, MessageTemplate)> {
        self.state.lock().expect("recording lock").posted.clone()
    }

    pub fn updated(&self) -> Vec<(MessageRef, MessageTemplate)> {
        self.state.lock().expect("recording lock").updated.clone()
    }

    pub fn modals(&self) -> Vec<(String, ModalView)> {
        self.state.lock().expect("recording lock").modals.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, NotifierError> {
        let mut state = self.state.lock().expect("recording lock");
        if state.fail_posts {
            return Err(NotifierError::Api("chat.postMessage: scripted failure".to_string()));
        }
        state.posted.push((channel.to_string(), message.clone()));
        let ts = format!("1730000000.{:06}", state.posted.len());
        Ok(MessageRef { channel: channel.to_string(), ts })
    }

    async fn update_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), NotifierError> {
        let mut state = self.state.lock().expect("recording lock");
        state.updated.push((target.clone(), message.clone()));
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), NotifierError> {
        let mut state = self.state.lock().expect("recording lock");
        state.modals.push((trigger_id.to_string(), view.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageRef, Notifier, RecordingNotifier};
    use crate::blocks::{reject_note_modal, MessageBuilder};

    #[tokio::test]
    async fn recording_notifier_captures_calls_in_order() {
        let notifier = RecordingNotifier::default();
        let message = MessageBuilder::new("hello").build();

        let posted = notifier.post_message("#patient-alerts", &message).await.expect("post");
        assert_eq!(posted.channel, "#patient-alerts");

        notifier.update_message(&posted, &message).await.expect("update");
        notifier.open_modal("trig-1", &reject_note_modal("fb-1")).await.expect("modal");

        assert_eq!(notifier.posted().len(), 1);
        assert_eq!(
            notifier.updated(),
            vec![(MessageRef { channel: posted.channel, ts: posted.ts }, message)]
        );
        assert_eq!(notifier.modals()[0].0, "trig-1");
    }

    #[tokio::test]
    async fn failing_posts_surface_an_api_error() {
        let notifier = RecordingNotifier::failing_posts();
        let message = MessageBuilder::new("hello").build();

        let result = notifier.post_message("#patient-alerts", &message).await;
        assert!(result.is_err());
        assert!(notifier.posted().is_empty());
    }
}
