use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use careloop_core::domain::feedback::FeedbackId;
use careloop_slack::blocks::{
    ACTION_ACKNOWLEDGE, ACTION_REJECT, ACTION_VIEW, REJECT_MODAL_CALLBACK, REJECT_NOTE_ACTION,
    REJECT_NOTE_BLOCK,
};
use careloop_slack::notify::MessageRef;
use careloop_slack::signature::{self, SignatureError};
use careloop_slack::triage::{decode_modal_metadata, TriageError, TriageService};

#[derive(Clone)]
pub struct ActionsState {
    pub triage: Arc<TriageService>,
    pub signing_secret: SecretString,
}

pub fn router(state: ActionsState) -> Router {
    Router::new().route("/slack/actions", post(actions)).with_state(state)
}

/// Slack interactivity payload. Only the fields the triage handlers need
/// are modelled; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct InteractionPayload {
    #[serde(rename = "type")]
    interaction_type: String,
    user: InteractionUser,
    #[serde(default)]
    channel: Option<ChannelRef>,
    #[serde(default)]
    message: Option<SourceMessage>,
    #[serde(default)]
    actions: Vec<ActionInvocation>,
    #[serde(default)]
    trigger_id: Option<String>,
    #[serde(default)]
    view: Option<SubmittedView>,
}

#[derive(Debug, Deserialize)]
struct InteractionUser {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl InteractionUser {
    fn display_name(&self) -> &str {
        self.name.as_deref().or(self.username.as_deref()).unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SourceMessage {
    ts: String,
}

#[derive(Debug, Deserialize)]
struct ActionInvocation {
    action_id: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmittedView {
    callback_id: String,
    #[serde(default)]
    private_metadata: String,
    state: ViewState,
}

#[derive(Debug, Deserialize)]
struct ViewState {
    values: HashMap<String, HashMap<String, BlockValue>>,
}

#[derive(Debug, Deserialize)]
struct BlockValue {
    #[serde(default)]
    value: Option<String>,
}

/// Slack retries on any non-2xx, so processing failures after a verified
/// signature still return 200; the error stays in the logs.
async fn actions(State(state): State<ActionsState>, headers: HeaderMap, body: String) -> Response {
    if let Err(error) = verify_request(&state.signing_secret, &headers, &body) {
        warn!(error = %error, "slack callback failed signature verification");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(reason) => {
            warn!(reason, "slack callback payload could not be parsed");
            return StatusCode::OK.into_response();
        }
    };

    match handle_interaction(&state.triage, payload).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::OK.into_response(),
        Err(error) => {
            warn!(error = %error, "slack interaction failed");
            StatusCode::OK.into_response()
        }
    }
}

fn verify_request(
    signing_secret: &SecretString,
    headers: &HeaderMap,
    body: &str,
) -> Result<(), SignatureError> {
    let timestamp = header(headers, "x-slack-request-timestamp");
    let provided = header(headers, "x-slack-signature");
    signature::verify(signing_secret, timestamp, body, provided, Utc::now().timestamp())
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or("")
}

fn parse_payload(body: &str) -> Result<InteractionPayload, &'static str> {
    let encoded = body.strip_prefix("payload=").ok_or("missing payload field")?;
    let decoded = urlencoding::decode(encoded).map_err(|_| "payload is not valid urlencoding")?;
    serde_json::from_str(&decoded).map_err(|_| "payload is not valid json")
}

async fn handle_interaction(
    triage: &TriageService,
    payload: InteractionPayload,
) -> Result<Option<serde_json::Value>, TriageError> {
    match payload.interaction_type.as_str() {
        "block_actions" => {
            handle_block_action(triage, payload).await?;
            Ok(None)
        }
        "view_submission" => handle_view_submission(triage, payload).await,
        other => {
            debug!(interaction_type = other, "ignoring unhandled interaction type");
            Ok(None)
        }
    }
}

async fn handle_block_action(
    triage: &TriageService,
    payload: InteractionPayload,
) -> Result<(), TriageError> {
    let actor = payload.user.display_name().to_string();
    let Some(action) = payload.actions.into_iter().next() else {
        return Ok(());
    };
    let Some(value) = action.value else {
        warn!(action_id = action.action_id, "button action carried no feedback id");
        return Ok(());
    };
    let id = FeedbackId(value);

    let source = match (payload.channel, payload.message) {
        (Some(channel), Some(message)) => {
            Some(MessageRef { channel: channel.id, ts: message.ts })
        }
        _ => None,
    };

    match action.action_id.as_str() {
        ACTION_VIEW => {
            triage.view(&id).await?;
        }
        ACTION_ACKNOWLEDGE => {
            let Some(source) = source else {
                warn!(feedback_id = %id.0, "acknowledge action without a source message");
                return Ok(());
            };
            triage.acknowledge(&id, &actor, &source).await?;
        }
        ACTION_REJECT => {
            let (Some(trigger_id), Some(source)) = (payload.trigger_id, source) else {
                warn!(feedback_id = %id.0, "reject action without trigger or source message");
                return Ok(());
            };
            triage.open_rejection(&trigger_id, &id, &source).await?;
        }
        other => {
            debug!(action_id = other, "ignoring unknown action id");
        }
    }
    Ok(())
}

async fn handle_view_submission(
    triage: &TriageService,
    payload: InteractionPayload,
) -> Result<Option<serde_json::Value>, TriageError> {
    let actor = payload.user.display_name().to_string();
    let Some(view) = payload.view else {
        return Ok(None);
    };
    if view.callback_id != REJECT_MODAL_CALLBACK {
        debug!(callback_id = view.callback_id, "ignoring unknown view callback");
        return Ok(None);
    }

    let Some((id, source)) = decode_modal_metadata(&view.private_metadata) else {
        warn!("reject submission carried malformed metadata");
        return Ok(None);
    };
    let note = view
        .state
        .values
        .get(REJECT_NOTE_BLOCK)
        .and_then(|block| block.get(REJECT_NOTE_ACTION))
        .and_then(|input| input.value.as_deref())
        .unwrap_or("");

    match triage.reject(&id, &actor, note, &source).await {
        Ok(_) => Ok(None),
        // Surfaced inline on the modal's note field instead of closing it.
        Err(TriageError::Validation(message)) => Ok(Some(json!({
            "response_action": "errors",
            "errors": { REJECT_NOTE_BLOCK: message }
        }))),
        Err(error) => Err(error),
    }
}
