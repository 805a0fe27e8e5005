use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::{info, warn};

use careloop_agent::FeedbackService;
use careloop_core::errors::CoreError;

#[derive(Clone)]
struct ChatState {
    service: Arc<FeedbackService>,
}

pub fn router(service: Arc<FeedbackService>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(ChatState { service })
}

/// One inbound frame from the patient client. Anything that does not parse
/// as JSON is treated as a bare message, so plain-text clients still work.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Init {
        #[serde(rename = "nhsNumber")]
        nhs_number: String,
    },
    NewChat,
    Message {
        content: String,
    },
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<ChatState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.service))
}

async fn handle_socket(mut socket: WebSocket, service: Arc<FeedbackService>) {
    // The NHS number is established by the init frame and scopes every
    // later frame on this connection.
    let mut nhs_number: Option<String> = None;

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let reply = dispatch(&service, &mut nhs_number, &text).await;
        if socket.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
    }

    if let Some(nhs_number) = nhs_number {
        info!(nhs_number, "chat connection closed");
    }
}

async fn dispatch(
    service: &FeedbackService,
    nhs_number: &mut Option<String>,
    text: &str,
) -> String {
    let frame = serde_json::from_str::<ClientFrame>(text)
        .unwrap_or_else(|_| ClientFrame::Message { content: text.to_string() });

    match frame {
        ClientFrame::Init { nhs_number: requested } => {
            match service.start_session(&requested).await {
                Ok(start) => {
                    *nhs_number = Some(requested);
                    start.greeting
                }
                Err(error) => {
                    // Unknown NHS number leaves the connection without a
                    // session; the client may retry with another init.
                    info!(nhs_number = requested, error = %error, "session init refused");
                    error.user_message()
                }
            }
        }
        ClientFrame::NewChat => match nhs_number.as_deref() {
            Some(number) => reply_or_user_message(service.new_chat(number).await, number),
            None => uninitialized_reply(),
        },
        ClientFrame::Message { content } => match nhs_number.as_deref() {
            Some(number) => {
                reply_or_user_message(service.handle_message(number, &content).await, number)
            }
            None => uninitialized_reply(),
        },
    }
}

fn reply_or_user_message(result: Result<String, CoreError>, nhs_number: &str) -> String {
    match result {
        Ok(reply) => reply,
        Err(error) => {
            warn!(nhs_number, error = %error, "chat turn failed");
            error.user_message()
        }
    }
}

fn uninitialized_reply() -> String {
    "Please identify yourself first by sending your NHS number.".to_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use careloop_core::domain::patient::PatientProfile;
    use careloop_db::repositories::{
        InMemoryFeedbackRepository, InMemoryUserRepository, UserRepository,
    };

    use careloop_agent::FeedbackService;

    use super::dispatch;

    async fn service() -> Arc<FeedbackService> {
        let users = Arc::new(InMemoryUserRepository::default());
        let feedback = Arc::new(InMemoryFeedbackRepository::default());

        users
            .save(PatientProfile {
                nhs_number: "1234567890".to_string(),
                name: "Alex Morgan".to_string(),
                age: 30,
                gender: "Male".to_string(),
                treatment: "Outpatient".to_string(),
                date_of_treatment: "2024-04-10".to_string(),
                health_issue: "Hypertension".to_string(),
            })
            .await
            .expect("save profile");

        Arc::new(FeedbackService::new(users, feedback))
    }

    #[tokio::test]
    async fn init_frame_opens_a_session_and_greets() {
        let service = service().await;
        let mut session = None;

        let reply = dispatch(
            &service,
            &mut session,
            r#"{"type":"init","nhsNumber":"1234567890"}"#,
        )
        .await;

        assert!(reply.contains("Alex Morgan"));
        assert_eq!(session.as_deref(), Some("1234567890"));
    }

    #[tokio::test]
    async fn unknown_nhs_number_gets_not_found_and_no_session() {
        let service = service().await;
        let mut session = None;

        let reply = dispatch(
            &service,
            &mut session,
            r#"{"type":"init","nhsNumber":"0000000000"}"#,
        )
        .await;

        assert!(reply.contains("not found"));
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn messages_before_init_ask_for_identification() {
        let service = service().await;
        let mut session = None;

        let reply =
            dispatch(&service, &mut session, r#"{"type":"message","content":"hi"}"#).await;
        assert!(reply.contains("NHS number"));
    }

    #[tokio::test]
    async fn raw_text_is_routed_as_message_content() {
        let service = service().await;
        let mut session = None;

        dispatch(&service, &mut session, r#"{"type":"init","nhsNumber":"1234567890"}"#).await;
        let reply = dispatch(&service, &mut session, "hello there").await;

        assert!(reply.contains("healthcare experience"));
    }

    #[tokio::test]
    async fn new_chat_resets_the_conversation() {
        let service = service().await;
        let mut session = None;

        dispatch(&service, &mut session, r#"{"type":"init","nhsNumber":"1234567890"}"#).await;
        dispatch(&service, &mut session, "the ward was noisy all night").await;

        let reply = dispatch(&service, &mut session, r#"{"type":"new_chat"}"#).await;
        assert!(reply.contains("Alex Morgan"));
    }
}
