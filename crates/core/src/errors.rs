use thiserror::Error;

/// Error taxonomy shared across the workspace. Interface layers map these
/// onto their own responses (websocket text, HTTP status, Slack ack).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("validation failed: {message}")]
    Validation { message: String, missing: Vec<String> },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("transient failure: {0}")]
    Transient(String),
}

impl CoreError {
    pub fn missing_fields(missing: Vec<String>) -> Self {
        Self::Validation {
            message: format!("missing required fields: {}", missing.join(", ")),
            missing,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    /// Message safe to show to the patient or Slack actor. Internal detail
    /// stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::NotFound { kind, .. } => format!("{kind} not found"),
            Self::Authentication(_) => "Request could not be authenticated.".to_owned(),
            Self::Transient(_) => "An error occurred, please try again.".to_owned(),
        }
    }
}
